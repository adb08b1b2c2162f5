use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, max = 64))]
    pub test_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    #[validate(length(min = 1, max = 64))]
    pub question_id: String,

    #[validate(length(min = 1, max = 64))]
    pub option_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigateRequest {
    pub direction: NavigationDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationDirection {
    Previous,
    Next,
}
