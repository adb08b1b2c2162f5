use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct StudentProfile {
    pub user_id: String,
    pub name: String,
    pub roll_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl StudentProfile {
    pub fn new(user_id: &str, name: &str, roll_number: &str) -> Self {
        StudentProfile {
            user_id: user_id.to_string(),
            name: name.to_string(),
            roll_number: roll_number.to_string(),
            created_at: Some(Utc::now()),
        }
    }

    /// Attempt records denormalize the student's name and roll, so an
    /// incomplete profile refuses attempt creation up front.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.roll_number.trim().is_empty()
    }
}
