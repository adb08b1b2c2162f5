use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub explanation: String,
    pub points: i32,
    pub position: i16,
    pub options: Vec<QuestionOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl Question {
    pub fn new(
        text: &str,
        explanation: &str,
        points: i32,
        position: i16,
        options: Vec<QuestionOption>,
    ) -> Self {
        Question {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            explanation: explanation.to_string(),
            points,
            position,
            options,
        }
    }

    pub fn correct_option(&self) -> Option<&QuestionOption> {
        self.options.iter().find(|opt| opt.is_correct)
    }
}

impl QuestionOption {
    pub fn new(text: &str, is_correct: bool) -> Self {
        QuestionOption {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            is_correct,
        }
    }
}
