use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::question::Question;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Test {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration_minutes: i64,
    pub is_published: bool,
    pub allow_unlimited_attempts: bool,
    pub created_by: String,
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Test {
    pub fn new(title: &str, description: &str, duration_minutes: i64, created_by: &str) -> Self {
        Test {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            duration_minutes,
            is_published: false,
            allow_unlimited_attempts: false,
            created_by: created_by.to_string(),
            questions: Vec::new(),
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    /// Questions in creation order. The current-question pointer is
    /// positional, so every consumer must see the same ordering.
    pub fn sorted_questions(&self) -> Vec<Question> {
        let mut questions = self.questions.clone();
        questions.sort_by_key(|q| q.position);
        questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::question::QuestionOption;

    #[test]
    fn test_new_defaults_to_unpublished() {
        let test = Test::new("Algebra I", "Linear equations", 30, "teacher-1");

        assert!(!test.is_published);
        assert!(!test.allow_unlimited_attempts);
        assert!(test.questions.is_empty());
        assert!(test.created_at.is_some());
    }

    #[test]
    fn sorted_questions_follows_creation_order() {
        let mut test = Test::new("Algebra I", "Linear equations", 30, "teacher-1");
        test.questions = vec![
            Question::new("Second", "", 2, 1, vec![QuestionOption::new("b", true)]),
            Question::new("First", "", 1, 0, vec![QuestionOption::new("a", true)]),
            Question::new("Third", "", 1, 2, vec![QuestionOption::new("c", true)]),
        ];

        let sorted = test.sorted_questions();
        assert_eq!(sorted[0].text, "First");
        assert_eq!(sorted[1].text, "Second");
        assert_eq!(sorted[2].text, "Third");
    }
}
