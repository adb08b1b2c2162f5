use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::student_profile::StudentProfile;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestAttempt {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub student_name: String,
    pub student_roll: String,
    pub started_at: DateTime<Utc>,
    // Serialized as an explicit null while in progress; the store's partial
    // unique index on (test_id, student_id) keys on that null.
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttemptAnswer {
    pub id: String,
    pub test_attempt_id: String,
    pub question_id: String,
    pub selected_option_id: String,
    pub is_correct: bool,
}

impl TestAttempt {
    pub fn start(test_id: &str, student: &StudentProfile) -> Self {
        let now = Utc::now();
        TestAttempt {
            id: Uuid::new_v4().to_string(),
            test_id: test_id.to_string(),
            student_id: student.user_id.clone(),
            student_name: student.name.clone(),
            student_roll: student.roll_number.clone(),
            started_at: now,
            completed_at: None,
            score: None,
            created_at: Some(now),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}
