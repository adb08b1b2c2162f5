use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::Question;
use crate::services::attempt_engine::{AttemptOutcome, StartedAttempt};

/// Question view handed to a student mid-attempt: option correctness and the
/// explanation are withheld until after finalization.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionForTaking {
    pub id: String,
    pub text: String,
    pub points: i32,
    pub options: Vec<OptionForTaking>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionForTaking {
    pub id: String,
    pub text: String,
}

impl QuestionForTaking {
    pub fn from_question(question: Question) -> Self {
        QuestionForTaking {
            id: question.id,
            text: question.text,
            points: question.points,
            options: question
                .options
                .into_iter()
                .map(|opt| OptionForTaking {
                    id: opt.id,
                    text: opt.text,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptStartedResponse {
    pub attempt_id: String,
    pub test_id: String,
    pub title: String,
    pub description: String,
    pub duration_seconds: i64,
    pub started_at: DateTime<Utc>,
    pub questions: Vec<QuestionForTaking>,
}

impl From<StartedAttempt> for AttemptStartedResponse {
    fn from(started: StartedAttempt) -> Self {
        AttemptStartedResponse {
            attempt_id: started.attempt.id,
            test_id: started.test.id,
            title: started.test.title,
            description: started.test.description,
            duration_seconds: started.duration_seconds,
            started_at: started.attempt.started_at,
            questions: started
                .questions
                .into_iter()
                .map(QuestionForTaking::from_question)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResultResponse {
    pub attempt_id: String,
    pub score: i32,
    pub total_points: i32,
    pub percentage: i64,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

impl From<AttemptOutcome> for SubmitResultResponse {
    fn from(outcome: AttemptOutcome) -> Self {
        SubmitResultResponse {
            attempt_id: outcome.attempt_id,
            score: outcome.score,
            total_points: outcome.total_points,
            percentage: outcome.percentage,
            passed: outcome.passed,
            completed_at: outcome.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    pub current_question: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::QuestionOption;

    #[test]
    fn taking_view_withholds_correctness() {
        let question = Question::new(
            "What is 2 + 2?",
            "Basic addition",
            1,
            0,
            vec![
                QuestionOption::new("3", false),
                QuestionOption::new("4", true),
            ],
        );

        let view = QuestionForTaking::from_question(question);
        let json = serde_json::to_value(&view).expect("view serializes");

        assert_eq!(view.options.len(), 2);
        assert!(json["options"][0].get("is_correct").is_none());
        assert!(json.get("explanation").is_none());
    }
}
