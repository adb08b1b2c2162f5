use std::collections::HashMap;

use uuid::Uuid;

use crate::models::domain::{AttemptAnswer, Question};

/// Fraction of the total points needed to pass. The source material shipped
/// two different constants on different screens; 40% is the canonical value
/// here and every pass/fail decision goes through [`ScoringService::is_passing`].
pub const PASS_THRESHOLD: f64 = 0.4;

/// Stateless grading. Total points are never stored on the test record, so
/// this is the one place they are derived; attempt scoring, analytics and
/// history views all agree because they all call in here.
pub struct ScoringService;

impl ScoringService {
    pub fn total_points(questions: &[Question]) -> i32 {
        questions.iter().map(|q| q.points).sum()
    }

    /// Score a captured answer map against the session's question list.
    ///
    /// Unanswered questions contribute nothing and produce no answer row.
    /// A selected option id that matches none of the question's options is
    /// graded incorrect rather than rejected; capture is client-trusted and
    /// correctness is recomputed here, at save time.
    pub fn score_answers(
        attempt_id: &str,
        questions: &[Question],
        selections: &HashMap<String, String>,
    ) -> (i32, Vec<AttemptAnswer>) {
        let mut score = 0;
        let mut graded = Vec::with_capacity(selections.len());

        for question in questions {
            let Some(option_id) = selections.get(&question.id) else {
                continue;
            };

            let is_correct = question
                .options
                .iter()
                .find(|opt| opt.id == *option_id)
                .map(|opt| opt.is_correct)
                .unwrap_or(false);

            if is_correct {
                score += question.points;
            }

            graded.push(AttemptAnswer {
                id: Uuid::new_v4().to_string(),
                test_attempt_id: attempt_id.to_string(),
                question_id: question.id.clone(),
                selected_option_id: option_id.clone(),
                is_correct,
            });
        }

        (score, graded)
    }

    /// Rounded percentage; 0 when the test carries no points at all.
    pub fn percentage(score: i32, total_points: i32) -> i64 {
        if total_points <= 0 {
            return 0;
        }
        ((score as f64 / total_points as f64) * 100.0).round() as i64
    }

    /// Pass predicate over raw points, so point and percentage displays can
    /// never disagree about the verdict.
    pub fn is_passing(score: i32, total_points: i32) -> bool {
        score as f64 >= total_points as f64 * PASS_THRESHOLD
    }
}
