use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    errors::{AppError, AppResult},
    models::domain::TestAttempt,
    repositories::{AttemptRepository, TestRepository},
    services::scoring_service::ScoringService,
};

#[derive(Clone, Debug, Serialize)]
pub struct TestAnalytics {
    pub test_id: String,
    pub test_title: String,
    pub created_by: String,
    pub total_points: i32,
    pub total_attempts: i64,
    pub average_score: i64,
    pub pass_rate: i64,
    pub highest_score: i32,
    pub lowest_score: i32,
    pub attempts: Vec<AttemptRow>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AttemptRow {
    pub attempt_id: String,
    pub student_name: String,
    pub student_roll: String,
    pub score: i32,
    pub percentage: i64,
    pub passed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryRow {
    pub attempt_id: String,
    pub test_id: String,
    pub test_title: String,
    pub score: i32,
    pub total_points: i32,
    pub percentage: i64,
    pub passed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Read-only summaries over completed attempts. Stateless per request; both
/// views recompute total points from the catalog so the numbers here always
/// match what submission reported.
pub struct AnalyticsService {
    tests: Arc<dyn TestRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

struct ScoreSummary {
    total_attempts: i64,
    average_score: i64,
    pass_rate: i64,
    highest_score: i32,
    lowest_score: i32,
}

impl AnalyticsService {
    pub fn new(tests: Arc<dyn TestRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { tests, attempts }
    }

    pub async fn compute_analytics(&self, test_id: &str) -> AppResult<TestAnalytics> {
        let test = self
            .tests
            .find_by_id(test_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test with id '{}' not found", test_id)))?;

        let questions = test.sorted_questions();
        let total_points = ScoringService::total_points(&questions);

        let completed = self.attempts.find_completed_by_test(test_id).await?;
        let summary = Self::summarize(total_points, &completed);

        let attempts = completed
            .iter()
            .map(|attempt| {
                let score = attempt.score.unwrap_or(0);
                AttemptRow {
                    attempt_id: attempt.id.clone(),
                    student_name: attempt.student_name.clone(),
                    student_roll: attempt.student_roll.clone(),
                    score,
                    percentage: ScoringService::percentage(score, total_points),
                    passed: ScoringService::is_passing(score, total_points),
                    completed_at: attempt.completed_at,
                }
            })
            .collect();

        Ok(TestAnalytics {
            test_id: test.id,
            test_title: test.title,
            created_by: test.created_by,
            total_points,
            total_attempts: summary.total_attempts,
            average_score: summary.average_score,
            pass_rate: summary.pass_rate,
            highest_score: summary.highest_score,
            lowest_score: summary.lowest_score,
            attempts,
        })
    }

    /// The student's own completed attempts, joined with their tests. Total
    /// points are recomputed per test with the same helpers submission uses.
    pub async fn student_history(&self, student_user_id: &str) -> AppResult<Vec<HistoryRow>> {
        let completed = self
            .attempts
            .find_completed_by_student(student_user_id)
            .await?;

        let mut rows = Vec::with_capacity(completed.len());
        for attempt in completed {
            let Some(test) = self.tests.find_by_id(&attempt.test_id).await? else {
                // The test was deleted after the attempt; skip rather than fail
                // the whole history view.
                log::warn!(
                    "attempt {} references missing test {}",
                    attempt.id,
                    attempt.test_id
                );
                continue;
            };

            let total_points = ScoringService::total_points(&test.sorted_questions());
            let score = attempt.score.unwrap_or(0);
            rows.push(HistoryRow {
                attempt_id: attempt.id,
                test_id: test.id,
                test_title: test.title,
                score,
                total_points,
                percentage: ScoringService::percentage(score, total_points),
                passed: ScoringService::is_passing(score, total_points),
                completed_at: attempt.completed_at,
            });
        }
        Ok(rows)
    }

    /// All-zero metrics for an empty attempt list; never NaN, never an error.
    fn summarize(total_points: i32, completed: &[TestAttempt]) -> ScoreSummary {
        let scores: Vec<i32> = completed.iter().map(|a| a.score.unwrap_or(0)).collect();
        if scores.is_empty() {
            return ScoreSummary {
                total_attempts: 0,
                average_score: 0,
                pass_rate: 0,
                highest_score: 0,
                lowest_score: 0,
            };
        }

        let count = scores.len();
        let sum: i64 = scores.iter().map(|s| *s as i64).sum();
        let passed = scores
            .iter()
            .filter(|s| ScoringService::is_passing(**s, total_points))
            .count();

        ScoreSummary {
            total_attempts: count as i64,
            average_score: (sum as f64 / count as f64).round() as i64,
            pass_rate: ((passed as f64 / count as f64) * 100.0).round() as i64,
            highest_score: scores.iter().copied().max().unwrap_or(0),
            lowest_score: scores.iter().copied().min().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{Question, QuestionOption, StudentProfile, Test};
    use crate::repositories::{MockAttemptRepository, MockTestRepository};

    fn test_with_points(points: &[i32]) -> Test {
        let mut test = Test::new("Geometry", "Angles and shapes", 20, "teacher-1");
        test.is_published = true;
        test.questions = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Question::new(
                    &format!("Q{}", i + 1),
                    "",
                    *p,
                    i as i16,
                    vec![
                        QuestionOption::new("right", true),
                        QuestionOption::new("wrong", false),
                    ],
                )
            })
            .collect();
        test
    }

    fn completed_attempt(test_id: &str, student: &str, score: i32) -> TestAttempt {
        let profile = StudentProfile::new(student, "Asha Rao", "CS-042");
        let mut attempt = TestAttempt::start(test_id, &profile);
        attempt.completed_at = Some(Utc::now());
        attempt.score = Some(score);
        attempt
    }

    fn service(tests: MockTestRepository, attempts: MockAttemptRepository) -> AnalyticsService {
        AnalyticsService::new(Arc::new(tests), Arc::new(attempts))
    }

    #[tokio::test]
    async fn zero_attempts_yields_all_zero_metrics() {
        let test = test_with_points(&[1, 2]);
        let test_id = test.id.clone();

        let mut tests = MockTestRepository::new();
        tests
            .expect_find_by_id()
            .returning(move |_| Ok(Some(test.clone())));

        let mut attempts = MockAttemptRepository::new();
        attempts
            .expect_find_completed_by_test()
            .returning(|_| Ok(vec![]));

        let analytics = service(tests, attempts)
            .compute_analytics(&test_id)
            .await
            .expect("analytics computes");

        assert_eq!(analytics.total_points, 3);
        assert_eq!(analytics.total_attempts, 0);
        assert_eq!(analytics.average_score, 0);
        assert_eq!(analytics.pass_rate, 0);
        assert_eq!(analytics.highest_score, 0);
        assert_eq!(analytics.lowest_score, 0);
        assert!(analytics.attempts.is_empty());
    }

    #[tokio::test]
    async fn summary_statistics_over_mixed_scores() {
        // Total 10 points; pass needs >= 4.
        let test = test_with_points(&[4, 6]);
        let test_id = test.id.clone();

        let mut tests = MockTestRepository::new();
        tests
            .expect_find_by_id()
            .returning(move |_| Ok(Some(test.clone())));

        let mut attempts = MockAttemptRepository::new();
        let rows = vec![
            completed_attempt(&test_id, "s1", 10),
            completed_attempt(&test_id, "s2", 4),
            completed_attempt(&test_id, "s3", 0),
        ];
        attempts
            .expect_find_completed_by_test()
            .returning(move |_| Ok(rows.clone()));

        let analytics = service(tests, attempts)
            .compute_analytics(&test_id)
            .await
            .expect("analytics computes");

        assert_eq!(analytics.total_attempts, 3);
        // mean(10, 4, 0) = 4.67 -> 5
        assert_eq!(analytics.average_score, 5);
        // 2 of 3 at or above 4 points
        assert_eq!(analytics.pass_rate, 67);
        assert_eq!(analytics.highest_score, 10);
        assert_eq!(analytics.lowest_score, 0);

        let top = &analytics.attempts[0];
        assert_eq!(top.percentage, 100);
        assert!(top.passed);
        let bottom = analytics
            .attempts
            .iter()
            .find(|a| a.score == 0)
            .expect("zero-score row present");
        assert_eq!(bottom.percentage, 0);
        assert!(!bottom.passed);
    }

    #[tokio::test]
    async fn zero_point_test_reports_zero_percentages() {
        let test = test_with_points(&[]);
        let test_id = test.id.clone();

        let mut tests = MockTestRepository::new();
        tests
            .expect_find_by_id()
            .returning(move |_| Ok(Some(test.clone())));

        let mut attempts = MockAttemptRepository::new();
        let rows = vec![completed_attempt(&test_id, "s1", 0)];
        attempts
            .expect_find_completed_by_test()
            .returning(move |_| Ok(rows.clone()));

        let analytics = service(tests, attempts)
            .compute_analytics(&test_id)
            .await
            .expect("analytics computes");

        assert_eq!(analytics.total_points, 0);
        assert_eq!(analytics.attempts[0].percentage, 0);
    }

    #[tokio::test]
    async fn history_skips_attempts_whose_test_vanished() {
        let test = test_with_points(&[1, 2]);
        let test_id = test.id.clone();

        let mut tests = MockTestRepository::new();
        let known = test_id.clone();
        tests.expect_find_by_id().returning(move |id| {
            if id == known {
                Ok(Some(test.clone()))
            } else {
                Ok(None)
            }
        });

        let mut attempts = MockAttemptRepository::new();
        let rows = vec![
            completed_attempt(&test_id, "s1", 1),
            completed_attempt("deleted-test", "s1", 2),
        ];
        attempts
            .expect_find_completed_by_student()
            .returning(move |_| Ok(rows.clone()));

        let history = service(tests, attempts)
            .student_history("s1")
            .await
            .expect("history computes");

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_points, 3);
        assert_eq!(history[0].percentage, 33);
    }

    #[tokio::test]
    async fn missing_test_is_not_found() {
        let mut tests = MockTestRepository::new();
        tests.expect_find_by_id().returning(|_| Ok(None));

        let result = service(tests, MockAttemptRepository::new())
            .compute_analytics("missing")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
