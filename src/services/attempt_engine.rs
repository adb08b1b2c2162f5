use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Question, StudentProfile, Test, TestAttempt},
    models::dto::request::NavigationDirection,
    repositories::{AttemptRepository, ProfileRepository, TestRepository},
    services::notifier::AttemptNotifier,
    services::scoring_service::ScoringService,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Active,
    Finalizing,
    Completed,
    Errored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FinalizeTrigger {
    Manual,
    Timeout,
}

/// Result of a finalized attempt, recorded so that whichever of the two
/// triggers loses the submit/timeout race can return it as a no-op.
#[derive(Clone, Debug)]
pub struct AttemptOutcome {
    pub attempt_id: String,
    pub score: i32,
    pub total_points: i32,
    pub percentage: i64,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

enum FinalizeState {
    Pending,
    Done(AttemptOutcome),
}

/// Everything the handlers need to render a freshly started session.
pub struct StartedAttempt {
    pub attempt: TestAttempt,
    pub test: Test,
    pub questions: Vec<Question>,
    pub duration_seconds: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub attempt_id: String,
    pub test_id: String,
    pub phase: SessionPhase,
    pub current_question: usize,
    pub question_count: usize,
    pub remaining_seconds: i64,
    pub answers: HashMap<String, String>,
}

struct SessionCore {
    answers: HashMap<String, String>,
    current_question: usize,
    phase: SessionPhase,
}

/// One student's live run against a test. The question list is sorted once
/// at creation and frozen; the current-question pointer is an index into it.
pub struct AttemptSession {
    attempt_id: String,
    test_id: String,
    student_id: String,
    questions: Vec<Question>,
    remaining: AtomicI64,
    core: StdMutex<SessionCore>,
    finalize: Mutex<FinalizeState>,
    timer: StdMutex<Option<JoinHandle<()>>>,
}

impl AttemptSession {
    fn new(
        attempt_id: &str,
        test_id: &str,
        student_id: &str,
        questions: Vec<Question>,
        duration_seconds: i64,
    ) -> Self {
        AttemptSession {
            attempt_id: attempt_id.to_string(),
            test_id: test_id.to_string(),
            student_id: student_id.to_string(),
            questions,
            remaining: AtomicI64::new(duration_seconds),
            core: StdMutex::new(SessionCore {
                answers: HashMap::new(),
                current_question: 0,
                phase: SessionPhase::Active,
            }),
            finalize: Mutex::new(FinalizeState::Pending),
            timer: StdMutex::new(None),
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.core.lock().expect("session core lock poisoned").phase = phase;
    }

    fn answers_snapshot(&self) -> HashMap<String, String> {
        self.core
            .lock()
            .expect("session core lock poisoned")
            .answers
            .clone()
    }

    fn remaining_seconds(&self) -> i64 {
        self.remaining.load(Ordering::SeqCst).max(0)
    }

    /// Aborts the countdown task, if one is still running. Harmless when the
    /// task already finished; must never be called from the countdown task
    /// itself while a finalization it claimed is in flight.
    fn cancel_countdown(&self) {
        let handle = self.timer.lock().expect("session timer lock poisoned").take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct AttemptEngine {
    tests: Arc<dyn TestRepository>,
    attempts: Arc<dyn AttemptRepository>,
    profiles: Arc<dyn ProfileRepository>,
    notifier: Arc<dyn AttemptNotifier>,
    sessions: Arc<RwLock<HashMap<String, Arc<AttemptSession>>>>,
}

impl AttemptEngine {
    pub fn new(
        tests: Arc<dyn TestRepository>,
        attempts: Arc<dyn AttemptRepository>,
        profiles: Arc<dyn ProfileRepository>,
        notifier: Arc<dyn AttemptNotifier>,
    ) -> Self {
        Self {
            tests,
            attempts,
            profiles,
            notifier,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Eligibility check plus attempt creation. The countdown starts only
    /// after the attempt row exists and the session is registered, so none
    /// of the setup latency is charged against the student's time limit.
    pub async fn start_attempt(
        &self,
        test_id: &str,
        student_user_id: &str,
    ) -> AppResult<StartedAttempt> {
        let test = self
            .tests
            .find_published_by_id(test_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Test '{}' not found or not available", test_id))
            })?;

        let completed = self
            .attempts
            .find_completed_by_test_and_student(test_id, student_user_id)
            .await?;
        if !completed.is_empty() && !test.allow_unlimited_attempts {
            return Err(AppError::AttemptBlocked(
                "You have already attempted this test".to_string(),
            ));
        }

        let profile = self
            .profiles
            .find_by_user_id(student_user_id)
            .await?
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "No student profile found for user '{}'",
                    student_user_id
                ))
            })?;
        if !profile.is_complete() {
            return Err(AppError::ValidationError(
                "Student profile is missing a name or roll number".to_string(),
            ));
        }

        // A second open on the same test supersedes the first: drop any live
        // session this process still holds for the pair before inserting.
        self.supersede_live_session(test_id, student_user_id).await;

        let attempt = self.create_attempt_row(&test, &profile).await?;

        let questions = test.sorted_questions();
        let duration_seconds = test.duration_minutes * 60;

        let session = Arc::new(AttemptSession::new(
            &attempt.id,
            test_id,
            student_user_id,
            questions.clone(),
            duration_seconds,
        ));
        self.sessions
            .write()
            .await
            .insert(attempt.id.clone(), Arc::clone(&session));
        self.spawn_countdown(Arc::clone(&session));

        log::info!(
            "attempt {} started on test '{}' by student {} ({}s on the clock)",
            attempt.id,
            test.title,
            student_user_id,
            duration_seconds
        );

        Ok(StartedAttempt {
            attempt,
            test,
            questions,
            duration_seconds,
        })
    }

    /// Overwrites any prior selection for the question. Accepted only while
    /// the session is active; option membership is not validated here, the
    /// grading pass recomputes correctness from the catalog data.
    pub async fn set_answer(
        &self,
        attempt_id: &str,
        student_user_id: &str,
        question_id: &str,
        option_id: &str,
    ) -> AppResult<()> {
        let session = self.get_session(attempt_id, student_user_id).await?;

        let mut core = session.core.lock().expect("session core lock poisoned");
        if core.phase != SessionPhase::Active {
            return Err(AppError::AttemptBlocked(format!(
                "Attempt '{}' is no longer accepting answers",
                attempt_id
            )));
        }
        core.answers
            .insert(question_id.to_string(), option_id.to_string());
        Ok(())
    }

    /// Moves the current-question pointer, clamped to the question range.
    /// Navigation touches neither the countdown nor the captured answers.
    pub async fn navigate(
        &self,
        attempt_id: &str,
        student_user_id: &str,
        direction: NavigationDirection,
    ) -> AppResult<usize> {
        let session = self.get_session(attempt_id, student_user_id).await?;

        let mut core = session.core.lock().expect("session core lock poisoned");
        if core.phase != SessionPhase::Active {
            return Err(AppError::AttemptBlocked(format!(
                "Attempt '{}' is no longer active",
                attempt_id
            )));
        }
        let last = session.questions.len().saturating_sub(1);
        core.current_question = match direction {
            NavigationDirection::Previous => core.current_question.saturating_sub(1),
            NavigationDirection::Next => (core.current_question + 1).min(last),
        };
        Ok(core.current_question)
    }

    pub async fn session_state(
        &self,
        attempt_id: &str,
        student_user_id: &str,
    ) -> AppResult<SessionSnapshot> {
        let session = self.get_session(attempt_id, student_user_id).await?;

        let core = session.core.lock().expect("session core lock poisoned");
        Ok(SessionSnapshot {
            attempt_id: session.attempt_id.clone(),
            test_id: session.test_id.clone(),
            phase: core.phase,
            current_question: core.current_question,
            question_count: session.questions.len(),
            remaining_seconds: session.remaining_seconds(),
            answers: core.answers.clone(),
        })
    }

    /// Manual submission. Retryable: after a storage failure the session and
    /// its captured answers stay in place and submit may be called again.
    pub async fn submit(
        &self,
        attempt_id: &str,
        student_user_id: &str,
    ) -> AppResult<AttemptOutcome> {
        let session = self.get_session(attempt_id, student_user_id).await?;
        self.finalize(session, FinalizeTrigger::Manual).await
    }

    /// Drops the session without scoring it: cancels the countdown and
    /// deletes the in-progress attempt row so the student may start over.
    pub async fn abandon(&self, attempt_id: &str, student_user_id: &str) -> AppResult<()> {
        let session = self.get_session(attempt_id, student_user_id).await?;

        session.cancel_countdown();
        self.sessions.write().await.remove(attempt_id);
        self.attempts.delete_in_progress(attempt_id).await?;

        log::info!("attempt {} abandoned by student {}", attempt_id, student_user_id);
        Ok(())
    }

    async fn get_session(
        &self,
        attempt_id: &str,
        student_user_id: &str,
    ) -> AppResult<Arc<AttemptSession>> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(attempt_id).cloned().ok_or_else(|| {
            AppError::NotFound(format!("No active session for attempt '{}'", attempt_id))
        })?;
        if session.student_id != student_user_id {
            return Err(AppError::Forbidden(
                "This attempt belongs to another student".to_string(),
            ));
        }
        Ok(session)
    }

    async fn supersede_live_session(&self, test_id: &str, student_user_id: &str) {
        let stale = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .find(|s| s.test_id == test_id && s.student_id == student_user_id)
                .cloned()
        };
        if let Some(stale) = stale {
            log::warn!(
                "superseding live session for attempt {} (student {} reopened test {})",
                stale.attempt_id,
                student_user_id,
                test_id
            );
            stale.cancel_countdown();
            self.sessions.write().await.remove(&stale.attempt_id);
        }
    }

    /// Inserts the attempt row. The store's unique active-attempt index may
    /// refuse it when a stale in-progress row survives from a crashed or
    /// superseded session; that row is cleared and the insert retried once.
    async fn create_attempt_row(
        &self,
        test: &Test,
        profile: &StudentProfile,
    ) -> AppResult<TestAttempt> {
        let attempt = TestAttempt::start(&test.id, profile);
        match self.attempts.create(attempt).await {
            Ok(created) => Ok(created),
            Err(AppError::AttemptBlocked(_)) => {
                let cleared = self
                    .attempts
                    .delete_active_for_student(&test.id, &profile.user_id)
                    .await?;
                log::warn!(
                    "cleared {} stale in-progress attempt(s) on test {} for student {}",
                    cleared,
                    test.id,
                    profile.user_id
                );
                self.attempts.create(TestAttempt::start(&test.id, profile)).await
            }
            Err(err) => Err(err),
        }
    }

    fn spawn_countdown(&self, session: Arc<AttemptSession>) {
        let engine = self.clone();
        let timer_session = Arc::clone(&session);
        let handle = tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(1));
            // The first tick completes immediately; consume it so the clock
            // only starts draining a full second from now.
            tick.tick().await;
            loop {
                tick.tick().await;
                let left = timer_session.remaining.fetch_sub(1, Ordering::SeqCst) - 1;
                if left <= 0 {
                    break;
                }
            }
            log::info!("time expired for attempt {}", timer_session.attempt_id);
            if let Err(err) = engine
                .finalize(Arc::clone(&timer_session), FinalizeTrigger::Timeout)
                .await
            {
                log::error!(
                    "auto-submit failed for attempt {}: {}",
                    timer_session.attempt_id,
                    err
                );
            }
        });
        *session.timer.lock().expect("session timer lock poisoned") = Some(handle);
    }

    /// Scores and persists the attempt at most once. The async mutex on the
    /// session's finalize state serializes the timeout/submit race: the
    /// loser observes the recorded outcome and returns it without writing.
    async fn finalize(
        &self,
        session: Arc<AttemptSession>,
        trigger: FinalizeTrigger,
    ) -> AppResult<AttemptOutcome> {
        let mut flight = session.finalize.lock().await;
        if let FinalizeState::Done(outcome) = &*flight {
            return Ok(outcome.clone());
        }

        session.set_phase(SessionPhase::Finalizing);
        if trigger == FinalizeTrigger::Manual {
            // The countdown task finalizes from its own tail and must not
            // abort itself; only the manual path cancels it here.
            session.cancel_countdown();
        }

        let selections = session.answers_snapshot();
        let (score, graded) =
            ScoringService::score_answers(&session.attempt_id, &session.questions, &selections);
        let total_points = ScoringService::total_points(&session.questions);
        let completed_at = Utc::now();

        match self.persist_completion(&session, completed_at, score, graded).await {
            Ok(effective_completed_at) => {
                let outcome = AttemptOutcome {
                    attempt_id: session.attempt_id.clone(),
                    score,
                    total_points,
                    percentage: ScoringService::percentage(score, total_points),
                    passed: ScoringService::is_passing(score, total_points),
                    completed_at: effective_completed_at,
                };
                *flight = FinalizeState::Done(outcome.clone());
                session.set_phase(SessionPhase::Completed);
                drop(flight);

                self.sessions.write().await.remove(&session.attempt_id);
                self.notifier
                    .attempt_completed(&session.attempt_id, score, total_points);
                Ok(outcome)
            }
            Err(err) => {
                // The captured answers survive in the session; the caller
                // may re-invoke submit once storage recovers.
                session.set_phase(SessionPhase::Errored);
                self.notifier
                    .attempt_failed(&session.attempt_id, &err.to_string());
                Err(err)
            }
        }
    }

    /// Applies the two completion writes, re-checking persisted state first
    /// so a retry after a partial failure never duplicates anything.
    async fn persist_completion(
        &self,
        session: &AttemptSession,
        completed_at: DateTime<Utc>,
        score: i32,
        graded: Vec<crate::models::domain::AttemptAnswer>,
    ) -> AppResult<DateTime<Utc>> {
        let stored = self
            .attempts
            .find_by_id(&session.attempt_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "Attempt '{}' vanished from storage",
                    session.attempt_id
                ))
            })?;

        let effective_completed_at = match stored.completed_at {
            Some(previous) => previous,
            None => {
                self.attempts
                    .complete(&session.attempt_id, completed_at, score)
                    .await?;
                completed_at
            }
        };

        if !graded.is_empty() {
            let existing = self
                .attempts
                .find_answers_by_attempt(&session.attempt_id)
                .await?;
            if existing.is_empty() {
                self.attempts.insert_answers(graded).await?;
            }
        }

        Ok(effective_completed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{QuestionOption, StudentProfile};
    use crate::repositories::{MockAttemptRepository, MockProfileRepository, MockTestRepository};
    use crate::services::notifier::LogNotifier;

    fn published_test() -> Test {
        let mut test = Test::new("Algebra I", "Linear equations", 30, "teacher-1");
        test.is_published = true;
        test.questions = vec![Question::new(
            "What is 2 + 2?",
            "Basic addition",
            1,
            0,
            vec![
                QuestionOption::new("3", false),
                QuestionOption::new("4", true),
            ],
        )];
        test
    }

    fn completed_attempt(test_id: &str, student_id: &str) -> TestAttempt {
        let profile = StudentProfile::new(student_id, "Asha Rao", "CS-042");
        let mut attempt = TestAttempt::start(test_id, &profile);
        attempt.completed_at = Some(Utc::now());
        attempt.score = Some(1);
        attempt
    }

    fn engine(
        tests: MockTestRepository,
        attempts: MockAttemptRepository,
        profiles: MockProfileRepository,
    ) -> AttemptEngine {
        AttemptEngine::new(
            Arc::new(tests),
            Arc::new(attempts),
            Arc::new(profiles),
            Arc::new(LogNotifier),
        )
    }

    #[tokio::test]
    async fn unpublished_test_is_not_found() {
        let mut tests = MockTestRepository::new();
        tests
            .expect_find_published_by_id()
            .returning(|_| Ok(None));

        let engine = engine(tests, MockAttemptRepository::new(), MockProfileRepository::new());
        let result = engine.start_attempt("missing", "student-1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn completed_attempt_blocks_second_start() {
        let test = published_test();
        let test_id = test.id.clone();

        let mut tests = MockTestRepository::new();
        tests
            .expect_find_published_by_id()
            .returning(move |_| Ok(Some(test.clone())));

        let mut attempts = MockAttemptRepository::new();
        let prior = completed_attempt(&test_id, "student-1");
        attempts
            .expect_find_completed_by_test_and_student()
            .returning(move |_, _| Ok(vec![prior.clone()]));

        let engine = engine(tests, attempts, MockProfileRepository::new());
        let result = engine.start_attempt(&test_id, "student-1").await;

        assert!(matches!(result, Err(AppError::AttemptBlocked(_))));
    }

    #[tokio::test]
    async fn unlimited_attempts_allow_restart() {
        let mut test = published_test();
        test.allow_unlimited_attempts = true;
        let test_id = test.id.clone();

        let mut tests = MockTestRepository::new();
        tests
            .expect_find_published_by_id()
            .returning(move |_| Ok(Some(test.clone())));

        let mut attempts = MockAttemptRepository::new();
        let prior = completed_attempt(&test_id, "student-1");
        attempts
            .expect_find_completed_by_test_and_student()
            .returning(move |_, _| Ok(vec![prior.clone()]));
        attempts.expect_create().returning(Ok);
        attempts.expect_delete_in_progress().returning(|_| Ok(()));

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_user_id()
            .returning(|user_id| Ok(Some(StudentProfile::new(user_id, "Asha Rao", "CS-042"))));

        let engine = engine(tests, attempts, profiles);
        let started = engine
            .start_attempt(&test_id, "student-1")
            .await
            .expect("restart allowed");

        assert_eq!(started.duration_seconds, 30 * 60);
        assert_eq!(started.questions.len(), 1);
        // Clean up the countdown we just spawned.
        engine
            .abandon(&started.attempt.id, "student-1")
            .await
            .ok();
    }

    #[tokio::test]
    async fn missing_profile_is_a_validation_error() {
        let test = published_test();
        let test_id = test.id.clone();

        let mut tests = MockTestRepository::new();
        tests
            .expect_find_published_by_id()
            .returning(move |_| Ok(Some(test.clone())));

        let mut attempts = MockAttemptRepository::new();
        attempts
            .expect_find_completed_by_test_and_student()
            .returning(|_, _| Ok(vec![]));

        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_user_id().returning(|_| Ok(None));

        let engine = engine(tests, attempts, profiles);
        let result = engine.start_attempt(&test_id, "student-1").await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
