use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{AttemptAnswer, TestAttempt},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn create(&self, attempt: TestAttempt) -> AppResult<TestAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestAttempt>>;
    async fn find_completed_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> AppResult<Vec<TestAttempt>>;
    async fn find_completed_by_test(&self, test_id: &str) -> AppResult<Vec<TestAttempt>>;
    async fn find_completed_by_student(&self, student_id: &str) -> AppResult<Vec<TestAttempt>>;
    async fn complete(
        &self,
        attempt_id: &str,
        completed_at: DateTime<Utc>,
        score: i32,
    ) -> AppResult<()>;
    async fn insert_answers(&self, answers: Vec<AttemptAnswer>) -> AppResult<()>;
    async fn find_answers_by_attempt(&self, attempt_id: &str) -> AppResult<Vec<AttemptAnswer>>;
    async fn delete_in_progress(&self, attempt_id: &str) -> AppResult<()>;
    async fn delete_active_for_student(&self, test_id: &str, student_id: &str) -> AppResult<u64>;
}

pub struct MongoAttemptRepository {
    attempts: Collection<TestAttempt>,
    answers: Collection<AttemptAnswer>,
}

impl MongoAttemptRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            attempts: db.get_collection("test_attempts"),
            answers: db.get_collection("answers"),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for test_attempts and answers collections");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // At most one in-progress attempt per (test, student). The filter
        // keys on the explicit null that in-progress attempts serialize.
        let active_attempt_index = IndexModel::builder()
            .keys(doc! { "test_id": 1, "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "completed_at": { "$type": "null" } })
                    .name("one_active_attempt".to_string())
                    .build(),
            )
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1, "test_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("student_test".to_string())
                    .build(),
            )
            .build();

        self.attempts.create_index(id_index).await?;
        self.attempts.create_index(active_attempt_index).await?;
        self.attempts.create_index(student_index).await?;

        let answer_attempt_index = IndexModel::builder()
            .keys(doc! { "test_attempt_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("answers_by_attempt".to_string())
                    .build(),
            )
            .build();

        self.answers.create_index(answer_attempt_index).await?;

        Ok(())
    }

    fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        matches!(
            err.kind.as_ref(),
            mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(write_err))
                if write_err.code == 11000
        )
    }
}

#[async_trait]
impl AttemptRepository for MongoAttemptRepository {
    async fn create(&self, attempt: TestAttempt) -> AppResult<TestAttempt> {
        match self.attempts.insert_one(&attempt).await {
            Ok(_) => Ok(attempt),
            Err(err) if Self::is_duplicate_key(&err) => Err(AppError::AttemptBlocked(format!(
                "An attempt on test '{}' is already in progress",
                attempt.test_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestAttempt>> {
        let attempt = self.attempts.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_completed_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> AppResult<Vec<TestAttempt>> {
        let attempts = self
            .attempts
            .find(doc! {
                "test_id": test_id,
                "student_id": student_id,
                "completed_at": { "$ne": Bson::Null }
            })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn find_completed_by_test(&self, test_id: &str) -> AppResult<Vec<TestAttempt>> {
        let attempts = self
            .attempts
            .find(doc! {
                "test_id": test_id,
                "completed_at": { "$ne": Bson::Null }
            })
            .sort(doc! { "completed_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn find_completed_by_student(&self, student_id: &str) -> AppResult<Vec<TestAttempt>> {
        let attempts = self
            .attempts
            .find(doc! {
                "student_id": student_id,
                "completed_at": { "$ne": Bson::Null }
            })
            .sort(doc! { "completed_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn complete(
        &self,
        attempt_id: &str,
        completed_at: DateTime<Utc>,
        score: i32,
    ) -> AppResult<()> {
        let completed_at = mongodb::bson::to_bson(&completed_at)?;
        let result = self
            .attempts
            .update_one(
                doc! { "id": attempt_id },
                doc! { "$set": { "completed_at": completed_at, "score": score } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Attempt with id '{}' not found",
                attempt_id
            )));
        }
        Ok(())
    }

    async fn insert_answers(&self, answers: Vec<AttemptAnswer>) -> AppResult<()> {
        if answers.is_empty() {
            return Ok(());
        }
        self.answers.insert_many(&answers).await?;
        Ok(())
    }

    async fn find_answers_by_attempt(&self, attempt_id: &str) -> AppResult<Vec<AttemptAnswer>> {
        let answers = self
            .answers
            .find(doc! { "test_attempt_id": attempt_id })
            .await?
            .try_collect()
            .await?;
        Ok(answers)
    }

    async fn delete_in_progress(&self, attempt_id: &str) -> AppResult<()> {
        self.attempts
            .delete_one(doc! { "id": attempt_id, "completed_at": Bson::Null })
            .await?;
        Ok(())
    }

    async fn delete_active_for_student(&self, test_id: &str, student_id: &str) -> AppResult<u64> {
        let result = self
            .attempts
            .delete_many(doc! {
                "test_id": test_id,
                "student_id": student_id,
                "completed_at": Bson::Null
            })
            .await?;
        Ok(result.deleted_count)
    }
}
