use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::Test};

/// Read side of the test catalog. Attempt-taking never mutates tests;
/// `create_test` exists for authoring flows and fixtures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Test>>;
    async fn find_published_by_id(&self, id: &str) -> AppResult<Option<Test>>;
    async fn create_test(&self, test: Test) -> AppResult<Test>;
}

pub struct MongoTestRepository {
    collection: Collection<Test>,
}

impl MongoTestRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("tests");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for tests collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;

        Ok(())
    }
}

#[async_trait]
impl TestRepository for MongoTestRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Test>> {
        let test = self.collection.find_one(doc! { "id": id }).await?;
        Ok(test)
    }

    async fn find_published_by_id(&self, id: &str) -> AppResult<Option<Test>> {
        let test = self
            .collection
            .find_one(doc! { "id": id, "is_published": true })
            .await?;
        Ok(test)
    }

    async fn create_test(&self, test: Test) -> AppResult<Test> {
        self.collection.insert_one(&test).await?;
        Ok(test)
    }
}
