use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::StudentProfile};

/// Student record-keeping data (display name, roll number). Profiles are
/// written by the registration flow upstream; `upsert` covers seeding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<StudentProfile>>;
    async fn upsert(&self, profile: StudentProfile) -> AppResult<StudentProfile>;
}

pub struct MongoProfileRepository {
    collection: Collection<StudentProfile>,
}

impl MongoProfileRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("profiles");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for profiles collection");

        let user_id_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_id_index).await?;

        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MongoProfileRepository {
    async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<StudentProfile>> {
        let profile = self
            .collection
            .find_one(doc! { "user_id": user_id })
            .await?;
        Ok(profile)
    }

    async fn upsert(&self, profile: StudentProfile) -> AppResult<StudentProfile> {
        self.collection
            .replace_one(doc! { "user_id": &profile.user_id }, &profile)
            .upsert(true)
            .await?;
        Ok(profile)
    }
}
