use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{MongoAttemptRepository, MongoProfileRepository, MongoTestRepository},
    services::{AnalyticsService, AttemptEngine, LogNotifier},
};

#[derive(Clone)]
pub struct AppState {
    pub attempt_engine: AttemptEngine,
    pub analytics_service: Arc<AnalyticsService>,
    pub database: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let test_repository = Arc::new(MongoTestRepository::new(&db));
        test_repository.ensure_indexes().await?;

        let attempt_repository = Arc::new(MongoAttemptRepository::new(&db));
        attempt_repository.ensure_indexes().await?;

        let profile_repository = Arc::new(MongoProfileRepository::new(&db));
        profile_repository.ensure_indexes().await?;

        let attempt_engine = AttemptEngine::new(
            test_repository.clone(),
            attempt_repository.clone(),
            profile_repository,
            Arc::new(LogNotifier),
        );
        let analytics_service = Arc::new(AnalyticsService::new(
            test_repository,
            attempt_repository,
        ));

        Ok(Self {
            attempt_engine,
            analytics_service,
            database: db,
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
