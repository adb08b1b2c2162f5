pub mod analytics_service;
pub mod attempt_engine;
pub mod notifier;
pub mod scoring_service;

pub use analytics_service::AnalyticsService;
pub use attempt_engine::AttemptEngine;
pub use notifier::{AttemptNotifier, LogNotifier};
pub use scoring_service::ScoringService;
