pub mod attempt_repository;
pub mod profile_repository;
pub mod test_repository;

pub use attempt_repository::{AttemptRepository, MongoAttemptRepository};
pub use profile_repository::{MongoProfileRepository, ProfileRepository};
pub use test_repository::{MongoTestRepository, TestRepository};

#[cfg(test)]
pub use attempt_repository::MockAttemptRepository;
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
#[cfg(test)]
pub use test_repository::MockTestRepository;
