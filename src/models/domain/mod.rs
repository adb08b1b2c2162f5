pub mod question;
pub mod student_profile;
pub mod test;
pub mod test_attempt;

pub use question::{Question, QuestionOption};
pub use student_profile::StudentProfile;
pub use test::Test;
pub use test_attempt::{AttemptAnswer, TestAttempt};
