pub mod analytics_handler;
pub mod attempt_handler;
pub mod health_handler;

pub use analytics_handler::{student_history, test_analytics};
pub use attempt_handler::{
    abandon_attempt, get_attempt_state, navigate, save_answer, start_attempt, submit_attempt,
};
pub use health_handler::health_check;
