/// Completion/failure notification capability, injected into the engine
/// instead of any ambient notification state. The server default logs;
/// tests substitute a recording implementation.
pub trait AttemptNotifier: Send + Sync {
    fn attempt_completed(&self, attempt_id: &str, score: i32, total_points: i32);
    fn attempt_failed(&self, attempt_id: &str, reason: &str);
}

pub struct LogNotifier;

impl AttemptNotifier for LogNotifier {
    fn attempt_completed(&self, attempt_id: &str, score: i32, total_points: i32) {
        log::info!(
            "attempt {} completed with score {}/{}",
            attempt_id,
            score,
            total_points
        );
    }

    fn attempt_failed(&self, attempt_id: &str, reason: &str) {
        log::error!("attempt {} failed to finalize: {}", attempt_id, reason);
    }
}
