use crate::{Failure, Outcome, Progress, Success};

/// Receiver of conversion events.
///
/// Methods are always invoked on the UI thread and must return quickly.
pub trait ConversionCallback: Send + Sync {
    fn on_progress(&self, progress: Progress);
    fn on_success(&self, success: Success);
    fn on_error(&self, failure: Failure);
}

/// Routes an outcome to the matching callback method.
pub fn deliver(callback: &dyn ConversionCallback, outcome: Outcome) {
    match outcome {
        Outcome::Progress(progress) => callback.on_progress(progress),
        Outcome::Success(success) => callback.on_success(success),
        Outcome::Error(failure) => callback.on_error(failure),
    }
}
