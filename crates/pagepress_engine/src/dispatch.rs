use std::marker::PhantomData;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use pagepress_core::{deliver, ConversionCallback, Outcome, Progress};
use pagepress_logging::{press_debug, press_info, press_warn};

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs closures on the host's single UI thread.
pub trait UiDispatcher: Send + Sync {
    fn dispatch(&self, task: UiTask);
}

/// Queue of UI tasks, drained by the thread that created it.
///
/// `UiLoop` is deliberately `!Send`, so tasks only ever run on that thread.
pub struct UiLoop {
    rx: mpsc::Receiver<UiTask>,
    _not_send: PhantomData<*const ()>,
}

#[derive(Clone)]
pub struct UiHandle {
    tx: mpsc::Sender<UiTask>,
}

impl UiLoop {
    pub fn new() -> (Self, UiHandle) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                rx,
                _not_send: PhantomData,
            },
            UiHandle { tx },
        )
    }

    /// Runs every task queued so far without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Runs tasks as they arrive until `done` holds or `timeout` elapses.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(task) => task(),
                Err(mpsc::RecvTimeoutError::Timeout) => return done(),
                Err(mpsc::RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }
}

impl UiDispatcher for UiHandle {
    fn dispatch(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            press_warn!("UI loop is gone; dropping event");
        }
    }
}

/// Single emission point of a conversion: logs each event and hands it to
/// the callback on the UI thread, in emission order.
#[derive(Clone)]
pub(crate) struct EventEmitter {
    callback: Option<Arc<dyn ConversionCallback>>,
    ui: Arc<dyn UiDispatcher>,
    label: String,
}

impl EventEmitter {
    pub(crate) fn new(
        callback: Option<Arc<dyn ConversionCallback>>,
        ui: Arc<dyn UiDispatcher>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            callback,
            ui,
            label: label.into(),
        }
    }

    pub(crate) fn progress(&self, message: impl Into<String>) {
        self.emit(&Outcome::Progress(Progress::new(message)));
    }

    pub(crate) fn emit(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Progress(progress) => {
                press_debug!("[{}] {}", self.label, progress.message)
            }
            Outcome::Success(success) => {
                press_info!("[{}] {}", self.label, success.message)
            }
            Outcome::Error(failure) => press_warn!(
                "[{}] failed at {}: {}",
                self.label,
                failure.cause.step(),
                failure.message
            ),
        }
        if let Some(callback) = &self.callback {
            let callback = callback.clone();
            let outcome = outcome.clone();
            self.ui
                .dispatch(Box::new(move || deliver(callback.as_ref(), outcome)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn tasks_run_on_the_loop_thread_in_order() {
        let (ui_loop, handle) = UiLoop::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let ui_thread = thread::current().id();

        let worker = {
            let seen = seen.clone();
            thread::spawn(move || {
                for i in 0..3 {
                    let seen = seen.clone();
                    handle.dispatch(Box::new(move || {
                        assert_eq!(thread::current().id(), ui_thread);
                        seen.lock().unwrap().push(i);
                    }));
                }
            })
        };
        worker.join().unwrap();

        assert_eq!(ui_loop.run_pending(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn run_until_times_out_without_tasks() {
        let (ui_loop, _handle) = UiLoop::new();
        let ran = AtomicUsize::new(0);
        let done = ui_loop.run_until(Duration::from_millis(20), || {
            ran.fetch_add(1, Ordering::Relaxed);
            false
        });
        assert!(!done);
        assert!(ran.load(Ordering::Relaxed) >= 1);
    }
}
