use std::sync::{mpsc, Arc};

use pagepress_core::{ConversionCallback, Effect, Failure, Msg, Progress, Success};
use pagepress_engine::PdfConverter;
use pagepress_logging::{press_debug, press_info};

/// Turns effects emitted by `update` into converter calls.
pub struct EffectRunner {
    converter: PdfConverter,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(converter: PdfConverter, msg_tx: mpsc::Sender<Msg>) -> Self {
        Self { converter, msg_tx }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartConversion(config) => {
                    press_info!(
                        "StartConversion url={} file={} path={} strategy={}",
                        config.url(),
                        config.file_name(),
                        config.storage_path(),
                        self.converter.storage_strategy()
                    );
                    let callback = Arc::new(ShellCallback::new(self.msg_tx.clone()));
                    self.converter.convert_async(config, callback);
                }
            }
        }
    }
}

/// Forwards converter callbacks into the shell's message queue.
pub struct ShellCallback {
    msg_tx: mpsc::Sender<Msg>,
}

impl ShellCallback {
    pub fn new(msg_tx: mpsc::Sender<Msg>) -> Self {
        Self { msg_tx }
    }

    fn send(&self, msg: Msg) {
        if self.msg_tx.send(msg).is_err() {
            press_debug!("Shell closed before the conversion finished");
        }
    }
}

impl ConversionCallback for ShellCallback {
    fn on_progress(&self, progress: Progress) {
        self.send(Msg::ConversionProgress {
            message: progress.message,
        });
    }

    fn on_success(&self, success: Success) {
        self.send(Msg::ConversionSucceeded {
            locator: success.locator.to_string(),
            message: success.message,
        });
    }

    fn on_error(&self, failure: Failure) {
        self.send(Msg::ConversionFailed {
            message: failure.message,
        });
    }
}
