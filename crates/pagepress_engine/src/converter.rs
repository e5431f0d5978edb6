use std::any::Any;
use std::io::Write;
use std::sync::Arc;

use pagepress_core::{
    validate_config, ConversionCallback, ConversionConfig, ConvertError, Locator, Outcome, Success,
};
use pagepress_logging::press_debug;
use tokio::runtime::Handle;
use tokio::task::JoinError;

use crate::dispatch::EventEmitter;
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::host::HostContext;
use crate::render::{PrintPdfRenderer, RenderError, Renderer};
use crate::storage::{Destination, StorageStrategist, StorageStrategy, PDF_MIME_TYPE};
use crate::FetchRequest;

/// Entry point: converts a web page into a stored PDF.
///
/// One instance serves any number of conversions, sequentially or
/// concurrently; it holds no per-conversion state.
#[derive(Clone)]
pub struct PdfConverter {
    context: HostContext,
    pipeline: Pipeline,
}

impl PdfConverter {
    /// Converter with the default fetcher and renderer.
    pub fn create(context: &HostContext) -> Self {
        let fetcher = Arc::new(ReqwestFetcher::new(context.fetch_settings().clone()));
        Self::with_collaborators(context, fetcher, Arc::new(PrintPdfRenderer))
    }

    pub fn with_collaborators(
        context: &HostContext,
        fetcher: Arc<dyn Fetcher>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            context: context.clone(),
            pipeline: Pipeline {
                runtime: context.runtime().clone(),
                storage: context.storage().clone(),
                fetcher,
                renderer,
            },
        }
    }

    pub fn storage_strategy(&self) -> StorageStrategy {
        self.pipeline.storage.strategy()
    }

    /// Runs the conversion on the background runtime and resolves to the
    /// terminal outcome. Events also go to `callback`, on the UI thread.
    pub async fn convert(
        &self,
        config: &ConversionConfig,
        callback: Option<Arc<dyn ConversionCallback>>,
    ) -> Outcome {
        let emitter = self.emitter(config, callback);
        self.pipeline.clone().supervise(config.clone(), emitter).await
    }

    /// Blocking form of [`convert`](Self::convert).
    ///
    /// Must not be called from inside an async runtime.
    pub fn convert_blocking(
        &self,
        config: &ConversionConfig,
        callback: Option<Arc<dyn ConversionCallback>>,
    ) -> Outcome {
        self.pipeline.runtime.block_on(self.convert(config, callback))
    }

    /// Schedules a conversion and returns immediately; results arrive only
    /// through `callback`.
    pub fn convert_async(&self, config: ConversionConfig, callback: Arc<dyn ConversionCallback>) {
        let emitter = self.emitter(&config, Some(callback));
        let pipeline = self.pipeline.clone();
        self.pipeline.runtime.spawn(async move {
            pipeline.supervise(config, emitter).await;
        });
    }

    fn emitter(
        &self,
        config: &ConversionConfig,
        callback: Option<Arc<dyn ConversionCallback>>,
    ) -> EventEmitter {
        EventEmitter::new(callback, self.context.ui(), config.file_name())
    }
}

/// The steps of one conversion. Holds only a runtime `Handle`; the
/// `HostContext` clone in [`PdfConverter`] is what keeps the runtime alive.
#[derive(Clone)]
struct Pipeline {
    runtime: Handle,
    storage: StorageStrategist,
    fetcher: Arc<dyn Fetcher>,
    renderer: Arc<dyn Renderer>,
}

impl Pipeline {
    /// Runs the pipeline as its own task so that a panic anywhere inside it
    /// still ends in exactly one terminal event.
    async fn supervise(self, config: ConversionConfig, emitter: EventEmitter) -> Outcome {
        let task_emitter = emitter.clone();
        let task = self
            .runtime
            .clone()
            .spawn(async move { self.run(&config, &task_emitter).await });
        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                let outcome = Outcome::from(unexpected(err));
                emitter.emit(&outcome);
                outcome
            }
        }
    }

    async fn run(&self, config: &ConversionConfig, emitter: &EventEmitter) -> Outcome {
        let outcome = match self.execute(config, emitter).await {
            Ok(locator) => Outcome::Success(Success::new(locator)),
            Err(err) => Outcome::from(err),
        };
        emitter.emit(&outcome);
        outcome
    }

    async fn execute(
        &self,
        config: &ConversionConfig,
        emitter: &EventEmitter,
    ) -> Result<Locator, ConvertError> {
        validate_config(config)?;

        emitter.progress(format!("Fetching {}", config.url()));
        let page = self
            .fetcher
            .fetch(&FetchRequest::from_config(config))
            .await
            .map_err(|err| ConvertError::Fetch {
                url: config.url().to_string(),
                source: Box::new(err),
            })?;
        press_debug!(
            "Fetched {} ({} bytes, {})",
            page.metadata.final_url,
            page.metadata.byte_len,
            page.metadata.encoding
        );

        emitter.progress(format!("Creating {}", config.file_name()));
        let storage = self.storage.clone();
        let file_name = config.file_name().to_string();
        let storage_path = config.storage_path().to_string();
        let destination = self
            .off_thread(move || {
                storage
                    .create_destination(&file_name, &storage_path, PDF_MIME_TYPE)
                    .map_err(|err| ConvertError::Destination {
                        file_name,
                        source: Box::new(err),
                    })
            })
            .await??;

        emitter.progress("Converting page to PDF");
        let renderer = self.renderer.clone();
        let target = destination.clone();
        let base_uri = config.url().to_string();
        let html = page.html;
        self.off_thread(move || write_document(&target, renderer.as_ref(), &html, &base_uri))
            .await??;

        if destination.strategy == StorageStrategy::Managed {
            emitter.progress("Finalizing document");
            let target = destination.clone();
            self.off_thread(move || {
                target.finalize().map_err(|err| ConvertError::Finalize {
                    source: Box::new(err),
                })
            })
            .await??;
        }

        Ok(destination.locator)
    }

    /// Runs blocking storage or render work on the runtime's blocking pool.
    async fn off_thread<T, F>(&self, work: F) -> Result<T, ConvertError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.runtime.spawn_blocking(work).await.map_err(unexpected)
    }
}

/// Opens the stream, renders into it and always drops (closes) it again.
/// The stream is only flushed when rendering succeeded.
fn write_document(
    destination: &Destination,
    renderer: &dyn Renderer,
    html: &str,
    base_uri: &str,
) -> Result<(), ConvertError> {
    let mut stream = destination
        .open_write()
        .map_err(|err| ConvertError::StreamOpen {
            source: Box::new(err),
        })?;
    let rendered = renderer
        .render(html, base_uri, &mut stream)
        .and_then(|()| stream.flush().map_err(RenderError::from));
    drop(stream);
    rendered.map_err(|err| ConvertError::Render {
        source: Box::new(err),
    })
}

fn unexpected(err: JoinError) -> ConvertError {
    let message = if err.is_panic() {
        panic_message(err.into_panic())
    } else {
        err.to_string()
    };
    ConvertError::Unexpected { message }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
