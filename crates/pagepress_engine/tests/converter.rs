use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use pagepress_core::{
    ContentUri, ConversionCallback, ConversionConfig, ConvertError, Failure, FailureStep, Locator,
    Outcome, Progress, Success,
};
use pagepress_engine::{
    FailureKind, FetchError, FetchRequest, FetchedPage, Fetcher, HostContext, MediaStore,
    PdfConverter, PendingEntry, RenderError, Renderer, StaticPlatform, StorageError,
    StorageStrategy, UiLoop, WriteStream,
};
use tempfile::TempDir;

const PAGE: &str = "<html><body>Hi</body></html>";
const PDF_BYTES: &[u8] = b"%PDF-1.3 stub";

fn init_logging() {
    pagepress_logging::initialize_for_tests();
}

struct StubFetcher {
    calls: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
    response: Result<String, FetchError>,
}

impl StubFetcher {
    fn ok(html: &str) -> Self {
        Self::with(Ok(html.to_string()))
    }

    fn failing(kind: FailureKind) -> Self {
        Self::with(Err(FetchError::new(kind, "stubbed failure")))
    }

    fn with(response: Result<String, FetchError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            response,
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.response
            .clone()
            .map(|html| FetchedPage::from_html(request.url.clone(), html))
    }
}

#[derive(Clone, Copy)]
enum RenderMode {
    Succeed,
    Fail,
    Panic,
}

struct StubRenderer {
    calls: AtomicUsize,
    base_uris: Mutex<Vec<String>>,
    mode: RenderMode,
}

impl StubRenderer {
    fn new(mode: RenderMode) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            base_uris: Mutex::new(Vec::new()),
            mode,
        }
    }
}

impl Renderer for StubRenderer {
    fn render(&self, html: &str, base_uri: &str, out: &mut dyn Write) -> Result<(), RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.base_uris.lock().unwrap().push(base_uri.to_string());
        assert_eq!(html, PAGE);
        match self.mode {
            RenderMode::Succeed => {
                out.write_all(PDF_BYTES)?;
                Ok(())
            }
            RenderMode::Fail => {
                out.write_all(b"%PDF-partial")?;
                Err(RenderError::Pdf("stubbed render failure".into()))
            }
            RenderMode::Panic => panic!("renderer exploded"),
        }
    }
}

/// Writer that counts how often it was closed (dropped).
struct TrackingWriter {
    data: Arc<Mutex<Vec<u8>>>,
    closes: Arc<AtomicUsize>,
}

impl Write for TrackingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for TrackingWriter {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingMediaStore {
    registered: Mutex<Vec<PendingEntry>>,
    pending_updates: Mutex<Vec<bool>>,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    data: Arc<Mutex<Vec<u8>>>,
    reject_register: bool,
    reject_open: bool,
}

impl RecordingMediaStore {
    fn rejecting_register() -> Self {
        Self {
            reject_register: true,
            ..Self::default()
        }
    }

    fn rejecting_open() -> Self {
        Self {
            reject_open: true,
            ..Self::default()
        }
    }

    fn register_count(&self) -> usize {
        self.registered.lock().unwrap().len()
    }

    fn pending_updates(&self) -> Vec<bool> {
        self.pending_updates.lock().unwrap().clone()
    }
}

impl MediaStore for RecordingMediaStore {
    fn register(&self, entry: PendingEntry) -> Result<ContentUri, StorageError> {
        let mut registered = self.registered.lock().unwrap();
        if self.reject_register {
            return Err(StorageError::Rejected {
                display_name: entry.display_name,
                reason: "insert failed".into(),
            });
        }
        registered.push(entry);
        Ok(ContentUri::new(format!(
            "content://test.media/downloads/{}",
            registered.len()
        )))
    }

    fn open_write(&self, _uri: &ContentUri) -> Result<WriteStream, StorageError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.reject_open {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only volume",
            )));
        }
        Ok(Box::new(TrackingWriter {
            data: self.data.clone(),
            closes: self.closes.clone(),
        }))
    }

    fn set_pending(&self, _uri: &ContentUri, pending: bool) -> Result<(), StorageError> {
        self.pending_updates.lock().unwrap().push(pending);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Event {
    Progress(String),
    Success(Locator),
    Error(String),
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<Event>>,
    threads: Mutex<Vec<ThreadId>>,
}

impl RecordingCallback {
    fn record(&self, event: Event) {
        self.threads.lock().unwrap().push(thread::current().id());
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn terminal_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| !matches!(e, Event::Progress(_)))
            .count()
    }
}

impl ConversionCallback for RecordingCallback {
    fn on_progress(&self, progress: Progress) {
        self.record(Event::Progress(progress.message));
    }

    fn on_success(&self, success: Success) {
        self.record(Event::Success(success.locator));
    }

    fn on_error(&self, failure: Failure) {
        self.record(Event::Error(failure.message));
    }
}

struct Harness {
    ui_loop: UiLoop,
    converter: PdfConverter,
    fetcher: Arc<StubFetcher>,
    renderer: Arc<StubRenderer>,
    media: Arc<RecordingMediaStore>,
    dir: TempDir,
}

impl Harness {
    fn new(level: u32, fetcher: StubFetcher, mode: RenderMode, media: RecordingMediaStore) -> Self {
        init_logging();
        let dir = TempDir::new().unwrap();
        let (ui_loop, ui_handle) = UiLoop::new();
        let fetcher = Arc::new(fetcher);
        let renderer = Arc::new(StubRenderer::new(mode));
        let media = Arc::new(media);
        let context = HostContext::builder(Arc::new(ui_handle))
            .platform(Arc::new(StaticPlatform(level)))
            .media_store(media.clone())
            .shared_root(dir.path())
            .downloads_root(dir.path().join("Download"))
            .worker_threads(2)
            .build()
            .unwrap();
        let converter = PdfConverter::with_collaborators(&context, fetcher.clone(), renderer.clone());
        Self {
            ui_loop,
            converter,
            fetcher,
            renderer,
            media,
            dir,
        }
    }

    fn managed(fetcher: StubFetcher, mode: RenderMode) -> Self {
        Self::new(34, fetcher, mode, RecordingMediaStore::default())
    }

    fn legacy(fetcher: StubFetcher, mode: RenderMode) -> Self {
        Self::new(28, fetcher, mode, RecordingMediaStore::default())
    }

    fn convert(&self, config: &ConversionConfig) -> (Outcome, Arc<RecordingCallback>) {
        let callback = Arc::new(RecordingCallback::default());
        let outcome = self
            .converter
            .convert_blocking(config, Some(callback.clone()));
        self.ui_loop.run_pending();
        (outcome, callback)
    }

    fn fetch_calls(&self) -> usize {
        self.fetcher.calls.load(Ordering::SeqCst)
    }

    fn render_calls(&self) -> usize {
        self.renderer.calls.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.media.closes.load(Ordering::SeqCst)
    }
}

fn config(url: &str) -> ConversionConfig {
    ConversionConfig::builder(url).file_name("page.pdf").build()
}

fn expect_failure(outcome: &Outcome) -> &Failure {
    match outcome {
        Outcome::Error(failure) => failure,
        other => panic!("expected an error outcome, got {other:?}"),
    }
}

#[test]
fn invalid_urls_fail_without_side_effects() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    for url in ["", "ftp://example.com", "example.com", "file:///etc/passwd"] {
        let (outcome, callback) = harness.convert(&config(url));
        let failure = expect_failure(&outcome);
        assert!(matches!(*failure.cause, ConvertError::InvalidUrl { .. }));
        assert!(failure.message.contains("http://"), "{}", failure.message);
        assert!(matches!(callback.events().as_slice(), [Event::Error(_)]));
    }
    assert_eq!(harness.fetch_calls(), 0);
    assert_eq!(harness.media.register_count(), 0);
    assert_eq!(harness.render_calls(), 0);
}

#[test]
fn ftp_url_reports_invalid_scheme() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let (outcome, _) = harness.convert(&config("ftp://example.com"));
    let failure = expect_failure(&outcome);
    assert!(failure.message.starts_with("Invalid URL"));
    assert_eq!(failure.cause.step(), FailureStep::Validate);
}

#[test]
fn managed_success_returns_locator_and_finalizes_once() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let (outcome, callback) = harness.convert(&config("https://example.com"));

    let locator = match &outcome {
        Outcome::Success(success) => {
            assert!(!success.message.is_empty());
            success.locator.clone()
        }
        other => panic!("expected success, got {other:?}"),
    };
    assert_eq!(
        locator,
        Locator::Content(ContentUri::new("content://test.media/downloads/1"))
    );
    assert_eq!(harness.converter.storage_strategy(), StorageStrategy::Managed);
    assert_eq!(harness.media.pending_updates(), vec![false]);
    assert_eq!(harness.closes(), 1);
    assert_eq!(harness.media.data.lock().unwrap().as_slice(), PDF_BYTES);

    let entry = harness.media.registered.lock().unwrap()[0].clone();
    assert_eq!(entry.display_name, "page.pdf");
    assert_eq!(entry.mime_type, "application/pdf");
    assert_eq!(entry.relative_path, "Download/PagePress");
    assert!(entry.pending);

    let events = callback.events();
    let (last, earlier) = events.split_last().unwrap();
    assert!(matches!(last, Event::Success(l) if *l == locator));
    assert!(earlier.iter().all(|e| matches!(e, Event::Progress(_))));
    assert!(!earlier.is_empty());
}

#[test]
fn renderer_gets_the_page_url_as_base() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let config = ConversionConfig::builder("https://example.com/blog/post")
        .file_name("post.pdf")
        .user_agent("agent/1.0")
        .timeout_millis(1_500)
        .build();
    let (outcome, _) = harness.convert(&config);
    assert!(outcome.is_success());
    assert_eq!(
        *harness.renderer.base_uris.lock().unwrap(),
        vec!["https://example.com/blog/post".to_string()]
    );
    let request = harness.fetcher.requests.lock().unwrap()[0].clone();
    assert_eq!(request.user_agent, "agent/1.0");
    assert_eq!(request.timeout, Duration::from_millis(1_500));
}

#[test]
fn legacy_success_writes_file_and_skips_finalize() {
    let harness = Harness::legacy(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let config = ConversionConfig::builder("https://example.com")
        .file_name("legacy.pdf")
        .storage_path("Download/Archive")
        .build();
    let (outcome, _) = harness.convert(&config);

    let expected: PathBuf = harness.dir.path().join("Download/Archive/legacy.pdf");
    assert_eq!(outcome.locator(), Some(&Locator::File(expected.clone())));
    assert_eq!(std::fs::read(&expected).unwrap(), PDF_BYTES);
    assert_eq!(harness.converter.storage_strategy(), StorageStrategy::Legacy);
    assert_eq!(harness.media.register_count(), 0);
    assert!(harness.media.pending_updates().is_empty());
}

#[test]
fn fetch_timeout_keeps_cause_and_skips_storage() {
    let harness = Harness::managed(StubFetcher::failing(FailureKind::Timeout), RenderMode::Succeed);
    let (outcome, callback) = harness.convert(&config("https://example.com"));

    let failure = expect_failure(&outcome);
    match failure.cause.as_ref() {
        ConvertError::Fetch { source, .. } => {
            let fetch_error = source
                .downcast_ref::<FetchError>()
                .expect("fetch error is preserved");
            assert_eq!(fetch_error.kind, FailureKind::Timeout);
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert_eq!(harness.media.register_count(), 0);
    assert_eq!(harness.render_calls(), 0);
    assert_eq!(callback.terminal_count(), 1);
}

#[test]
fn destination_failure_skips_rendering() {
    let harness = Harness::new(
        34,
        StubFetcher::ok(PAGE),
        RenderMode::Succeed,
        RecordingMediaStore::rejecting_register(),
    );
    let (outcome, _) = harness.convert(&config("https://example.com"));

    let failure = expect_failure(&outcome);
    assert_eq!(failure.cause.step(), FailureStep::CreateDestination);
    assert_eq!(harness.render_calls(), 0);
    assert_eq!(harness.media.opens.load(Ordering::SeqCst), 0);
}

#[test]
fn stream_open_failure_is_reported() {
    let harness = Harness::new(
        34,
        StubFetcher::ok(PAGE),
        RenderMode::Succeed,
        RecordingMediaStore::rejecting_open(),
    );
    let (outcome, _) = harness.convert(&config("https://example.com"));

    let failure = expect_failure(&outcome);
    assert_eq!(failure.cause.step(), FailureStep::OpenStream);
    assert_eq!(harness.render_calls(), 0);
    assert!(harness.media.pending_updates().is_empty());
}

#[test]
fn render_failure_closes_stream_and_never_finalizes() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Fail);
    let (outcome, callback) = harness.convert(&config("https://example.com"));

    let failure = expect_failure(&outcome);
    assert_eq!(failure.cause.step(), FailureStep::Render);
    assert!(failure.message.contains("stubbed render failure"));
    assert_eq!(harness.closes(), 1);
    assert!(harness.media.pending_updates().is_empty());
    assert!(matches!(callback.events().last(), Some(Event::Error(_))));
}

#[test]
fn renderer_panic_becomes_a_single_error() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Panic);
    let (outcome, callback) = harness.convert(&config("https://example.com"));

    let failure = expect_failure(&outcome);
    assert!(matches!(*failure.cause, ConvertError::Unexpected { .. }));
    assert!(failure.message.contains("renderer exploded"));
    assert_eq!(harness.closes(), 1);
    assert!(harness.media.pending_updates().is_empty());
    assert_eq!(callback.terminal_count(), 1);
}

#[test]
fn legacy_render_failure_leaves_the_file_in_place() {
    let harness = Harness::legacy(StubFetcher::ok(PAGE), RenderMode::Fail);
    let config = ConversionConfig::builder("https://example.com")
        .file_name("partial.pdf")
        .storage_path("Download/Archive")
        .build();
    let (outcome, callback) = harness.convert(&config);

    let failure = expect_failure(&outcome);
    assert_eq!(failure.cause.step(), FailureStep::Render);
    assert_eq!(outcome.locator(), None);
    let path = harness.dir.path().join("Download/Archive/partial.pdf");
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-partial");
    assert_eq!(harness.media.register_count(), 0);
    assert!(harness.media.pending_updates().is_empty());
    assert_eq!(callback.terminal_count(), 1);
    assert!(matches!(callback.events().last(), Some(Event::Error(_))));
}

#[test]
fn callbacks_run_on_the_ui_thread() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let (_, callback) = harness.convert(&config("https://example.com"));
    let ui_thread = thread::current().id();
    let threads = callback.threads.lock().unwrap().clone();
    assert!(!threads.is_empty());
    assert!(threads.iter().all(|id| *id == ui_thread));
}

#[test]
fn callbacks_wait_for_the_ui_loop() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let callback = Arc::new(RecordingCallback::default());
    let outcome = harness
        .converter
        .convert_blocking(&config("https://example.com"), Some(callback.clone()));
    assert!(outcome.is_success());
    assert!(callback.events().is_empty());
    assert!(harness.ui_loop.run_pending() > 0);
    assert_eq!(callback.terminal_count(), 1);
}

#[test]
fn convert_async_reports_through_callback_only() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let callback = Arc::new(RecordingCallback::default());
    harness
        .converter
        .convert_async(config("https://example.com"), callback.clone());

    let finished = harness
        .ui_loop
        .run_until(Duration::from_secs(10), || callback.terminal_count() == 1);
    assert!(finished);
    assert!(matches!(callback.events().last(), Some(Event::Success(_))));
    assert_eq!(harness.media.pending_updates(), vec![false]);
}

#[test]
fn concurrent_conversions_are_independent() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let first = Arc::new(RecordingCallback::default());
    let second = Arc::new(RecordingCallback::default());
    harness.converter.convert_async(
        ConversionConfig::builder("https://a.example").file_name("a.pdf").build(),
        first.clone(),
    );
    harness.converter.convert_async(
        ConversionConfig::builder("https://b.example").file_name("b.pdf").build(),
        second.clone(),
    );

    let finished = harness.ui_loop.run_until(Duration::from_secs(10), || {
        first.terminal_count() == 1 && second.terminal_count() == 1
    });
    assert!(finished);
    assert_eq!(harness.media.register_count(), 2);
    assert_eq!(harness.media.pending_updates(), vec![false, false]);
    assert_eq!(harness.closes(), 2);
}

#[tokio::test]
async fn convert_can_be_awaited_without_callback() {
    let harness = Harness::managed(StubFetcher::ok(PAGE), RenderMode::Succeed);
    let outcome = harness
        .converter
        .convert(&config("https://example.com"), None)
        .await;
    assert!(outcome.is_success());
    assert_eq!(harness.ui_loop.run_pending(), 0);
}
