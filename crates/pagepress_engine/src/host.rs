use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use pagepress_logging::press_info;
use tokio::runtime::{Handle, Runtime};

use crate::dispatch::UiDispatcher;
use crate::fetch::FetchSettings;
use crate::media_store::DirectoryMediaStore;
use crate::storage::{MediaStore, PlatformInfo, StaticPlatform, StorageStrategist};

/// Platform level assumed when the host does not declare one.
pub const DEFAULT_PLATFORM_LEVEL: u32 = 34;

/// Application-scoped services shared by every conversion: the background
/// runtime, the UI dispatcher and the storage back-ends.
///
/// Cheap to clone. The runtime shuts down when the last clone is dropped.
#[derive(Clone)]
pub struct HostContext {
    inner: Arc<HostInner>,
}

struct HostInner {
    runtime: Option<Runtime>,
    handle: Handle,
    ui: Arc<dyn UiDispatcher>,
    storage: StorageStrategist,
    fetch_settings: FetchSettings,
}

impl Drop for HostInner {
    fn drop(&mut self) {
        // Never blocks, so the context may be dropped from async code too.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl HostContext {
    pub fn builder(ui: Arc<dyn UiDispatcher>) -> HostContextBuilder {
        HostContextBuilder::new(ui)
    }

    pub fn runtime(&self) -> &Handle {
        &self.inner.handle
    }

    pub fn ui(&self) -> Arc<dyn UiDispatcher> {
        self.inner.ui.clone()
    }

    pub fn storage(&self) -> &StorageStrategist {
        &self.inner.storage
    }

    pub fn fetch_settings(&self) -> &FetchSettings {
        &self.inner.fetch_settings
    }
}

pub struct HostContextBuilder {
    ui: Arc<dyn UiDispatcher>,
    platform: Option<Arc<dyn PlatformInfo>>,
    media_store: Option<Arc<dyn MediaStore>>,
    shared_root: Option<PathBuf>,
    downloads_root: Option<PathBuf>,
    fetch_settings: FetchSettings,
    worker_threads: Option<usize>,
}

impl HostContextBuilder {
    fn new(ui: Arc<dyn UiDispatcher>) -> Self {
        Self {
            ui,
            platform: None,
            media_store: None,
            shared_root: None,
            downloads_root: None,
            fetch_settings: FetchSettings::default(),
            worker_threads: None,
        }
    }

    pub fn platform(mut self, platform: Arc<dyn PlatformInfo>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn media_store(mut self, media_store: Arc<dyn MediaStore>) -> Self {
        self.media_store = Some(media_store);
        self
    }

    /// Root of shared storage; the default media store and downloads
    /// directory live below it.
    pub fn shared_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.shared_root = Some(root.into());
        self
    }

    pub fn downloads_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.downloads_root = Some(root.into());
        self
    }

    pub fn fetch_settings(mut self, settings: FetchSettings) -> Self {
        self.fetch_settings = settings;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads.max(1));
        self
    }

    pub fn build(self) -> io::Result<HostContext> {
        let shared_root = match self.shared_root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let downloads_root = self
            .downloads_root
            .unwrap_or_else(|| shared_root.join("Download"));
        let platform = self
            .platform
            .unwrap_or_else(|| Arc::new(StaticPlatform(DEFAULT_PLATFORM_LEVEL)));
        let media_store = self
            .media_store
            .unwrap_or_else(|| Arc::new(DirectoryMediaStore::new(shared_root.clone())));

        let mut runtime = tokio::runtime::Builder::new_multi_thread();
        runtime.enable_all().thread_name("pagepress-worker");
        if let Some(threads) = self.worker_threads {
            runtime.worker_threads(threads);
        }
        let runtime = runtime.build()?;
        let handle = runtime.handle().clone();

        press_info!(
            "Host context ready: platform level {}, shared root {:?}, downloads {:?}",
            platform.platform_level(),
            shared_root,
            downloads_root
        );

        Ok(HostContext {
            inner: Arc::new(HostInner {
                runtime: Some(runtime),
                handle,
                ui: self.ui,
                storage: StorageStrategist::new(platform, media_store, downloads_root),
                fetch_settings: self.fetch_settings,
            }),
        })
    }
}
