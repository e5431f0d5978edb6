use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use pagepress_core::{ContentUri, Locator};
use pagepress_logging::{press_debug, press_info};
use thiserror::Error;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// First platform level whose shared storage is managed through a media index.
pub const SCOPED_STORAGE_MIN_LEVEL: u32 = 29;

/// Leading segment of storage paths that names the downloads area itself.
const DOWNLOADS_SEGMENT: &str = "Download";

pub type WriteStream = Box<dyn Write + Send>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("invalid storage path {0:?}")]
    InvalidPath(String),
    #[error("media store rejected {display_name}: {reason}")]
    Rejected {
        display_name: String,
        reason: String,
    },
    #[error("unknown content uri {0}")]
    UnknownUri(ContentUri),
    #[error("locator {0} does not belong to this storage")]
    ForeignLocator(Locator),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Host platform version query.
pub trait PlatformInfo: Send + Sync {
    fn platform_level(&self) -> u32;
}

/// Platform with a fixed, declared level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPlatform(pub u32);

impl PlatformInfo for StaticPlatform {
    fn platform_level(&self) -> u32 {
        self.0
    }
}

/// Metadata handed to a media store when an entry is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub display_name: String,
    pub mime_type: String,
    pub relative_path: String,
    pub pending: bool,
}

/// Host-managed storage index. Pending entries are hidden from other readers
/// until `set_pending(uri, false)`.
pub trait MediaStore: Send + Sync {
    fn register(&self, entry: PendingEntry) -> Result<ContentUri, StorageError>;
    fn open_write(&self, uri: &ContentUri) -> Result<WriteStream, StorageError>;
    fn set_pending(&self, uri: &ContentUri, pending: bool) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStrategy {
    /// Media-index registration with a pending flag.
    Managed,
    /// Direct file in the shared downloads directory, visible at creation.
    Legacy,
}

impl fmt::Display for StorageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageStrategy::Managed => write!(f, "managed"),
            StorageStrategy::Legacy => write!(f, "legacy"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DestinationRequest<'a> {
    pub file_name: &'a str,
    pub storage_path: &'a str,
    pub mime_type: &'a str,
}

/// One storage regime: create an entry, write it, make it visible.
pub trait DestinationStore: Send + Sync {
    fn create(&self, request: &DestinationRequest<'_>) -> Result<Locator, StorageError>;
    fn open_write(&self, locator: &Locator) -> Result<WriteStream, StorageError>;
    fn finalize(&self, locator: &Locator) -> Result<(), StorageError>;
}

pub struct ManagedStorage {
    media_store: Arc<dyn MediaStore>,
}

impl ManagedStorage {
    pub fn new(media_store: Arc<dyn MediaStore>) -> Self {
        Self { media_store }
    }
}

impl DestinationStore for ManagedStorage {
    fn create(&self, request: &DestinationRequest<'_>) -> Result<Locator, StorageError> {
        check_file_name(request.file_name)?;
        let relative_path = normalize_relative_path(request.storage_path)?;
        let uri = self.media_store.register(PendingEntry {
            display_name: request.file_name.to_string(),
            mime_type: request.mime_type.to_string(),
            relative_path,
            pending: true,
        })?;
        Ok(Locator::Content(uri))
    }

    fn open_write(&self, locator: &Locator) -> Result<WriteStream, StorageError> {
        match locator {
            Locator::Content(uri) => self.media_store.open_write(uri),
            other => Err(StorageError::ForeignLocator(other.clone())),
        }
    }

    fn finalize(&self, locator: &Locator) -> Result<(), StorageError> {
        match locator {
            Locator::Content(uri) => self.media_store.set_pending(uri, false),
            other => Err(StorageError::ForeignLocator(other.clone())),
        }
    }
}

/// Direct file-system access below the shared downloads directory.
///
/// The file exists (empty) as soon as [`DestinationStore::create`] returns, so
/// other readers can see it before the document is written.
#[derive(Debug, Clone)]
pub struct LegacyStorage {
    downloads_root: PathBuf,
}

impl LegacyStorage {
    pub fn new(downloads_root: impl Into<PathBuf>) -> Self {
        Self {
            downloads_root: downloads_root.into(),
        }
    }

    pub fn downloads_root(&self) -> &Path {
        &self.downloads_root
    }

    /// Directory a storage path maps to; a leading `Download/` is dropped
    /// because the root already is the downloads directory.
    pub fn directory_for(&self, storage_path: &str) -> Result<PathBuf, StorageError> {
        let relative = normalize_relative_path(storage_path)?;
        let relative = match relative.strip_prefix(DOWNLOADS_SEGMENT) {
            Some("") => "",
            Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
            _ => relative.as_str(),
        };
        Ok(self.downloads_root.join(relative))
    }
}

impl DestinationStore for LegacyStorage {
    fn create(&self, request: &DestinationRequest<'_>) -> Result<Locator, StorageError> {
        check_file_name(request.file_name)?;
        let dir = self.directory_for(request.storage_path)?;
        fs::create_dir_all(&dir)?;
        let path = dir.join(request.file_name);
        if !path.exists() {
            OpenOptions::new().write(true).create(true).open(&path)?;
        }
        press_debug!("Legacy destination ready at {:?}", path);
        Ok(Locator::File(path))
    }

    fn open_write(&self, locator: &Locator) -> Result<WriteStream, StorageError> {
        match locator {
            Locator::File(path) => Ok(Box::new(fs::File::create(path)?)),
            other => Err(StorageError::ForeignLocator(other.clone())),
        }
    }

    fn finalize(&self, _locator: &Locator) -> Result<(), StorageError> {
        Ok(())
    }
}

/// A created destination, bound to the regime that created it.
#[derive(Clone)]
pub struct Destination {
    pub locator: Locator,
    pub strategy: StorageStrategy,
    store: Arc<dyn DestinationStore>,
}

impl Destination {
    pub fn open_write(&self) -> Result<WriteStream, StorageError> {
        self.store.open_write(&self.locator)
    }

    /// Makes the document visible; only managed storage has anything to do.
    pub fn finalize(&self) -> Result<(), StorageError> {
        match self.strategy {
            StorageStrategy::Managed => self.store.finalize(&self.locator),
            StorageStrategy::Legacy => Ok(()),
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("locator", &self.locator)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Picks managed or legacy storage from the host's declared platform level.
#[derive(Clone)]
pub struct StorageStrategist {
    platform: Arc<dyn PlatformInfo>,
    managed: Arc<dyn DestinationStore>,
    legacy: Arc<dyn DestinationStore>,
}

impl StorageStrategist {
    pub fn new(
        platform: Arc<dyn PlatformInfo>,
        media_store: Arc<dyn MediaStore>,
        downloads_root: impl Into<PathBuf>,
    ) -> Self {
        Self::with_stores(
            platform,
            Arc::new(ManagedStorage::new(media_store)),
            Arc::new(LegacyStorage::new(downloads_root)),
        )
    }

    pub fn with_stores(
        platform: Arc<dyn PlatformInfo>,
        managed: Arc<dyn DestinationStore>,
        legacy: Arc<dyn DestinationStore>,
    ) -> Self {
        Self {
            platform,
            managed,
            legacy,
        }
    }

    pub fn strategy(&self) -> StorageStrategy {
        if self.platform.platform_level() >= SCOPED_STORAGE_MIN_LEVEL {
            StorageStrategy::Managed
        } else {
            StorageStrategy::Legacy
        }
    }

    pub fn create_destination(
        &self,
        file_name: &str,
        storage_path: &str,
        mime_type: &str,
    ) -> Result<Destination, StorageError> {
        let strategy = self.strategy();
        let store = match strategy {
            StorageStrategy::Managed => self.managed.clone(),
            StorageStrategy::Legacy => self.legacy.clone(),
        };
        let locator = store.create(&DestinationRequest {
            file_name,
            storage_path,
            mime_type,
        })?;
        press_info!("Created {} destination {}", strategy, locator);
        Ok(Destination {
            locator,
            strategy,
            store,
        })
    }
}

pub(crate) fn check_file_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// `/`-separated relative path without empty, `.` or `..` segments.
pub(crate) fn normalize_relative_path(path: &str) -> Result<String, StorageError> {
    let mut segments = Vec::new();
    for component in Path::new(path.trim()).components() {
        match component {
            Component::Normal(segment) => match segment.to_str() {
                Some(segment) => segments.push(segment),
                None => return Err(StorageError::InvalidPath(path.to_string())),
            },
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidPath(path.to_string()))
            }
        }
    }
    Ok(segments.join("/"))
}
