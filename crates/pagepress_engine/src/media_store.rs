use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use pagepress_core::ContentUri;
use pagepress_logging::{press_debug, press_info};
use tempfile::TempPath;

use crate::storage::{
    check_file_name, normalize_relative_path, MediaStore, PendingEntry, StorageError, WriteStream,
};

pub const DEFAULT_AUTHORITY: &str = "pagepress.media";

/// Media store backed by a directory tree.
///
/// Pending entries live in hidden temp files next to their final location and
/// are renamed to the display name when published. Only the path is kept
/// between calls, so an entry that is never published holds no descriptor. A name that is already
/// taken gets a ` (n)` suffix before the extension.
pub struct DirectoryMediaStore {
    root: PathBuf,
    authority: String,
    next_id: AtomicU64,
    entries: Mutex<HashMap<ContentUri, MediaEntry>>,
}

struct MediaEntry {
    display_name: String,
    directory: PathBuf,
    state: EntryState,
}

enum EntryState {
    Pending(TempPath),
    Published(PathBuf),
}

impl DirectoryMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_authority(root, DEFAULT_AUTHORITY)
    }

    pub fn with_authority(root: impl Into<PathBuf>, authority: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            authority: authority.into(),
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File behind a published entry; `None` while pending or unknown.
    pub fn resolve(&self, uri: &ContentUri) -> Option<PathBuf> {
        let entries = self.entries().ok()?;
        match &entries.get(uri)?.state {
            EntryState::Published(path) => Some(path.clone()),
            EntryState::Pending(_) => None,
        }
    }

    pub fn is_pending(&self, uri: &ContentUri) -> bool {
        self.entries()
            .ok()
            .and_then(|entries| {
                entries
                    .get(uri)
                    .map(|entry| matches!(entry.state, EntryState::Pending(_)))
            })
            .unwrap_or(false)
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<ContentUri, MediaEntry>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::Rejected {
            display_name: String::new(),
            reason: "media index lock poisoned".to_string(),
        })
    }

    fn publish(entry: &mut MediaEntry) -> Result<PathBuf, StorageError> {
        let placeholder = EntryState::Published(PathBuf::new());
        match std::mem::replace(&mut entry.state, placeholder) {
            EntryState::Pending(tmp) => {
                let target = unique_target(&entry.directory, &entry.display_name);
                match tmp.persist_noclobber(&target) {
                    Ok(_) => {
                        entry.state = EntryState::Published(target.clone());
                        Ok(target)
                    }
                    Err(err) => {
                        entry.state = EntryState::Pending(err.path);
                        Err(StorageError::Io(err.error))
                    }
                }
            }
            EntryState::Published(path) => {
                entry.state = EntryState::Published(path.clone());
                Ok(path)
            }
        }
    }
}

impl MediaStore for DirectoryMediaStore {
    fn register(&self, entry: PendingEntry) -> Result<ContentUri, StorageError> {
        check_file_name(&entry.display_name)?;
        let relative = normalize_relative_path(&entry.relative_path)?;
        let directory = self.root.join(&relative);
        fs::create_dir_all(&directory)?;
        let tmp = tempfile::Builder::new()
            .prefix(".pending-")
            .tempfile_in(&directory)?
            .into_temp_path();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let uri = ContentUri::new(format!("content://{}/downloads/{id}", self.authority));
        let mut media_entry = MediaEntry {
            display_name: entry.display_name,
            directory,
            state: EntryState::Pending(tmp),
        };
        if !entry.pending {
            Self::publish(&mut media_entry)?;
        }
        press_debug!(
            "Registered {} as {} ({}, {:?})",
            media_entry.display_name,
            uri,
            entry.mime_type,
            relative
        );
        self.entries()?.insert(uri.clone(), media_entry);
        Ok(uri)
    }

    fn open_write(&self, uri: &ContentUri) -> Result<WriteStream, StorageError> {
        let entries = self.entries()?;
        let entry = entries
            .get(uri)
            .ok_or_else(|| StorageError::UnknownUri(uri.clone()))?;
        let file = match &entry.state {
            EntryState::Pending(tmp) => open_truncated(tmp)?,
            EntryState::Published(path) => open_truncated(path)?,
        };
        Ok(Box::new(file))
    }

    fn set_pending(&self, uri: &ContentUri, pending: bool) -> Result<(), StorageError> {
        let mut entries = self.entries()?;
        let entry = entries
            .get_mut(uri)
            .ok_or_else(|| StorageError::UnknownUri(uri.clone()))?;
        if pending {
            return match entry.state {
                EntryState::Pending(_) => Ok(()),
                EntryState::Published(_) => Err(StorageError::Rejected {
                    display_name: entry.display_name.clone(),
                    reason: "published entries cannot be hidden again".to_string(),
                }),
            };
        }
        let path = Self::publish(entry)?;
        press_info!("Published {} at {:?}", uri, path);
        Ok(())
    }
}

fn open_truncated(path: &Path) -> Result<fs::File, StorageError> {
    Ok(OpenOptions::new().write(true).truncate(true).open(path)?)
}

fn unique_target(directory: &Path, display_name: &str) -> PathBuf {
    let candidate = directory.join(display_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, extension) = match display_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (display_name, None),
    };
    (1u32..)
        .map(|n| match extension {
            Some(ext) => directory.join(format!("{stem} ({n}).{ext}")),
            None => directory.join(format!("{stem} ({n})")),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
