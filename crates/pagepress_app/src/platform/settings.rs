use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use pagepress_core::{RequestParams, ShellDefaults};
use pagepress_engine::DEFAULT_PLATFORM_LEVEL;
use pagepress_logging::LogDestination;
use serde::{Deserialize, Serialize};

use super::cli::{Args, LogTarget};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read settings from {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid settings in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// Contents of `pagepress.ron`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub storage_path: Option<String>,
    pub shared_root: Option<PathBuf>,
    pub downloads_root: Option<PathBuf>,
    pub platform_level: Option<u32>,
    pub user_agent: Option<String>,
    pub timeout_millis: Option<u64>,
    pub log: Option<LogTarget>,
    pub log_file: Option<PathBuf>,
}

/// A missing file is not an error; it just means no overrides.
pub fn load(path: &Path) -> Result<FileSettings, SettingsError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(FileSettings::default()),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    ron::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Effective settings after command-line flags are laid over the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub request: RequestParams,
    pub defaults: ShellDefaults,
    pub shared_root: Option<PathBuf>,
    pub downloads_root: Option<PathBuf>,
    pub platform_level: u32,
    pub log_destination: LogDestination,
    pub log_file: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn resolve(args: Args, file: FileSettings) -> Self {
        let log_level = match args.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        Self {
            request: RequestParams {
                url: args.url,
                file_name: args.file_name,
                storage_path: args.storage_path.or(file.storage_path),
            },
            defaults: ShellDefaults {
                user_agent: args.user_agent.or(file.user_agent),
                timeout_millis: args.timeout.or(file.timeout_millis),
            },
            shared_root: args.shared_root.or(file.shared_root),
            downloads_root: args.downloads_root.or(file.downloads_root),
            platform_level: args
                .platform_level
                .or(file.platform_level)
                .unwrap_or(DEFAULT_PLATFORM_LEVEL),
            log_destination: args.log.or(file.log).map(Into::into).unwrap_or_default(),
            log_file: file.log_file,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["pagepress", "https://example.com"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(loaded, FileSettings::default());
    }

    #[test]
    fn partial_file_is_parsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pagepress.ron");
        fs::write(
            &path,
            r#"(storage_path: Some("Download/Saved"), platform_level: Some(28), log: Some(both))"#,
        )
        .unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.storage_path.as_deref(), Some("Download/Saved"));
        assert_eq!(loaded.platform_level, Some(28));
        assert_eq!(loaded.log, Some(LogTarget::Both));
        assert_eq!(loaded.user_agent, None);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pagepress.ron");
        fs::write(&path, "(storage_path: 42").unwrap();
        assert!(matches!(load(&path), Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn flags_override_file_values() {
        let file = FileSettings {
            storage_path: Some("Download/FromFile".into()),
            user_agent: Some("file-agent".into()),
            timeout_millis: Some(1_000),
            platform_level: Some(28),
            ..FileSettings::default()
        };
        let settings = Settings::resolve(
            args(&["--storage-path", "Download/FromFlag", "-t", "2000", "-v"]),
            file,
        );

        assert_eq!(
            settings.request.storage_path.as_deref(),
            Some("Download/FromFlag")
        );
        assert_eq!(settings.defaults.user_agent.as_deref(), Some("file-agent"));
        assert_eq!(settings.defaults.timeout_millis, Some(2_000));
        assert_eq!(settings.platform_level, 28);
        assert_eq!(settings.log_level, LevelFilter::Debug);
    }

    #[test]
    fn nothing_configured_uses_defaults() {
        let settings = Settings::resolve(args(&[]), FileSettings::default());
        assert_eq!(settings.request.url, "https://example.com");
        assert_eq!(settings.request.file_name, None);
        assert_eq!(settings.platform_level, DEFAULT_PLATFORM_LEVEL);
        assert_eq!(settings.log_destination, LogDestination::Terminal);
        assert_eq!(settings.defaults, ShellDefaults::default());
    }
}
