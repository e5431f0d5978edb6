use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};

/// Prefix of generated document names.
pub const DEFAULT_FILE_PREFIX: &str = "WebPage";
/// Sub-path under the shared storage area used when none is given.
pub const DEFAULT_STORAGE_PATH: &str = "Download/PagePress";
/// Desktop browser identity sent with every fetch unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 30_000;

/// Immutable description of one conversion request.
///
/// Building never fails: an empty or malformed `url` is accepted here and
/// rejected by the converter before any network or storage access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    url: String,
    file_name: String,
    storage_path: String,
    user_agent: String,
    timeout: Duration,
}

impl ConversionConfig {
    /// Config with every optional field at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self::builder(url).build()
    }

    pub fn builder(url: impl Into<String>) -> ConversionConfigBuilder {
        ConversionConfigBuilder::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn timeout_millis(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Accumulates optional overrides before producing a [`ConversionConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConversionConfigBuilder {
    url: String,
    file_name: Option<String>,
    storage_path: Option<String>,
    user_agent: Option<String>,
    timeout_millis: Option<u64>,
}

impl ConversionConfigBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn storage_path(mut self, storage_path: impl Into<String>) -> Self {
        self.storage_path = Some(storage_path.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn timeout_millis(mut self, timeout_millis: u64) -> Self {
        self.timeout_millis = Some(timeout_millis);
        self
    }

    /// The default file name is resolved here, so it reflects the build date.
    pub fn build(self) -> ConversionConfig {
        ConversionConfig {
            url: self.url,
            file_name: self
                .file_name
                .unwrap_or_else(|| default_file_name(Local::now().date_naive())),
            storage_path: self
                .storage_path
                .unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_string()),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: Duration::from_millis(self.timeout_millis.unwrap_or(DEFAULT_TIMEOUT_MILLIS)),
        }
    }
}

/// Date-stamped document name: `WebPage_<dd>_<mm>_<yyyy>.pdf`.
///
/// Same date, same name. Callers that need uniqueness pass an explicit name.
pub fn default_file_name(date: NaiveDate) -> String {
    format!(
        "{DEFAULT_FILE_PREFIX}_{:02}_{:02}_{:04}.pdf",
        date.day(),
        date.month(),
        date.year()
    )
}
