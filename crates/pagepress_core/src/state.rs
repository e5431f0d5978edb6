use crate::view_model::AppViewModel;
use crate::ConversionConfig;

/// Parameters a launcher can pre-fill before the shell is shown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestParams {
    pub url: String,
    pub file_name: Option<String>,
    pub storage_path: Option<String>,
}

/// Settings that are not edited in the form but still end up in the config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellDefaults {
    pub user_agent: Option<String>,
    pub timeout_millis: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Converting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    url: String,
    file_name: String,
    storage_path: String,
    defaults: ShellDefaults,
    phase: Phase,
    progress: Vec<String>,
    status: Option<String>,
    saved_to: Option<String>,
    attempts: u32,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: ShellDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase,
            url: self.url.clone(),
            file_name: self.file_name.clone(),
            storage_path: self.storage_path.clone(),
            status: self.status.clone(),
            progress: self.progress.clone(),
            saved_to: self.saved_to.clone(),
            can_convert: self.phase != Phase::Converting,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn apply_request(&mut self, params: RequestParams) {
        self.url = params.url;
        self.file_name = params.file_name.unwrap_or_default();
        self.storage_path = params.storage_path.unwrap_or_default();
        self.mark_dirty();
    }

    pub(crate) fn set_url(&mut self, url: String) {
        self.url = url;
        self.mark_dirty();
    }

    pub(crate) fn set_file_name(&mut self, file_name: String) {
        self.file_name = file_name;
        self.mark_dirty();
    }

    pub(crate) fn set_storage_path(&mut self, storage_path: String) {
        self.storage_path = storage_path;
        self.mark_dirty();
    }

    /// Builds the config from the form; blank optional fields keep their defaults.
    pub(crate) fn build_config(&self) -> ConversionConfig {
        let mut builder = ConversionConfig::builder(self.url.trim());
        if let Some(name) = non_blank(&self.file_name) {
            builder = builder.file_name(name);
        }
        if let Some(path) = non_blank(&self.storage_path) {
            builder = builder.storage_path(path);
        }
        if let Some(user_agent) = self.defaults.user_agent.as_deref() {
            builder = builder.user_agent(user_agent);
        }
        if let Some(timeout) = self.defaults.timeout_millis {
            builder = builder.timeout_millis(timeout);
        }
        builder.build()
    }

    pub(crate) fn start_conversion(&mut self) {
        self.phase = Phase::Converting;
        self.attempts += 1;
        self.progress.clear();
        self.saved_to = None;
        self.status = Some("Starting conversion...".to_string());
        self.mark_dirty();
    }

    pub(crate) fn apply_progress(&mut self, message: String) {
        self.status = Some(message.clone());
        self.progress.push(message);
        self.mark_dirty();
    }

    pub(crate) fn apply_success(&mut self, locator: String, message: String) {
        self.phase = Phase::Succeeded;
        self.saved_to = Some(locator);
        self.status = Some(message);
        self.mark_dirty();
    }

    pub(crate) fn apply_failure(&mut self, message: String) {
        self.phase = Phase::Failed;
        self.status = Some(message);
        self.mark_dirty();
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
