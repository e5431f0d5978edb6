use crate::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub url: String,
    pub file_name: String,
    pub storage_path: String,
    /// Latest progress line or terminal message.
    pub status: Option<String>,
    pub progress: Vec<String>,
    pub saved_to: Option<String>,
    pub can_convert: bool,
    pub dirty: bool,
}
