use crate::RequestParams;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Pre-filled request parameters handed to the shell at start-up.
    RequestReceived(RequestParams),
    /// User edited the URL field.
    UrlChanged(String),
    /// User edited the file name field.
    FileNameChanged(String),
    /// User edited the storage sub-path field.
    StoragePathChanged(String),
    /// User asked for the current inputs to be converted.
    ConvertClicked,
    /// Converter reported a milestone.
    ConversionProgress { message: String },
    /// Converter finished and stored the document.
    ConversionSucceeded { locator: String, message: String },
    /// Converter gave up; `message` is shown verbatim.
    ConversionFailed { message: String },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
