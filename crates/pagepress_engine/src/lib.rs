//! PagePress engine: fetch, render and store pipeline plus UI-thread delivery.
mod converter;
mod decode;
mod dispatch;
mod fetch;
mod host;
mod layout;
mod media_store;
mod render;
mod storage;
mod types;

pub use converter::PdfConverter;
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use dispatch::{UiDispatcher, UiHandle, UiLoop, UiTask};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use host::{HostContext, HostContextBuilder, DEFAULT_PLATFORM_LEVEL};
pub use layout::{layout_document, Block, BlockKind, PageLayout};
pub use media_store::{DirectoryMediaStore, DEFAULT_AUTHORITY};
pub use render::{PrintPdfRenderer, RenderError, Renderer};
pub use storage::{
    Destination, DestinationRequest, DestinationStore, LegacyStorage, ManagedStorage, MediaStore,
    PendingEntry, PlatformInfo, StaticPlatform, StorageError, StorageStrategist, StorageStrategy,
    WriteStream, PDF_MIME_TYPE, SCOPED_STORAGE_MIN_LEVEL,
};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchRequest, FetchedPage};
