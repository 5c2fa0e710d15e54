// Extraction core.
// - `format.rs` maps declared content types onto the closed format set.
// - `strategies.rs` holds the pure bytes-to-text conversions.
// - `extraction_service.rs` is the dispatcher that ties them together.

pub mod extraction_service;
pub mod format;
pub mod strategies;

pub use extraction_service::{
    ContentFetcher, DocParagraph, ExtractionError, ExtractionResult, ExtractionService,
    GoogleDocMode, RemoteFile, StructuredDocument,
};
pub use format::DocumentKind;
