pub mod diagnostics;
pub mod download;
pub mod dxf;
pub mod source;

use std::path::PathBuf;

use thiserror::Error;

pub use diagnostics::{CollectingDiagnostics, Diagnostic, DiagnosticsSink, TracingDiagnostics};
pub use download::save_download;
pub use dxf::{DxfExtractor, ExtractError, Extraction};
pub use source::{DirectorySource, DrawingSource, SourceError};

#[cfg(feature = "http")]
pub use source::HttpSource;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("invalid file name {0:?}")]
    InvalidFileName(String),
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
