//! Error types for the quote card pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading inputs, rendering or exporting a card
#[derive(Error, Debug)]
pub enum Error {
    /// A record was rejected before rendering (missing or empty field)
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The records file itself is unusable (missing columns, unreadable)
    #[error("Invalid input file: {0}")]
    InputError(String),

    /// An asset could not be decoded or located
    #[error("Asset error: {0}")]
    AssetError(String),

    /// The vertical flow could not be fitted onto the canvas
    #[error("Layout failed: {0}")]
    LayoutError(String),

    /// Failed to render content
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to encode or write an output file
    #[error("Export failed: {0}")]
    ExportError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Image decoding or resampling error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Whether this error only affects the record being processed.
    ///
    /// Batch runners keep going after a recoverable error and report it in
    /// the end-of-batch summary.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            Error::MalformedRecord(_)
                | Error::LayoutError(_)
                | Error::RenderError(_)
                | Error::ExportError(_)
                | Error::Io(_)
                | Error::Image(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_scoped_errors_are_recoverable() {
        assert!(Error::MalformedRecord("empty content".into()).is_record_scoped());
        assert!(Error::ExportError("disk full".into()).is_record_scoped());
        assert!(!Error::ConfigError("bad dpi".into()).is_record_scoped());
        assert!(!Error::InputError("missing column".into()).is_record_scoped());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(err.to_string().contains("denied"));
    }
}
