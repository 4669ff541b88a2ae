//! Library-level error type returned by all fallible archive operations.
//!
//! Inner causes (I/O, ZIP, JSON, UTF-8) are converted to strings at the
//! boundary so callers match on the variant, not on the source error type.

/// Top-level error for archive save/load and record decoding.
///
/// The two best-effort filesystem helpers in [`crate::fsutil`] never
/// return this type; their failures are reported through
/// [`crate::fsutil::CopyOutcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A generic I/O error; the inner [`std::io::Error`] is converted to a
    /// string at the system boundary.
    #[error("{0}")]
    Io(String),

    /// The archive could not be written.
    #[error("{0}")]
    Save(String),

    /// The archive could not be opened or its container is malformed.
    #[error("{0}")]
    Load(String),

    /// A record could not be encoded into the value graph.
    #[error("{0}")]
    Encode(String),

    /// The payload was read but a value or record inside it is malformed.
    #[error("{0}")]
    Decode(String),

    /// The stream names a record type absent from the registry.
    #[error("unknown record type `{0}`")]
    UnknownType(String),

    /// A typed load found a root record of a different type.
    #[error("expected a `{expected}` record, found `{found}`")]
    WrongRecordType {
        expected: &'static str,
        found: String,
    },
}

impl From<std::io::Error> for StoreError {
    /// Convert an [`std::io::Error`] into a [`StoreError::Io`].
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            StoreError::Load("cannot open file: gone".to_string()).to_string(),
            "cannot open file: gone"
        );
        assert_eq!(
            StoreError::UnknownType("roi".to_string()).to_string(),
            "unknown record type `roi`"
        );
        assert_eq!(
            StoreError::WrongRecordType {
                expected: "molecule",
                found: "embryo".to_string(),
            }
            .to_string(),
            "expected a `molecule` record, found `embryo`"
        );
    }

    #[test]
    fn from_io_error_produces_io_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::from(io_err);
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(err.to_string(), "denied");
    }
}
