//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IoError> for atlasclean_core::Error {
    fn from(err: IoError) -> Self {
        use atlasclean_core::Error;
        use std::io::ErrorKind;

        match err {
            IoError::Io(e) => Error::Io(e),
            IoError::FileNotFound { path } => {
                Error::Io(std::io::Error::new(ErrorKind::NotFound, path))
            }
            IoError::WriteError { message } => {
                Error::Io(std::io::Error::new(ErrorKind::Other, message))
            }
            IoError::InvalidFormat { format } => Error::UnsupportedFormat(format),
            IoError::ParseError { message } => Error::InvalidData(message),
            IoError::Nifti(e) => Error::InvalidData(e.to_string()),
        }
    }
}

pub type IoResult<T> = std::result::Result<T, IoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use atlasclean_core::Error;

    #[test]
    fn test_conversion_to_core_error() {
        let err: Error = IoError::InvalidFormat { format: "mgz".into() }.into();
        assert!(matches!(err, Error::UnsupportedFormat(f) if f == "mgz"));

        let err: Error = IoError::FileNotFound { path: "a.nii".into() }.into();
        assert!(matches!(err, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound));

        let err: Error = IoError::ParseError { message: "bad".into() }.into();
        assert!(matches!(err, Error::InvalidData(_)));
    }
}
