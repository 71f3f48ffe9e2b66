use jarscope_class_file::{DecodeError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JarError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl JarError {
    /// The class file error kind, if the archive itself was readable.
    pub fn decode_kind(&self) -> Option<ErrorKind> {
        match self {
            JarError::Decode(e) => Some(e.kind()),
            JarError::IOError(_) | JarError::Zip(_) => None,
        }
    }
}
