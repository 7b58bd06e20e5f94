use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, FormatError>;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Serialization Error: {0}")]
    SerializationError(#[from] Box<bincode::ErrorKind>),
    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Not a binary mesh file")]
    InvalidMagic,
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),
    #[error("Unexpected record tag: {0}")]
    UnexpectedRecord(u8),
    #[error("Writer already finished")]
    Finished,
}
