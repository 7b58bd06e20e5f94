use std::{io, num};

use ms_format::FormatError;

pub type Result<T> = ::std::result::Result<T, LoaderError>;

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Loader has no source bound")]
    NotReady,
    #[error("Loader is locked while loading")]
    Locked,
    #[error("Malformed mesh: {0}")]
    Malformed(String),
    #[error("Failed to triangulate face: {0}")]
    Triangulation(String),
    #[error("Material loading failed: {0}")]
    Material(String),
    #[error("No more chunks available")]
    NotAvailable,
    #[error("Failed to parse float.")]
    ParseFloat(#[from] num::ParseFloatError),
    #[error("Failed to parse integer.")]
    ParseInt(#[from] num::ParseIntError),
    #[error("Failed to write mesh: {0}")]
    Format(#[from] FormatError),
    #[error("Failed to read config: {0}")]
    Config(#[from] toml::de::Error),
}

impl LoaderError {
    pub(crate) fn malformed(details: impl Into<String>) -> Self {
        LoaderError::Malformed(details.into())
    }
}
