use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DepresError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("XML Parsing Error: {0}")]
    Xml(#[from] Arc<roxmltree::Error>),

    #[error("Metadata Parsing Error: {0}")]
    Metadata(#[from] Arc<quick_xml::DeError>),

    #[error("Archive Error: {0}")]
    Archive(#[from] Arc<zip::result::ZipError>),

    #[error("JSON Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Cache Error: {0}")]
    Cache(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Malformed POM {0}: {1}")]
    MalformedPom(String, String),

    #[error("Generic Error: {0}")]
    Generic(String),

    #[error("HttpError: {0}")]
    HttpError(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Parsing Error in {0}: {1}")]
    ParseError(&'static str, String),

    #[error("IoError: {0}")]
    IoError(String),
}

impl DepresError {
    /// True for the "looked everywhere, nothing there" class of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DepresError::NotFound(_))
    }
}

impl From<std::io::Error> for DepresError {
    fn from(err: std::io::Error) -> Self {
        DepresError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for DepresError {
    fn from(err: reqwest::Error) -> Self {
        DepresError::Http(Arc::new(err))
    }
}

impl From<roxmltree::Error> for DepresError {
    fn from(err: roxmltree::Error) -> Self {
        DepresError::Xml(Arc::new(err))
    }
}

impl From<quick_xml::DeError> for DepresError {
    fn from(err: quick_xml::DeError) -> Self {
        DepresError::Metadata(Arc::new(err))
    }
}

impl From<zip::result::ZipError> for DepresError {
    fn from(err: zip::result::ZipError) -> Self {
        DepresError::Archive(Arc::new(err))
    }
}

impl From<serde_json::Error> for DepresError {
    fn from(err: serde_json::Error) -> Self {
        DepresError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, DepresError>;
