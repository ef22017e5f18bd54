use std::fmt;

use thiserror::Error;

/// Which unique blog column a collision was detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogField {
    Name,
    Url,
}

impl fmt::Display for BlogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlogField::Name => write!(f, "name"),
            BlogField::Url => write!(f, "URL"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Blog '{0}' not found")]
    BlogNotFound(String),

    #[error("Article {0} not found")]
    ArticleNotFound(i64),

    #[error("Blog with {field} '{value}' already exists")]
    BlogAlreadyExists { field: BlogField, value: String },

    /// Storage-level uniqueness violation, carrying the offending column.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
