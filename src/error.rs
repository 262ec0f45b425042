use std::path::PathBuf;
use thiserror::Error;

/// Architectum error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Malformed extraction for {path}: {message}")]
    MalformedExtraction { path: String, message: String },

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Selection not found: {0}")]
    SelectionNotFound(String),

    #[error("Empty selection: {0}")]
    EmptySelection(String),

    #[error("Unsupported format: {0} (expected json or xml)")]
    UnsupportedFormat(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Cannot merge blueprints: {0}")]
    IncompatibleMerge(String),

    #[error("Invalid blueprint definition: {0}")]
    InvalidDefinition(String),

    #[error("Blueprint is not persistent: {0}")]
    NotPersistent(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Architectum operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a malformed extraction error for a file
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedExtraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    pub fn unknown_identifier(id: impl ToString) -> Self {
        Error::UnknownIdentifier(id.to_string())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound(key.into())
    }

    pub fn selection_not_found(key: impl Into<String>) -> Self {
        Error::SelectionNotFound(key.into())
    }

    /// Create an invalid definition error
    pub fn invalid_definition(msg: impl Into<String>) -> Self {
        Error::InvalidDefinition(msg.into())
    }

    /// Create a parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Error::Parser(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// True for the "caller referenced something absent" family
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::UnknownIdentifier(_)
                | Error::NotFound(_)
                | Error::SelectionNotFound(_)
                | Error::PathNotFound(_)
        )
    }
}
