//! Error types for entity definitions

use thiserror::Error;

/// The main error type for loading and building entity definitions
#[derive(Debug, Error)]
pub enum EntityDefError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid definition for {type_name}: {reason}")]
    InvalidDefinition { type_name: String, reason: String },

    #[error("Missing type token in definition '{0}'")]
    MissingTypeToken(String),

    #[error("Meta type already registered: {0}")]
    DuplicateMetaType(String),

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Alias already defined: {0}")]
    DuplicateAlias(String),

    #[error("Unknown custom implementor: {0}")]
    UnknownImplementor(String),

    #[error("Invalid default value for {type_name}")]
    InvalidDefault { type_name: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),
}

impl EntityDefError {
    /// Shorthand for an `InvalidDefinition` error
    pub fn invalid(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        EntityDefError::InvalidDefinition {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for entity definition operations
pub type Result<T> = std::result::Result<T, EntityDefError>;

impl From<toml::de::Error> for EntityDefError {
    fn from(err: toml::de::Error) -> Self {
        EntityDefError::TomlParseError(err.to_string())
    }
}
