/*!
 * Error types for opconfig.
 */
use thiserror::Error;

use crate::types::Kind;

/// Error type for opconfig operations
#[derive(Error, Debug)]
pub enum Error {
    /// Structural violation of the wire format
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// Value whose kind is not boolean, integer, float or string
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// Typed read of an entry stored with a different kind
    #[error("Type mismatch for '{name}': stored {stored}, requested {requested}")]
    TypeMismatch {
        /// Entry name
        name: String,
        /// Kind of the stored value
        stored: Kind,
        /// Kind the caller asked for
        requested: Kind,
    },

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Already exists error
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lock poisoned
    #[error("Lock error: {0}")]
    Lock(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for opconfig operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new malformed data error
    pub fn malformed<S: AsRef<str>>(msg: S) -> Self {
        Error::MalformedData(msg.as_ref().to_string())
    }

    /// Create a new invalid type error
    pub fn invalid_type<S: AsRef<str>>(msg: S) -> Self {
        Error::InvalidType(msg.as_ref().to_string())
    }

    /// Create a new type mismatch error
    pub fn type_mismatch<S: AsRef<str>>(name: S, stored: Kind, requested: Kind) -> Self {
        Error::TypeMismatch {
            name: name.as_ref().to_string(),
            stored,
            requested,
        }
    }

    /// Create a new not found error
    pub fn not_found<S: AsRef<str>>(msg: S) -> Self {
        Error::NotFound(msg.as_ref().to_string())
    }

    /// Create a new already exists error
    pub fn already_exists<S: AsRef<str>>(msg: S) -> Self {
        Error::AlreadyExists(msg.as_ref().to_string())
    }

    /// Create a new configuration error
    pub fn config<S: AsRef<str>>(msg: S) -> Self {
        Error::Config(msg.as_ref().to_string())
    }

    /// Create a new lock error
    pub fn lock<S: AsRef<str>>(msg: S) -> Self {
        Error::Lock(msg.as_ref().to_string())
    }

    /// Create a new runtime error
    pub fn runtime<S: AsRef<str>>(msg: S) -> Self {
        Error::Runtime(msg.as_ref().to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
