use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Snapshot schema version {found} is not supported (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use rentcache_core::Error;
    /// let err = Error::config_error("flush interval must be positive");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating snapshot errors
    pub fn snapshot_error(msg: impl Into<String>) -> Self {
        Error::Snapshot(msg.into())
    }

    /// Helper for creating general errors with a message
    ///
    /// # Example
    /// ```
    /// use rentcache_core::Error;
    /// let err = Error::message("Something went wrong");
    /// ```
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }
}
