//! Error types for connection acquisition
use thiserror::Error;

/// Boxed error used as the cause of adapter failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for acquisition operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building strategies or acquiring connections
#[derive(Error, Debug)]
pub enum Error {
    /// A strategy was configured with values it cannot work with.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// What is wrong with the configuration
        message: String,
    },

    /// The pool could not hand out a connection within its wait time.
    ///
    /// Strategies recover from this variant; the same value (and cause) is
    /// what reaches the caller once every strategy gives up.
    #[error("Timed out acquiring a connection: {source}")]
    AcquireTimeout {
        /// The adapter's underlying failure
        #[source]
        source: BoxError,
    },

    /// Interrupted while waiting for the pool resize lock.
    #[error("Interrupted while waiting for the pool resize lock")]
    Interrupted,

    /// Any other pool adapter failure. Never retried.
    #[error("Pool error: {message}")]
    Pool {
        /// The error message
        message: String,
        /// The underlying error
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an acquire timeout carrying the adapter's cause
    pub fn acquire_timeout<E>(cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::AcquireTimeout {
            source: cause.into(),
        }
    }

    /// Create a non-timeout pool error
    pub fn pool<S: Into<String>>(message: S) -> Self {
        Self::Pool {
            message: message.into(),
            source: None,
        }
    }

    /// Create a non-timeout pool error wrapping the adapter's cause
    pub fn pool_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::Pool {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this is an acquire timeout
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::AcquireTimeout { .. })
    }

    /// Whether an outer strategy may try again after this error
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_timeout()
    }
}
