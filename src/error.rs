//! Contains the `Error` and `Result` types that this crate uses.

use std::sync::Arc;

use thiserror::Error;

/// The result type for all methods in this crate that can fail.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while checking out, checking in, or creating pooled connections.
///
/// The inner [`ErrorKind`] is wrapped in an `Arc` internally so that `Error` stays cheap to
/// clone, which matters since a single checkout failure may need to be observed by both the
/// caller and an event handler.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    /// Raised by [`crate::ConnectionPool::checkout`] when the deadline passes with no
    /// connection available for the requested address.
    pub(crate) fn max_pool_size_exceeded() -> Self {
        Self::new(ErrorKind::MaxPoolSizeExceeded)
    }

    pub(crate) fn invalid_address(address: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument {
            message: format!("invalid address `{}`, expected `host:port`", address.into()),
        })
    }

    pub(crate) fn invalid_max_pool_size(max_pool_size: u32) -> Self {
        Self::new(ErrorKind::InvalidArgument {
            message: format!("max_pool_size must be positive, got {max_pool_size}"),
        })
    }

    pub(crate) fn io(address: &str, source: std::io::Error) -> Self {
        Self::new(ErrorKind::ConnectionOpen {
            address: address.to_string(),
            source: Arc::new(source),
        })
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal {
            message: message.into(),
        })
    }

    /// Whether this error is the capacity-exhaustion error described in [`ErrorKind::MaxPoolSizeExceeded`].
    pub fn is_max_pool_size_exceeded(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::MaxPoolSizeExceeded)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// The types of errors that can occur.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An invalid argument was provided, such as an address that doesn't parse as `host:port`.
    #[error("an invalid argument was provided: {message}")]
    #[non_exhaustive]
    InvalidArgument { message: String },

    /// `checkout` waited until its deadline elapsed without finding or creating a connection.
    /// The pool's state is unchanged; the caller may retry. Carries no payload.
    #[error("no connection became available before the checkout deadline")]
    #[non_exhaustive]
    MaxPoolSizeExceeded,

    /// The underlying socket for a new connection failed to open. `instantiated` is not
    /// incremented when this occurs.
    #[error("failed to open a connection to {address}: {source}")]
    #[non_exhaustive]
    ConnectionOpen {
        address: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// An invariant of the pool was violated. This indicates a bug in the pool itself, not
    /// misuse by a caller.
    #[error("internal connection pool error: {message}")]
    #[non_exhaustive]
    Internal { message: String },
}
