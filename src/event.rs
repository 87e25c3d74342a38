//! Connection pool lifecycle events.
//!
//! Mirrors the event-handler pattern used elsewhere in this codebase for observability: a
//! caller can provide a [`CmapEventHandler`] to [`crate::ConnectionPool::with_event_handler`] to
//! receive structured notifications about pool activity, independent of whatever the pool logs
//! via `tracing`.

use std::fmt::Debug;

/// A lifecycle event emitted by a [`crate::ConnectionPool`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum CmapEvent {
    /// A pool was constructed.
    PoolCreated {
        /// The effective maximum pool size it was constructed with.
        max_size: u32,
    },
    /// A new connection was opened and counted against the pool's capacity.
    ConnectionCreated {
        /// The address the connection was opened to.
        address: String,
    },
    /// A connection was returned to the pool.
    ConnectionCheckedIn {
        /// The address of the returned connection.
        address: String,
    },
    /// A checkout's deadline elapsed with no connection available.
    ConnectionCheckoutFailed {
        /// The address that was requested.
        address: String,
    },
}

/// Receives [`CmapEvent`]s from a [`crate::ConnectionPool`].
///
/// Implementations must be safe to call from any thread while the pool's mutex may or may not
/// be held by the calling thread; handlers should not call back into the pool that invoked them.
pub trait CmapEventHandler: Debug + Send + Sync {
    /// Handle a single event. Called synchronously from the thread that triggered it.
    fn handle(&self, event: CmapEvent);
}
