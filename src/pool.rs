//! The public façade: a bounded, per-address, thread-pinned connection pool.
//!
//! The checkout/checkin state machine is the hard part of this crate. A single mutex guards
//! every field reachable from [`ConnectionPool`], including the [`ConnectionIndex`] and the
//! live-connection counter; a condition variable, broadcast on every checkin, wakes waiters so
//! they can re-check the (possibly still unavailable) condition. Opening a new connection
//! happens inside the critical section: this is a deliberate simplicity choice that serializes
//! connection establishment and guarantees the live-connection count never exceeds `max_size`.
//! Do not move connection establishment outside the lock without re-proving that guarantee.

use std::{
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};

use tracing::{debug, trace, warn};

use crate::{
    connection::{parse_address, Connection, ThreadId},
    error::{Error, Result},
    event::{CmapEvent, CmapEventHandler},
    index::ConnectionIndex,
    options::ConnectionPoolOptions,
};

/// The deadline used by [`ConnectionPool::checkout`] when the caller doesn't specify one.
pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
struct PoolState {
    index: ConnectionIndex,
    /// The total number of live connections created by this pool across all addresses. Only
    /// ever incremented, and only while holding the mutex; the pool does not destroy
    /// connections, so this count is never decremented (see `unpin_connections` for the one
    /// related caveat: a checked-out connection whose owning thread never calls back in leaks
    /// its slot forever).
    instantiated: u32,
}

/// A per-address, thread-pinned pool of [`Connection`]s.
///
/// Construct with [`ConnectionPool::new`], then call [`ConnectionPool::checkout`] and
/// [`ConnectionPool::checkin`] from any number of threads. The pool itself synchronizes all
/// access; there is no need to wrap it in an external `Mutex`.
#[derive(Debug)]
pub struct ConnectionPool {
    state: Mutex<PoolState>,
    checked_in: Condvar,
    max_size: u32,
    connect_timeout: Option<Duration>,
    event_handler: Option<Box<dyn CmapEventHandler>>,
}

impl ConnectionPool {
    /// Constructs an empty pool from `options`. See [`ConnectionPoolOptions`] for defaults.
    ///
    /// Fails only if `options` sets `max_pool_size` to `0`.
    pub fn new(options: ConnectionPoolOptions) -> Result<Self> {
        Self::with_event_handler(options, None)
    }

    /// Constructs an empty pool that additionally reports lifecycle events to `event_handler`.
    pub fn with_event_handler(
        options: ConnectionPoolOptions,
        event_handler: Option<Box<dyn CmapEventHandler>>,
    ) -> Result<Self> {
        let max_size = options.effective_max_pool_size()?;
        if let Some(handler) = &event_handler {
            handler.handle(CmapEvent::PoolCreated { max_size });
        }

        Ok(Self {
            state: Mutex::new(PoolState::default()),
            checked_in: Condvar::new(),
            max_size,
            connect_timeout: options.connect_timeout,
            event_handler,
        })
    }

    /// The effective maximum number of live connections this pool will instantiate.
    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Whether the pool currently has as many live connections as `max_size` allows.
    ///
    /// Reading this outside the pool's own mutex (as this method does) is a hint only: by the
    /// time the caller acts on it, another thread may have checked a connection in or out.
    /// `checkout` itself reads the equivalent condition under the lock.
    pub fn saturated(&self) -> bool {
        let state = self.state.lock().unwrap();
        self.is_saturated(&state)
    }

    fn is_saturated(&self, state: &PoolState) -> bool {
        state.instantiated >= self.max_size
    }

    /// Returns `connection` to the pool under its current pin, then wakes every thread blocked
    /// in [`ConnectionPool::checkout`].
    ///
    /// `connection` must have a non-null `pinned_to`; a connection checked out via
    /// [`ConnectionPool::checkout`] or pinned manually satisfies this by construction. Checking
    /// in never allocates a new capacity slot.
    ///
    /// Broadcast, not signal: a checkin wakes every waiter regardless of the address it wants,
    /// because a waiter woken for the wrong address must yield to whichever waiter the checked-in
    /// connection actually serves. Each reevaluates the wait condition independently on wake.
    pub fn checkin(&self, connection: Connection) -> Result<()> {
        let address = connection.address().to_string();
        let mut state = self.state.lock().unwrap();
        state.index.get(&address).set(connection)?;
        trace!(address, "checked in connection");
        if let Some(handler) = &self.event_handler {
            handler.handle(CmapEvent::ConnectionCheckedIn { address });
        }
        self.checked_in.notify_all();
        Ok(())
    }

    /// Checks out a connection pinned to `thread_id` for `address`, waiting up to
    /// [`DEFAULT_CHECKOUT_TIMEOUT`] if the pool is saturated and none is immediately available.
    pub fn checkout(&self, thread_id: ThreadId, address: &str) -> Result<Connection> {
        self.checkout_with_timeout(thread_id, address, DEFAULT_CHECKOUT_TIMEOUT)
    }

    /// Checks out a connection pinned to `thread_id` for `address`, waiting up to `timeout`.
    ///
    /// Three outcomes, checked in order under the pool's mutex: a connection already pinned to
    /// (or promotable for) `thread_id` is returned immediately; failing that, if the pool is not
    /// saturated, a new connection is opened, counted, pinned to `thread_id`, and returned
    /// without being inserted into the pinning (only `checkin` does that — two concurrent
    /// checkouts for the same address and thread will each open their own connection, since
    /// neither has been checked in yet for the other to find); failing that, the caller waits on
    /// the condition variable, re-checking the first condition on every wake, until it succeeds
    /// or `timeout` elapses.
    pub fn checkout_with_timeout(
        &self,
        thread_id: ThreadId,
        address: &str,
        timeout: Duration,
    ) -> Result<Connection> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();

        if let Some(connection) = state.index.get(address).get(thread_id) {
            return Ok(connection);
        }

        if !self.is_saturated(&state) {
            return self.create_connection(&mut state, thread_id, address);
        }

        self.wait_for_checkin(state, thread_id, address, deadline)
    }

    fn wait_for_checkin(
        &self,
        mut state: std::sync::MutexGuard<'_, PoolState>,
        thread_id: ThreadId,
        address: &str,
        deadline: Instant,
    ) -> Result<Connection> {
        loop {
            if let Some(connection) = state.index.get(address).get(thread_id) {
                return Ok(connection);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    address,
                    thread_id, "checkout timed out waiting for a connection"
                );
                if let Some(handler) = &self.event_handler {
                    handler.handle(CmapEvent::ConnectionCheckoutFailed {
                        address: address.to_string(),
                    });
                }
                return Err(Error::max_pool_size_exceeded());
            }

            let (guard, _timeout_result) =
                self.checked_in.wait_timeout(state, deadline - now).unwrap();
            state = guard;
        }
    }

    /// Opens a new connection, bumping `instantiated` only after the socket succeeds. Must be
    /// called with `state` already confirmed non-saturated.
    fn create_connection(
        &self,
        state: &mut PoolState,
        thread_id: ThreadId,
        address: &str,
    ) -> Result<Connection> {
        let (host, port) = parse_address(address)?;
        let mut connection = Connection::open(&host, port, self.connect_timeout)?;
        state.instantiated += 1;
        connection.pin_to(thread_id);
        debug!(
            address,
            thread_id,
            instantiated = state.instantiated,
            "created connection"
        );
        if let Some(handler) = &self.event_handler {
            handler.handle(CmapEvent::ConnectionCreated {
                address: address.to_string(),
            });
        }
        Ok(connection)
    }

    /// Unpins every connection currently pinned to `thread_id`, across all addresses, making
    /// them available for reassignment to other threads.
    ///
    /// Deliberately does not broadcast: the newly-unpinned connections are not signaled to
    /// waiters until the next `checkin`. A thread blocked in `checkout` for one of these
    /// addresses will not wake until then.
    pub fn unpin_connections(&self, thread_id: ThreadId) {
        let mut state = self.state.lock().unwrap();
        state.index.unpin(thread_id);
        trace!(thread_id, "unpinned connections for thread");
    }
}
