//! Per-address bookkeeping of which connections are pinned to which threads.
//!
//! All methods here are called with the pool's mutex held; `Pinning` carries no lock of its
//! own and is not meant to be shared across threads except through that outer lock.

use std::collections::HashMap;

use crate::{
    connection::{Connection, ThreadId},
    error::{Error, Result},
};

/// Tracks, for a single address, which connections are currently pinned to which threads and
/// which are resident but unpinned.
///
/// Ownership models the invariant that a connection lives in exactly one place at a time: it's
/// either a value in `threads`, an entry in `unpinned`, or it has been moved out to a caller
/// (checked out) and is momentarily owned by neither. The last case is the Rust-idiomatic
/// reading of a detail some pinning implementations leave implicit: a connection handed back by
/// `get` is not simultaneously resident anywhere else, because nothing else holds a reference to
/// it to observe that.
#[derive(Debug, Default)]
pub(crate) struct Pinning {
    threads: HashMap<ThreadId, Connection>,
    unpinned: Vec<Connection>,
}

impl Pinning {
    /// Returns the connection pinned to `thread_id`, if resident. Failing that, promotes the
    /// most recently unpinned connection (LIFO, to keep hot connections warm) and pins it to
    /// `thread_id`. Returns `None` if neither is available.
    pub(crate) fn get(&mut self, thread_id: ThreadId) -> Option<Connection> {
        if let Some(connection) = self.threads.remove(&thread_id) {
            return Some(connection);
        }

        let mut connection = self.unpinned.pop()?;
        connection.pin_to(thread_id);
        Some(connection)
    }

    /// Makes a returned connection resident again under its current pin.
    ///
    /// Fails if `connection` has no pin: that would mean a caller checked in a connection it
    /// never checked out (or unpinned first), which is a misuse of the pool, not a capacity or
    /// I/O condition.
    pub(crate) fn set(&mut self, connection: Connection) -> Result<()> {
        let thread_id = connection.pinned_to().ok_or_else(|| {
            Error::internal("checked in a connection with no pin; set() requires pinned_to")
        })?;
        self.threads.insert(thread_id, connection);
        Ok(())
    }

    /// Moves the connection pinned to `thread_id`, if any, into the unpinned set and returns a
    /// reference to it.
    pub(crate) fn unpin(&mut self, thread_id: ThreadId) -> Option<&Connection> {
        let mut connection = self.threads.remove(&thread_id)?;
        connection.unpin();
        self.unpinned.push(connection);
        self.unpinned.last()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn conn(address: &str) -> Connection {
        // Tests exercise the bookkeeping directly, without opening a real socket.
        crate::connection::test_support::fake(address)
    }

    #[test]
    fn get_promotes_from_unpinned_lifo() {
        let mut pinning = Pinning::default();
        let a = conn("127.0.0.1:27017");
        let b = conn("127.0.0.1:27017");
        let id_a = a.id();
        let id_b = b.id();

        pinning
            .set({
                let mut a = a;
                a.pin_to(1);
                a
            })
            .unwrap();
        pinning.unpin(1);
        pinning
            .set({
                let mut b = b;
                b.pin_to(1);
                b
            })
            .unwrap();
        pinning.unpin(1);

        // last unpinned (b) should be promoted first
        let promoted = pinning.get(2).unwrap();
        assert_eq!(promoted.id(), id_b);
        let promoted = pinning.get(3).unwrap();
        assert_eq!(promoted.id(), id_a);
    }

    #[test]
    fn get_prefers_exact_thread_match() {
        let mut pinning = Pinning::default();
        let mut a = conn("127.0.0.1:27017");
        a.pin_to(42);
        let id_a = a.id();
        pinning.set(a).unwrap();

        let mut b = conn("127.0.0.1:27017");
        b.pin_to(99);
        pinning.set(b).unwrap();
        pinning.unpin(99);

        let got = pinning.get(42).unwrap();
        assert_eq!(got.id(), id_a);
    }
}
