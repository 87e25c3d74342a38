//! Maps address strings to their per-address [`Pinning`].

use std::collections::HashMap;

use crate::{connection::ThreadId, pinning::Pinning};

/// A create-on-miss mapping from address string to [`Pinning`]. Keys are compared as raw
/// strings; no normalization is performed.
#[derive(Debug, Default)]
pub(crate) struct ConnectionIndex {
    pinnings: HashMap<String, Pinning>,
}

impl ConnectionIndex {
    /// Returns the `Pinning` for `address`, installing a fresh empty one on first reference.
    pub(crate) fn get(&mut self, address: &str) -> &mut Pinning {
        self.pinnings.entry(address.to_string()).or_default()
    }

    /// Unpins every connection currently pinned to `thread_id`, across all addresses.
    pub(crate) fn unpin(&mut self, thread_id: ThreadId) {
        for pinning in self.pinnings.values_mut() {
            pinning.unpin(thread_id);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::connection::test_support::fake;

    #[test]
    fn get_creates_pinning_on_miss_and_reuses_it() {
        let mut index = ConnectionIndex::default();

        let mut conn = fake("127.0.0.1:27017");
        conn.pin_to(7);
        index.get("127.0.0.1:27017").set(conn).unwrap();

        let got = index.get("127.0.0.1:27017").get(7);
        assert!(got.is_some());
    }

    #[test]
    fn unpin_sweeps_every_address() {
        let mut index = ConnectionIndex::default();

        let mut a = fake("127.0.0.1:27017");
        a.pin_to(7);
        index.get("127.0.0.1:27017").set(a).unwrap();

        let mut b = fake("127.0.0.1:27018");
        b.pin_to(7);
        index.get("127.0.0.1:27018").set(b).unwrap();

        index.unpin(7);

        // threads[7] was already swept out of both pinnings, so a second sweep finds nothing.
        assert!(index.get("127.0.0.1:27017").unpin(7).is_none());
        assert!(index.get("127.0.0.1:27018").unpin(7).is_none());
    }
}
