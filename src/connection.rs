//! The pool's sole collaborator: a single TCP connection to a server address.
//!
//! Everything about reading, writing, and keeping this connection alive is out of scope for
//! the pool; the pool only opens the socket, observes its address, and tracks which logical
//! thread it is currently pinned to.

use std::{
    net::TcpStream,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use crate::error::{Error, Result};

/// An opaque, caller-assigned identifier for a logical execution context ("thread").
///
/// This need not be a native OS thread id; any stable, comparable key a caller uses
/// consistently for the lifetime of its checkouts is valid.
pub type ThreadId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
enum Transport {
    Tcp(#[allow(dead_code)] TcpStream),
    /// Stands in for a real socket in unit tests that exercise pinning/index bookkeeping
    /// without needing a live listener on the other end.
    #[cfg(test)]
    Fake,
}

/// A single pooled connection to a `host:port` address.
///
/// `Connection` compares equal by address, not identity: two connections to the same address
/// are interchangeable from a routing perspective even though the pool's bookkeeping relies on
/// object identity (ownership) rather than equality to decide which connection a caller holds.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    address: String,
    pinned_to: Option<ThreadId>,
    // Held only to keep the socket open for the connection's lifetime; the pool never reads
    // or writes through it.
    #[allow(dead_code)]
    transport: Transport,
}

impl Connection {
    /// Opens a new TCP connection to `host:port`, optionally bounded by `timeout`.
    pub(crate) fn open(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self> {
        let address = format!("{host}:{port}");

        let stream = match timeout {
            Some(timeout) => {
                let socket_addr = (host, port)
                    .to_socket_addrs_single()
                    .map_err(|source| Error::io(&address, source))?;
                TcpStream::connect_timeout(&socket_addr, timeout)
                    .map_err(|source| Error::io(&address, source))?
            }
            None => {
                TcpStream::connect((host, port)).map_err(|source| Error::io(&address, source))?
            }
        };

        Ok(Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            address,
            pinned_to: None,
            transport: Transport::Tcp(stream),
        })
    }

    /// The `host:port` this connection was opened against.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The thread this connection is currently pinned to, if any.
    pub fn pinned_to(&self) -> Option<ThreadId> {
        self.pinned_to
    }

    /// A per-process-unique identity, distinct from address-based equality. Used by tests (and
    /// could be used by event handlers) to tell two connections to the same address apart.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn pin_to(&mut self, thread_id: ThreadId) {
        self.pinned_to = Some(thread_id);
    }

    pub(crate) fn unpin(&mut self) {
        self.pinned_to = None;
    }

    #[cfg(test)]
    pub(crate) fn local_addr_is_live(&self) -> bool {
        match &self.transport {
            Transport::Tcp(stream) => stream.local_addr().is_ok(),
            Transport::Fake => true,
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Connection {}

/// Splits `"host:port"` on the first `:`, per the address format this pool expects.
pub(crate) fn parse_address(address: &str) -> Result<(String, u16)> {
    let (host, port) = address
        .split_once(':')
        .ok_or_else(|| Error::invalid_address(address))?;

    let port: u16 = port.parse().map_err(|_| Error::invalid_address(address))?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{Connection, Transport, NEXT_CONNECTION_ID};
    use std::sync::atomic::Ordering;

    /// Builds a `Connection` with no real socket, for tests that only exercise pinning and
    /// index bookkeeping.
    pub(crate) fn fake(address: &str) -> Connection {
        Connection {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            address: address.to_string(),
            pinned_to: None,
            transport: Transport::Fake,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn open_connects_and_reports_its_address() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = std::thread::spawn(move || listener.accept().unwrap());

        let connection = Connection::open("127.0.0.1", port, Some(Duration::from_secs(1))).unwrap();

        accepted.join().unwrap();
        assert_eq!(connection.address(), format!("127.0.0.1:{port}"));
        assert!(connection.pinned_to().is_none());
        assert!(connection.local_addr_is_live());
    }

    #[test]
    fn open_surfaces_connection_refused_as_connection_open_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err =
            Connection::open("127.0.0.1", port, Some(Duration::from_millis(200))).unwrap_err();
        assert!(matches!(
            err.kind.as_ref(),
            crate::error::ErrorKind::ConnectionOpen { .. }
        ));
    }

    #[test]
    fn parse_address_splits_on_first_colon() {
        assert_eq!(
            parse_address("127.0.0.1:27017").unwrap(),
            ("127.0.0.1".to_string(), 27017)
        );
    }

    #[test]
    fn parse_address_rejects_missing_port() {
        assert!(parse_address("127.0.0.1").is_err());
    }

    #[test]
    fn parse_address_rejects_non_numeric_port() {
        assert!(parse_address("127.0.0.1:mongo").is_err());
    }

    #[test]
    fn two_connections_to_same_address_compare_equal_but_have_distinct_identity() {
        let a = test_support::fake("127.0.0.1:27017");
        let b = test_support::fake("127.0.0.1:27017");
        assert_eq!(a, b);
        assert_ne!(a.id(), b.id());
    }
}

trait ToSocketAddrSingle {
    fn to_socket_addrs_single(&self) -> std::io::Result<std::net::SocketAddr>;
}

impl ToSocketAddrSingle for (&str, u16) {
    fn to_socket_addrs_single(&self) -> std::io::Result<std::net::SocketAddr> {
        use std::net::ToSocketAddrs;

        self.to_socket_addrs()?.next().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
        })
    }
}
