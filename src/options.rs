//! Construction options for [`crate::ConnectionPool`].

use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::error::{Error, Result};

pub(crate) const DEFAULT_MAX_POOL_SIZE: u32 = 5;

/// Options used to construct a [`crate::ConnectionPool`].
///
/// Unknown keys are not representable here; this type is exhaustive by design, and any field
/// left at its default takes the documented default behavior.
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(strip_option)))]
pub struct ConnectionPoolOptions {
    /// The maximum number of connections the pool will instantiate for all addresses combined.
    /// Defaults to 5.
    pub max_pool_size: Option<u32>,

    /// The I/O timeout forwarded to each new connection when it is opened. Left unset by
    /// default, which means connection establishment does not time out.
    pub connect_timeout: Option<Duration>,
}

impl ConnectionPoolOptions {
    /// Returns the effective max pool size (the configured value, or the default of 5),
    /// rejecting an explicit `0` since the pool must be able to create at least one connection.
    pub(crate) fn effective_max_pool_size(&self) -> Result<u32> {
        match self.max_pool_size {
            Some(0) => Err(Error::invalid_max_pool_size(0)),
            Some(max_pool_size) => Ok(max_pool_size),
            None => Ok(DEFAULT_MAX_POOL_SIZE),
        }
    }
}
