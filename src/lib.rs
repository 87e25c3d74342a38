#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::cast_possible_truncation)]

mod connection;
pub mod error;
pub mod event;
mod index;
pub mod options;
mod pinning;
mod pool;

pub use crate::{
    connection::{Connection, ThreadId},
    error::{Error, Result},
    options::ConnectionPoolOptions,
    pool::{ConnectionPool, DEFAULT_CHECKOUT_TIMEOUT},
};
