#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes an application configuration section.
mod config;
pub use self::config::BrokerConfig;

/// Exposes a handle for defining a set of connection credentials.
mod handle;
pub use self::handle::{DsnChunks, Handle, HandleCollection};

/// Exposes the supervised connection to a RabbitMQ cluster.
mod broker;
pub use self::broker::{Broker, BrokerError};

/// Re-exports the `wharf_shutdown` function to facilitate stand-alone usage of
/// this crate.
///
/// When using this crate without the rest of the `wharf` family, await on
/// this function as a last thing before completing the main application
/// logic.
pub use wharf_core::wharf_shutdown;
