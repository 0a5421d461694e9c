#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// The unified error type and result alias used throughout this crate.
mod errors;
pub use self::errors::{Error, Result};

/// HTTP-style status codes attached to responses.
mod status;
pub use self::status::StatusCode;

/// The header map attached to requests and responses.
mod headers;
pub use self::headers::Headers;

/// Positional-argument decoding for request bodies that are JSON arrays.
mod form;
pub use self::form::{Argument, Form};

/// The inbound view of a single delivery, handed to a registered handler.
mod request;
pub use self::request::Request;

/// The mutable response a handler builds up.
mod response;
pub use self::response::Response;

/// Structural descriptions of a method's request/response bodies, published
/// to the broker by [`extension::SpecShipper`].
mod spec;
pub use self::spec::{FieldKind, FieldSpec, MethodSpec};

/// Generates the correlation ids used to match replies to pending calls.
mod correlation;
pub use self::correlation::new_correlation_id;

/// Implements the calling side of the runtime: [`Client`], [`Call`], and the
/// machinery that matches replies to pending calls.
pub mod client;
pub use self::client::{Call, Client, ClientResponse, Slot};

/// Implements the serving side of the runtime: [`Server`] and its worker
/// pool.
pub mod server;
pub use self::server::{Server, ServerOptions};

/// Observers piped through a server's lifecycle and traffic.
pub mod extension;
pub use self::extension::{AccessLog, Extension, MetricsShipper, SpecShipper};

/// Re-exports the public API of `wharf-core` for convenience: this is the
/// shutdown/spindown integration used by both [`Client`] and [`Server`].
pub use wharf_core as core;

/// Re-exports the public API of `wharf-rabbitmq` for convenience: this is
/// the [`Broker`](wharf_rabbitmq::Broker) both [`Client::new`] and
/// [`Server::new`] are built on.
pub use wharf_rabbitmq as rabbitmq;
