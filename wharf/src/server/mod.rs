//! Registers handlers for remote methods and serves them over a
//! [`Broker`](wharf_rabbitmq::Broker)-managed connection.

mod job;

mod options;
pub use self::options::{ServerOptions, DEFAULT_MAX_WORKERS};

mod server;
pub use self::server::{Handler, Server};
