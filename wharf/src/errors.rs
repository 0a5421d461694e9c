use thiserror::Error;

/// The unified error type returned by this crate's public operations.
///
/// Variants are grouped by the taxonomy used throughout this crate's design:
/// transport, timing, routing, encoding, and lifecycle failures.
#[derive(Error, Debug)]
pub enum Error {
    /// The broker has no live connection right now. Raised synchronously;
    /// callers never suspend waiting for reconnection because of this error.
    #[error("broker is not connected")]
    BrokerNotConnected,

    /// A `Sync` call did not receive a response within its timeout.
    #[error("call timed out")]
    TimedOut,

    /// A publisher confirm came back negative (broker rejected the message).
    #[error("message was not acknowledged by the broker")]
    NotAcked,

    /// The response writer had no channel to publish the response on.
    #[error("no channel available to publish the response")]
    NilPublishChannel,

    /// The server has no handler registered for the requested method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// An [`Argument`](crate::form::Argument) could not be converted to the
    /// requested type.
    #[error("failed to cast argument to the requested type")]
    TypeCast,

    /// A request or response body could not be encoded/decoded as JSON.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// `Bind`/`Form` was used on a body whose content type is not
    /// `application/json`.
    #[error("unsupported content type for this operation: {0}")]
    UnsupportedContentType(String),

    /// The client or server has already been closed.
    #[error("operation attempted after close")]
    Closed,

    /// A lower-level AMQP operation failed.
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    /// The broker supervisor itself reported an error opening a channel.
    #[error("broker error: {0}")]
    Broker(#[from] wharf_rabbitmq::BrokerError),
}

/// A convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
