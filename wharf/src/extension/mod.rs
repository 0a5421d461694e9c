//! Hooks that observe a [`Server`](crate::server::Server)'s lifecycle and
//! traffic, registered via [`Server::add_extension`](crate::server::Server::add_extension).

mod access_log;
pub use self::access_log::AccessLog;

mod metrics_shipper;
pub use self::metrics_shipper::MetricsShipper;

mod spec_shipper;
pub use self::spec_shipper::SpecShipper;

use crate::errors::Result;
use crate::request::Request;
use crate::response::Response;
use crate::server::Server;
use crate::status::StatusCode;
use std::time::Duration;

/// An observer piped through a server's lifecycle and every request it
/// processes.
///
/// All three hooks have default no-op implementations, so an extension only
/// needs to implement the ones it cares about.
pub trait Extension: Send + Sync {
    /// Called once the server starts (re-)serving requests, including after
    /// every reconnect.
    fn server_listening(&self, _server: &Server) -> Result<()> {
        Ok(())
    }

    /// Called for every request, before its handler runs.
    fn incoming_request(&self, _request: &Request) {}

    /// Called for every request, after its handler has run and a response
    /// has been produced (not necessarily yet written to the wire).
    fn outgoing_response(
        &self,
        _request: &Request,
        _response: &Response,
        _elapsed: Duration,
        _status_code: StatusCode,
    ) {
    }
}
