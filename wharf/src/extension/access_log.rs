use super::Extension;
use crate::request::Request;
use crate::response::Response;
use crate::status::StatusCode;
use std::time::Duration;
use tracing::info;

/// Logs every incoming request and outgoing response as a structured
/// `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessLog;

impl AccessLog {
    /// Creates a new access-log extension.
    pub fn new() -> Self {
        Self
    }
}

impl Extension for AccessLog {
    fn incoming_request(&self, request: &Request) {
        info!(
            method = request.method(),
            service = request.service(),
            content_type = request.content_type(),
            "Incoming RPC request",
        );
    }

    fn outgoing_response(&self, request: &Request, _response: &Response, elapsed: Duration, status_code: StatusCode) {
        info!(
            method = request.method(),
            service = request.service(),
            status_code = status_code.as_i32(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Outgoing RPC response",
        );
    }
}
