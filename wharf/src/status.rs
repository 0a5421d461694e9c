/// HTTP-style numeric status codes used on RPC responses.
///
/// The runtime never interprets these codes itself (no redirect-following,
/// no retry-on-5xx); they are passed through as a plain integer header for
/// callers and handlers to agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// `200 OK`.
    pub const OK: StatusCode = StatusCode(200);
    /// `201 Created`.
    pub const CREATED: StatusCode = StatusCode(201);
    /// `202 Accepted`.
    pub const ACCEPTED: StatusCode = StatusCode(202);
    /// `203 Non-Authoritative Information`.
    pub const NON_AUTHORITATIVE_INFORMATION: StatusCode = StatusCode(203);
    /// `204 No Content`.
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    /// `205 Reset Content`.
    pub const RESET_CONTENT: StatusCode = StatusCode(205);
    /// `206 Partial Content`.
    pub const PARTIAL_CONTENT: StatusCode = StatusCode(206);
    /// `301 Moved Permanently`.
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);
    /// `302 Found`.
    pub const FOUND: StatusCode = StatusCode(302);
    /// `304 Not Modified`.
    pub const NOT_MODIFIED: StatusCode = StatusCode(304);
    /// `400 Bad Request`.
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    /// `401 Unauthorized`.
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    /// `403 Forbidden`.
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    /// `404 Not Found`.
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    /// `405 Method Not Allowed`.
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    /// `406 Not Acceptable`.
    pub const NOT_ACCEPTABLE: StatusCode = StatusCode(406);
    /// `409 Conflict`.
    pub const CONFLICT: StatusCode = StatusCode(409);
    /// `410 Gone`.
    pub const GONE: StatusCode = StatusCode(410);
    /// `423 Locked`.
    pub const LOCKED: StatusCode = StatusCode(423);
    /// `424 Failed Dependency`.
    pub const FAILED_DEPENDENCY: StatusCode = StatusCode(424);
    /// `428 Precondition Required`.
    pub const PRECONDITION_REQUIRED: StatusCode = StatusCode(428);
    /// `429 Too Many Requests`.
    pub const TOO_MANY_REQUESTS: StatusCode = StatusCode(429);
    /// `431 Request Header Fields Too Large`.
    pub const REQUEST_HEADER_FIELDS_TOO_LARGE: StatusCode = StatusCode(431);
    /// `451 Unavailable For Legal Reasons`.
    pub const UNAVAILABLE_FOR_LEGAL_REASONS: StatusCode = StatusCode(451);
    /// `500 Internal Server Error`.
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    /// `501 Not Implemented`.
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);
    /// `503 Service Unavailable`.
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);
    /// `507 Insufficient Storage`.
    pub const INSUFFICIENT_STORAGE: StatusCode = StatusCode(507);

    /// Returns the raw numeric code.
    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl Default for StatusCode {
    /// A fresh [`Response`](crate::Response) defaults to `200 OK`.
    fn default() -> Self {
        Self::OK
    }
}

impl From<i32> for StatusCode {
    fn from(value: i32) -> Self {
        StatusCode(value)
    }
}

impl From<StatusCode> for i32 {
    fn from(value: StatusCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_ok() {
        assert_eq!(StatusCode::default(), StatusCode::OK);
        assert_eq!(StatusCode::OK.as_i32(), 200);
    }

    #[test]
    fn round_trips_through_i32() {
        let status: StatusCode = 404.into();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(i32::from(status), 404);
    }
}
