use crate::headers::Headers;
use crate::status::StatusCode;
use serde::Serialize;

/// A mutable builder for the response a handler produces.
///
/// A fresh [`Response`] defaults to [`StatusCode::OK`], no headers, an empty
/// body, and content type `application/json`.
#[derive(Debug, Clone)]
pub struct Response {
    status_code: StatusCode,
    headers: Headers,
    content_type: String,
    body: Vec<u8>,
}

impl Response {
    /// Creates a fresh, default response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status code.
    pub fn set_status_code(&mut self, status_code: impl Into<StatusCode>) -> &mut Self {
        self.status_code = status_code.into();
        self
    }

    /// Sets the body and content type to the JSON encoding of `value`.
    pub fn set_json(&mut self, value: &impl Serialize) -> serde_json::Result<&mut Self> {
        self.body = serde_json::to_vec(value)?;
        self.content_type = "application/json".to_string();
        Ok(self)
    }

    /// Sets the raw body and its content type.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> &mut Self {
        self.body = body.into();
        self.content_type = content_type.into();
        self
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Returns a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status_code: StatusCode::default(),
            headers: Headers::default(),
            content_type: "application/json".to_string(),
            body: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn defaults_to_ok_with_json_content_type() {
        let response = Response::new();

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.content_type(), "application/json");
        assert!(response.body().is_empty());
    }

    #[test]
    fn set_json_encodes_body() {
        let mut response = Response::new();
        response.set_json(&json!({"value": 21})).unwrap();

        assert_eq!(response.body(), br#"{"value":21}"#);
    }
}
