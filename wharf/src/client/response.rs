use crate::errors::{Error, Result};
use crate::headers::Headers;
use crate::status::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The response to a completed remote call, delivered through a [`Slot`](super::Slot).
#[derive(Debug, Clone)]
pub struct ClientResponse {
    status_code: StatusCode,
    headers: Headers,
    content_type: String,
    body: Vec<u8>,
}

impl ClientResponse {
    pub(crate) fn new(
        status_code: StatusCode,
        headers: Headers,
        content_type: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            status_code,
            headers,
            content_type: content_type.into(),
            body,
        }
    }

    /// The status code set by the remote handler.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// The headers set by the remote handler.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The declared content type of the response body.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The raw response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the response body as JSON into `T`.
    ///
    /// Returns [`Error::UnsupportedContentType`] if the content type is not
    /// `application/json`.
    pub fn unmarshal_json_to<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if self.content_type != "application/json" {
            return Err(Error::UnsupportedContentType(self.content_type.clone()));
        }

        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decodes the response body as a loosely-typed JSON [`Value`].
    pub fn unmarshal_json(&self) -> Result<Value> {
        self.unmarshal_json_to()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn unmarshals_json_body() {
        let response = ClientResponse::new(
            StatusCode::OK,
            Headers::new(),
            "application/json",
            br#"{"value":21}"#.to_vec(),
        );

        assert_eq!(response.unmarshal_json().unwrap(), json!({"value": 21}));
    }

    #[test]
    fn rejects_unmarshal_on_non_json() {
        let response = ClientResponse::new(StatusCode::OK, Headers::new(), "text/plain", b"21".to_vec());

        assert!(matches!(
            response.unmarshal_json(),
            Err(Error::UnsupportedContentType(_))
        ));
    }
}
