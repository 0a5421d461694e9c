use crate::errors::{Error, Result};
use crate::form::Form;
use serde::de::DeserializeOwned;

/// An immutable view of one inbound delivery, handed to a registered handler.
#[derive(Debug, Clone)]
pub struct Request {
    service: String,
    method: String,
    content_type: String,
    body: Vec<u8>,
}

impl Request {
    /// Builds a [`Request`] from its wire components.
    pub(crate) fn new(
        service: impl Into<String>,
        method: impl Into<String>,
        content_type: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            content_type: content_type.into(),
            body,
        }
    }

    /// The name of the service this request was addressed to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The method requested, taken from the `X-Method` header.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The declared content type of the body.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The raw request body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the body as JSON into `T`.
    ///
    /// Returns [`Error::UnsupportedContentType`] if the content type is not
    /// `application/json`.
    pub fn bind<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if self.content_type != "application/json" {
            return Err(Error::UnsupportedContentType(self.content_type.clone()));
        }

        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parses the body as a positional [`Form`] of JSON arguments.
    pub fn form(&self) -> Result<Form> {
        Form::new(&self.content_type, &self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: i32,
    }

    #[test]
    fn binds_json_body() {
        let request = Request::new(
            "calculator",
            "addOne",
            "application/json",
            br#"{"value":20}"#.to_vec(),
        );

        let payload: Payload = request.bind().unwrap();

        assert_eq!(payload, Payload { value: 20 });
    }

    #[test]
    fn rejects_bind_on_non_json() {
        let request = Request::new("calculator", "addOne", "text/plain", b"20".to_vec());

        assert!(request.bind::<Payload>().is_err());
    }
}
