use super::client::Client;
use super::response::ClientResponse;
use super::slot::Slot;
use crate::correlation::new_correlation_id;
use crate::errors::{Error, Result};
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::BasicProperties;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// A single, in-flight remote call under construction.
///
/// Built via [`Client::call`], configured with the `with_*` methods, and
/// dispatched with exactly one of [`send_async`](Call::send_async),
/// [`send_sync`](Call::send_sync), or [`send_void`](Call::send_void).
pub struct Call<'a> {
    client: &'a Client,
    method: String,
    timeout: Option<Duration>,
    body: Vec<u8>,
    content_type: String,
}

impl<'a> Call<'a> {
    pub(crate) fn new(client: &'a Client, method: impl Into<String>) -> Self {
        Self {
            client,
            method: method.into(),
            timeout: None,
            body: Vec::new(),
            content_type: "application/json".to_string(),
        }
    }

    /// Overrides the client's default timeout for this call only.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the raw request body, with content type `application/octet-stream`.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.content_type = "application/octet-stream".to_string();
        self
    }

    /// Sets the raw request body with an explicit content type.
    pub fn with_body_content_type(mut self, body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        self.body = body.into();
        self.content_type = content_type.into();
        self
    }

    /// Sets the request body to the JSON encoding of a positional argument
    /// array.
    pub fn with_args(self, args: impl Serialize) -> Result<Self> {
        self.with_json(&args)
    }

    /// Sets the request body to the JSON encoding of a string-keyed map.
    pub fn with_map(self, map: impl Serialize) -> Result<Self> {
        self.with_json(&map)
    }

    /// Sets the request body to the JSON encoding of an arbitrary struct.
    pub fn with_struct(self, value: &impl Serialize) -> Result<Self> {
        self.with_json(value)
    }

    fn with_json(mut self, value: &impl Serialize) -> Result<Self> {
        self.body = serde_json::to_vec(value)?;
        self.content_type = "application/json".to_string();
        Ok(self)
    }

    fn timeout(&self) -> Duration {
        self.timeout.unwrap_or_else(|| self.client.default_ttl())
    }

    /// Dispatches the call and returns a [`Slot`] to await the response on,
    /// without blocking for it.
    ///
    /// Returns [`Error::Closed`] if the client has been closed,
    /// [`Error::BrokerNotConnected`] synchronously if the client's broker has
    /// no live connection, and [`Error::NotAcked`] if the broker rejects the
    /// publish (via publisher confirms).
    pub async fn send_async(self) -> Result<Slot> {
        if self.client.is_closed() {
            return Err(Error::Closed);
        }

        if !self.client.broker().is_connected() {
            return Err(Error::BrokerNotConnected);
        }

        let correlation_id: Arc<str> = Arc::from(new_correlation_id());
        let (sender, receiver) = oneshot::channel();
        self.client.registry().insert(correlation_id.to_string(), sender);

        let channel = self.client.broker().open_channel().await?;
        channel.confirm_select(ConfirmSelectOptions::default()).await?;

        let mut headers = FieldTable::default();
        headers.insert("X-Method".into(), AMQPValue::LongString(self.method.as_str().into()));

        let properties = BasicProperties::default()
            .with_correlation_id(correlation_id.as_ref().into())
            .with_reply_to(self.client.reply_queue_name().into())
            .with_content_type(self.content_type.as_str().into())
            .with_expiration(self.timeout().as_millis().to_string().into())
            .with_headers(headers);

        let confirm = channel
            .basic_publish(
                "",
                self.client.service_name(),
                BasicPublishOptions::default(),
                &self.body,
                properties,
            )
            .await?;

        let confirmation = confirm.await?;

        if !confirmation.is_ack() {
            self.client.registry().remove(&correlation_id);
            return Err(Error::NotAcked);
        }

        Ok(Slot::new(correlation_id, receiver, self.client.registry().clone()))
    }

    /// Dispatches the call and blocks until the response arrives or the
    /// effective timeout elapses.
    pub async fn send_sync(self) -> Result<ClientResponse> {
        let timeout = self.timeout();
        let slot = self.send_async().await?;

        match tokio::time::timeout(timeout, slot.response()).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(Error::TimedOut),
            Err(_) => Err(Error::TimedOut),
        }
    }

    /// Dispatches a fire-and-forget call: no correlation id, no reply-to, no
    /// expiration, and no registered slot. The remote side's response, if
    /// any, is discarded.
    ///
    /// Returns [`Error::Closed`] if the client has been closed.
    pub async fn send_void(self) -> Result<()> {
        if self.client.is_closed() {
            return Err(Error::Closed);
        }

        if !self.client.broker().is_connected() {
            return Err(Error::BrokerNotConnected);
        }

        let channel = self.client.broker().open_channel().await?;

        let mut headers = FieldTable::default();
        headers.insert("X-Method".into(), AMQPValue::LongString(self.method.as_str().into()));

        let properties = BasicProperties::default()
            .with_content_type(self.content_type.as_str().into())
            .with_headers(headers);

        channel
            .basic_publish(
                "",
                self.client.service_name(),
                BasicPublishOptions::default(),
                &self.body,
                properties,
            )
            .await?;

        Ok(())
    }
}

// `Call`'s send_* methods talk to a real `lapin::Channel` end to end (confirm
// select, publish, await confirmation), so they're exercised against a live
// broker rather than unit-tested here; `timeout()`'s fallback-to-default
// logic and the body/content-type builders are plain enough not to need
// their own broker-less tests.
