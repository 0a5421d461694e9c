use super::call::Call;
use super::response::ClientResponse;
use super::slot::Registry;
use crate::errors::Result;
use crate::headers::Headers;
use crate::status::StatusCode;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::select;
use tracing::{debug, warn};
use wharf_core::{AppContext, AppSpindown, AppSpindownToken};
use wharf_rabbitmq::Broker;
use futures::StreamExt;

/// An entry point for making remote calls against a service.
///
/// A [`Client`] owns a private, exclusive reply queue and a long-lived
/// background task that consumes it, matching incoming replies to pending
/// [`Slot`](super::Slot)s by correlation id. The consumer task restarts its
/// subscription whenever the underlying [`Broker`] reconnects.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    service_name: String,
    default_ttl: Duration,
    reply_queue_name: String,
    broker: Broker,
    registry: Arc<Registry>,
    closed: AtomicBool,
    _spindown_token: AppSpindownToken,
}

impl Client {
    /// Creates a new [`Client`] for the given service, with the given default
    /// call timeout, and starts its background reply consumer.
    pub async fn new(broker: Broker, service_name: impl Into<String>, default_ttl: Duration) -> Result<Self> {
        let service_name = service_name.into();
        let reply_queue_name = Self::compose_reply_queue_name(&service_name);

        let inner = Arc::new(Inner {
            _spindown_token: AppSpindown::register(format!("{service_name}-client")),
            service_name,
            default_ttl,
            reply_queue_name,
            broker,
            registry: Arc::new(Registry::new()),
            closed: AtomicBool::new(false),
        });

        let client = Self { inner };

        tokio::spawn(client.clone().run_reply_consumer());

        Ok(client)
    }

    fn compose_reply_queue_name(service_name: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        format!("{service_name}@{nanos}-wharf")
    }

    /// Prepares a remote call of the given method.
    pub fn call(&self, method: impl Into<String>) -> Call<'_> {
        Call::new(self, method)
    }

    /// Closes the client. Its reply consumer task stops on its next
    /// reconnect check; any calls made afterwards fail synchronously.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub(crate) fn broker(&self) -> &Broker {
        &self.inner.broker
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub(crate) fn reply_queue_name(&self) -> &str {
        &self.inner.reply_queue_name
    }

    pub(crate) fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    pub(crate) fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Runs for the lifetime of the client: consumes the reply queue,
    /// restarting the subscription whenever the connection drops and comes
    /// back, until the client is closed or the application terminates.
    async fn run_reply_consumer(self) {
        loop {
            if self.is_closed() || AppContext::is_terminated() {
                break;
            }

            if !self.inner.broker.is_connected() {
                let mut watcher = self.inner.broker.notify_reestablish();

                select! {
                    biased;
                    _ = AppContext::terminated() => break,
                    _ = watcher.next() => {}
                }

                continue;
            }

            if let Err(error) = self.consume_replies_once().await {
                warn!(
                    service = self.inner.service_name,
                    ?error,
                    error_message = %error,
                    "Reply consumer stopped unexpectedly, will retry once reconnected",
                );
            }

            select! {
                biased;
                _ = AppContext::terminated() => break,
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        }

        debug!(service = self.inner.service_name, "Reply consumer stopped");
    }

    async fn consume_replies_once(&self) -> Result<()> {
        let channel = self.inner.broker.open_channel().await?;

        let queue = channel
            .queue_declare(
                &self.inner.reply_queue_name,
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: false,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        let mut consumer = channel
            .basic_consume(
                queue.name().as_str(),
                "",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery?;
            delivery.ack(BasicAckOptions::default()).await?;

            let correlation_id = delivery
                .properties
                .correlation_id()
                .as_ref()
                .map(|id| id.as_str().to_string())
                .unwrap_or_default();

            let status_code = Self::extract_status_code(&delivery.properties);
            let headers = Self::extract_headers(&delivery.properties);
            let content_type = delivery
                .properties
                .content_type()
                .as_ref()
                .map(|ct| ct.as_str().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let response = ClientResponse::new(status_code, headers, content_type, delivery.data);

            if !self.inner.registry.deliver(&correlation_id, response) {
                warn!(correlation_id, "Received a reply for an unknown or disposed call");
            }
        }

        Ok(())
    }

    fn extract_status_code(properties: &lapin::BasicProperties) -> StatusCode {
        properties
            .headers()
            .as_ref()
            .and_then(|headers| headers.inner().get("statusCode"))
            .and_then(Self::amqp_value_as_i32)
            .map(StatusCode)
            .unwrap_or(StatusCode::OK)
    }

    fn extract_headers(properties: &lapin::BasicProperties) -> Headers {
        match properties.headers() {
            Some(headers) => headers
                .inner()
                .iter()
                .filter(|(key, _)| key.as_str() != "statusCode")
                .map(|(key, value)| (key.to_string(), Self::amqp_value_as_json(value)))
                .collect(),
            None => Headers::new(),
        }
    }

    fn amqp_value_as_i32(value: &AMQPValue) -> Option<i32> {
        match value {
            AMQPValue::LongInt(value) => Some(*value),
            AMQPValue::ShortInt(value) => Some(*value as i32),
            AMQPValue::ShortShortInt(value) => Some(*value as i32),
            _ => None,
        }
    }

    fn amqp_value_as_json(value: &AMQPValue) -> Value {
        match value {
            AMQPValue::LongString(value) => Value::String(value.to_string()),
            AMQPValue::ShortString(value) => Value::String(value.to_string()),
            AMQPValue::LongInt(value) => Value::from(*value),
            AMQPValue::ShortInt(value) => Value::from(*value),
            AMQPValue::ShortShortInt(value) => Value::from(*value),
            AMQPValue::LongLongInt(value) => Value::from(*value),
            AMQPValue::Boolean(value) => Value::from(*value),
            AMQPValue::Double(value) => Value::from(*value),
            AMQPValue::Float(value) => Value::from(*value),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn reply_queue_names_are_unique_per_service() {
        let a = Client::compose_reply_queue_name("calculator");
        let b = Client::compose_reply_queue_name("calculator");

        assert_ne!(a, b);
        assert!(a.starts_with("calculator@"));
        assert!(a.ends_with("-wharf"));
    }

    #[test]
    fn amqp_value_as_i32_reads_integers() {
        assert_eq!(Client::amqp_value_as_i32(&AMQPValue::LongInt(404)), Some(404));
        assert_eq!(Client::amqp_value_as_i32(&AMQPValue::Boolean(true)), None);
    }
}
