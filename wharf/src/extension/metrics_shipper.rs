use super::Extension;
use crate::request::Request;
use crate::response::Response;
use crate::status::StatusCode;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use wharf_rabbitmq::Broker;

const METRICS_QUEUE_NAME: &str = "porthos.metrics";

#[derive(Debug, Serialize)]
struct MetricEntry {
    service_name: String,
    method_name: String,
    response_time_ms: f64,
    status_code: i32,
}

/// A fixed-capacity buffer of [`MetricEntry`] values, split out from
/// [`MetricsShipper`] so the fill/drain invariant can be unit-tested without
/// a broker: pushing returns the drained batch exactly when the buffer has
/// just reached `size`, and resets to empty afterwards.
struct MetricBuffer {
    size: usize,
    entries: Mutex<Vec<MetricEntry>>,
}

impl MetricBuffer {
    fn new(size: usize) -> Self {
        let size = size.max(1);

        Self {
            size,
            entries: Mutex::new(Vec::with_capacity(size)),
        }
    }

    fn push_and_drain_if_full(&self, entry: MetricEntry) -> Option<Vec<MetricEntry>> {
        let mut entries = self.entries.lock().unwrap();
        entries.push(entry);

        if entries.len() >= self.size {
            Some(std::mem::replace(&mut *entries, Vec::with_capacity(self.size)))
        } else {
            None
        }
    }
}

/// Buffers response-time metrics and ships them to a durable `porthos.metrics`
/// queue once the buffer fills up.
pub struct MetricsShipper {
    broker: Broker,
    buffer: MetricBuffer,
}

impl MetricsShipper {
    /// Creates a new metrics-shipping extension that buffers up to
    /// `buffer_size` entries before publishing them as a single JSON array.
    pub fn new(broker: Broker, buffer_size: usize) -> Self {
        Self {
            broker,
            buffer: MetricBuffer::new(buffer_size),
        }
    }
}

impl Extension for MetricsShipper {
    fn outgoing_response(&self, request: &Request, _response: &Response, elapsed: Duration, status_code: StatusCode) {
        let entry = MetricEntry {
            service_name: request.service().to_string(),
            method_name: request.method().to_string(),
            response_time_ms: elapsed.as_secs_f64() * 1000.0,
            status_code: status_code.as_i32(),
        };

        if let Some(entries) = self.buffer.push_and_drain_if_full(entry) {
            let broker = self.broker.clone();
            tokio::spawn(ship_metrics(broker, entries));
        }
    }
}

async fn ship_metrics(broker: Broker, entries: Vec<MetricEntry>) {
    debug!(count = entries.len(), "Shipping metrics to broker");

    let payload = match serde_json::to_vec(&entries) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(?error, error_message = %error, "Failed to encode metrics payload");
            return;
        }
    };

    let channel = match broker.open_channel().await {
        Ok(channel) => channel,
        Err(error) => {
            warn!(?error, error_message = %error, "Failed to open a channel for the metrics shipper");
            return;
        }
    };

    if let Err(error) = channel
        .queue_declare(
            METRICS_QUEUE_NAME,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
    {
        warn!(?error, error_message = %error, "Failed to declare the metrics queue");
        return;
    }

    if let Err(error) = channel
        .basic_publish(
            "",
            METRICS_QUEUE_NAME,
            BasicPublishOptions::default(),
            &payload,
            lapin::BasicProperties::default().with_content_type("application/json".into()),
        )
        .await
    {
        warn!(?error, error_message = %error, "Failed to publish metrics to the broker");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(n: usize) -> MetricEntry {
        MetricEntry {
            service_name: "calculator".to_string(),
            method_name: "add".to_string(),
            response_time_ms: n as f64,
            status_code: 200,
        }
    }

    #[test]
    fn drains_exactly_every_buffer_size_pushes() {
        let buffer = MetricBuffer::new(2);
        let mut drains = 0;

        for n in 1..=6 {
            match buffer.push_and_drain_if_full(entry(n)) {
                Some(drained) => {
                    drains += 1;
                    assert_eq!(drained.len(), 2);
                }
                None => panic!("push {n} should have filled the buffer"),
            }
        }

        assert_eq!(drains, 3);
    }

    #[test]
    fn a_partial_buffer_does_not_drain() {
        let buffer = MetricBuffer::new(2);

        assert!(buffer.push_and_drain_if_full(entry(1)).is_none());
    }

    #[test]
    fn the_next_push_after_a_drain_starts_a_fresh_buffer() {
        let buffer = MetricBuffer::new(2);

        for n in 1..=6 {
            buffer.push_and_drain_if_full(entry(n));
        }

        assert!(buffer.push_and_drain_if_full(entry(7)).is_none());
    }
}
