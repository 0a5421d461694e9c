use super::Extension;
use crate::errors::Result;
use crate::server::Server;
use crate::spec::MethodSpec;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;
use wharf_rabbitmq::Broker;

const SPECS_QUEUE_NAME: &str = "porthos.specs";

#[derive(Debug, Serialize)]
struct SpecEntry<'a> {
    service: &'a str,
    specs: &'a HashMap<String, MethodSpec>,
}

/// Ships every registered [`MethodSpec`](crate::spec::MethodSpec) to a
/// durable `porthos.specs` queue whenever the server starts (re-)serving.
pub struct SpecShipper {
    broker: Broker,
}

impl SpecShipper {
    /// Creates a new spec-shipping extension.
    pub fn new(broker: Broker) -> Self {
        Self { broker }
    }
}

impl Extension for SpecShipper {
    fn server_listening(&self, server: &Server) -> Result<()> {
        let broker = self.broker.clone();
        let service = server.service_name().to_string();
        let specs = server.specs();

        tokio::spawn(async move {
            if let Err(error) = ship_specs(broker, &service, &specs).await {
                warn!(?error, error_message = %error, "Failed to ship method specs to the broker");
            }
        });

        Ok(())
    }
}

async fn ship_specs(broker: Broker, service: &str, specs: &HashMap<String, MethodSpec>) -> Result<()> {
    let channel = broker.open_channel().await?;

    channel
        .queue_declare(
            SPECS_QUEUE_NAME,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    let payload = serde_json::to_vec(&SpecEntry { service, specs })?;

    channel
        .basic_publish(
            "",
            SPECS_QUEUE_NAME,
            BasicPublishOptions::default(),
            &payload,
            lapin::BasicProperties::default().with_content_type("application/json".into()),
        )
        .await?;

    Ok(())
}
