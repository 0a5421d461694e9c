use super::job::{run_worker, Job};
use super::options::ServerOptions;
use crate::errors::{Error, Result};
use crate::extension::Extension;
use crate::request::Request;
use crate::response::Response;
use crate::spec::MethodSpec;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicRejectOptions, ConfirmSelectOptions,
    QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::BasicProperties;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;
use tokio::select;
use tracing::{info, warn};
use wharf_core::{AppContext, AppSpindown, AppSpindownToken};
use wharf_rabbitmq::Broker;
use wharf_sync::{Conduit, Signal, Watcher};
use futures::StreamExt;

/// A registered remote method handler.
///
/// Invoked synchronously inside a worker; any asynchronous work a handler
/// needs to perform should be spawned separately.
pub type Handler = Arc<dyn Fn(&Request, &mut Response) + Send + Sync>;

/// Registers handlers for remote methods and serves them over a
/// [`Broker`]-managed RabbitMQ connection.
///
/// A [`Server`] owns a fixed-size pool of worker tasks (see
/// [`ServerOptions::with_max_workers`]) fed through a "channel of channels"
/// ([`Conduit`]): incoming deliveries are handed off to whichever worker
/// asks for work next, which bounds concurrent handler execution to the
/// pool size regardless of how fast requests arrive.
///
/// Re-sets up its topology (queue + consumer) every time the broker
/// reconnects.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

struct Inner {
    broker: Broker,
    service_name: String,
    options: ServerOptions,
    methods: SyncMutex<HashMap<String, Handler>>,
    specs: SyncMutex<HashMap<String, MethodSpec>>,
    extensions: SyncMutex<Vec<Arc<dyn Extension>>>,
    job_conduit: Conduit<Job>,
    closed: AtomicBool,
    close_signal: Signal<bool>,
    _spindown_token: AppSpindownToken,
}

impl Server {
    /// Creates a new server for `service_name`, sets up its topology, and
    /// starts its worker pool and serve loop in the background.
    pub async fn new(broker: Broker, service_name: impl Into<String>, options: ServerOptions) -> Result<Self> {
        let service_name = service_name.into();

        let inner = Arc::new(Inner {
            _spindown_token: AppSpindown::register(format!("{service_name}-server")),
            broker,
            options,
            methods: SyncMutex::new(HashMap::new()),
            specs: SyncMutex::new(HashMap::new()),
            extensions: SyncMutex::new(Vec::new()),
            job_conduit: Conduit::new(),
            closed: AtomicBool::new(false),
            close_signal: Signal::new(),
            service_name,
        });

        let server = Self { inner };

        for _ in 0..server.inner.options.max_workers() {
            tokio::spawn(run_worker(server.inner.job_conduit.retriever()));
        }

        tokio::spawn(server.clone().run_serve_loop());

        Ok(server)
    }

    /// The name of the service this server answers requests for.
    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Registers a method and its handler.
    pub fn register(&self, method: impl Into<String>, handler: impl Fn(&Request, &mut Response) + Send + Sync + 'static) {
        self.inner
            .methods
            .lock()
            .unwrap()
            .insert(method.into(), Arc::new(handler));
    }

    /// Registers a method, its handler, and its [`MethodSpec`].
    pub fn register_with_spec(
        &self,
        method: impl Into<String>,
        handler: impl Fn(&Request, &mut Response) + Send + Sync + 'static,
        spec: MethodSpec,
    ) {
        let method = method.into();
        self.inner.specs.lock().unwrap().insert(method.clone(), spec);
        self.register(method, handler);
    }

    /// Registers an [`Extension`] to observe this server's lifecycle and
    /// traffic.
    pub fn add_extension(&self, extension: Arc<dyn Extension>) {
        self.inner.extensions.lock().unwrap().push(extension);
    }

    /// Returns a snapshot of all registered method specs.
    pub fn specs(&self) -> HashMap<String, MethodSpec> {
        self.inner.specs.lock().unwrap().clone()
    }

    pub(crate) fn extensions_snapshot(&self) -> Vec<Arc<dyn Extension>> {
        self.inner.extensions.lock().unwrap().clone()
    }

    /// Closes the server: it stops consuming new requests. In-flight jobs
    /// already handed to a worker are allowed to finish.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Registers a subscriber notified once when the server closes.
    pub fn notify_close(&self) -> Watcher<bool> {
        self.inner.close_signal.watch()
    }

    /// Suspends the caller until the server closes, mirroring a
    /// blocking "serve forever" call.
    pub async fn wait_until_closed(&self) {
        let mut watcher = self.notify_close();
        watcher.next().await;
    }

    async fn run_serve_loop(self) {
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

            if let Err(error) = self.setup_topology_and_consume().await {
                warn!(
                    service = self.inner.service_name,
                    ?error,
                    error_message = %error,
                    "Server stopped consuming unexpectedly, will retry once reconnected",
                );
            }

            select! {
                biased;
                _ = AppContext::terminated() => break,
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        }

        self.inner.close_signal.notify(true);
    }

    async fn setup_topology_and_consume(&self) -> Result<()> {
        let channel = self.inner.broker.open_channel().await?;

        channel
            .queue_declare(
                &self.inner.service_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        let mut consumer = channel
            .basic_consume(
                &self.inner.service_name,
                "",
                BasicConsumeOptions {
                    no_ack: self.inner.options.auto_ack(),
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.announce_listening();

        info!(
            service = self.inner.service_name,
            "Connected to the broker and waiting for incoming RPC requests",
        );

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery?;
            let server = self.clone();
            tokio::spawn(async move { server.process_request(delivery).await });
        }

        Ok(())
    }

    fn announce_listening(&self) {
        for extension in self.extensions_snapshot() {
            if let Err(error) = extension.server_listening(self) {
                warn!(?error, error_message = %error, "Extension failed its server_listening hook");
            }
        }
    }

    async fn process_request(&self, delivery: Delivery) {
        let method_name = Self::extract_method(&delivery.properties).unwrap_or_default();
        let handler = self.inner.methods.lock().unwrap().get(&method_name).cloned();

        match handler {
            Some(handler) => {
                let content_type = delivery
                    .properties
                    .content_type()
                    .as_ref()
                    .map(|ct| ct.as_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let request = Request::new(
                    self.inner.service_name.clone(),
                    method_name,
                    content_type,
                    delivery.data.clone(),
                );

                let sender = self.inner.job_conduit.requested().await;

                let job = Job {
                    server: self.clone(),
                    handler,
                    request,
                    delivery,
                };

                let _ = sender.send(job);
            }
            None => {
                if !self.inner.options.auto_ack() {
                    let _ = delivery.reject(BasicRejectOptions::default()).await;
                }

                let error = Error::MethodNotFound(method_name);
                warn!(?error, error_message = %error, "No handler registered for method");
            }
        }
    }

    pub(crate) async fn write_response(&self, delivery: &Delivery, mut response: Response) -> Result<()> {
        let channel = self.inner.broker.open_channel().await?;
        channel.confirm_select(ConfirmSelectOptions::default()).await?;

        response.headers_mut().set("statusCode", response.status_code().as_i32());

        let mut headers = FieldTable::default();
        for (key, value) in response.headers().as_map() {
            headers.insert(key.as_str().into(), Self::json_to_amqp_value(value));
        }

        let reply_to = delivery
            .properties
            .reply_to()
            .as_ref()
            .map(|reply_to| reply_to.as_str())
            .ok_or(Error::NilPublishChannel)?;

        let properties = BasicProperties::default()
            .with_content_type(response.content_type().into())
            .with_headers(headers);

        let properties = match delivery.properties.correlation_id().as_ref() {
            Some(correlation_id) => properties.with_correlation_id(correlation_id.clone()),
            None => properties,
        };

        let confirm = channel
            .basic_publish(
                "",
                reply_to,
                BasicPublishOptions::default(),
                response.body(),
                properties,
            )
            .await?;

        if !self.inner.options.auto_ack() {
            delivery.ack(BasicAckOptions::default()).await?;
        }

        let confirmation = confirm.await?;

        if !confirmation.is_ack() {
            return Err(Error::NotAcked);
        }

        Ok(())
    }

    fn extract_method(properties: &BasicProperties) -> Option<String> {
        let headers = properties.headers().as_ref()?;
        let value = headers.inner().get("X-Method")?;

        match value {
            AMQPValue::LongString(value) => Some(value.to_string()),
            AMQPValue::ShortString(value) => Some(value.to_string()),
            _ => None,
        }
    }

    fn json_to_amqp_value(value: &serde_json::Value) -> AMQPValue {
        match value {
            serde_json::Value::String(value) => AMQPValue::LongString(value.as_str().into()),
            serde_json::Value::Bool(value) => AMQPValue::Boolean(*value),
            serde_json::Value::Number(value) if value.is_i64() => {
                AMQPValue::LongInt(value.as_i64().unwrap_or_default() as i32)
            }
            serde_json::Value::Number(value) => AMQPValue::Double(value.as_f64().unwrap_or_default()),
            other => AMQPValue::LongString(other.to_string().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extract_method_reads_x_method_header() {
        let mut headers = FieldTable::default();
        headers.insert("X-Method".into(), AMQPValue::LongString("addOne".into()));

        let properties = BasicProperties::default().with_headers(headers);

        assert_eq!(Server::extract_method(&properties), Some("addOne".to_string()));
    }

    #[test]
    fn extract_method_is_none_without_the_header() {
        let properties = BasicProperties::default();

        assert_eq!(Server::extract_method(&properties), None);
    }
}
