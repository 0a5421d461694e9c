use super::response::ClientResponse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// The pending-call registry shared by a [`Client`](super::Client) and every
/// [`Slot`] it has handed out.
///
/// Keyed by correlation id. Delivering a reply and disposing of a slot are
/// both expressed as removal from this map, so a reply that arrives after its
/// slot has been disposed (e.g. because it already timed out) finds nothing
/// to deliver to and is simply dropped, rather than racing a flag.
pub(crate) struct Registry {
    pending: Mutex<HashMap<String, oneshot::Sender<ClientResponse>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, correlation_id: String, sender: oneshot::Sender<ClientResponse>) {
        self.pending.lock().unwrap().insert(correlation_id, sender);
    }

    pub(crate) fn remove(&self, correlation_id: &str) {
        self.pending.lock().unwrap().remove(correlation_id);
    }

    /// Hands a response to the slot registered under `correlation_id`.
    ///
    /// Returns `false` if no slot is registered under that id (already
    /// disposed, timed out, or the id is unknown), in which case the caller
    /// should log and drop the reply.
    pub(crate) fn deliver(&self, correlation_id: &str, response: ClientResponse) -> bool {
        let sender = self.pending.lock().unwrap().remove(correlation_id);

        match sender {
            Some(sender) => sender.send(response).is_ok(),
            None => false,
        }
    }
}

/// A single pending remote call, obtained from [`Call::send_async`](super::Call::send_async).
///
/// Holds the one-shot response channel for this call's correlation id. A
/// [`Slot`] is disposed automatically when dropped, so a caller who never
/// awaits [`response`](Slot::response) (e.g. because a timeout already fired)
/// still frees its registry entry.
pub struct Slot {
    correlation_id: Arc<str>,
    receiver: Option<oneshot::Receiver<ClientResponse>>,
    registry: Arc<Registry>,
}

impl Slot {
    pub(crate) fn new(
        correlation_id: Arc<str>,
        receiver: oneshot::Receiver<ClientResponse>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            correlation_id,
            receiver: Some(receiver),
            registry,
        }
    }

    /// The correlation id this slot is registered under.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Waits for the response to arrive, consuming the slot.
    ///
    /// Returns `None` if the registry entry was disposed (or the client
    /// dropped) before a response arrived.
    pub async fn response(mut self) -> Option<ClientResponse> {
        self.receiver.take()?.await.ok()
    }

    /// Disposes of this slot's registry entry ahead of time.
    ///
    /// Idempotent: calling this more than once (or letting the slot drop
    /// afterwards) has no additional effect.
    pub fn dispose(&self) {
        self.registry.remove(&self.correlation_id);
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::Headers;
    use crate::status::StatusCode;
    use pretty_assertions::assert_eq;

    fn response(value: i32) -> ClientResponse {
        ClientResponse::new(StatusCode::OK, Headers::new(), "application/json", value.to_string().into_bytes())
    }

    #[tokio::test]
    async fn delivers_response_to_waiting_slot() {
        let registry = Arc::new(Registry::new());
        let (tx, rx) = oneshot::channel();
        registry.insert("abc".to_string(), tx);

        let slot = Slot::new(Arc::from("abc"), rx, registry.clone());

        assert!(registry.deliver("abc", response(42)));

        let received = slot.response().await.unwrap();
        assert_eq!(received.body(), b"42");
    }

    #[tokio::test]
    async fn delivery_to_unknown_correlation_id_is_a_no_op() {
        let registry = Registry::new();

        assert!(!registry.deliver("missing", response(1)));
    }

    #[tokio::test]
    async fn disposing_a_slot_drops_late_deliveries() {
        let registry = Arc::new(Registry::new());
        let (tx, rx) = oneshot::channel();
        registry.insert("abc".to_string(), tx);

        let slot = Slot::new(Arc::from("abc"), rx, registry.clone());
        slot.dispose();

        assert!(!registry.deliver("abc", response(42)));
    }

    #[tokio::test]
    async fn dropping_a_slot_disposes_it() {
        let registry = Arc::new(Registry::new());
        let (tx, rx) = oneshot::channel();
        registry.insert("abc".to_string(), tx);

        drop(Slot::new(Arc::from("abc"), rx, registry.clone()));

        assert!(!registry.deliver("abc", response(42)));
    }
}
