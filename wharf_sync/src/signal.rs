use tokio::sync::mpsc;

/// A broadcaster that notifies any number of [`Watcher`]s of discrete events,
/// without ever blocking on a slow or absent subscriber.
///
/// Each subscription is a channel of capacity one. If a watcher has not yet
/// consumed the event from a previous notification, a subsequent notification
/// is silently dropped for that watcher rather than queued: the watcher keeps
/// the older event and is expected to catch up before it needs the newest
/// one. This mirrors the “coalescing” semantics wanted of a connection
/// state-change broadcaster, where only the latest fact (“the connection is
/// up again”) matters, not every intermediate transition.
///
/// ## Example
///
/// ```
/// use wharf_sync::Signal;
///
/// # tokio_test::block_on(async {
/// let signal = Signal::new();
///
/// let mut watcher = signal.watch();
///
/// signal.notify(true);
///
/// assert_eq!(watcher.next().await, Some(true));
/// # })
/// ```
pub struct Signal<T> {
    watchers: std::sync::Mutex<Vec<mpsc::Sender<T>>>,
}

impl<T> Signal<T>
where
    T: Clone,
{
    /// Creates a new, watcher-less [`Signal`].
    pub fn new() -> Self {
        Self {
            watchers: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Registers a new [`Watcher`] that will receive every subsequent
    /// [notification](Signal::notify), except those it cannot keep up with.
    pub fn watch(&self) -> Watcher<T> {
        let (sender, receiver) = mpsc::channel(1);

        self.watchers.lock().unwrap().push(sender);

        Watcher { receiver }
    }

    /// Notifies every currently registered [`Watcher`] of the given event.
    ///
    /// Watchers whose channel is already full (i.e., has an unconsumed event
    /// from a previous call) are skipped for this notification. Watchers
    /// whose [`Watcher`] has been dropped are pruned from the internal list.
    pub fn notify(&self, event: T) {
        let mut watchers = self.watchers.lock().unwrap();

        watchers.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

impl<T> Default for Signal<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// One subscription to a [`Signal`], obtained via [`Signal::watch`].
pub struct Watcher<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> Watcher<T> {
    /// Waits for the next event that this watcher has not yet seen.
    ///
    /// Returns [`None`] if the originating [`Signal`] has been dropped.
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn simple_notify() {
        let signal = Signal::new();
        let mut watcher = signal.watch();

        signal.notify(42);

        assert_eq!(watcher.next().await, Some(42));
    }

    #[tokio::test]
    async fn multiple_watchers_all_notified() {
        let signal = Signal::new();
        let mut a = signal.watch();
        let mut b = signal.watch();

        signal.notify("up");

        assert_eq!(a.next().await, Some("up"));
        assert_eq!(b.next().await, Some("up"));
    }

    #[tokio::test]
    async fn slow_watcher_keeps_older_event() {
        let signal = Signal::new();
        let mut watcher = signal.watch();

        signal.notify(1);
        signal.notify(2); // dropped: watcher has not yet consumed `1`

        assert_eq!(watcher.next().await, Some(1));
    }

    #[tokio::test]
    async fn dropped_watcher_is_pruned() {
        let signal = Signal::new();
        let watcher = signal.watch();
        drop(watcher);

        // Must not panic or block despite no live watchers.
        signal.notify(());

        assert_eq!(signal.watchers.lock().unwrap().len(), 0);
    }
}
