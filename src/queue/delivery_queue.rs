//! Bounded buffer with a single retrying consumer

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::delivery::Deliver;
use crate::types::{Event, QueueItem};

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors surfaced to queue callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,
    #[error("queue consumer is already running")]
    ConsumerRunning,
}

struct Buffer {
    items: VecDeque<QueueItem>,
    closed: bool,
}

/// Clears the running flag even if the consumer future is dropped
struct ConsumerGuard<'a>(&'a AtomicBool);

impl Drop for ConsumerGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum Next {
    Item(QueueItem),
    Wait,
    Done,
}

/// Bounded delivery queue with retry and dead-lettering
///
/// Capacity is enforced with a semaphore of slots. A producer takes a slot
/// in [`enqueue`](Self::enqueue) and the consumer returns it as soon as it
/// takes the item off the buffer. Retries are re-appended without a slot,
/// so the buffer can briefly hold `capacity + 1` items and the consumer
/// never waits on itself.
pub struct DeliveryQueue {
    buffer: Mutex<Buffer>,
    slots: Semaphore,
    ready: Notify,
    consuming: AtomicBool,
    dead_letters: Mutex<Vec<QueueItem>>,
    capacity: usize,
    max_attempts: u32,
}

impl DeliveryQueue {
    /// Create a queue holding at most `capacity` items, each tried at most `max_attempts` times
    pub fn new(capacity: usize, max_attempts: u32) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            buffer: Mutex::new(Buffer {
                items: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
            }),
            slots: Semaphore::new(capacity),
            ready: Notify::new(),
            consuming: AtomicBool::new(false),
            dead_letters: Mutex::new(Vec::new()),
            capacity,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Add an event with `attempts = 0`
    ///
    /// Waits while the queue is full. Returns the number of buffered items
    /// right after insertion; other producers may change it immediately.
    pub async fn enqueue(&self, event: Event) -> QueueResult<usize> {
        let permit = self.slots.acquire().await.map_err(|_| QueueError::Closed)?;

        let size = {
            let mut buffer = self.buffer.lock();
            if buffer.closed {
                return Err(QueueError::Closed);
            }
            permit.forget();
            buffer.items.push_back(QueueItem::new(event));
            buffer.items.len()
        };

        self.ready.notify_one();
        Ok(size)
    }

    /// Stop accepting events; the consumer drains what is left and returns
    pub fn shutdown(&self) {
        {
            let mut buffer = self.buffer.lock();
            if buffer.closed {
                return;
            }
            buffer.closed = true;
        }
        self.slots.close();
        self.ready.notify_one();
        tracing::info!(pending = self.len(), "Queue closed for new events, draining");
    }

    /// The consumer loop
    ///
    /// Delivers items oldest first. Failed items are re-appended to the tail
    /// until they reach `max_attempts`, then moved to the dead-letter
    /// collection. Returns once the queue is closed and empty.
    pub async fn run<D: Deliver>(&self, deliver: D, url: &str) -> QueueResult<()> {
        if self.consuming.swap(true, Ordering::SeqCst) {
            return Err(QueueError::ConsumerRunning);
        }
        let _guard = ConsumerGuard(&self.consuming);

        loop {
            let next = {
                let mut buffer = self.buffer.lock();
                match buffer.items.pop_front() {
                    Some(item) => {
                        // Only first attempts were admitted through a slot
                        if item.attempts == 0 {
                            self.slots.add_permits(1);
                        }
                        Next::Item(item)
                    }
                    None if buffer.closed => Next::Done,
                    None => Next::Wait,
                }
            };

            match next {
                Next::Item(item) => self.handle_item(item, &deliver, url).await,
                Next::Wait => self.ready.notified().await,
                Next::Done => break,
            }
        }

        tracing::info!(
            dead_letters = self.dead_letter_count(),
            "Queue consumer stopped"
        );
        Ok(())
    }

    /// Start the consumer on the tokio runtime
    pub fn spawn<D: Deliver>(
        self: &Arc<Self>,
        deliver: D,
        url: impl Into<String>,
    ) -> JoinHandle<QueueResult<()>> {
        let queue = Arc::clone(self);
        let url = url.into();
        tokio::spawn(async move { queue.run(deliver, &url).await })
    }

    async fn handle_item<D: Deliver>(&self, mut item: QueueItem, deliver: &D, url: &str) {
        let event_id = item.event.id();

        match deliver.deliver(url, &item.event).await {
            Ok(()) => {
                tracing::info!(%event_id, attempts = item.attempts + 1, "Delivered event");
            }
            Err(e) => {
                item.attempts += 1;
                tracing::warn!(%event_id, attempts = item.attempts, error = %e, "Delivery failed");

                if item.attempts < self.max_attempts {
                    tracing::info!(%event_id, attempts = item.attempts, "Re-enqueuing event");
                    self.buffer.lock().items.push_back(item);
                } else {
                    tracing::error!(%event_id, attempts = item.attempts, "Max attempts reached, dead-lettering event");
                    self.dead_letters.lock().push(item);
                }
            }
        }
    }

    /// Number of buffered items (excludes the one being delivered)
    pub fn len(&self) -> usize {
        self.buffer.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_closed(&self) -> bool {
        self.buffer.lock().closed
    }

    /// Snapshot of items that exhausted their attempts
    pub fn dead_letters(&self) -> Vec<QueueItem> {
        self.dead_letters.lock().clone()
    }

    pub fn dead_letter_count(&self) -> usize {
        self.dead_letters.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::delivery::DeliveryError;
    use crate::types::{Candidate, EventId};

    const URL: &str = "http://localhost:4000";

    /// Fails the first `failures` attempts for every event, or always when `None`
    struct ScriptedSink {
        failures: Option<u32>,
        calls: Mutex<Vec<EventId>>,
    }

    impl ScriptedSink {
        fn new(failures: Option<u32>) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<EventId> {
            self.calls.lock().clone()
        }
    }

    impl Deliver for ScriptedSink {
        async fn deliver(&self, url: &str, event: &Event) -> Result<(), DeliveryError> {
            let seen = {
                let mut calls = self.calls.lock();
                calls.push(event.id());
                calls.iter().filter(|id| **id == event.id()).count() as u32
            };
            match self.failures {
                Some(n) if seen > n => Ok(()),
                _ => Err(DeliveryError::rejected(url, "scripted failure")),
            }
        }
    }

    /// Holds every delivery until `release` is notified
    #[derive(Default)]
    struct GatedSink {
        started: Notify,
        release: Notify,
    }

    impl Deliver for GatedSink {
        async fn deliver(&self, _url: &str, _event: &Event) -> Result<(), DeliveryError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    fn event(n: u32) -> Event {
        Event::new(Candidate::new(
            "user.new:v1",
            "https://example.com",
            format!("/users/{}", n),
            json!({"n": n}),
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_delivery_discards_item() {
        let queue = Arc::new(DeliveryQueue::new(10, 3));
        let sink = ScriptedSink::new(Some(0));
        let consumer = queue.spawn(sink.clone(), URL);

        let e = event(1);
        queue.enqueue(e.clone()).await.unwrap();
        queue.shutdown();
        consumer.await.unwrap().unwrap();

        assert_eq!(sink.calls(), vec![e.id()]);
        assert_eq!(queue.dead_letter_count(), 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_always_failing_item_is_dead_lettered_after_max_attempts() {
        let queue = Arc::new(DeliveryQueue::new(10, 3));
        let sink = ScriptedSink::new(None);

        let e = event(1);
        queue.enqueue(e.clone()).await.unwrap();
        queue.shutdown();
        queue.run(sink.clone(), URL).await.unwrap();

        assert_eq!(sink.calls().len(), 3);
        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].event, e);
        assert_eq!(dead[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_item_recovering_before_max_is_not_dead_lettered() {
        let queue = Arc::new(DeliveryQueue::new(10, 3));
        let sink = ScriptedSink::new(Some(2));

        queue.enqueue(event(1)).await.unwrap();
        queue.shutdown();
        queue.run(sink.clone(), URL).await.unwrap();

        assert_eq!(sink.calls().len(), 3);
        assert_eq!(queue.dead_letter_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_goes_to_tail() {
        let queue = Arc::new(DeliveryQueue::new(10, 3));
        let sink = ScriptedSink::new(Some(1));

        let a = event(1);
        let b = event(2);
        queue.enqueue(a.clone()).await.unwrap();
        queue.enqueue(b.clone()).await.unwrap();
        queue.shutdown();
        queue.run(sink.clone(), URL).await.unwrap();

        assert_eq!(sink.calls(), vec![a.id(), b.id(), a.id(), b.id()]);
    }

    #[tokio::test]
    async fn test_enqueue_reports_occupancy() {
        let queue = DeliveryQueue::new(5, 3);
        assert_eq!(queue.enqueue(event(1)).await, Ok(1));
        assert_eq!(queue.enqueue(event(2)).await, Ok(2));
        assert_eq!(queue.enqueue(event(3)).await, Ok(3));
        assert_eq!(queue.len(), 3);
    }

    #[tokio::test]
    async fn test_enqueue_blocks_when_full() {
        let queue = Arc::new(DeliveryQueue::new(1, 3));
        queue.enqueue(event(1)).await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), queue.enqueue(event(2))).await;
        assert!(blocked.is_err());

        let producer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.enqueue(event(3)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!producer.is_finished());

        let sink = ScriptedSink::new(Some(0));
        let consumer = queue.spawn(sink.clone(), URL);

        assert!(producer.await.unwrap().is_ok());
        queue.shutdown();
        consumer.await.unwrap().unwrap();
        assert_eq!(sink.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_is_rejected() {
        let queue = DeliveryQueue::new(5, 3);
        queue.shutdown();
        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(event(1)).await, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn test_shutdown_releases_blocked_producer() {
        let queue = Arc::new(DeliveryQueue::new(1, 3));
        queue.enqueue(event(1)).await.unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.enqueue(event(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.shutdown();

        assert_eq!(producer.await.unwrap(), Err(QueueError::Closed));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_buffer_including_retries() {
        let queue = Arc::new(DeliveryQueue::new(10, 2));
        let sink = ScriptedSink::new(None);

        for n in 0..4 {
            queue.enqueue(event(n)).await.unwrap();
        }
        let consumer = queue.spawn(sink.clone(), URL);
        queue.shutdown();
        consumer.await.unwrap().unwrap();

        assert!(queue.is_empty());
        assert_eq!(sink.calls().len(), 8);
        assert_eq!(queue.dead_letter_count(), 4);
        assert!(queue.dead_letters().iter().all(|item| item.attempts == 2));
    }

    #[tokio::test]
    async fn test_single_consumer() {
        let queue = Arc::new(DeliveryQueue::new(10, 3));
        let first = queue.spawn(ScriptedSink::new(Some(0)), URL);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = queue.run(ScriptedSink::new(Some(0)), URL).await;
        assert_eq!(second, Err(QueueError::ConsumerRunning));

        queue.shutdown();
        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_slot_freed_when_consumer_takes_item() {
        let queue = Arc::new(DeliveryQueue::new(1, 3));
        let sink = Arc::new(GatedSink::default());

        queue.enqueue(event(1)).await.unwrap();
        let consumer = queue.spawn(sink.clone(), URL);
        sink.started.notified().await;
        assert!(queue.is_empty());

        let size =
            tokio::time::timeout(Duration::from_millis(200), queue.enqueue(event(2))).await;
        assert_eq!(size.expect("enqueue blocked while buffer was empty"), Ok(1));

        sink.release.notify_one();
        sink.started.notified().await;
        sink.release.notify_one();

        queue.shutdown();
        consumer.await.unwrap().unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.dead_letter_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_on_full_queue_does_not_deadlock() {
        let queue = Arc::new(DeliveryQueue::new(1, 3));
        let sink = ScriptedSink::new(Some(1));

        let a = event(1);
        let b = event(2);
        queue.enqueue(a.clone()).await.unwrap();
        let consumer = queue.spawn(sink.clone(), URL);
        queue.enqueue(b.clone()).await.unwrap();
        queue.shutdown();

        tokio::time::timeout(Duration::from_secs(2), consumer)
            .await
            .expect("consumer did not finish")
            .unwrap()
            .unwrap();
        assert_eq!(sink.calls().len(), 4);
        assert_eq!(queue.dead_letter_count(), 0);
    }

    #[tokio::test]
    async fn test_consumer_can_restart_after_abort() {
        let queue = Arc::new(DeliveryQueue::new(10, 3));
        let gated = Arc::new(GatedSink::default());

        queue.enqueue(event(1)).await.unwrap();
        let consumer = queue.spawn(gated.clone(), URL);
        gated.started.notified().await;
        consumer.abort();
        assert!(consumer.await.unwrap_err().is_cancelled());

        let sink = ScriptedSink::new(Some(0));
        let e = event(2);
        queue.enqueue(e.clone()).await.unwrap();
        queue.shutdown();
        queue.run(sink.clone(), URL).await.unwrap();

        assert_eq!(sink.calls(), vec![e.id()]);
    }

    #[test]
    fn test_limits_are_clamped() {
        let queue = DeliveryQueue::new(0, 0);
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.max_attempts(), 1);
    }
}
