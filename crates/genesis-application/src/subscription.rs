//! Push-channel lifecycle for live stores.
//!
//! The manager owns at most one open channel. Inbound events land in a
//! bounded queue and a single dispatcher task drains it, in arrival order,
//! into a [`PushSink`].

use genesis_core::error::Result;
use genesis_core::realtime::{EventReceiver, PushEvent, PushGateway, SubscriptionHandle, Topic};
use genesis_core::{GenesisError, UserId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receives events drained from a push channel.
pub trait PushSink: Send + Sync + 'static {
    fn deliver(&self, event: PushEvent);
}

struct ActiveChannel {
    handle: SubscriptionHandle,
    cancel: CancellationToken,
    dispatcher: JoinHandle<()>,
}

impl ActiveChannel {
    fn is_live(&self) -> bool {
        !self.dispatcher.is_finished()
    }
}

pub struct SubscriptionManager {
    gateway: Arc<dyn PushGateway>,
    queue_capacity: usize,
    active: Mutex<Option<ActiveChannel>>,
    /// Bumped by `detach`; a subscribe that started before it must not install.
    detached: AtomicU64,
    /// Serializes subscribe/unsubscribe, which suspend on the gateway.
    transition: AsyncMutex<()>,
}

impl SubscriptionManager {
    pub fn new(gateway: Arc<dyn PushGateway>, queue_capacity: usize) -> Self {
        Self {
            gateway,
            queue_capacity: queue_capacity.max(1),
            active: Mutex::new(None),
            detached: AtomicU64::new(0),
            transition: AsyncMutex::new(()),
        }
    }

    /// Opens the message channel for `user_id`, delivering into `sink`.
    ///
    /// Subscribing again for the user whose channel is live is a no-op. A
    /// channel for another user, or one the gateway already dropped, is
    /// torn down first. A [`detach`](Self::detach) that lands while the
    /// channel is opening wins: the late handle is closed, not installed.
    pub async fn subscribe<S: PushSink>(&self, user_id: &UserId, sink: S) -> Result<()> {
        let started = self.detached.load(Ordering::SeqCst);
        let _transition = self.transition.lock().await;
        let topic = Topic::messages(user_id.clone());
        if self.detached.load(Ordering::SeqCst) != started {
            tracing::debug!(%topic, "[SubscriptionManager] detached before opening, skipping");
            return Ok(());
        }

        let previous = {
            let mut active = self.active.lock();
            let live = active
                .as_ref()
                .is_some_and(|channel| channel.handle.topic == topic && channel.is_live());
            if live {
                tracing::debug!(%topic, "[SubscriptionManager] already subscribed");
                return Ok(());
            }
            active.take()
        };
        if let Some(previous) = previous {
            tracing::info!(from = %previous.handle.topic, to = %topic, "[SubscriptionManager] replacing channel");
            self.close(previous).await;
        }

        let (events, queue) = mpsc::channel(self.queue_capacity);
        let handle = self.gateway.open(&topic, events).await.map_err(|e| match e {
            GenesisError::Subscription(_) => e,
            other => GenesisError::subscription(format!("failed to open {topic}: {other}")),
        })?;

        if self.detached.load(Ordering::SeqCst) != started {
            tracing::debug!(%topic, handle = %handle.id, "[SubscriptionManager] detached while opening, closing late channel");
            if let Err(e) = self.gateway.close(handle).await {
                tracing::warn!(error = %e, "[SubscriptionManager] failed to close late channel");
            }
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let dispatcher = tokio::spawn(dispatch(topic.clone(), queue, sink, cancel.clone()));
        *self.active.lock() = Some(ActiveChannel {
            handle,
            cancel,
            dispatcher,
        });

        tracing::info!(%topic, "[SubscriptionManager] subscribed");
        Ok(())
    }

    /// Closes the open channel, if any. Idempotent.
    pub async fn unsubscribe(&self) {
        let _transition = self.transition.lock().await;
        let channel = self.active.lock().take();
        if let Some(channel) = channel {
            tracing::info!(topic = %channel.handle.topic, "[SubscriptionManager] unsubscribing");
            self.close(channel).await;
        }
    }

    /// Stops delivery immediately and closes the channel in the background.
    ///
    /// For callers that cannot suspend, such as a store reset.
    pub fn detach(&self) {
        self.detached.fetch_add(1, Ordering::SeqCst);
        let Some(channel) = self.active.lock().take() else {
            return;
        };
        channel.cancel.cancel();

        let gateway = Arc::clone(&self.gateway);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = gateway.close(channel.handle).await {
                        tracing::warn!(error = %e, "[SubscriptionManager] failed to close detached channel");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(topic = %channel.handle.topic, "[SubscriptionManager] no runtime to close detached channel");
            }
        }
    }

    pub fn active_topic(&self) -> Option<Topic> {
        self.active
            .lock()
            .as_ref()
            .filter(|channel| channel.is_live())
            .map(|channel| channel.handle.topic.clone())
    }

    pub fn is_subscribed(&self) -> bool {
        self.active_topic().is_some()
    }

    async fn close(&self, channel: ActiveChannel) {
        channel.cancel.cancel();
        if let Err(e) = channel.dispatcher.await {
            tracing::warn!(error = %e, "[SubscriptionManager] dispatcher ended abnormally");
        }
        if let Err(e) = self.gateway.close(channel.handle).await {
            tracing::warn!(error = %e, "[SubscriptionManager] failed to close channel");
        }
    }
}

async fn dispatch<S: PushSink>(topic: Topic, mut queue: EventReceiver, sink: S, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%topic, "[SubscriptionManager] dispatcher cancelled");
                break;
            }
            event = queue.recv() => match event {
                Some(event) => sink.deliver(event),
                None => {
                    tracing::warn!(%topic, "[SubscriptionManager] push channel dropped by gateway");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use genesis_core::chat::{Message, MessageRole, MessageType};
    use genesis_core::realtime::EventSender;
    use genesis_core::EntityId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct MockPushGateway {
        senders: Mutex<Vec<EventSender>>,
        opened: AtomicUsize,
        closed: AtomicUsize,
        fail_open: Mutex<bool>,
    }

    #[async_trait]
    impl PushGateway for MockPushGateway {
        async fn open(&self, topic: &Topic, events: EventSender) -> Result<SubscriptionHandle> {
            if *self.fail_open.lock() {
                return Err(GenesisError::transport("socket refused"));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.senders.lock().push(events);
            Ok(SubscriptionHandle::new(topic.clone()))
        }

        async fn close(&self, _handle: SubscriptionHandle) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl PushSink for RecordingSink {
        fn deliver(&self, event: PushEvent) {
            let PushEvent::MessageInserted { message } = event;
            self.seen.lock().push(message.content);
        }
    }

    fn event(content: &str) -> PushEvent {
        PushEvent::MessageInserted {
            message: Message {
                id: EntityId::generate(),
                user_id: None,
                role: MessageRole::Genesis,
                content: content.to_string(),
                message_type: MessageType::Text,
                is_coach_note: false,
                created_at: None,
                read_at: None,
            },
        }
    }

    async fn wait_for(seen: &Arc<Mutex<Vec<String>>>, len: usize) {
        for _ in 0..100 {
            if seen.lock().len() >= len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("sink saw {:?}", seen.lock());
    }

    #[tokio::test]
    async fn test_subscribe_twice_for_same_user_opens_one_channel() {
        let gateway = Arc::new(MockPushGateway::default());
        let manager = SubscriptionManager::new(gateway.clone(), 8);
        let user = UserId::new("u1");

        manager.subscribe(&user, RecordingSink::default()).await.unwrap();
        manager.subscribe(&user, RecordingSink::default()).await.unwrap();

        assert_eq!(gateway.opened.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_topic(), Some(Topic::messages(user)));
    }

    #[tokio::test]
    async fn test_other_user_tears_down_first() {
        let gateway = Arc::new(MockPushGateway::default());
        let manager = SubscriptionManager::new(gateway.clone(), 8);

        manager.subscribe(&UserId::new("u1"), RecordingSink::default()).await.unwrap();
        manager.subscribe(&UserId::new("u2"), RecordingSink::default()).await.unwrap();

        assert_eq!(gateway.opened.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.closed.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_topic(), Some(Topic::messages(UserId::new("u2"))));
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_arrival_order() {
        let gateway = Arc::new(MockPushGateway::default());
        let manager = SubscriptionManager::new(gateway.clone(), 8);
        let sink = RecordingSink::default();

        manager.subscribe(&UserId::new("u1"), sink.clone()).await.unwrap();
        let sender = gateway.senders.lock()[0].clone();
        for content in ["one", "two", "three"] {
            sender.send(event(content)).await.unwrap();
        }

        wait_for(&sink.seen, 3).await;
        assert_eq!(*sink.seen.lock(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_stops_delivery() {
        let gateway = Arc::new(MockPushGateway::default());
        let manager = SubscriptionManager::new(gateway.clone(), 8);
        let sink = RecordingSink::default();

        manager.subscribe(&UserId::new("u1"), sink.clone()).await.unwrap();
        let sender = gateway.senders.lock()[0].clone();
        manager.unsubscribe().await;
        manager.unsubscribe().await;

        assert!(!manager.is_subscribed());
        assert_eq!(gateway.closed.load(Ordering::SeqCst), 1);
        assert!(sender.send(event("late")).await.is_err());
        assert!(sink.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_leaves_no_handle() {
        let gateway = Arc::new(MockPushGateway::default());
        *gateway.fail_open.lock() = true;
        let manager = SubscriptionManager::new(gateway.clone(), 8);

        let err = manager
            .subscribe(&UserId::new("u1"), RecordingSink::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenesisError::Subscription(_)));
        assert!(!manager.is_subscribed());
    }

    #[tokio::test]
    async fn test_dropped_channel_is_reopened() {
        let gateway = Arc::new(MockPushGateway::default());
        let manager = SubscriptionManager::new(gateway.clone(), 8);
        let user = UserId::new("u1");

        manager.subscribe(&user, RecordingSink::default()).await.unwrap();
        gateway.senders.lock().clear();
        for _ in 0..100 {
            if !manager.is_subscribed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!manager.is_subscribed());

        manager.subscribe(&user, RecordingSink::default()).await.unwrap();
        assert_eq!(gateway.opened.load(Ordering::SeqCst), 2);
        assert!(manager.is_subscribed());
    }
}
