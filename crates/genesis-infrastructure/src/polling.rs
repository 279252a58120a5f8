//! Push channels emulated by polling.
//!
//! Used when the backend has no realtime endpoint. Each open channel runs a
//! task that forwards messages as [`PushEvent::MessageInserted`]. The first
//! poll backfills the latest messages; later polls ask for rows at or after
//! the newest server `created_at` seen so far. The client clock is never
//! consulted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use genesis_core::EntityId;
use genesis_core::chat::{ChatGateway, Message};
use genesis_core::error::Result;
use genesis_core::realtime::{ChannelKind, EventSender, PushEvent, PushGateway, SubscriptionHandle, Topic};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Messages forwarded by the first poll of a channel.
const BACKFILL: usize = 50;

pub struct PollingPushGateway {
    chat: Arc<dyn ChatGateway>,
    interval: Duration,
    tasks: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl PollingPushGateway {
    pub fn new(chat: Arc<dyn ChatGateway>, interval: Duration) -> Self {
        Self {
            chat,
            interval,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn open_channels(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Drop for PollingPushGateway {
    fn drop(&mut self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

#[async_trait]
impl PushGateway for PollingPushGateway {
    async fn open(&self, topic: &Topic, events: EventSender) -> Result<SubscriptionHandle> {
        let handle = SubscriptionHandle::new(topic.clone());
        let task = match topic.kind {
            ChannelKind::Messages => tokio::spawn(poll_messages(
                self.chat.clone(),
                topic.clone(),
                self.interval,
                events,
            )),
        };
        self.tasks.lock().insert(handle.id, task);
        tracing::debug!(%topic, handle = %handle.id, interval_ms = self.interval.as_millis() as u64, "[PollingPush] channel opened");
        Ok(handle)
    }

    async fn close(&self, handle: SubscriptionHandle) -> Result<()> {
        if let Some(task) = self.tasks.lock().remove(&handle.id) {
            task.abort();
            tracing::debug!(topic = %handle.topic, handle = %handle.id, "[PollingPush] channel closed");
        }
        Ok(())
    }
}

/// Newest server timestamp forwarded, with the ids forwarded at exactly
/// that instant so an inclusive query does not repeat them.
#[derive(Debug, Default)]
struct Cursor {
    at: Option<DateTime<Utc>>,
    sent_at_cursor: HashSet<EntityId>,
}

impl Cursor {
    /// Records `message` and reports whether it still needs forwarding.
    fn admit(&mut self, message: &Message) -> bool {
        let Some(created_at) = message.created_at else {
            return true;
        };
        match self.at {
            Some(at) if created_at < at => false,
            Some(at) if created_at == at => self.sent_at_cursor.insert(message.id.clone()),
            _ => {
                self.at = Some(created_at);
                self.sent_at_cursor.clear();
                self.sent_at_cursor.insert(message.id.clone());
                true
            }
        }
    }
}

/// Polls until the receiver goes away or the task is aborted.
async fn poll_messages(chat: Arc<dyn ChatGateway>, topic: Topic, interval: Duration, events: EventSender) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut cursor = Cursor::default();

    loop {
        ticker.tick().await;
        let fetched = match cursor.at {
            None => chat.recent_messages(&topic.user_id, BACKFILL).await,
            Some(at) => chat.messages_since(&topic.user_id, at).await,
        };
        let messages = match fetched {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(%topic, error = %e, "[PollingPush] poll failed, retrying next tick");
                continue;
            }
        };

        for message in messages {
            if !cursor.admit(&message) {
                continue;
            }
            if events.send(PushEvent::MessageInserted { message }).await.is_err() {
                tracing::debug!(%topic, "[PollingPush] receiver dropped, stopping");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGateway;
    use genesis_core::UserId;
    use genesis_core::chat::MessageRole;
    use tokio::sync::mpsc;

    fn incoming_at(user: &UserId, content: &str, created_at: DateTime<Utc>) -> Message {
        let mut message = Message::outgoing(EntityId::generate(), user.clone(), content);
        message.role = MessageRole::Genesis;
        message.created_at = Some(created_at);
        message
    }

    fn incoming(user: &UserId, content: &str) -> Message {
        incoming_at(user, content, Utc::now() + chrono::Duration::seconds(1))
    }

    async fn received(queue: &mut mpsc::Receiver<PushEvent>) -> Message {
        let PushEvent::MessageInserted { message } = tokio::time::timeout(Duration::from_secs(2), queue.recv())
            .await
            .expect("no event within 2s")
            .expect("channel closed");
        message
    }

    #[tokio::test]
    async fn test_new_rows_are_forwarded_once() {
        let backend = Arc::new(InMemoryGateway::new());
        let push = PollingPushGateway::new(backend.clone(), Duration::from_millis(5));
        let user = UserId::new("u1");
        let (events, mut queue) = mpsc::channel(8);

        let handle = push.open(&Topic::messages(user.clone()), events).await.unwrap();
        let message = incoming(&user, "hello");
        backend.insert_message(message.clone());

        assert_eq!(received(&mut queue).await, message);

        // A few more ticks must not re-deliver it.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(queue.try_recv().is_err());

        push.close(handle).await.unwrap();
        assert_eq!(push.open_channels(), 0);
    }

    #[tokio::test]
    async fn test_closing_an_unknown_handle_succeeds() {
        let backend = Arc::new(InMemoryGateway::new());
        let push = PollingPushGateway::new(backend, Duration::from_secs(1));
        let handle = SubscriptionHandle::new(Topic::messages(UserId::new("u1")));
        assert!(push.close(handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_rows_stamped_behind_the_client_clock_are_delivered() {
        let backend = Arc::new(InMemoryGateway::new());
        let push = PollingPushGateway::new(backend.clone(), Duration::from_millis(5));
        let user = UserId::new("u1");
        let (events, mut queue) = mpsc::channel(8);

        let earlier = incoming_at(&user, "before open", Utc::now() - chrono::Duration::seconds(30));
        backend.insert_message(earlier.clone());
        push.open(&Topic::messages(user.clone()), events).await.unwrap();
        assert_eq!(received(&mut queue).await, earlier);

        // Server clock lagging the client by a second.
        let lagging = incoming_at(&user, "lagging", Utc::now() - chrono::Duration::seconds(1));
        backend.insert_message(lagging.clone());
        assert_eq!(received(&mut queue).await, lagging);
    }

    #[tokio::test]
    async fn test_rows_sharing_a_timestamp_are_each_delivered_once() {
        let backend = Arc::new(InMemoryGateway::new());
        let push = PollingPushGateway::new(backend.clone(), Duration::from_millis(5));
        let user = UserId::new("u1");
        let (events, mut queue) = mpsc::channel(8);
        let at = Utc::now();

        let first = incoming_at(&user, "first", at);
        backend.insert_message(first.clone());
        push.open(&Topic::messages(user.clone()), events).await.unwrap();
        assert_eq!(received(&mut queue).await, first);

        let second = incoming_at(&user, "second", at);
        backend.insert_message(second.clone());
        assert_eq!(received(&mut queue).await, second);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(queue.try_recv().is_err());
    }

    #[test]
    fn test_cursor_skips_repeats_at_the_same_instant() {
        let user = UserId::new("u1");
        let at = Utc::now();
        let mut cursor = Cursor::default();
        let first = incoming_at(&user, "first", at);

        assert!(cursor.admit(&first));
        assert!(!cursor.admit(&first));
        assert!(cursor.admit(&incoming_at(&user, "second", at)));
        assert!(!cursor.admit(&incoming_at(&user, "older", at - chrono::Duration::seconds(1))));
        assert!(cursor.admit(&incoming_at(&user, "newer", at + chrono::Duration::seconds(1))));
    }
}
