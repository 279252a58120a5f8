//! Chat store: the conversation with GENESIS and the coach.
//!
//! Owns the message push channel through a [`SubscriptionManager`]; pushed
//! messages are merged last-write-wins by id.

use super::reconcile::{replace_in_place, upsert_by_id};
use super::{
    LocalResult, PersistOutcome, PersistTask, ReconcileOutcome, StoreCell, StoreStatus, Submitted, begin_load,
    finish_load, record_failure, settle,
};
use crate::subscription::{PushSink, SubscriptionManager};
use chrono::{DateTime, Utc};
use genesis_core::chat::{ChatGateway, Message, MessageRole};
use genesis_core::error::Result;
use genesis_core::realtime::{PushEvent, PushGateway, Topic};
use genesis_core::{EntityId, UserId};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

const STORE: &str = "ChatStore";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatState {
    /// Chronological
    pub messages: Vec<Message>,
    pub unread_count: u32,
    pub is_loading: bool,
    pub sends_in_flight: u32,
    pub error: Option<String>,
}

impl ChatState {
    pub fn is_sending(&self) -> bool {
        self.sends_in_flight > 0
    }
}

super::impl_has_status!(ChatState);

#[derive(Debug, Clone, PartialEq)]
pub enum ChatMutation {
    SendMessage(Message),
    MarkAsRead { at: DateTime<Utc> },
}

impl ChatMutation {
    pub fn send(user_id: &UserId, content: impl Into<String>) -> Self {
        ChatMutation::SendMessage(Message::outgoing(EntityId::temporary("msg"), user_id.clone(), content))
    }
}

pub fn apply(state: &mut ChatState, mutation: &ChatMutation) -> LocalResult {
    match mutation {
        ChatMutation::SendMessage(message) => {
            state.messages.push(message.clone());
            state.sends_in_flight += 1;
            LocalResult::Applied(Some(message.id.clone()))
        }
        ChatMutation::MarkAsRead { at } => {
            state.unread_count = 0;
            for message in state.messages.iter_mut().filter(|m| m.is_unread_incoming()) {
                message.read_at = Some(*at);
            }
            LocalResult::Applied(None)
        }
    }
}

pub fn reconcile(mut state: ChatState, outcome: &PersistOutcome<Message>) -> (ChatState, ReconcileOutcome) {
    let result = match outcome {
        PersistOutcome::Created { temp_id, record } => {
            state.sends_in_flight = state.sends_in_flight.saturating_sub(1);
            if replace_in_place(&mut state.messages, temp_id, record) {
                ReconcileOutcome::Replaced {
                    temp_id: temp_id.clone(),
                    server_id: record.id.clone(),
                }
            } else {
                ReconcileOutcome::Acknowledged
            }
        }
        PersistOutcome::Saved(_) | PersistOutcome::Done => ReconcileOutcome::Acknowledged,
        PersistOutcome::Failed { temp_id, error } => {
            if temp_id.is_some() {
                state.sends_in_flight = state.sends_in_flight.saturating_sub(1);
            }
            record_failure(&mut state, error)
        }
    };
    (state, result)
}

/// Merges one pushed event. Returns `true` if the state changed.
///
/// A message already present (same id) is replaced in place; a new one is
/// appended, and counts as unread unless the user wrote it.
pub fn apply_push(state: &mut ChatState, event: &PushEvent) -> bool {
    match event {
        PushEvent::MessageInserted { message } => {
            let appended = upsert_by_id(&mut state.messages, message.clone());
            if appended && message.role != MessageRole::User {
                state.unread_count += 1;
            }
            true
        }
    }
}

struct ChatPushSink {
    store: Weak<ChatStore>,
    generation: u64,
}

impl PushSink for ChatPushSink {
    fn deliver(&self, event: PushEvent) {
        if let Some(store) = self.store.upgrade() {
            store.deliver(self.generation, &event);
        }
    }
}

pub struct ChatStore {
    cell: StoreCell<ChatState>,
    gateway: Arc<dyn ChatGateway>,
    subscriptions: SubscriptionManager,
    message_limit: usize,
    me: Weak<ChatStore>,
}

impl ChatStore {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        push: Arc<dyn PushGateway>,
        message_limit: usize,
        queue_capacity: usize,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            cell: StoreCell::new(ChatState::default()),
            gateway,
            subscriptions: SubscriptionManager::new(push, queue_capacity),
            message_limit,
            me: me.clone(),
        })
    }

    pub fn snapshot(&self) -> ChatState {
        self.cell.snapshot()
    }

    pub fn read<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        self.cell.read(f)
    }

    pub fn status(&self) -> StoreStatus {
        self.cell.read(StoreStatus::of)
    }

    pub fn revision(&self) -> u64 {
        self.cell.revision()
    }

    pub fn changes(&self) -> watch::Receiver<u64> {
        self.cell.subscribe()
    }

    /// Replaces messages and the unread count with the server's.
    pub async fn fetch_messages(&self, user_id: &UserId) -> Result<()> {
        let generation = begin_load(&self.cell);
        let (messages, unread) = tokio::join!(
            self.gateway.recent_messages(user_id, self.message_limit),
            self.gateway.unread_count(user_id),
        );
        let result = messages.and_then(|m| unread.map(|u| (m, u)));
        finish_load(&self.cell, STORE, generation, result, |state, (messages, unread)| {
            state.messages = messages;
            state.unread_count = unread;
        })
    }

    pub fn apply_local(&self, mutation: &ChatMutation) -> LocalResult {
        self.cell.update(|state| apply(state, mutation))
    }

    pub fn schedule_persist(self: &Arc<Self>, mutation: ChatMutation, user_id: Option<&UserId>) -> Option<PersistTask> {
        let user_id = user_id?.clone();
        let generation = self.cell.generation();
        let store = Arc::clone(self);

        let task = match mutation {
            ChatMutation::SendMessage(message) => PersistTask::spawn(async move {
                let result = store
                    .gateway
                    .send_message(&user_id, &message.content, message.message_type)
                    .await;
                let outcome = PersistOutcome::from_create(message.id.clone(), result);
                settle(&store.cell, STORE, generation, outcome, reconcile)
            }),
            ChatMutation::MarkAsRead { .. } => PersistTask::spawn(async move {
                let result = store.gateway.mark_as_read(&user_id).await;
                settle(&store.cell, STORE, generation, PersistOutcome::from_ack(result), reconcile)
            }),
        };
        Some(task)
    }

    pub fn send_message(self: &Arc<Self>, user_id: &UserId, content: impl Into<String>) -> Submitted {
        self.submit(ChatMutation::send(user_id, content), user_id)
    }

    pub fn mark_as_read(self: &Arc<Self>, user_id: &UserId) -> Submitted {
        self.submit(ChatMutation::MarkAsRead { at: Utc::now() }, user_id)
    }

    /// Merges a pushed event into the current state.
    pub fn apply_push(&self, event: &PushEvent) -> bool {
        self.deliver(self.cell.generation(), event)
    }

    /// Opens the message channel for `user_id`; a no-op if it is already open.
    pub async fn subscribe(&self, user_id: &UserId) -> Result<()> {
        let sink = ChatPushSink {
            store: self.me.clone(),
            generation: self.cell.generation(),
        };
        self.subscriptions.subscribe(user_id, sink).await
    }

    pub async fn unsubscribe(&self) {
        self.subscriptions.unsubscribe().await;
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriptions.is_subscribed()
    }

    pub fn active_topic(&self) -> Option<Topic> {
        self.subscriptions.active_topic()
    }

    /// Clears the state and drops the push channel.
    pub fn reset(&self) {
        self.subscriptions.detach();
        self.cell.reset(ChatState::default());
    }

    fn deliver(&self, generation: u64, event: &PushEvent) -> bool {
        match self.cell.update_if_current(generation, |state| apply_push(state, event)) {
            Some(changed) => changed,
            None => {
                tracing::debug!(generation, "[ChatStore] dropping push event for a previous session");
                false
            }
        }
    }

    fn submit(self: &Arc<Self>, mutation: ChatMutation, user_id: &UserId) -> Submitted {
        let local = self.apply_local(&mutation);
        let persist = self.schedule_persist(mutation, Some(user_id));
        Submitted { local, persist }
    }
}
