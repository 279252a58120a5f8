//! Session provider backed by a `watch` channel.

use genesis_core::UserId;
use genesis_core::session::SessionProvider;
use tokio::sync::watch;

/// Holds the signed-in user and publishes every change.
///
/// Stand-in for the auth client: the host calls [`sign_in`](Self::sign_in)
/// and [`sign_out`](Self::sign_out) as its auth state changes.
#[derive(Debug)]
pub struct WatchSessionProvider {
    sender: watch::Sender<Option<UserId>>,
}

impl WatchSessionProvider {
    pub fn new(initial: Option<UserId>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Publishes `user_id`. Re-publishing the current user is not a change.
    pub fn sign_in(&self, user_id: UserId) {
        self.set(Some(user_id));
    }

    pub fn sign_out(&self) {
        self.set(None);
    }

    fn set(&self, identity: Option<UserId>) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == identity {
                return false;
            }
            *current = identity;
            true
        });
        if changed {
            tracing::info!(signed_in = self.sender.borrow().is_some(), "[SessionProvider] identity changed");
        }
    }
}

impl Default for WatchSessionProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionProvider for WatchSessionProvider {
    fn current(&self) -> Option<UserId> {
        self.sender.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<UserId>> {
        self.sender.subscribe()
    }
}
