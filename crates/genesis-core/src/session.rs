//! Session identity, as seen by the sync core.

use crate::identity::UserId;
use tokio::sync::watch;

/// Exposes the authenticated user as an observable value.
///
/// `None` means signed out. Implementations must publish every transition
/// through [`SessionProvider::watch`].
pub trait SessionProvider: Send + Sync {
    fn current(&self) -> Option<UserId>;

    fn watch(&self) -> watch::Receiver<Option<UserId>>;
}
