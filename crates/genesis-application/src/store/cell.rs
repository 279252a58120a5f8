use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// State container shared by every domain store.
///
/// Holds the state behind a synchronous lock, a generation counter bumped by
/// [`StoreCell::reset`], and a revision counter published on every change.
/// Asynchronous completions capture the generation when they are issued and
/// go through [`StoreCell::update_if_current`], which checks it under the
/// write lock so a completion can never land after a reset.
pub struct StoreCell<S> {
    state: RwLock<S>,
    generation: AtomicU64,
    revision: watch::Sender<u64>,
}

impl<S: Clone> StoreCell<S> {
    pub fn new(initial: S) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(initial),
            generation: AtomicU64::new(0),
            revision,
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.read())
    }

    pub fn snapshot(&self) -> S {
        self.state.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Mutates the state and publishes a new revision.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = {
            let mut state = self.state.write();
            f(&mut state)
        };
        self.bump();
        result
    }

    /// Like [`StoreCell::update`], returning the generation observed under the lock.
    pub fn update_tracked<R>(&self, f: impl FnOnce(&mut S) -> R) -> (u64, R) {
        let (generation, result) = {
            let mut state = self.state.write();
            (self.generation(), f(&mut state))
        };
        self.bump();
        (generation, result)
    }

    /// Applies `f` only if no reset happened since `generation` was observed.
    pub fn update_if_current<R>(&self, generation: u64, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let result = {
            let mut state = self.state.write();
            if self.generation() != generation {
                return None;
            }
            f(&mut state)
        };
        self.bump();
        Some(result)
    }

    /// Replaces the state and invalidates every in-flight completion.
    pub fn reset(&self, initial: S) {
        {
            let mut state = self.state.write();
            self.generation.fetch_add(1, Ordering::AcqRel);
            *state = initial;
        }
        self.bump();
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_bumps_revision() {
        let cell = StoreCell::new(vec![1]);
        let before = cell.revision();
        cell.update(|v| v.push(2));
        assert_eq!(cell.revision(), before + 1);
        assert_eq!(cell.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_completion_after_reset_is_discarded() {
        let cell = StoreCell::new(vec![1]);
        let generation = cell.generation();
        cell.reset(Vec::new());

        assert!(cell.update_if_current(generation, |v| v.push(9)).is_none());
        assert!(cell.snapshot().is_empty());
        assert_eq!(cell.update_if_current(cell.generation(), |v| v.len()), Some(0));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let cell = StoreCell::new(0u32);
        let mut rx = cell.subscribe();
        cell.update(|n| *n += 1);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), cell.revision());
    }
}
