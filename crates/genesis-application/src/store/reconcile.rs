//! Collection helpers used by the stores' reconcile functions.

use genesis_core::{EntityId, Identified};
use std::collections::BTreeSet;

/// Swaps the entry keyed `temp_id` for `record`, keeping its position.
///
/// Any other entry already carrying `record`'s id is dropped, so the server
/// key never appears twice. Returns `false` (and leaves `items` alone) when
/// `temp_id` is no longer present.
pub fn replace_in_place<R: Identified + Clone>(items: &mut Vec<R>, temp_id: &EntityId, record: &R) -> bool {
    let Some(position) = items.iter().position(|item| item.id() == temp_id) else {
        return false;
    };

    items[position] = record.clone();
    let server_id = record.id();
    let mut index = 0;
    items.retain(|item| {
        let keep = index == position || item.id() != server_id;
        index += 1;
        keep
    });
    true
}

/// Last-write-wins insert: replaces the entry with the same id in place, or
/// appends. Returns `true` when the record was appended.
pub fn upsert_by_id<R: Identified>(items: &mut Vec<R>, record: R) -> bool {
    match items.iter_mut().find(|item| item.id() == record.id()) {
        Some(existing) => {
            *existing = record;
            false
        }
        None => {
            items.push(record);
            true
        }
    }
}

/// Removes every entry keyed `id`. Returns `true` if something was removed.
pub fn remove_by_id<R: Identified>(items: &mut Vec<R>, id: &EntityId) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

/// Book-keeping for creates whose persist has not resolved yet.
///
/// A temporary entity removed while its create is in flight is remembered
/// here, so the late confirmation is reported as orphaned instead of being
/// mistaken for an entity that a wholesale fetch replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingCreates {
    in_flight: BTreeSet<EntityId>,
    discarded: BTreeSet<EntityId>,
}

impl PendingCreates {
    pub fn track(&mut self, temp_id: EntityId) {
        self.in_flight.insert(temp_id);
    }

    pub fn is_in_flight(&self, temp_id: &EntityId) -> bool {
        self.in_flight.contains(temp_id)
    }

    /// Marks an in-flight create as removed locally.
    pub fn discard(&mut self, temp_id: &EntityId) -> bool {
        if self.in_flight.contains(temp_id) {
            self.discarded.insert(temp_id.clone());
            true
        } else {
            false
        }
    }

    /// Ends tracking of `temp_id`; returns `true` if it had been discarded.
    pub fn settle(&mut self, temp_id: &EntityId) -> bool {
        self.in_flight.remove(temp_id);
        self.discarded.remove(temp_id)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}
