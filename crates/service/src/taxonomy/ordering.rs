//! Dense zero-based ordering within one parent scope.
//!
//! An [`OrderedScope`] is the membership of a scope in display order; the
//! position of an id is its index. Engines load a scope, edit it and then
//! [`OrderedScope::apply`] the result back onto the records, which yields only
//! the records whose position actually moved.

use std::collections::HashSet;

use uuid::Uuid;

use crate::errors::TaxonomyError;

use super::domain::{Category, Cluster, Placement, Service};

/// A record that occupies a slot in some ordering scope.
pub trait Positioned {
    fn id(&self) -> Uuid;
    /// Current stored position, `None` when the record is outside any scope.
    fn position(&self) -> Option<u32>;
    fn set_position(&mut self, position: u32);
}

impl Positioned for Cluster {
    fn id(&self) -> Uuid { self.id }
    fn position(&self) -> Option<u32> { Some(self.order) }
    fn set_position(&mut self, position: u32) { self.order = position; }
}

impl Positioned for Service {
    fn id(&self) -> Uuid { self.id }
    fn position(&self) -> Option<u32> { Some(self.order) }
    fn set_position(&mut self, position: u32) { self.order = position; }
}

impl Positioned for Category {
    fn id(&self) -> Uuid { self.id }
    fn position(&self) -> Option<u32> {
        match self.placement {
            Placement::Active { order, .. } => Some(order),
            _ => None,
        }
    }
    /// Only meaningful for active categories; other placements are left alone.
    fn set_position(&mut self, position: u32) {
        if let Placement::Active { order, .. } = &mut self.placement {
            *order = position;
        }
    }
}

/// How a member asks to be placed by [`OrderedScope::arrange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Explicit order sent by the caller.
    Requested(u32),
    /// Order the member already had.
    Current(u32),
    /// No order at all; goes to the end.
    Append,
}

impl Slot {
    fn sort_key(&self) -> (u64, u8) {
        match *self {
            Slot::Requested(o) => (o as u64, 0),
            Slot::Current(o) => (o as u64, 1),
            Slot::Append => (u64::MAX, 2),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderedScope {
    ids: Vec<Uuid>,
}

impl OrderedScope {
    pub fn from_ids(ids: Vec<Uuid>) -> Self { Self { ids } }

    /// Dense sequence from possibly gapped positions; ties keep their input order.
    pub fn compact<T: Positioned>(members: &[T]) -> Self {
        let mut keyed: Vec<(u64, Uuid)> = members
            .iter()
            .map(|m| (m.position().map(u64::from).unwrap_or(u64::MAX), m.id()))
            .collect();
        keyed.sort_by_key(|(k, _)| *k);
        Self { ids: keyed.into_iter().map(|(_, id)| id).collect() }
    }

    /// Sort by `(order, explicitly-ordered-first)`, appended members last in input order.
    pub fn arrange<I>(members: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, Slot)>,
    {
        let mut keyed: Vec<((u64, u8), Uuid)> = members.into_iter().map(|(id, slot)| (slot.sort_key(), id)).collect();
        keyed.sort_by_key(|(k, _)| *k);
        Self { ids: keyed.into_iter().map(|(_, id)| id).collect() }
    }

    /// Replace the sequence with `ordered`, which must be exactly the current membership.
    pub fn reorder(&mut self, ordered: &[Uuid]) -> Result<(), TaxonomyError> {
        let mut seen = HashSet::with_capacity(ordered.len());
        if let Some(dup) = ordered.iter().find(|id| !seen.insert(**id)) {
            return Err(TaxonomyError::OrderConflict(format!("id {} listed more than once", dup)));
        }
        let current: HashSet<Uuid> = self.ids.iter().copied().collect();
        if let Some(extra) = ordered.iter().find(|id| !current.contains(id)) {
            return Err(TaxonomyError::OrderConflict(format!("id {} is not a member of this scope", extra)));
        }
        if let Some(missing) = self.ids.iter().find(|id| !seen.contains(id)) {
            return Err(TaxonomyError::OrderConflict(format!("id {} is missing from the submitted order", missing)));
        }
        self.ids = ordered.to_vec();
        Ok(())
    }

    /// Insert at `position` (clamped to the end) or append; returns the final position.
    pub fn insert(&mut self, id: Uuid, position: Option<u32>) -> u32 {
        self.remove(id);
        let at = position.map(|p| (p as usize).min(self.ids.len())).unwrap_or(self.ids.len());
        self.ids.insert(at, id);
        at as u32
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        match self.ids.iter().position(|m| *m == id) {
            Some(idx) => {
                self.ids.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn position(&self, id: Uuid) -> Option<u32> {
        self.ids.iter().position(|m| *m == id).map(|p| p as u32)
    }

    pub fn contains(&self, id: Uuid) -> bool { self.ids.contains(&id) }

    pub fn ids(&self) -> &[Uuid] { &self.ids }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Write positions onto `members` in scope order. Each entry carries
    /// whether its position changed; members not in the scope are dropped.
    pub fn apply<T: Positioned>(&self, members: Vec<T>) -> Vec<(T, bool)> {
        let mut slots: Vec<Option<T>> = (0..self.ids.len()).map(|_| None).collect();
        for m in members {
            if let Some(idx) = self.ids.iter().position(|id| *id == m.id()) {
                slots[idx] = Some(m);
            }
        }
        slots
            .into_iter()
            .enumerate()
            .filter_map(|(idx, m)| {
                let mut m = m?;
                let changed = m.position() != Some(idx as u32);
                m.set_position(idx as u32);
                Some((m, changed))
            })
            .collect()
    }
}
