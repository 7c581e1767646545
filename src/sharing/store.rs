//! Bounded store of share sets keyed by operation identifier.

use std::borrow::Borrow;
use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::ShareSet;

/// Default number of share sets retained before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Share sets retained between a share operation and its reconstruction.
///
/// Entries are evicted oldest-first once `capacity` is exceeded. Replacing
/// an existing identifier refreshes its position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareStore<ID: Ord> {
    sets: BTreeMap<ID, ShareSet>,
    order: VecDeque<ID>,
    capacity: usize,
}

impl<ID: Ord + Clone> Default for ShareStore<ID> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<ID: Ord + Clone> ShareStore<ID> {
    /// Create an empty store. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            sets: BTreeMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Change the capacity, evicting the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.sets.len() > self.capacity {
            self.evict_oldest();
        }
    }

    /// Insert a set, returning the identifier evicted to make room, if any.
    pub fn insert(&mut self, id: ID, set: ShareSet) -> Option<ID> {
        if self.sets.insert(id.clone(), set).is_some() {
            self.order.retain(|existing| existing != &id);
        }
        self.order.push_back(id);
        if self.sets.len() > self.capacity {
            self.evict_oldest()
        } else {
            None
        }
    }

    fn evict_oldest(&mut self) -> Option<ID> {
        let oldest = self.order.pop_front()?;
        self.sets.remove(&oldest);
        Some(oldest)
    }

    /// Look up a set.
    pub fn get<Q>(&self, id: &Q) -> Option<&ShareSet>
    where
        ID: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.sets.get(id)
    }

    /// Remove a set.
    pub fn remove<Q>(&mut self, id: &Q) -> Option<ShareSet>
    where
        ID: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let removed = self.sets.remove(id)?;
        self.order
            .retain(|existing| <ID as Borrow<Q>>::borrow(existing) != id);
        Some(removed)
    }

    /// Remove all sets.
    pub fn clear(&mut self) {
        self.sets.clear();
        self.order.clear();
    }

    /// Number of retained sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Maximum number of retained sets.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
