//! The pending set: repositories not yet migrated in this run.

use std::collections::VecDeque;

use crate::git::RepositoryHandle;

/// A repository waiting for its next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub handle: RepositoryHandle,
    /// failed attempts so far
    pub attempts: u32,
}

/// Ordered retry queue.
///
/// A cycle takes every queued item out at once; items come back only through
/// [`RetryQueue::requeue`], so an item is queued at most once at any time and
/// visited at most once per cycle.
#[derive(Debug, Default)]
pub struct RetryQueue {
    items: VecDeque<Pending>,
}

impl RetryQueue {
    /// Queue every handle with zero attempts, dropping duplicates.
    pub fn new(handles: impl IntoIterator<Item = RepositoryHandle>) -> Self {
        let mut queue = Self::default();
        for handle in handles {
            if !queue.contains(&handle) {
                queue.items.push_back(Pending { handle, attempts: 0 });
            }
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove and return everything currently queued, in order.
    pub fn take_cycle(&mut self) -> Vec<Pending> {
        self.items.drain(..).collect()
    }

    /// Put a failed item back at the end of the queue.
    pub fn requeue(&mut self, item: Pending) {
        debug_assert!(!self.contains(&item.handle));
        self.items.push_back(item);
    }

    pub fn contains(&self, handle: &RepositoryHandle) -> bool {
        self.items.iter().any(|item| item.handle.path() == handle.path())
    }
}
