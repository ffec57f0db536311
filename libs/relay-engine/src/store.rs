use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use relay_api::Record;

struct Ring<T> {
    slots: Vec<Option<Arc<Record<T>>>>,
    /// Sequence the next append receives. Sequences start at 1.
    next_sequence: u64,
}

impl<T> Ring<T> {
    fn latest(&self) -> u64 {
        self.next_sequence - 1
    }

    fn oldest(&self, capacity: u64) -> u64 {
        let latest = self.latest();
        if latest >= capacity { latest - capacity + 1 } else { 1 }
    }
}

/// Bounded history of one topic.
///
/// Records live in a fixed ring indexed by `sequence % capacity`; an append
/// into a full ring overwrites the oldest record. Appends take the write
/// lock, reads take the read lock, so a reader always sees a consistent
/// window and readers never block each other.
pub struct TopicStore<T> {
    name: String,
    capacity: usize,
    ring: RwLock<Ring<T>>,
}

impl<T> std::fmt::Debug for TopicStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicStore")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl<T> TopicStore<T> {
    /// `capacity` must be positive; [`DataBus`](crate::DataBus) checks it.
    pub(crate) fn new(name: String, capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            name,
            capacity,
            ring: RwLock::new(Ring {
                slots: vec![None; capacity],
                next_sequence: 1,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record, evicting the oldest one when full. Returns the new
    /// record's sequence.
    pub fn append(&self, content: T) -> u64 {
        let mut ring = self.write_ring();
        let sequence = ring.next_sequence;
        let slot = (sequence % self.capacity as u64) as usize;
        ring.slots[slot] = Some(Arc::new(Record::new(content, sequence)));
        ring.next_sequence += 1;
        sequence
    }

    /// All retained records with `sequence > cursor`, oldest first.
    pub fn read_after(&self, cursor: u64) -> Vec<Arc<Record<T>>> {
        let ring = self.read_ring();
        let latest = ring.latest();
        if latest <= cursor {
            return Vec::new();
        }
        let capacity = self.capacity as u64;
        let from = (cursor + 1).max(ring.oldest(capacity));
        (from..=latest)
            .filter_map(|seq| ring.slots[(seq % capacity) as usize].clone())
            .collect()
    }

    /// Every retained record, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<Record<T>>> {
        self.read_after(0)
    }

    /// Sequence of the newest record, 0 if nothing was ever written.
    pub fn latest_sequence(&self) -> u64 {
        self.read_ring().latest()
    }

    /// Sequence of the oldest retained record.
    pub fn oldest_sequence(&self) -> Option<u64> {
        let ring = self.read_ring();
        (ring.latest() > 0).then(|| ring.oldest(self.capacity as u64))
    }

    pub fn len(&self) -> usize {
        (self.read_ring().latest() as usize).min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.read_ring().latest() == 0
    }

    fn read_ring(&self) -> RwLockReadGuard<'_, Ring<T>> {
        match self.ring.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!(topic = %self.name, "topic read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_ring(&self) -> RwLockWriteGuard<'_, Ring<T>> {
        match self.ring.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!(topic = %self.name, "topic write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
