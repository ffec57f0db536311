use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use relay_api::Record;

use crate::error::BusError;
use crate::store::TopicStore;

type AnyStore = Arc<dyn Any + Send + Sync>;

/// Registry of all topics in the process.
///
/// Built once at startup and handed to every processor by reference. A
/// topic's payload type and capacity are fixed by whoever creates it first;
/// topics are never removed.
#[derive(Default)]
pub struct DataBus {
    topics: RwLock<HashMap<String, AnyStore>>,
}

impl std::fmt::Debug for DataBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBus")
            .field("topics", &self.topic_names())
            .finish()
    }
}

impl DataBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the store for `name`, creating it with `capacity` if absent.
    ///
    /// The capacity of an existing store is left untouched. Creation happens
    /// under the registry write lock, so racing first writers share one store.
    pub fn get_or_create<T>(&self, name: &str, capacity: usize) -> Result<Arc<TopicStore<T>>, BusError>
    where
        T: Send + Sync + 'static,
    {
        if let Some(store) = self.get::<T>(name)? {
            return Ok(store);
        }
        if capacity == 0 {
            return Err(BusError::ZeroCapacity {
                topic: name.to_string(),
            });
        }

        let mut guard = self.write_topics();
        let entry = guard.entry(name.to_string()).or_insert_with(|| {
            tracing::info!(topic = %name, capacity, "created topic");
            Arc::new(TopicStore::<T>::new(name.to_string(), capacity)) as AnyStore
        });
        downcast(name, entry.clone())
    }

    /// Look up an existing store without creating it.
    pub fn get<T>(&self, name: &str) -> Result<Option<Arc<TopicStore<T>>>, BusError>
    where
        T: Send + Sync + 'static,
    {
        let store = self.read_topics().get(name).cloned();
        store.map(|s| downcast(name, s)).transpose()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_topics().contains_key(name)
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_topics().keys().cloned().collect();
        names.sort();
        names
    }

    fn read_topics(&self) -> RwLockReadGuard<'_, HashMap<String, AnyStore>> {
        match self.topics.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("data bus read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_topics(&self) -> RwLockWriteGuard<'_, HashMap<String, AnyStore>> {
        match self.topics.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("data bus write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

fn downcast<T>(name: &str, store: AnyStore) -> Result<Arc<TopicStore<T>>, BusError>
where
    T: Send + Sync + 'static,
{
    store
        .downcast::<TopicStore<T>>()
        .map_err(|_| BusError::TypeMismatch {
            topic: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

// ---------------------------------------------------------------------------
// DataWriter
// ---------------------------------------------------------------------------

/// Appends records to one topic. The topic is created on the first write.
///
/// A writer holds no state beyond its binding, so several producers may
/// share one behind an `Arc`; appends are serialized by the store.
pub struct DataWriter<T> {
    bus: Arc<DataBus>,
    topic: String,
    capacity: usize,
    store: OnceLock<Arc<TopicStore<T>>>,
}

impl<T> std::fmt::Debug for DataWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataWriter")
            .field("topic", &self.topic)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> DataWriter<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(bus: &Arc<DataBus>, topic: impl Into<String>, capacity: usize) -> Result<Self, BusError> {
        let topic = topic.into();
        if capacity == 0 {
            return Err(BusError::ZeroCapacity { topic });
        }
        Ok(Self {
            bus: bus.clone(),
            topic,
            capacity,
            store: OnceLock::new(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `content` as a new record, visible to readers immediately.
    pub fn write(&self, content: T) -> Result<(), BusError> {
        let sequence = self.store()?.append(content);
        tracing::trace!(topic = %self.topic, sequence, "record written");
        Ok(())
    }

    fn store(&self) -> Result<&Arc<TopicStore<T>>, BusError> {
        if let Some(store) = self.store.get() {
            return Ok(store);
        }
        let store = self.bus.get_or_create::<T>(&self.topic, self.capacity)?;
        Ok(self.store.get_or_init(|| store))
    }
}

// ---------------------------------------------------------------------------
// DataReader
// ---------------------------------------------------------------------------

/// Reads unseen records from one topic.
///
/// Each record is returned at most once per reader. Records evicted before
/// the reader polls are skipped silently: consumers act on the newest state,
/// not on every intermediate value.
pub struct DataReader<T> {
    bus: Arc<DataBus>,
    topic: String,
    store: Option<Arc<TopicStore<T>>>,
    cursor: u64,
}

impl<T> std::fmt::Debug for DataReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("topic", &self.topic)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<T> DataReader<T>
where
    T: Send + Sync + 'static,
{
    /// Bind to `topic`. The topic need not exist yet.
    pub fn new(bus: &Arc<DataBus>, topic: impl Into<String>) -> Self {
        Self {
            bus: bus.clone(),
            topic: topic.into(),
            store: None,
            cursor: 0,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Sequence of the last record returned, 0 before the first read.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Every retained record newer than the cursor, in sequence order.
    pub fn read_new(&mut self) -> Result<Vec<Arc<Record<T>>>, BusError> {
        let store = match &self.store {
            Some(store) => store.clone(),
            None => match self.bus.get::<T>(&self.topic)? {
                Some(store) => {
                    self.store = Some(store.clone());
                    store
                }
                None => return Ok(Vec::new()),
            },
        };

        let records = store.read_after(self.cursor);
        if let (Some(first), Some(last)) = (records.first(), records.last()) {
            let missed = first.sequence - self.cursor - 1;
            if missed > 0 {
                tracing::debug!(topic = %self.topic, missed, "reader skipped evicted records");
            }
            self.cursor = last.sequence;
        }
        Ok(records)
    }

    /// Newest unseen record, discarding any older unseen ones.
    pub fn read_latest(&mut self) -> Result<Option<Arc<Record<T>>>, BusError> {
        Ok(self.read_new()?.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(records: &[Arc<Record<u32>>]) -> Vec<u32> {
        records.iter().map(|r| r.content).collect()
    }

    #[test]
    fn get_or_create_returns_same_store() {
        let bus = DataBus::new();
        let a = bus.get_or_create::<u32>("t", 5).unwrap();
        let b = bus.get_or_create::<u32>("t", 50).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.capacity(), 5);
        assert_eq!(bus.topic_names(), vec!["t".to_string()]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let bus = Arc::new(DataBus::new());
        assert!(matches!(
            bus.get_or_create::<u32>("t", 0),
            Err(BusError::ZeroCapacity { .. })
        ));
        assert!(!bus.contains("t"));
        assert!(DataWriter::<u32>::new(&bus, "t", 0).is_err());
    }

    #[test]
    fn type_clash_is_reported() {
        let bus = Arc::new(DataBus::new());
        bus.get_or_create::<u32>("t", 5).unwrap();
        let err = bus.get_or_create::<String>("t", 5).unwrap_err();
        assert!(matches!(err, BusError::TypeMismatch { ref topic, .. } if topic == "t"));

        let mut reader = DataReader::<String>::new(&bus, "t");
        assert!(reader.read_new().is_err());
    }

    #[test]
    fn writer_creates_topic_lazily() {
        let bus = Arc::new(DataBus::new());
        let writer = DataWriter::<u32>::new(&bus, "t", 3).unwrap();
        assert!(!bus.contains("t"));
        writer.write(1).unwrap();
        assert!(bus.contains("t"));
    }

    #[test]
    fn reader_before_topic_exists_sees_nothing_then_catches_up() {
        let bus = Arc::new(DataBus::new());
        let mut reader = DataReader::<u32>::new(&bus, "t");
        assert!(reader.read_new().unwrap().is_empty());
        assert_eq!(reader.cursor(), 0);

        let writer = DataWriter::<u32>::new(&bus, "t", 10).unwrap();
        writer.write(7).unwrap();
        writer.write(8).unwrap();
        assert_eq!(contents(&reader.read_new().unwrap()), vec![7, 8]);
        assert_eq!(reader.cursor(), 2);
        assert!(reader.read_new().unwrap().is_empty());
    }

    #[test]
    fn readers_are_independent() {
        let bus = Arc::new(DataBus::new());
        let writer = DataWriter::<u32>::new(&bus, "t", 10).unwrap();
        let mut a = DataReader::<u32>::new(&bus, "t");
        let mut b = DataReader::<u32>::new(&bus, "t");

        writer.write(1).unwrap();
        assert_eq!(contents(&a.read_new().unwrap()), vec![1]);
        writer.write(2).unwrap();
        assert_eq!(contents(&a.read_new().unwrap()), vec![2]);
        assert_eq!(contents(&b.read_new().unwrap()), vec![1, 2]);
    }

    #[test]
    fn lagging_reader_skips_evicted_records() {
        let bus = Arc::new(DataBus::new());
        let writer = DataWriter::<u32>::new(&bus, "t", 3).unwrap();
        let mut reader = DataReader::<u32>::new(&bus, "t");

        writer.write(0).unwrap();
        assert_eq!(contents(&reader.read_new().unwrap()), vec![0]);
        for v in 1..10 {
            writer.write(v).unwrap();
        }
        let records = reader.read_new().unwrap();
        assert_eq!(contents(&records), vec![7, 8, 9]);
        assert_eq!(reader.cursor(), 10);
    }

    #[test]
    fn read_latest_drops_older_unseen() {
        let bus = Arc::new(DataBus::new());
        let writer = DataWriter::<u32>::new(&bus, "t", 10).unwrap();
        let mut reader = DataReader::<u32>::new(&bus, "t");
        assert!(reader.read_latest().unwrap().is_none());

        for v in 1..=4 {
            writer.write(v).unwrap();
        }
        assert_eq!(reader.read_latest().unwrap().map(|r| r.content), Some(4));
        assert!(reader.read_latest().unwrap().is_none());
    }

    #[test]
    fn concurrent_first_writers_share_one_store() {
        let bus = Arc::new(DataBus::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    let writer = DataWriter::<u32>::new(&bus, "t", 1000).unwrap();
                    for v in 0..100u32 {
                        writer.write(i * 100 + v).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let store = bus.get::<u32>("t").unwrap().unwrap();
        assert_eq!(store.len(), 800);
        let seqs: Vec<u64> = store.snapshot().iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, (1..=800).collect::<Vec<_>>());
    }

    #[test]
    fn reader_never_sees_partial_eviction() {
        const WRITES: u64 = 50_000;
        let bus = Arc::new(DataBus::new());
        let writer = DataWriter::<u64>::new(&bus, "t", 4).unwrap();
        writer.write(1).unwrap();

        let producer = std::thread::spawn(move || {
            for v in 2..=WRITES {
                writer.write(v).unwrap();
            }
        });

        let mut reader = DataReader::<u64>::new(&bus, "t");
        let mut last = 0u64;
        while last < WRITES {
            let batch = reader.read_new().unwrap();
            assert!(batch.len() <= 4);
            for record in batch {
                assert!(record.sequence > last, "sequence went backwards");
                assert_eq!(record.content, record.sequence);
                last = record.sequence;
            }
        }
        producer.join().unwrap();
        assert_eq!(reader.cursor(), WRITES);
    }
}
