use std::sync::Arc;

use relay_api::topics::VISION_DETECTIONS_TOPIC;
use relay_api::{ExternalReceiver, RelayError};
use relay_engine::{DataBus, DataWriter, Processor};

fn default_max_records() -> usize {
    20
}

fn default_max_messages() -> usize {
    64
}

fn default_topic() -> String {
    VISION_DETECTIONS_TOPIC.into()
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct VisionCollectorConfig {
    pub max_records_to_persist: usize,
    /// Upper bound on datagrams drained per tick.
    pub max_messages_per_tick: usize,
    pub topic: String,
}

impl Default for VisionCollectorConfig {
    fn default() -> Self {
        Self {
            max_records_to_persist: default_max_records(),
            max_messages_per_tick: default_max_messages(),
            topic: default_topic(),
        }
    }
}

/// Vision collector: external receiver → raw SSL frames → vision topic.
///
/// Frames are stored undecoded; decoding is the consumer's job.
pub struct VisionDetectionsCollector {
    name: String,
    config: VisionCollectorConfig,
    receiver: Box<dyn ExternalReceiver>,
    writer: Option<DataWriter<Vec<u8>>>,
}

impl VisionDetectionsCollector {
    pub fn new(
        name: impl Into<String>,
        config: VisionCollectorConfig,
        receiver: Box<dyn ExternalReceiver>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            receiver,
            writer: None,
        }
    }
}

impl Processor for VisionDetectionsCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, bus: &Arc<DataBus>) -> Result<(), RelayError> {
        if self.config.max_messages_per_tick == 0 {
            return Err(RelayError::config("max_messages_per_tick must be positive"));
        }
        self.writer = Some(DataWriter::new(
            bus,
            self.config.topic.clone(),
            self.config.max_records_to_persist,
        )?);
        Ok(())
    }

    fn process(&mut self) -> Result<(), RelayError> {
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| RelayError::uninitialized("writer"))?;

        let mut received = 0usize;
        while received < self.config.max_messages_per_tick {
            let Some(message) = self.receiver.next_message()? else {
                break;
            };
            writer.write(message)?;
            received += 1;
        }
        if received > 0 {
            tracing::trace!(processor = %self.name, received, "vision frames collected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_engine::DataReader;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Vec<u8>>);

    impl ExternalReceiver for Scripted {
        fn next_message(&mut self) -> Result<Option<Vec<u8>>, RelayError> {
            Ok(self.0.pop_front())
        }
    }

    struct Failing;

    impl ExternalReceiver for Failing {
        fn next_message(&mut self) -> Result<Option<Vec<u8>>, RelayError> {
            Err(RelayError::io("socket closed"))
        }
    }

    fn collector(messages: &[&[u8]], config: VisionCollectorConfig) -> VisionDetectionsCollector {
        let queue = messages.iter().map(|m| m.to_vec()).collect();
        VisionDetectionsCollector::new("vision", config, Box::new(Scripted(queue)))
    }

    #[test]
    fn writes_every_frame_in_order() {
        let bus = Arc::new(DataBus::new());
        let mut vision = collector(&[b"f1", b"f2", b"f3"], VisionCollectorConfig::default());
        vision.initialize(&bus).unwrap();
        vision.process().unwrap();

        let mut reader = DataReader::<Vec<u8>>::new(&bus, VISION_DETECTIONS_TOPIC);
        let frames: Vec<Vec<u8>> = reader
            .read_new()
            .unwrap()
            .iter()
            .map(|r| r.content.clone())
            .collect();
        assert_eq!(frames, vec![b"f1".to_vec(), b"f2".to_vec(), b"f3".to_vec()]);
    }

    #[test]
    fn caps_frames_per_tick() {
        let bus = Arc::new(DataBus::new());
        let config = VisionCollectorConfig {
            max_messages_per_tick: 2,
            ..Default::default()
        };
        let mut vision = collector(&[b"a", b"b", b"c"], config);
        vision.initialize(&bus).unwrap();
        let mut reader = DataReader::<Vec<u8>>::new(&bus, VISION_DETECTIONS_TOPIC);

        vision.process().unwrap();
        assert_eq!(reader.read_new().unwrap().len(), 2);
        vision.process().unwrap();
        assert_eq!(reader.read_new().unwrap().len(), 1);
    }

    #[test]
    fn idle_tick_creates_nothing() {
        let bus = Arc::new(DataBus::new());
        let mut vision = collector(&[], VisionCollectorConfig::default());
        vision.initialize(&bus).unwrap();
        vision.process().unwrap();
        assert!(!bus.contains(VISION_DETECTIONS_TOPIC));
    }

    #[test]
    fn receiver_errors_propagate() {
        let bus = Arc::new(DataBus::new());
        let mut vision =
            VisionDetectionsCollector::new("vision", VisionCollectorConfig::default(), Box::new(Failing));
        vision.initialize(&bus).unwrap();
        assert_eq!(vision.process().unwrap_err().kind(), relay_api::ErrorKind::Io);
    }

    #[test]
    fn rejects_zero_capacity() {
        let bus = Arc::new(DataBus::new());
        let config = VisionCollectorConfig {
            max_records_to_persist: 0,
            ..Default::default()
        };
        let mut vision = collector(&[], config);
        assert_eq!(vision.initialize(&bus).unwrap_err().kind(), relay_api::ErrorKind::Bus);
    }
}
