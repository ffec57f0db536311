use std::sync::Arc;

use relay_api::topics::ROBOT_COMMANDS_TOPIC;
use relay_api::{CommandPacket, PacketSink, RelayError};
use relay_engine::{DataBus, DataReader, Processor};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct CommandsSenderConfig {
    pub topic: String,
}

impl Default for CommandsSenderConfig {
    fn default() -> Self {
        Self {
            topic: ROBOT_COMMANDS_TOPIC.into(),
        }
    }
}

/// Commands sender: newest command packet of the tick → packet sink.
///
/// Older packets written in the same tick are superseded and never sent.
pub struct RobotCommandsSender {
    name: String,
    config: CommandsSenderConfig,
    sink: Box<dyn PacketSink>,
    reader: Option<DataReader<CommandPacket>>,
    sent: u64,
    dropped: u64,
}

impl RobotCommandsSender {
    pub fn new(name: impl Into<String>, config: CommandsSenderConfig, sink: Box<dyn PacketSink>) -> Self {
        Self {
            name: name.into(),
            config,
            sink,
            reader: None,
            sent: 0,
            dropped: 0,
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Processor for RobotCommandsSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, bus: &Arc<DataBus>) -> Result<(), RelayError> {
        self.reader = Some(DataReader::new(bus, self.config.topic.clone()));
        Ok(())
    }

    fn process(&mut self) -> Result<(), RelayError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| RelayError::uninitialized("reader"))?;

        let Some(record) = reader.read_latest()? else {
            return Ok(());
        };
        let bytes = record.content.to_bytes();
        if self.sink.send(&bytes)? {
            self.sent += 1;
            tracing::trace!(processor = %self.name, sequence = record.sequence, bytes = bytes.len(), "command packet sent");
        } else {
            self.dropped += 1;
            tracing::warn!(processor = %self.name, sequence = record.sequence, dropped = self.dropped, "send buffer full, command packet dropped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_engine::DataWriter;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<Vec<u8>>>>);

    struct FakeSink {
        captured: Captured,
        accept: bool,
    }

    impl PacketSink for FakeSink {
        fn send(&mut self, packet: &[u8]) -> Result<bool, RelayError> {
            if self.accept {
                self.captured.0.lock().unwrap().push(packet.to_vec());
            }
            Ok(self.accept)
        }
    }

    fn setup(accept: bool) -> (DataWriter<CommandPacket>, RobotCommandsSender, Captured) {
        let bus = Arc::new(DataBus::new());
        let captured = Captured::default();
        let sink = FakeSink {
            captured: captured.clone(),
            accept,
        };
        let mut sender = RobotCommandsSender::new("sender", CommandsSenderConfig::default(), Box::new(sink));
        sender.initialize(&bus).unwrap();
        let writer = DataWriter::new(&bus, ROBOT_COMMANDS_TOPIC, 20).unwrap();
        (writer, sender, captured)
    }

    #[test]
    fn sends_only_newest_packet() {
        let (writer, mut sender, captured) = setup(true);
        writer.write(CommandPacket::new(vec![1.0])).unwrap();
        writer.write(CommandPacket::new(vec![2.0, 3.0])).unwrap();
        sender.process().unwrap();

        let sent = captured.0.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            CommandPacket::from_bytes(&sent[0]).unwrap(),
            CommandPacket::new(vec![2.0, 3.0])
        );
        assert_eq!(sender.sent(), 1);
    }

    #[test]
    fn nothing_new_sends_nothing() {
        let (writer, mut sender, captured) = setup(true);
        sender.process().unwrap();
        writer.write(CommandPacket::new(vec![1.0])).unwrap();
        sender.process().unwrap();
        sender.process().unwrap();
        assert_eq!(captured.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn full_buffer_is_counted_not_failed() {
        let (writer, mut sender, captured) = setup(false);
        writer.write(CommandPacket::new(vec![1.0])).unwrap();
        sender.process().unwrap();
        assert_eq!(sender.dropped(), 1);
        assert_eq!(sender.sent(), 0);
        assert!(captured.0.lock().unwrap().is_empty());
    }
}
