use std::sync::Arc;

use relay_api::topics::REFEREE_COMMANDS_TOPIC;
use relay_api::{ExternalReceiver, RefereeCommand, RelayError};
use relay_engine::{DataBus, DataWriter, Processor};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct RefereeCollectorConfig {
    pub max_records_to_persist: usize,
    pub topic: String,
}

impl Default for RefereeCollectorConfig {
    fn default() -> Self {
        Self {
            max_records_to_persist: 30,
            topic: REFEREE_COMMANDS_TOPIC.into(),
        }
    }
}

/// Referee collector: takes at most one JSON message per tick, decodes it
/// into a [`RefereeCommand`] and publishes it.
///
/// A malformed message fails the tick.
pub struct RefereeCommandsCollector {
    name: String,
    config: RefereeCollectorConfig,
    receiver: Box<dyn ExternalReceiver>,
    writer: Option<DataWriter<RefereeCommand>>,
}

impl RefereeCommandsCollector {
    pub fn new(
        name: impl Into<String>,
        config: RefereeCollectorConfig,
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

impl Processor for RefereeCommandsCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, bus: &Arc<DataBus>) -> Result<(), RelayError> {
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

        let Some(message) = self.receiver.next_message()? else {
            return Ok(());
        };
        let command = RefereeCommand::from_json(&message)?;
        tracing::debug!(
            processor = %self.name,
            state = %command.state,
            team = %command.command_for_team,
            is_left = command.is_part_of_field_left,
            "referee command received"
        );
        writer.write(command)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_api::{ErrorKind, RefereeTag};
    use relay_engine::DataReader;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Vec<u8>>);

    impl ExternalReceiver for Scripted {
        fn next_message(&mut self) -> Result<Option<Vec<u8>>, RelayError> {
            Ok(self.0.pop_front())
        }
    }

    fn setup(messages: &[&str]) -> (Arc<DataBus>, RefereeCommandsCollector) {
        let bus = Arc::new(DataBus::new());
        let queue = messages.iter().map(|m| m.as_bytes().to_vec()).collect();
        let mut referee = RefereeCommandsCollector::new(
            "referee",
            RefereeCollectorConfig::default(),
            Box::new(Scripted(queue)),
        );
        referee.initialize(&bus).unwrap();
        (bus, referee)
    }

    #[test]
    fn one_message_per_tick() {
        let (bus, mut referee) = setup(&[
            r#"{"state": 1, "team": 0, "is_left": true}"#,
            r#"{"state": 2, "team": 1, "is_left": false}"#,
        ]);
        let mut reader = DataReader::<RefereeCommand>::new(&bus, REFEREE_COMMANDS_TOPIC);

        referee.process().unwrap();
        let first = reader.read_new().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].content.state, RefereeTag::Code(1));
        assert!(first[0].content.is_part_of_field_left);

        referee.process().unwrap();
        let second = reader.read_latest().unwrap().unwrap();
        assert_eq!(second.content.command_for_team, RefereeTag::Code(1));
    }

    #[test]
    fn no_message_is_a_noop() {
        let (bus, mut referee) = setup(&[]);
        referee.process().unwrap();
        assert!(!bus.contains(REFEREE_COMMANDS_TOPIC));
    }

    #[test]
    fn malformed_message_fails_tick() {
        let (bus, mut referee) = setup(&["not json"]);
        let err = referee.process().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(!bus.contains(REFEREE_COMMANDS_TOPIC));
    }
}
