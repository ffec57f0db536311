use std::sync::Arc;

use relay_api::topics::{
    BOX_FEEDBACK_TOPIC, REFEREE_COMMANDS_TOPIC, ROBOT_COMMANDS_TOPIC, VISION_DETECTIONS_TOPIC,
};
use relay_api::{CommandPacket, RefereeCommand, RelayError};
use relay_engine::{DataBus, DataReader, DataWriter, Processor};

use crate::flatten::{FrameFlattener, PacketMode, VisionTables};
use crate::frame::TelemetryFrame;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub max_commands_to_persist: usize,
    pub packet_mode: PacketMode,
    pub vision_topic: String,
    pub referee_topic: String,
    pub feedback_topic: String,
    pub commands_topic: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_commands_to_persist: 20,
            packet_mode: PacketMode::default(),
            vision_topic: VISION_DETECTIONS_TOPIC.into(),
            referee_topic: REFEREE_COMMANDS_TOPIC.into(),
            feedback_topic: BOX_FEEDBACK_TOPIC.into(),
            commands_topic: ROBOT_COMMANDS_TOPIC.into(),
        }
    }
}

struct Ports {
    vision: DataReader<Vec<u8>>,
    referee: DataReader<RefereeCommand>,
    feedback: DataReader<Vec<u8>>,
    commands: DataWriter<CommandPacket>,
}

/// Turns vision frames into robot command packets.
///
/// Tables are zeroed at the start of every tick that has new vision records
/// and accumulate across that tick's frames; each frame yields one packet.
/// The referee snapshot carries over between ticks.
pub struct Controller {
    name: String,
    config: ControllerConfig,
    ports: Option<Ports>,
    tables: VisionTables,
    referee: RefereeCommand,
    flattener: FrameFlattener,
}

impl Controller {
    pub fn new(name: impl Into<String>, config: ControllerConfig) -> Self {
        let flattener = FrameFlattener::new(config.packet_mode);
        Self {
            name: name.into(),
            config,
            ports: None,
            tables: VisionTables::new(),
            referee: RefereeCommand::default(),
            flattener,
        }
    }

    /// Last referee command seen.
    pub fn referee(&self) -> &RefereeCommand {
        &self.referee
    }
}

impl Processor for Controller {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, bus: &Arc<DataBus>) -> Result<(), RelayError> {
        if self.flattener.mode() == PacketMode::Placeholder {
            tracing::warn!(
                processor = %self.name,
                "placeholder packet mode: command packets are a constant stub, not vision data"
            );
        }
        self.ports = Some(Ports {
            vision: DataReader::new(bus, self.config.vision_topic.clone()),
            referee: DataReader::new(bus, self.config.referee_topic.clone()),
            feedback: DataReader::new(bus, self.config.feedback_topic.clone()),
            commands: DataWriter::new(
                bus,
                self.config.commands_topic.clone(),
                self.config.max_commands_to_persist,
            )?,
        });
        Ok(())
    }

    fn process(&mut self) -> Result<(), RelayError> {
        let ports = self
            .ports
            .as_mut()
            .ok_or_else(|| RelayError::uninitialized("controller"))?;

        if let Some(record) = ports.referee.read_latest()? {
            self.referee = record.content.clone();
        }

        if let Some(record) = ports.feedback.read_latest()? {
            tracing::debug!(
                processor = %self.name,
                sequence = record.sequence,
                bytes = record.content.len(),
                "box feedback"
            );
        }

        let frames = ports.vision.read_new()?;
        if frames.is_empty() {
            return Ok(());
        }

        // The cursor is already past the whole batch, so one bad frame must
        // not cost the frames after it.
        let mut decoded = Vec::with_capacity(frames.len());
        let mut first_error = None;
        let mut dropped = 0usize;
        for record in &frames {
            match TelemetryFrame::decode(&record.content) {
                Ok(frame) => decoded.push(frame),
                Err(e) => {
                    dropped += 1;
                    first_error
                        .get_or_insert_with(|| e.with_context(format!("vision record {}", record.sequence)));
                }
            }
        }

        self.tables.reset();
        for frame in &decoded {
            let (packet, _) = self.flattener.flatten(&mut self.tables, frame, &self.referee);
            ports.commands.write(packet)?;
        }
        tracing::trace!(processor = %self.name, frames = decoded.len(), "command packets written");

        match first_error {
            Some(e) => {
                tracing::warn!(processor = %self.name, dropped, written = decoded.len(), "undecodable vision frames dropped");
                Err(e)
            }
            None => Ok(()),
        }
    }
}
