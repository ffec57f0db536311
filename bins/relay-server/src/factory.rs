use relay_engine::config::ProcessorConfig;
use relay_engine::{EngineError, Processor};
use relay_processor_commands_sender::{CommandsSenderConfig, RobotCommandsSender};
use relay_processor_controller::{Controller, ControllerConfig};
use relay_processor_referee_collector::{RefereeCollectorConfig, RefereeCommandsCollector};
use relay_processor_vision_collector::{VisionCollectorConfig, VisionDetectionsCollector};
use relay_transport_udp::{UdpReceiver, UdpReceiverConfig, UdpSender, UdpSenderConfig};

/// Build a processor from its `[[processors]]` entry.
///
/// Transport settings live in the same `config` table as the processor's own.
pub fn build(cfg: &ProcessorConfig) -> Result<Box<dyn Processor>, EngineError> {
    let processor: Box<dyn Processor> = match cfg.kind.as_str() {
        "vision-collector" => {
            let settings: VisionCollectorConfig = cfg.settings()?;
            let udp: UdpReceiverConfig = cfg.require()?;
            let receiver = UdpReceiver::bind(&udp).map_err(|e| EngineError::processor(&cfg.name, e))?;
            Box::new(VisionDetectionsCollector::new(&cfg.name, settings, Box::new(receiver)))
        }
        "referee-collector" => {
            let settings: RefereeCollectorConfig = cfg.settings()?;
            let mut udp: UdpReceiverConfig = cfg.require()?;
            // Only the newest referee decision matters.
            udp.conflate = true;
            let receiver = UdpReceiver::bind(&udp).map_err(|e| EngineError::processor(&cfg.name, e))?;
            Box::new(RefereeCommandsCollector::new(&cfg.name, settings, Box::new(receiver)))
        }
        "controller" => {
            let settings: ControllerConfig = cfg.settings()?;
            Box::new(Controller::new(&cfg.name, settings))
        }
        "commands-sender" => {
            let settings: CommandsSenderConfig = cfg.settings()?;
            let udp: UdpSenderConfig = cfg.require()?;
            let sender = UdpSender::connect(&udp).map_err(|e| EngineError::processor(&cfg.name, e))?;
            Box::new(RobotCommandsSender::new(&cfg.name, settings, Box::new(sender)))
        }
        other => {
            return Err(EngineError::Config(format!(
                "processor '{}': unknown kind '{other}'",
                cfg.name
            )));
        }
    };
    tracing::debug!(processor = %cfg.name, kind = %cfg.kind, "processor built");
    Ok(processor)
}
