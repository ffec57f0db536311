//! Names of the bus topics shared between processors.

/// Raw SSL-Vision wrapper frames as received from the vision transport.
pub const VISION_DETECTIONS_TOPIC: &str = "vision_detections";

/// Decoded [`RefereeCommand`](crate::RefereeCommand) snapshots.
pub const REFEREE_COMMANDS_TOPIC: &str = "referee_commands";

/// Flattened command packets ready for the robot transport.
pub const ROBOT_COMMANDS_TOPIC: &str = "robot_commands";

/// Opaque feedback frames from the robot command box.
pub const BOX_FEEDBACK_TOPIC: &str = "box_feedback";
