//! Vision controller: decodes SSL-Vision frames, flattens them into fixed
//! numeric tables and publishes command packets.

pub mod controller;
pub mod flatten;
pub mod frame;
pub mod ssl;

pub use controller::{Controller, ControllerConfig};
pub use flatten::{FlattenStats, FrameFlattener, PacketMode, Team, VisionTables, flatten_frame};
pub use frame::{BallDetection, Detection, FieldGeometry, RobotDetection, TelemetryFrame};
