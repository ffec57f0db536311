use prost::Message;

use relay_api::RelayError;

use crate::ssl;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldGeometry {
    pub field_length: f64,
    pub field_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallDetection {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotDetection {
    pub robot_id: u32,
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
}

/// One camera's detections.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// SSL camera number, 1-based in the relay's table layout.
    pub camera_id: u32,
    pub balls: Vec<BallDetection>,
    pub robots_blue: Vec<RobotDetection>,
    pub robots_yellow: Vec<RobotDetection>,
}

/// One decoded vision message: field geometry, detections, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryFrame {
    pub geometry: Option<FieldGeometry>,
    pub detection: Option<Detection>,
}

impl TelemetryFrame {
    /// Decode an SSL-Vision wrapper packet.
    pub fn decode(bytes: &[u8]) -> Result<Self, RelayError> {
        let packet = ssl::WrapperPacket::decode(bytes)
            .map_err(|e| RelayError::format(format!("ssl wrapper decode: {e}")))?;
        Ok(Self::from(packet))
    }
}

impl From<ssl::WrapperPacket> for TelemetryFrame {
    fn from(packet: ssl::WrapperPacket) -> Self {
        let geometry = packet
            .geometry
            .and_then(|g| g.field)
            .map(|field| FieldGeometry {
                field_length: field.field_length as f64,
                field_width: field.field_width as f64,
            });

        let detection = packet.detection.map(|d| Detection {
            camera_id: d.camera_id,
            balls: d
                .balls
                .iter()
                .map(|b| BallDetection {
                    x: b.x as f64,
                    y: b.y as f64,
                })
                .collect(),
            robots_blue: convert_robots(d.camera_id, &d.robots_blue),
            robots_yellow: convert_robots(d.camera_id, &d.robots_yellow),
        });

        Self { geometry, detection }
    }
}

fn convert_robots(camera_id: u32, robots: &[ssl::DetectionRobot]) -> Vec<RobotDetection> {
    robots
        .iter()
        .filter_map(|r| {
            let Some(robot_id) = r.robot_id else {
                tracing::warn!(camera_id, x = r.x, y = r.y, "robot detection without id, skipped");
                return None;
            };
            Some(RobotDetection {
                robot_id,
                x: r.x as f64,
                y: r.y as f64,
                orientation: r.orientation.unwrap_or(0.0) as f64,
            })
        })
        .collect()
}
