use relay_api::{CommandPacket, RefereeCommand};

use crate::frame::{RobotDetection, TelemetryFrame};

pub const CAMERAS: usize = 4;
pub const MAX_BALLS_PER_CAMERA: usize = 64;
pub const MAX_BALLS: usize = CAMERAS * MAX_BALLS_PER_CAMERA;
/// Ball planes: camera flag, x, y.
pub const BALL_PLANES: usize = 3;

pub const MAX_ROBOTS: usize = 32;
pub const TEAM_ROBOTS_MAX: usize = MAX_ROBOTS / 2;
/// Robot planes: camera flag, x, y, orientation.
pub const ROBOT_PLANES: usize = 4;

pub const GEOMETRY_LEN: usize = 2;

pub const BALL_TABLE_LEN: usize = BALL_PLANES * MAX_BALLS;
pub const ROBOT_TABLE_LEN: usize = ROBOT_PLANES * TEAM_ROBOTS_MAX;
/// `balls ‖ robots_blue ‖ robots_yellow ‖ geometry`.
pub const PACKET_LEN: usize = BALL_TABLE_LEN + 2 * ROBOT_TABLE_LEN + GEOMETRY_LEN;

pub const PLACEHOLDER_VALUE: f64 = 5.0;
pub const PLACEHOLDER_LEN: usize = MAX_ROBOTS * 13;

/// What the controller puts into a command packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketMode {
    /// The flattened vision tables.
    #[default]
    Tables,
    /// Constant `PLACEHOLDER_VALUE` × `PLACEHOLDER_LEN`, ignoring vision and
    /// referee input. Legacy output; the real command contract is undefined.
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Blue,
    Yellow,
}

/// Per-frame counts of what landed in the tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenStats {
    pub balls: usize,
    pub robots: usize,
    /// Entities dropped for an out-of-range camera, ball index or robot id.
    pub skipped: usize,
    pub geometry: bool,
}

/// Fixed-size, plane-major tables the vision data is flattened into.
///
/// Ball slot for camera `c` (1-based) and local index `i` is
/// `i + (c - 1) * MAX_BALLS_PER_CAMERA`; robot slot is the robot id.
/// Frames accumulate until [`reset`](Self::reset).
#[derive(Debug, Clone, PartialEq)]
pub struct VisionTables {
    balls: [f64; BALL_TABLE_LEN],
    robots_blue: [f64; ROBOT_TABLE_LEN],
    robots_yellow: [f64; ROBOT_TABLE_LEN],
    geometry: [f64; GEOMETRY_LEN],
}

impl Default for VisionTables {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionTables {
    pub fn new() -> Self {
        Self {
            balls: [0.0; BALL_TABLE_LEN],
            robots_blue: [0.0; ROBOT_TABLE_LEN],
            robots_yellow: [0.0; ROBOT_TABLE_LEN],
            geometry: [0.0; GEOMETRY_LEN],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn balls(&self) -> &[f64] {
        &self.balls
    }

    pub fn robots(&self, team: Team) -> &[f64] {
        match team {
            Team::Blue => &self.robots_blue,
            Team::Yellow => &self.robots_yellow,
        }
    }

    pub fn geometry(&self) -> &[f64] {
        &self.geometry
    }

    /// `[flag, x, y]` at ball slot `slot`.
    pub fn ball_at(&self, slot: usize) -> [f64; BALL_PLANES] {
        [
            self.balls[slot],
            self.balls[MAX_BALLS + slot],
            self.balls[2 * MAX_BALLS + slot],
        ]
    }

    /// `[flag, x, y, orientation]` for robot `id` of `team`.
    pub fn robot_at(&self, team: Team, id: usize) -> [f64; ROBOT_PLANES] {
        let table = self.robots(team);
        [
            table[id],
            table[TEAM_ROBOTS_MAX + id],
            table[2 * TEAM_ROBOTS_MAX + id],
            table[3 * TEAM_ROBOTS_MAX + id],
        ]
    }

    /// Write one frame into the tables. Out-of-range entities are skipped
    /// and counted, never written.
    pub fn apply(&mut self, frame: &TelemetryFrame) -> FlattenStats {
        let mut stats = FlattenStats::default();

        if let Some(geometry) = &frame.geometry {
            self.geometry = [geometry.field_length, geometry.field_width];
            stats.geometry = true;
        }

        let Some(detection) = &frame.detection else {
            return stats;
        };

        let camera = detection.camera_id as usize;
        if !(1..=CAMERAS).contains(&camera) {
            stats.skipped =
                detection.balls.len() + detection.robots_blue.len() + detection.robots_yellow.len();
            tracing::warn!(camera_id = detection.camera_id, skipped = stats.skipped, "camera id out of range, detection skipped");
            return stats;
        }
        let flag = detection.camera_id as f64;
        let base = (camera - 1) * MAX_BALLS_PER_CAMERA;

        for (index, ball) in detection.balls.iter().enumerate() {
            if index >= MAX_BALLS_PER_CAMERA {
                let dropped = detection.balls.len() - index;
                stats.skipped += dropped;
                tracing::warn!(camera_id = detection.camera_id, dropped, "too many balls for one camera");
                break;
            }
            let slot = base + index;
            self.balls[slot] = flag;
            self.balls[MAX_BALLS + slot] = ball.x;
            self.balls[2 * MAX_BALLS + slot] = ball.y;
            stats.balls += 1;
        }

        for (team, robots) in [
            (Team::Blue, &detection.robots_blue),
            (Team::Yellow, &detection.robots_yellow),
        ] {
            for robot in robots {
                if self.put_robot(team, flag, robot) {
                    stats.robots += 1;
                } else {
                    stats.skipped += 1;
                    tracing::warn!(?team, robot_id = robot.robot_id, "robot id out of range, skipped");
                }
            }
        }

        stats
    }

    fn put_robot(&mut self, team: Team, flag: f64, robot: &RobotDetection) -> bool {
        let id = robot.robot_id as usize;
        if id >= TEAM_ROBOTS_MAX {
            return false;
        }
        let table = match team {
            Team::Blue => &mut self.robots_blue,
            Team::Yellow => &mut self.robots_yellow,
        };
        table[id] = flag;
        table[TEAM_ROBOTS_MAX + id] = robot.x;
        table[2 * TEAM_ROBOTS_MAX + id] = robot.y;
        table[3 * TEAM_ROBOTS_MAX + id] = robot.orientation;
        true
    }

    /// Concatenate the tables into a packet of `PACKET_LEN` values.
    pub fn to_packet(&self) -> CommandPacket {
        let mut values = Vec::with_capacity(PACKET_LEN);
        values.extend_from_slice(&self.balls);
        values.extend_from_slice(&self.robots_blue);
        values.extend_from_slice(&self.robots_yellow);
        values.extend_from_slice(&self.geometry);
        CommandPacket::new(values)
    }
}

/// Turns frames into command packets according to a [`PacketMode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameFlattener {
    mode: PacketMode,
}

impl FrameFlattener {
    pub fn new(mode: PacketMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PacketMode {
        self.mode
    }

    /// Accumulate `frame` into `tables` and build the packet.
    ///
    /// The referee snapshot is accepted but does not influence the packet.
    pub fn flatten(
        &self,
        tables: &mut VisionTables,
        frame: &TelemetryFrame,
        referee: &RefereeCommand,
    ) -> (CommandPacket, FlattenStats) {
        let stats = tables.apply(frame);
        tracing::trace!(
            state = %referee.state,
            team = %referee.command_for_team,
            balls = stats.balls,
            robots = stats.robots,
            skipped = stats.skipped,
            "frame flattened"
        );
        let packet = match self.mode {
            PacketMode::Tables => tables.to_packet(),
            PacketMode::Placeholder => CommandPacket::new(vec![PLACEHOLDER_VALUE; PLACEHOLDER_LEN]),
        };
        (packet, stats)
    }
}

/// Flatten a single frame against zeroed tables.
pub fn flatten_frame(frame: &TelemetryFrame, referee: &RefereeCommand) -> CommandPacket {
    let mut tables = VisionTables::new();
    FrameFlattener::default().flatten(&mut tables, frame, referee).0
}
