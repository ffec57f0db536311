//! SSL-Vision wrapper packet (proto2), only the parts the relay consumes.
//! Unknown fields such as camera calibration are skipped on decode.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WrapperPacket {
    #[prost(message, optional, tag = "1")]
    pub detection: Option<DetectionFrame>,
    #[prost(message, optional, tag = "2")]
    pub geometry: Option<GeometryData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DetectionFrame {
    #[prost(uint32, required, tag = "1")]
    pub frame_number: u32,
    #[prost(double, required, tag = "2")]
    pub t_capture: f64,
    #[prost(double, required, tag = "3")]
    pub t_sent: f64,
    #[prost(uint32, required, tag = "4")]
    pub camera_id: u32,
    #[prost(message, repeated, tag = "5")]
    pub balls: Vec<DetectionBall>,
    #[prost(message, repeated, tag = "6")]
    pub robots_yellow: Vec<DetectionRobot>,
    #[prost(message, repeated, tag = "7")]
    pub robots_blue: Vec<DetectionRobot>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DetectionBall {
    #[prost(float, required, tag = "1")]
    pub confidence: f32,
    #[prost(uint32, optional, tag = "2")]
    pub area: Option<u32>,
    #[prost(float, required, tag = "3")]
    pub x: f32,
    #[prost(float, required, tag = "4")]
    pub y: f32,
    #[prost(float, optional, tag = "5")]
    pub z: Option<f32>,
    #[prost(float, required, tag = "6")]
    pub pixel_x: f32,
    #[prost(float, required, tag = "7")]
    pub pixel_y: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DetectionRobot {
    #[prost(float, required, tag = "1")]
    pub confidence: f32,
    #[prost(uint32, optional, tag = "2")]
    pub robot_id: Option<u32>,
    #[prost(float, required, tag = "3")]
    pub x: f32,
    #[prost(float, required, tag = "4")]
    pub y: f32,
    #[prost(float, optional, tag = "5")]
    pub orientation: Option<f32>,
    #[prost(float, required, tag = "6")]
    pub pixel_x: f32,
    #[prost(float, required, tag = "7")]
    pub pixel_y: f32,
    #[prost(float, optional, tag = "8")]
    pub height: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GeometryData {
    #[prost(message, optional, tag = "1")]
    pub field: Option<GeometryFieldSize>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GeometryFieldSize {
    #[prost(int32, required, tag = "1")]
    pub field_length: i32,
    #[prost(int32, required, tag = "2")]
    pub field_width: i32,
    #[prost(int32, required, tag = "3")]
    pub goal_width: i32,
    #[prost(int32, required, tag = "4")]
    pub goal_depth: i32,
    #[prost(int32, required, tag = "5")]
    pub boundary_width: i32,
}
