use super::vector::{Vec2, Vec3};

// Stream headers. Each is a single line terminated by '\n'.
pub const CTUDC_HEADER_PREFIX: &str = "TDS";
pub const CTUDC_DROP_HEADER: &str = "TDSdrop";
pub const EXT_HEADER: &str = "TDSext";
pub const EXT_HEADER_ALT: &str = "TDS_ext";
pub const EXT_HEADER_META: &str = "TDSext_m";

// NEVOD record framing
pub const NEVOD_START_MARKER: &[u8; 5] = b"start";
pub const NEVOD_STOP_MARKER: &[u8; 4] = b"stop";
pub const NEVOD_RECORD_HEADER: u8 = 0;
pub const NEVOD_RECORD_EVENT: u8 = 7;
pub const DECOR_ID_CONFIG: u32 = 0;
pub const DECOR_ID_MONIT: u32 = 1;
pub const DECOR_ID_NOISE: u32 = 3;

// Fixed NEVOD/DECOR layouts, in bytes
pub const NEVOD_EVENT_META_SIZE: usize = 90;
pub const NEVOD_BEK_EVENT_SIZE: usize = 142;
pub const NEVOD_BEP_EVENT_SIZE: usize = 182;
pub const DECOR_CONFIG_SIZE: usize = 8568;
pub const DECOR_MONIT_SIZE: usize = 301;
pub const DECOR_NOISE_SIZE: usize = 332;
pub const DECOR_EVENT_META_SIZE: usize = 126;
pub const DECOR_EVENT_BUFFER_SIZE: usize = 1514 * 8;
pub const MAX_BEK: usize = 32;
pub const MAX_BEP: usize = 2;

// Channel bit layout
pub const CHANNEL_WIRE_MASK: u32 = 0xFF;
pub const CHANNEL_CHAMBER_SHIFT: u32 = 8;
pub const CHANNEL_CHAMBER_MASK: u32 = 0xFFFF;
pub const CHANNEL_EDGE_SHIFT: u32 = 28;

/// Wires per chamber
pub const N_WIRES: usize = 4;

// Chamber dimensions in mm
pub const CHAMBER_WIDTH: f64 = 500.0;
pub const CHAMBER_HEIGHT: f64 = 112.0;
pub const CHAMBER_LENGTH: f64 = 4000.0;

/// Wire positions in chamber-local coordinates, used when a calibration omits them
pub const DEFAULT_WIRES: [Vec2; N_WIRES] = [
    Vec2 { x: 41.0, y: 0.75 },
    Vec2 { x: 51.0, y: -0.75 },
    Vec2 { x: 61.0, y: 0.75 },
    Vec2 { x: 71.0, y: -0.75 },
];

// Systematic correction caps on the displacement, in mm
pub const SAME_SIDE_CAP: f64 = 6.2;
pub const OPPOSITE_SIDE_CAP: f64 = 3.6;

/// Below this the normal system of the line fit is treated as singular
pub const FIT_DETERMINANT_EPSILON: f64 = 1e-60;
/// Below this a line is treated as parallel to a plane
pub const GEOMETRY_EPSILON: f64 = 1e-12;

// Calibration frame to experiment frame
pub const GLOBAL_ORIGIN: Vec3 = Vec3 {
    x: 26891.4,
    y: -10028.6,
    z: -9572.1,
};
pub const GLOBAL_OX: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };
pub const GLOBAL_OY: Vec3 = Vec3 { x: -1.0, y: 0.0, z: 0.0 };
pub const GLOBAL_OZ: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 1.0 };

/// Capacity of the producer queues feeding the correlator
pub const QUEUE_CAPACITY: usize = 100;
