use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::chamber::Chamber;
use super::constants::*;
use super::coord_system::CoordSystem;
use super::error::ChamberConfigError;
use super::vector::{Vec2, Vec3};

fn default_wires() -> [Vec2; N_WIRES] {
    DEFAULT_WIRES
}

/// Calibration of one drift chamber as stored in the run's chamber config (JSON).
///
/// Points are given in the survey frame. [`ChamberDesc::to_global`] moves them into
/// the experiment frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChamberDesc {
    /// Three corners spanning the chamber: origin, end of the wire plane, top
    pub points: [Vec3; 3],
    /// Time offset of each wire, in TDC ticks
    pub offsets: [u32; N_WIRES],
    /// Drift speed of each wire, mm per TDC tick
    pub speeds: [f64; N_WIRES],
    /// Wire positions in the chamber frame
    #[serde(default = "default_wires")]
    pub wires: [Vec2; N_WIRES],
    pub plane: i32,
    pub group: i32,
    pub number: i32,
}

impl ChamberDesc {
    /// Flip the survey y axis, convert the points into the experiment frame and make
    /// the chamber number zero based
    pub fn to_global(&mut self) {
        let global = CoordSystem::new(GLOBAL_ORIGIN, GLOBAL_OX, GLOBAL_OY, GLOBAL_OZ);
        for point in self.points.iter_mut() {
            point.y = -point.y;
            *point = global.convert_vector(point);
        }
        self.number -= 1;
    }
}

/// Chambers of a run keyed by their (zero based) number
pub type ChamberMap = FxHashMap<u16, Chamber>;

/// Parse a chamber config and convert every chamber into the experiment frame
pub fn parse_chamber_config(json: &str) -> Result<Vec<ChamberDesc>, ChamberConfigError> {
    let mut descs: Vec<ChamberDesc> = serde_json::from_str(json)?;
    descs.iter_mut().for_each(ChamberDesc::to_global);
    Ok(descs)
}

pub fn read_chamber_config(path: &Path) -> Result<Vec<ChamberDesc>, ChamberConfigError> {
    if !path.exists() {
        return Err(ChamberConfigError::BadFilePath(path.to_path_buf()));
    }
    parse_chamber_config(&std::fs::read_to_string(path)?)
}

/// Build the chamber map of a run from its config file
pub fn read_chambers(path: &Path) -> Result<ChamberMap, ChamberConfigError> {
    let mut chambers = ChamberMap::default();
    for desc in read_chamber_config(path)? {
        match u16::try_from(desc.number) {
            Ok(number) => {
                chambers.insert(number, Chamber::new(desc));
            }
            Err(_) => spdlog::warn!(
                "Chamber config {} has an invalid chamber number {}, skipping",
                path.display(),
                desc.number + 1
            ),
        }
    }
    spdlog::info!("Loaded {} chambers from {}", chambers.len(), path.display());
    Ok(chambers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"[
        {
            "points": [[0, 0, 0], [4000, 0, 0], [0, 0, 112]],
            "offsets": [10, 20, 30, 40],
            "speeds": [0.05, 0.05, 0.05, 0.05],
            "wires": [[40, 1], [50, -1], [60, 1], [70, -1]],
            "plane": 1,
            "group": 2,
            "number": 3
        },
        {
            "points": [[26891.4, 10028.6, -9572.1], [26891.4, 14028.6, -9572.1], [26891.4, 10028.6, -9460.1]],
            "offsets": [0, 0, 0, 0],
            "speeds": [1, 1, 1, 1],
            "plane": 0,
            "group": 0,
            "number": 1
        }
    ]"#;

    #[test]
    fn test_parse_and_transform() {
        let descs = parse_chamber_config(CONFIG).unwrap();
        assert_eq!(descs.len(), 2);
        assert_eq!(descs[0].number, 2);
        assert_eq!(descs[0].offsets, [10, 20, 30, 40]);
        assert_eq!(descs[0].wires[1], Vec2::new(50.0, -1.0));
        assert_eq!(descs[1].wires, DEFAULT_WIRES);

        // (26891.4, -10028.6, -9572.1) after the flip is the global origin
        let p0 = descs[1].points[0];
        assert!(p0.len() < 1e-9);
        // survey +x maps onto global -y, survey +y onto global -x after the flip
        let p1 = descs[1].points[1];
        assert!((p1 - Vec3::new(-4000.0, 0.0, 0.0)).len() < 1e-9);
        let p2 = descs[1].points[2];
        assert!((p2 - Vec3::new(0.0, 0.0, 112.0)).len() < 1e-9);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            parse_chamber_config("[{\"points\": []}]"),
            Err(ChamberConfigError::ParsingError(_))
        ));
    }

    #[test]
    fn test_read_chambers() {
        let dir = std::env::temp_dir().join("ctudc_handler_chamber_config_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chambers.conf.new");
        assert!(matches!(
            read_chambers(&path),
            Err(ChamberConfigError::BadFilePath(_))
        ));
        std::fs::write(&path, CONFIG).unwrap();
        let chambers = read_chambers(&path).unwrap();
        assert_eq!(chambers.len(), 2);
        assert_eq!(chambers[&2].group(), 2);
        assert_eq!(chambers[&0].plane(), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
