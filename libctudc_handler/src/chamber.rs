use super::chamber_config::ChamberDesc;
use super::constants::*;
use super::coord_system::CoordSystem;
use super::event::ChamberTimes;
use super::hexahedron::Hexahedron;
use super::line::{Line2, Line3};
use super::vector::{Vec2, Vec3};

/// Drift distances of one chamber, `[wire][candidate]`
pub type ChamberDists = [Vec<f64>; N_WIRES];

/// A calibrated drift chamber in the experiment frame.
///
/// The local frame has its origin at the first calibration point, x along the wires'
/// plane towards the second point and z towards the third; y = x × z points across
/// the drift gap. The gas volume is cached as a hexahedron for crossing tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Chamber {
    desc: ChamberDesc,
    coord: CoordSystem,
    hexahedron: Hexahedron,
}

impl Chamber {
    pub fn new(desc: ChamberDesc) -> Self {
        Self {
            coord: chamber_coord(&desc.points),
            hexahedron: chamber_hexahedron(&desc.points),
            desc,
        }
    }

    /// Drift distance of a time measured on a wire.
    ///
    /// None when the time does not exceed the wire's offset or the distance reaches
    /// the half-width of the chamber.
    pub fn drift_distance(&self, wire: usize, time: u32) -> Option<f64> {
        let offset = *self.desc.offsets.get(wire)?;
        if time <= offset {
            return None;
        }
        let dist = (time - offset) as f64 * self.desc.speeds[wire];
        (dist.abs() < CHAMBER_WIDTH / 2.0).then_some(dist)
    }

    pub fn is_time_good(&self, wire: usize, time: u32) -> bool {
        self.drift_distance(wire, time).is_some()
    }

    /// The usable times of each wire, in arrival order
    pub fn good_times(&self, times: &ChamberTimes) -> ChamberTimes {
        let mut good = ChamberTimes::default();
        for (wire, (slot, wire_times)) in good.iter_mut().zip(times.iter()).enumerate() {
            slot.extend(wire_times.iter().filter(|t| self.is_time_good(wire, **t)));
        }
        good
    }

    /// Drift distances of every usable time
    pub fn chamber_dists(&self, times: &ChamberTimes) -> ChamberDists {
        let mut dists = ChamberDists::default();
        for (wire, (slot, wire_times)) in dists.iter_mut().zip(times.iter()).enumerate() {
            slot.extend(wire_times.iter().filter_map(|t| self.drift_distance(wire, *t)));
        }
        dists
    }

    /// Smallest number of usable times over the wires. A chamber crossed by a single
    /// clean muon has depth one.
    pub fn times_depth(&self, times: &ChamberTimes) -> usize {
        times
            .iter()
            .enumerate()
            .map(|(wire, times)| times.iter().filter(|t| self.is_time_good(wire, **t)).count())
            .min()
            .unwrap_or(0)
    }

    /// Project a line in the experiment frame onto the chamber's xy plane.
    /// None when the line runs along the chamber's z axis.
    pub fn line_projection(&self, line: &Line3) -> Option<Line2> {
        let local = self.coord.convert_line(line);
        Line2::from_vector(
            Vec2::new(local.point.x, local.point.y),
            Vec2::new(local.vector.x, local.vector.y),
        )
    }

    pub fn hexahedron(&self) -> &Hexahedron {
        &self.hexahedron
    }

    pub fn coord(&self) -> &CoordSystem {
        &self.coord
    }

    pub fn desc(&self) -> &ChamberDesc {
        &self.desc
    }

    /// Zero based chamber number
    pub fn number(&self) -> i32 {
        self.desc.number
    }

    pub fn plane(&self) -> i32 {
        self.desc.plane
    }

    pub fn group(&self) -> i32 {
        self.desc.group
    }

    pub fn wires(&self) -> &[Vec2; N_WIRES] {
        &self.desc.wires
    }

    pub fn offsets(&self) -> &[u32; N_WIRES] {
        &self.desc.offsets
    }

    pub fn speeds(&self) -> &[f64; N_WIRES] {
        &self.desc.speeds
    }

    pub fn width(&self) -> f64 {
        CHAMBER_WIDTH
    }

    pub fn height(&self) -> f64 {
        CHAMBER_HEIGHT
    }

    pub fn length(&self) -> f64 {
        CHAMBER_LENGTH
    }
}

fn chamber_coord(points: &[Vec3; 3]) -> CoordSystem {
    let ox = (points[1] - points[0]).ort();
    let oz = (points[2] - points[0]).ort();
    let oy = ox.cross(&oz).ort();
    CoordSystem::new(points[0], ox, oy, oz)
}

/// The calibration face extruded by half the chamber width to either side
fn chamber_hexahedron(points: &[Vec3; 3]) -> Hexahedron {
    let p12 = points[1] - points[0];
    let p13 = points[2] - points[0];
    let w = p12.cross(&p13).ort() * (CHAMBER_WIDTH / 2.0);
    Hexahedron::new([
        points[0] + w,
        points[0] - w,
        points[1] - w,
        points[1] + w,
        points[2] + w,
        points[2] - w,
        points[2] - w + p12,
        points[2] + w + p12,
    ])
}
