use super::constants::GEOMETRY_EPSILON;
use super::line::Line3;
use super::vector::Vec3;

/// An infinite plane `n·p + d = 0` with unit normal `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub norm: Vec3,
    pub dist: f64,
}

impl Plane {
    /// Plane through three points. The normal follows the right-hand rule on (p1, p2, p3).
    pub fn new(p1: &Vec3, p2: &Vec3, p3: &Vec3) -> Self {
        let norm = (*p2 - *p1).cross(&(*p3 - *p1)).ort();
        let dist = -norm.dot(p1);
        Self { norm, dist }
    }

    /// Intersection point with a line. None when the line is (nearly) parallel to the plane.
    pub fn cross(&self, line: &Line3) -> Option<Vec3> {
        let d = self.norm.dot(&line.vector);
        if d.abs() < GEOMETRY_EPSILON {
            return None;
        }
        let t = -(self.norm.dot(&line.point) + self.dist) / d;
        Some(line.at(t))
    }
}
