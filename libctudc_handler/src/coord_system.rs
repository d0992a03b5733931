use super::line::Line3;
use super::vector::Vec3;

/// A Cartesian frame given by an origin and three axes expressed in the parent frame.
///
/// Converting a point shifts it by the origin and projects it on the axes; directions
/// are only projected. The axes are expected to be orthonormal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordSystem {
    offset: Vec3,
    ox: Vec3,
    oy: Vec3,
    oz: Vec3,
}

impl CoordSystem {
    pub fn new(offset: Vec3, ox: Vec3, oy: Vec3, oz: Vec3) -> Self {
        Self { offset, ox, oy, oz }
    }

    pub fn convert_vector(&self, v: &Vec3) -> Vec3 {
        self.rotate(&(*v - self.offset))
    }

    pub fn convert_line(&self, l: &Line3) -> Line3 {
        Line3::new(self.convert_vector(&l.point), self.rotate(&l.vector))
    }

    fn rotate(&self, v: &Vec3) -> Vec3 {
        Vec3::new(v.dot(&self.ox), v.dot(&self.oy), v.dot(&self.oz))
    }
}
