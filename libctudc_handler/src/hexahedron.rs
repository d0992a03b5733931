use super::line::Line3;
use super::quadrangle::Quadrangle3;
use super::vector::Vec3;

/// Vertex indices of the six faces. Vertices 0-3 form one base, 4-7 the other,
/// with vertex i+4 sitting "above" vertex i along the side edges listed below.
const FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [3, 2, 6, 7],
    [0, 4, 7, 3],
    [1, 5, 6, 2],
];

/// A convex solid with eight vertices and six planar quadrilateral faces.
///
/// Used to model the gas volume of a drift chamber for the crossing test.
#[derive(Debug, Clone, PartialEq)]
pub struct Hexahedron {
    pub vertices: [Vec3; 8],
    pub polygons: [Quadrangle3; 6],
}

impl Hexahedron {
    pub fn new(vertices: [Vec3; 8]) -> Self {
        let polygons = FACES.map(|f| {
            Quadrangle3::new([vertices[f[0]], vertices[f[1]], vertices[f[2]], vertices[f[3]]])
        });
        Self { vertices, polygons }
    }

    /// All points where the line pierces a face, in face order.
    pub fn cross(&self, line: &Line3) -> Vec<Vec3> {
        self.polygons.iter().filter_map(|q| q.cross(line)).collect()
    }

    /// Does the line pass through the volume
    pub fn crossing(&self, line: &Line3) -> bool {
        self.polygons.iter().any(|q| q.cross(line).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cube [0,1]^3 laid out the same way the chamber volume is built: the base
    /// 0-1-2-3 at x = 0 and its copy 4-7 at x = 1.
    fn cube() -> Hexahedron {
        Hexahedron::new([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ])
    }

    #[test]
    fn test_center_line_enters_and_exits_once() {
        let hex = cube();
        let line = Line3::new(Vec3::new(-3.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let crosses = hex.cross(&line);
        assert_eq!(crosses.len(), 2);
        assert!((crosses[0] - Vec3::new(0.0, 0.5, 0.5)).len() < 1e-12);
        assert!((crosses[1] - Vec3::new(1.0, 0.5, 0.5)).len() < 1e-12);
        assert!(hex.crossing(&line));
    }

    #[test]
    fn test_line_outside() {
        let hex = cube();
        let line = Line3::new(Vec3::new(0.5, 2.0, 0.5), Vec3::new(1.0, 0.0, 1.0));
        assert!(hex.cross(&line).is_empty());
        assert!(!hex.crossing(&line));
    }

    #[test]
    fn test_oblique_line() {
        let hex = cube();
        let line = Line3::from_points(Vec3::new(0.2, 0.3, -1.0), Vec3::new(0.4, 0.6, 2.0));
        assert_eq!(hex.cross(&line).len(), 2);
    }
}
