use super::coord_system::CoordSystem;
use super::line::{Line2, Line3};
use super::plane::Plane;
use super::vector::{Vec2, Vec3};

/// A convex quadrilateral in the plane.
///
/// Vertices are given in order around the boundary (either winding). Containment
/// is tested against each edge's half-plane, using the centroid as the reference
/// for the inner side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrangle2 {
    pub vertices: [Vec2; 4],
    center: Vec2,
}

impl Quadrangle2 {
    pub fn new(vertices: [Vec2; 4]) -> Self {
        let center = (vertices[0] + vertices[1] + vertices[2] + vertices[3]) * 0.25;
        Self { vertices, center }
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Is the point inside or on the boundary
    pub fn has_point(&self, p: &Vec2) -> bool {
        self.edges().all(|(a, b)| {
            let norm = (b - a).ortho().ort();
            let c = norm.dot(&a);
            let dist_pt = norm.dot(p) - c;
            let dist_cen = norm.dot(&self.center) - c;
            dist_cen * dist_pt >= 0.0
        })
    }

    /// Points where the line crosses the boundary, in edge order.
    pub fn cross(&self, line: &Line2) -> Vec<Vec2> {
        let mut crosses = Vec::new();
        for (a, b) in self.edges() {
            let edge = match Line2::from_points(a, b) {
                Some(e) => e,
                None => continue,
            };
            if let Some(p) = line.cross(&edge) {
                let seg = b - a;
                let t = (p - a).dot(&seg) / seg.dot(&seg);
                // half-open so a line through a vertex is reported once
                if (0.0..1.0).contains(&t) {
                    crosses.push(p);
                }
            }
        }
        crosses
    }

    fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        (0..4).map(|k| (self.vertices[k], self.vertices[(k + 1) % 4]))
    }
}

/// A planar convex quadrilateral embedded in 3-D space.
///
/// Caches its supporting plane and its 2-D image in a local frame anchored at the
/// first vertex, with axes along the (orthonormalized) edges v0→v1 and v0→v3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrangle3 {
    pub vertices: [Vec3; 4],
    coord: CoordSystem,
    plane: Plane,
    quad2: Quadrangle2,
}

impl Quadrangle3 {
    pub fn new(vertices: [Vec3; 4]) -> Self {
        let coord = local_coord_system(&vertices);
        let quad2 = Quadrangle2::new(vertices.map(|v| {
            let t = coord.convert_vector(&v);
            Vec2::new(t.x, t.y)
        }));
        Self {
            vertices,
            coord,
            plane: Plane::new(&vertices[0], &vertices[1], &vertices[2]),
            quad2,
        }
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Is a point of the supporting plane inside the quadrangle
    pub fn has_point(&self, p: &Vec3) -> bool {
        let t = self.coord.convert_vector(p);
        self.quad2.has_point(&Vec2::new(t.x, t.y))
    }

    /// Intersection of the line with the face. None when the line is parallel to the
    /// face or meets its plane outside the boundary.
    pub fn cross(&self, line: &Line3) -> Option<Vec3> {
        self.plane.cross(line).filter(|c| self.has_point(c))
    }
}

fn local_coord_system(v: &[Vec3; 4]) -> CoordSystem {
    let ox = (v[1] - v[0]).ort();
    let e3 = v[3] - v[0];
    let oy = (e3 - ox * e3.dot(&ox)).ort();
    let oz = ox.cross(&oy).ort();
    CoordSystem::new(v[0], ox, oy, oz)
}
