use super::vector::{Vec2, Vec3};

/// A straight line in the chamber-local plane.
///
/// Stored as a unit normal `n` and a signed distance `d` so that every point `p`
/// on the line satisfies `n·p = d`. Vertical lines are representable; the
/// slope/intercept view returns infinities for them. The normal is oriented so
/// that `n.y >= 0` (and `n.x > 0` for vertical lines), which makes the
/// representation unique.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2 {
    normal: Vec2,
    dist: f64,
}

impl Line2 {
    /// Line `y = k*x + b`
    pub fn from_kb(k: f64, b: f64) -> Self {
        let norm = (1.0 + k * k).sqrt();
        Self {
            normal: Vec2::new(-k / norm, 1.0 / norm),
            dist: b / norm,
        }
    }

    /// Line through a point along a direction. Returns None for a zero direction.
    pub fn from_vector(point: Vec2, vector: Vec2) -> Option<Self> {
        let mut normal = vector.ortho().ort();
        if normal.len() == 0.0 {
            return None;
        }
        if normal.y < 0.0 || (normal.y == 0.0 && normal.x < 0.0) {
            normal = normal * -1.0;
        }
        Some(Self {
            normal,
            dist: normal.dot(&point),
        })
    }

    /// Line through two distinct points.
    pub fn from_points(p1: Vec2, p2: Vec2) -> Option<Self> {
        Self::from_vector(p1, p2 - p1)
    }

    pub fn normal(&self) -> Vec2 {
        self.normal
    }

    pub fn dist(&self) -> f64 {
        self.dist
    }

    /// Slope. Infinite for a vertical line.
    pub fn k(&self) -> f64 {
        if self.normal.y == 0.0 {
            f64::INFINITY
        } else {
            -self.normal.x / self.normal.y
        }
    }

    /// Intercept with the y axis. Infinite for a vertical line.
    pub fn b(&self) -> f64 {
        if self.normal.y == 0.0 {
            f64::INFINITY
        } else {
            self.dist / self.normal.y
        }
    }

    /// Unit direction vector, pointing towards increasing x.
    pub fn direction(&self) -> Vec2 {
        let dir = self.normal.ortho() * -1.0;
        if dir.x < 0.0 {
            dir * -1.0
        } else {
            dir
        }
    }

    /// Signed distance from a point to the line.
    pub fn distance_to(&self, p: &Vec2) -> f64 {
        self.normal.dot(p) - self.dist
    }

    /// Intersection point of two lines; None when they are parallel.
    pub fn cross(&self, other: &Line2) -> Option<Vec2> {
        let det = self.normal.x * other.normal.y - self.normal.y * other.normal.x;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let x = (self.dist * other.normal.y - self.normal.y * other.dist) / det;
        let y = (self.normal.x * other.dist - self.dist * other.normal.x) / det;
        Some(Vec2::new(x, y))
    }
}

/// A straight line in 3-D: a point and a (not necessarily unit) direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Line3 {
    pub point: Vec3,
    pub vector: Vec3,
}

impl Line3 {
    pub fn new(point: Vec3, vector: Vec3) -> Self {
        Self { point, vector }
    }

    /// Line through two points, directed from the first to the second
    pub fn from_points(p1: Vec3, p2: Vec3) -> Self {
        Self {
            point: p1,
            vector: p2 - p1,
        }
    }

    /// The point at parameter t
    pub fn at(&self, t: f64) -> Vec3 {
        self.point + self.vector * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_kb_round_trip() {
        let line = Line2::from_kb(0.5, -3.0);
        assert!((line.k() - 0.5).abs() < TOL);
        assert!((line.b() + 3.0).abs() < TOL);
        assert!(line.distance_to(&Vec2::new(2.0, -2.0)).abs() < TOL);
    }

    #[test]
    fn test_vertical_line() {
        let line = Line2::from_points(Vec2::new(3.0, 0.0), Vec2::new(3.0, 5.0)).unwrap();
        assert!(line.k().is_infinite());
        assert!(line.distance_to(&Vec2::new(3.0, -7.0)).abs() < TOL);
        assert!(Line2::from_points(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_orientation_is_unique() {
        let a = Line2::from_points(Vec2::new(0.0, 1.0), Vec2::new(1.0, 2.0)).unwrap();
        let b = Line2::from_points(Vec2::new(1.0, 2.0), Vec2::new(0.0, 1.0)).unwrap();
        assert!((a.normal() - b.normal()).len() < TOL);
        assert!((a.dist() - b.dist()).abs() < TOL);
        assert!((a.k() - 1.0).abs() < TOL);
    }

    #[test]
    fn test_cross() {
        let a = Line2::from_kb(1.0, 0.0);
        let b = Line2::from_kb(-1.0, 2.0);
        let p = a.cross(&b).unwrap();
        assert!((p - Vec2::new(1.0, 1.0)).len() < TOL);
        assert!(a.cross(&Line2::from_kb(1.0, 5.0)).is_none());
    }
}
