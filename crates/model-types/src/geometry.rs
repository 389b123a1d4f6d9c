use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A point in sketch-local 2D coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const ORIGIN: Point2 = Point2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Offset this point by `(dx, dy)`.
    pub fn offset(&self, dx: f64, dy: f64) -> Point2 {
        Point2::new(self.x + dx, self.y + dy)
    }

    /// True if both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Point2::new(x, y)
    }
}

/// Two points coincide when they are no further apart than `tolerance`.
pub fn points_coincide(a: Point2, b: Point2, tolerance: f64) -> bool {
    a.distance_to(&b) <= tolerance
}

/// Point on a circle at `angle` radians (counter-clockwise from +X).
pub fn point_on_circle(center: Point2, radius: f64, angle: f64) -> Point2 {
    Point2::new(
        center.x + radius * angle.cos(),
        center.y + radius * angle.sin(),
    )
}

/// Angle of `point` around `center`, in radians.
pub fn angle_around(center: Point2, point: Point2) -> f64 {
    (point.y - center.y).atan2(point.x - center.x)
}

/// Shift `angle` by whole turns so it lies within half a turn of `reference`.
pub fn unwrap_angle(angle: f64, reference: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    angle + ((reference - angle) / tau).round() * tau
}

/// One of the two ends of a chainable sketch element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementEnd {
    Start,
    End,
}

impl ElementEnd {
    pub fn opposite(self) -> ElementEnd {
        match self {
            ElementEnd::Start => ElementEnd::End,
            ElementEnd::End => ElementEnd::Start,
        }
    }
}

/// Direction in which a chain walks through an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Traversal {
    /// Entered at the start, left at the end.
    Forward,
    /// Entered at the end, left at the start.
    Reversed,
}

impl Traversal {
    /// The traversal that enters an element at `end`.
    pub fn entering_at(end: ElementEnd) -> Traversal {
        match end {
            ElementEnd::Start => Traversal::Forward,
            ElementEnd::End => Traversal::Reversed,
        }
    }

    /// The end through which the walk leaves the element.
    pub fn exit(self) -> ElementEnd {
        match self {
            Traversal::Forward => ElementEnd::End,
            Traversal::Reversed => ElementEnd::Start,
        }
    }
}

/// Orthonormal frame of a sketch plane in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaneFrame {
    pub origin: [f64; 3],
    pub x_axis: [f64; 3],
    pub y_axis: [f64; 3],
    pub normal: [f64; 3],
}

impl PlaneFrame {
    /// Build a frame from an origin, a normal and a hint for the x axis.
    ///
    /// The x hint is projected into the plane. Returns `None` when the normal is
    /// degenerate or the hint is parallel to it.
    pub fn from_normal(origin: [f64; 3], normal: [f64; 3], x_hint: [f64; 3]) -> Option<Self> {
        let n = Vector3::from(normal).try_normalize(1e-12)?;
        let hint = Vector3::from(x_hint);
        let x = (hint - n * hint.dot(&n)).try_normalize(1e-12)?;
        let y = n.cross(&x);
        Some(Self {
            origin,
            x_axis: x.into(),
            y_axis: y.into(),
            normal: n.into(),
        })
    }

    /// Map a sketch-local point to world coordinates.
    pub fn to_world(&self, p: Point2) -> [f64; 3] {
        let world = Vector3::from(self.origin)
            + Vector3::from(self.x_axis) * p.x
            + Vector3::from(self.y_axis) * p.y;
        world.into()
    }

    /// Project a world point onto the plane, in sketch-local coordinates.
    pub fn to_local(&self, world: [f64; 3]) -> Point2 {
        let d = Vector3::from(world) - Vector3::from(self.origin);
        Point2::new(
            d.dot(&Vector3::from(self.x_axis)),
            d.dot(&Vector3::from(self.y_axis)),
        )
    }
}

/// Reconstruct a plane frame from a closed boundary polygon.
///
/// The origin is the vertex centroid, the normal comes from Newell's method and the
/// x axis follows the first boundary edge that is not degenerate.
pub fn frame_from_boundary(boundary: &[[f64; 3]]) -> Option<PlaneFrame> {
    if boundary.len() < 3 {
        return None;
    }

    let count = boundary.len() as f64;
    let centroid = boundary
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + Vector3::from(*p))
        / count;

    let mut normal = Vector3::<f64>::zeros();
    for (i, current) in boundary.iter().enumerate() {
        let next = boundary[(i + 1) % boundary.len()];
        normal.x += (current[1] - next[1]) * (current[2] + next[2]);
        normal.y += (current[2] - next[2]) * (current[0] + next[0]);
        normal.z += (current[0] - next[0]) * (current[1] + next[1]);
    }

    let x_hint = boundary
        .iter()
        .zip(boundary.iter().cycle().skip(1))
        .map(|(a, b)| Vector3::from(*b) - Vector3::from(*a))
        .find(|edge| edge.norm() > 1e-9)?;

    PlaneFrame::from_normal(centroid.into(), normal.into(), x_hint.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn coincidence_is_inclusive_at_tolerance() {
        let a = Point2::new(0.0, 0.0);
        assert!(points_coincide(a, Point2::new(0.5, 0.0), 0.5));
        assert!(!points_coincide(a, Point2::new(0.51, 0.0), 0.5));
    }

    #[test]
    fn unwrap_angle_stays_near_reference() {
        let tau = std::f64::consts::TAU;
        assert_relative_eq!(unwrap_angle(-0.1, tau), tau - 0.1, epsilon = 1e-12);
        assert_relative_eq!(unwrap_angle(1.0, 1.2), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn traversal_exit_is_opposite_of_entry() {
        for end in [ElementEnd::Start, ElementEnd::End] {
            assert_eq!(Traversal::entering_at(end).exit(), end.opposite());
        }
    }

    #[test]
    fn boundary_frame_of_square_in_xy() {
        let square = [
            [0.0, 0.0, 2.0],
            [4.0, 0.0, 2.0],
            [4.0, 4.0, 2.0],
            [0.0, 4.0, 2.0],
        ];
        let frame = frame_from_boundary(&square).unwrap();
        assert_relative_eq!(frame.origin[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(frame.origin[2], 2.0, epsilon = 1e-12);
        assert_relative_eq!(frame.normal[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.x_axis[0], 1.0, epsilon = 1e-12);

        let world = frame.to_world(Point2::new(1.0, 1.0));
        assert_relative_eq!(world[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(world[1], 3.0, epsilon = 1e-12);
        let back = frame.to_local(world);
        assert_relative_eq!(back.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(back.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_boundary_has_no_frame() {
        assert!(frame_from_boundary(&[[0.0; 3], [1.0, 0.0, 0.0]]).is_none());
        let collinear = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        assert!(frame_from_boundary(&collinear).is_none());
    }
}
