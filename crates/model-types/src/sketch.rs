use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constraint::SketchConstraint;
use crate::geometry::{
    frame_from_boundary, point_on_circle, ElementEnd, PlaneFrame, Point2, Traversal,
};

/// A 2D sketch: its placement, raw elements, detected profiles and constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sketch {
    /// Where the sketch lies in world space.
    pub reference: SketchReference,
    /// Raw elements in authoring order.
    #[serde(default)]
    pub elements: Vec<SketchElement>,
    /// Closed loops detected from `elements`; eligible for extrusion and cuts.
    #[serde(default)]
    pub closed_profiles: Vec<ClosedProfileGroup>,
    /// Open chains detected from `elements`; usable as sweep paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_paths: Option<Vec<OpenPathGroup>>,
    /// User-authored geometric constraints.
    #[serde(default)]
    pub constraints: Vec<SketchConstraint>,
    /// Outcome of the most recent constraint solve, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solve_status: Option<SolveStatus>,
}

impl Sketch {
    /// An empty sketch on the given reference.
    pub fn new(reference: SketchReference) -> Self {
        Self {
            reference,
            elements: Vec::new(),
            closed_profiles: Vec::new(),
            open_paths: None,
            constraints: Vec::new(),
            solve_status: None,
        }
    }

    /// An empty sketch on a standard plane.
    pub fn on_plane(plane: StandardPlane, offset: f64) -> Self {
        Self::new(SketchReference::Plane { plane, offset })
    }

    pub fn element(&self, id: Uuid) -> Option<&SketchElement> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn element_index(&self, id: Uuid) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    pub fn constraint_index(&self, id: Uuid) -> Option<usize> {
        self.constraints.iter().position(|c| c.id == id)
    }
}

/// One of the three orthogonal world planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardPlane {
    #[serde(rename = "XY")]
    Xy,
    #[serde(rename = "XZ")]
    Xz,
    #[serde(rename = "YZ")]
    Yz,
}

impl StandardPlane {
    /// Axes as `(x_axis, y_axis, normal)`, right-handed.
    pub fn axes(self) -> ([f64; 3], [f64; 3], [f64; 3]) {
        match self {
            StandardPlane::Xy => ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
            StandardPlane::Xz => ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
            StandardPlane::Yz => ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        }
    }
}

/// The placement of a sketch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SketchReference {
    /// A standard plane shifted along its normal.
    Plane { plane: StandardPlane, offset: f64 },
    /// A planar face of another feature's result.
    #[serde(rename_all = "camelCase")]
    Face {
        feature_id: Uuid,
        face_index: usize,
        /// Cached boundary of the face, used to rebuild the local frame.
        boundary: Vec<[f64; 3]>,
    },
}

impl SketchReference {
    /// The feature this reference depends on, if any.
    pub fn feature_id(&self) -> Option<Uuid> {
        match self {
            SketchReference::Plane { .. } => None,
            SketchReference::Face { feature_id, .. } => Some(*feature_id),
        }
    }

    /// The local 2D frame of the sketch.
    ///
    /// Face references with a degenerate boundary have no frame.
    pub fn frame(&self) -> Option<PlaneFrame> {
        match self {
            SketchReference::Plane { plane, offset } => {
                let (x_axis, y_axis, normal) = plane.axes();
                Some(PlaneFrame {
                    origin: normal.map(|c| c * offset),
                    x_axis,
                    y_axis,
                    normal,
                })
            }
            SketchReference::Face { boundary, .. } => frame_from_boundary(boundary),
        }
    }

    /// Why the sketch cannot be placed in world space, if it cannot.
    ///
    /// A face boundary must span a plane, and every boundary point must lie on
    /// that plane within `tolerance`.
    pub fn placement_problem(&self, tolerance: f64) -> Option<String> {
        let SketchReference::Face { boundary, .. } = self else {
            return None;
        };
        let Some(frame) = self.frame() else {
            return Some("Face boundary does not span a plane".to_string());
        };
        let off_plane = boundary.iter().any(|point| {
            let projected = frame.to_world(frame.to_local(*point));
            projected
                .iter()
                .zip(point)
                .any(|(a, b)| (a - b).abs() > tolerance)
        });
        off_plane.then(|| "Face boundary is not planar".to_string())
    }
}

/// A raw 2D sketch element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SketchElement {
    Line {
        id: Uuid,
        start: Point2,
        end: Point2,
    },
    /// Horizontal line given by its start and a signed length along +X.
    #[serde(rename = "hline")]
    HLine {
        id: Uuid,
        start: Point2,
        length: f64,
    },
    /// Vertical line given by its start and a signed length along +Y.
    #[serde(rename = "vline")]
    VLine {
        id: Uuid,
        start: Point2,
        length: f64,
    },
    /// Counter-clockwise arc; angles in radians.
    #[serde(rename_all = "camelCase")]
    Arc {
        id: Uuid,
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Spline {
        id: Uuid,
        points: Vec<Point2>,
    },
    /// Axis-aligned rectangle between two opposite corners.
    Rectangle {
        id: Uuid,
        start: Point2,
        end: Point2,
    },
    Circle {
        id: Uuid,
        center: Point2,
        radius: f64,
    },
}

impl SketchElement {
    pub fn line(start: Point2, end: Point2) -> Self {
        SketchElement::Line {
            id: Uuid::new_v4(),
            start,
            end,
        }
    }

    pub fn hline(start: Point2, length: f64) -> Self {
        SketchElement::HLine {
            id: Uuid::new_v4(),
            start,
            length,
        }
    }

    pub fn vline(start: Point2, length: f64) -> Self {
        SketchElement::VLine {
            id: Uuid::new_v4(),
            start,
            length,
        }
    }

    pub fn arc(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        SketchElement::Arc {
            id: Uuid::new_v4(),
            center,
            radius,
            start_angle,
            end_angle,
        }
    }

    pub fn spline(points: Vec<Point2>) -> Self {
        SketchElement::Spline {
            id: Uuid::new_v4(),
            points,
        }
    }

    pub fn rectangle(start: Point2, end: Point2) -> Self {
        SketchElement::Rectangle {
            id: Uuid::new_v4(),
            start,
            end,
        }
    }

    pub fn circle(center: Point2, radius: f64) -> Self {
        SketchElement::Circle {
            id: Uuid::new_v4(),
            center,
            radius,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            SketchElement::Line { id, .. }
            | SketchElement::HLine { id, .. }
            | SketchElement::VLine { id, .. }
            | SketchElement::Arc { id, .. }
            | SketchElement::Spline { id, .. }
            | SketchElement::Rectangle { id, .. }
            | SketchElement::Circle { id, .. } => *id,
        }
    }

    /// Short kind name, as used in the persisted `type` tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SketchElement::Line { .. } => "line",
            SketchElement::HLine { .. } => "hline",
            SketchElement::VLine { .. } => "vline",
            SketchElement::Arc { .. } => "arc",
            SketchElement::Spline { .. } => "spline",
            SketchElement::Rectangle { .. } => "rectangle",
            SketchElement::Circle { .. } => "circle",
        }
    }

    /// Elements that can be joined end-to-end into chains.
    ///
    /// Rectangles and circles are closed on their own and never chain.
    pub fn is_chainable(&self) -> bool {
        !matches!(
            self,
            SketchElement::Rectangle { .. } | SketchElement::Circle { .. }
        )
    }

    /// Start and end points of a chainable element.
    ///
    /// `None` for rectangles, circles and splines with fewer than two points.
    pub fn endpoints(&self) -> Option<(Point2, Point2)> {
        match self {
            SketchElement::Line { start, end, .. } => Some((*start, *end)),
            SketchElement::HLine { start, length, .. } => Some((*start, start.offset(*length, 0.0))),
            SketchElement::VLine { start, length, .. } => Some((*start, start.offset(0.0, *length))),
            SketchElement::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                ..
            } => Some((
                point_on_circle(*center, *radius, *start_angle),
                point_on_circle(*center, *radius, *end_angle),
            )),
            SketchElement::Spline { points, .. } => match (points.first(), points.last()) {
                (Some(first), Some(last)) if points.len() >= 2 => Some((*first, *last)),
                _ => None,
            },
            SketchElement::Rectangle { .. } | SketchElement::Circle { .. } => None,
        }
    }

    /// The point at one end of a chainable element.
    pub fn end_point(&self, end: ElementEnd) -> Option<Point2> {
        self.endpoints().map(|(start, finish)| match end {
            ElementEnd::Start => start,
            ElementEnd::End => finish,
        })
    }

    /// The four corners of a rectangle, counter-clockwise from `start` when
    /// `start` is the lower-left corner.
    pub fn rectangle_corners(start: Point2, end: Point2) -> [Point2; 4] {
        [
            start,
            Point2::new(end.x, start.y),
            end,
            Point2::new(start.x, end.y),
        ]
    }
}

/// An ordered chain of sketch elements.
///
/// `element_ids[i]` is walked in direction `directions[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChain {
    pub id: Uuid,
    pub element_ids: Vec<Uuid>,
    #[serde(default)]
    pub directions: Vec<Traversal>,
    pub closed: bool,
}

impl ProfileChain {
    pub fn len(&self) -> usize {
        self.element_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_ids.is_empty()
    }

    pub fn contains(&self, element_id: Uuid) -> bool {
        self.element_ids.contains(&element_id)
    }
}

/// A chain whose end joins its start; extrudable.
pub type ClosedProfileGroup = ProfileChain;

/// A chain with two free ends; usable as a sweep path.
pub type OpenPathGroup = ProfileChain;

/// Outcome of a constraint solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SolveStatus {
    FullyConstrained,
    UnderConstrained { dof: usize },
    Failed { reason: String },
}

impl SolveStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, SolveStatus::Failed { .. })
    }
}
