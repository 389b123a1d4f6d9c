use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A geometric constraint authored on a sketch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchConstraint {
    pub id: Uuid,
    pub kind: ConstraintKind,
    pub targets: Vec<ElementRef>,
    /// Dimension for `Distance` and `Radius`; ignored otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Which relation a constraint enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintKind {
    Coincident,
    Distance,
    Horizontal,
    Vertical,
    Parallel,
    Perpendicular,
    Radius,
    /// Pins a point where it is when the solve starts.
    Fixed,
}

impl ConstraintKind {
    /// Kinds that carry a numeric dimension.
    pub fn takes_value(self) -> bool {
        matches!(self, ConstraintKind::Distance | ConstraintKind::Radius)
    }
}

/// A reference to an element, or to a specific point or edge of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    pub element_id: Uuid,
    pub anchor: Anchor,
}

/// Sub-part of an element addressed by an [`ElementRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Anchor {
    /// The element itself (a segment, circle or arc).
    Whole,
    Start,
    End,
    Center,
    /// A spline control point or a rectangle corner.
    Vertex { index: usize },
    /// A rectangle side, counter-clockwise from the bottom edge.
    Edge { index: usize },
}

impl ElementRef {
    pub fn whole(element_id: Uuid) -> Self {
        Self {
            element_id,
            anchor: Anchor::Whole,
        }
    }

    pub fn start(element_id: Uuid) -> Self {
        Self {
            element_id,
            anchor: Anchor::Start,
        }
    }

    pub fn end(element_id: Uuid) -> Self {
        Self {
            element_id,
            anchor: Anchor::End,
        }
    }

    pub fn center(element_id: Uuid) -> Self {
        Self {
            element_id,
            anchor: Anchor::Center,
        }
    }

    pub fn vertex(element_id: Uuid, index: usize) -> Self {
        Self {
            element_id,
            anchor: Anchor::Vertex { index },
        }
    }

    pub fn edge(element_id: Uuid, index: usize) -> Self {
        Self {
            element_id,
            anchor: Anchor::Edge { index },
        }
    }
}

impl SketchConstraint {
    pub fn new(kind: ConstraintKind, targets: Vec<ElementRef>, value: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            targets,
            value,
        }
    }

    pub fn coincident(a: ElementRef, b: ElementRef) -> Self {
        Self::new(ConstraintKind::Coincident, vec![a, b], None)
    }

    /// Distance between two points.
    pub fn distance(a: ElementRef, b: ElementRef, value: f64) -> Self {
        Self::new(ConstraintKind::Distance, vec![a, b], Some(value))
    }

    /// Length of a single segment.
    pub fn length(segment: ElementRef, value: f64) -> Self {
        Self::new(ConstraintKind::Distance, vec![segment], Some(value))
    }

    pub fn horizontal(segment: ElementRef) -> Self {
        Self::new(ConstraintKind::Horizontal, vec![segment], None)
    }

    pub fn vertical(segment: ElementRef) -> Self {
        Self::new(ConstraintKind::Vertical, vec![segment], None)
    }

    pub fn parallel(a: ElementRef, b: ElementRef) -> Self {
        Self::new(ConstraintKind::Parallel, vec![a, b], None)
    }

    pub fn perpendicular(a: ElementRef, b: ElementRef) -> Self {
        Self::new(ConstraintKind::Perpendicular, vec![a, b], None)
    }

    pub fn radius(curve: ElementRef, value: f64) -> Self {
        Self::new(ConstraintKind::Radius, vec![curve], Some(value))
    }

    pub fn fixed(point: ElementRef) -> Self {
        Self::new(ConstraintKind::Fixed, vec![point], None)
    }

    /// True if any target points at `element_id`.
    pub fn references(&self, element_id: Uuid) -> bool {
        self.targets.iter().any(|t| t.element_id == element_id)
    }
}
