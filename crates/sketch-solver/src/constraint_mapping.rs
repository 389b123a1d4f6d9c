use model_types::{Anchor, ConstraintKind, ElementRef, SketchConstraint};
use uuid::Uuid;

use crate::entity_mapping::{ElementVars, Equation, PointVar, SegmentVar, SolverSystem};
use crate::types::SolveError;

impl SolverSystem {
    /// Translate user constraints into equations over the extracted primitives.
    pub fn add_constraints(&mut self, constraints: &[SketchConstraint]) -> Result<(), SolveError> {
        for constraint in constraints {
            self.add_constraint(constraint)?;
        }
        Ok(())
    }

    fn add_constraint(&mut self, constraint: &SketchConstraint) -> Result<(), SolveError> {
        let id = constraint.id;
        let targets = constraint.targets.as_slice();

        let equations = match (constraint.kind, targets) {
            (ConstraintKind::Coincident, [a, b]) => {
                vec![Equation::Coincident(self.point_of(id, a)?, self.point_of(id, b)?)]
            }
            (ConstraintKind::Distance, [segment]) => {
                let s = self.segment_of(id, segment)?;
                vec![Equation::Distance(s.a, s.b, required_value(constraint)?)]
            }
            (ConstraintKind::Distance, [a, b]) => vec![Equation::Distance(
                self.point_of(id, a)?,
                self.point_of(id, b)?,
                required_value(constraint)?,
            )],
            (ConstraintKind::Horizontal, [segment]) => {
                let s = self.segment_of(id, segment)?;
                vec![Equation::Horizontal(s.a, s.b)]
            }
            (ConstraintKind::Horizontal, [a, b]) => {
                vec![Equation::Horizontal(self.point_of(id, a)?, self.point_of(id, b)?)]
            }
            (ConstraintKind::Vertical, [segment]) => {
                let s = self.segment_of(id, segment)?;
                vec![Equation::Vertical(s.a, s.b)]
            }
            (ConstraintKind::Vertical, [a, b]) => {
                vec![Equation::Vertical(self.point_of(id, a)?, self.point_of(id, b)?)]
            }
            (ConstraintKind::Parallel, [a, b]) => {
                vec![Equation::Parallel(self.segment_of(id, a)?, self.segment_of(id, b)?)]
            }
            (ConstraintKind::Perpendicular, [a, b]) => vec![Equation::Perpendicular(
                self.segment_of(id, a)?,
                self.segment_of(id, b)?,
            )],
            (ConstraintKind::Radius, [curve]) => {
                vec![Equation::Radius(self.radius_of(id, curve)?, required_value(constraint)?)]
            }
            (ConstraintKind::Fixed, [target]) => self
                .fixed_points(id, target)?
                .into_iter()
                .map(|p| Equation::FixedAt(p, self.point(&self.params, p)))
                .collect(),
            (kind, _) => {
                return Err(SolveError::InvalidTarget {
                    constraint_id: id,
                    reason: format!("{kind:?} does not take {} target(s)", targets.len()),
                })
            }
        };

        self.equations.extend(equations);
        Ok(())
    }

    fn vars_of(&self, target: &ElementRef) -> Result<&ElementVars, SolveError> {
        self.element_vars
            .get(&target.element_id)
            .ok_or(SolveError::UnknownElement(target.element_id))
    }

    /// Resolve a target to a single point.
    fn point_of(&self, id: Uuid, target: &ElementRef) -> Result<PointVar, SolveError> {
        let vars = self.vars_of(target)?;
        let point = match (vars, target.anchor) {
            (ElementVars::Segment(s), Anchor::Start) => Some(s.a),
            (ElementVars::Segment(s), Anchor::End) => Some(s.b),
            (ElementVars::Arc { start, .. }, Anchor::Start) => Some(*start),
            (ElementVars::Arc { end, .. }, Anchor::End) => Some(*end),
            (ElementVars::Arc { center, .. }, Anchor::Center)
            | (ElementVars::Circle { center, .. }, Anchor::Center) => Some(*center),
            (ElementVars::Spline { points }, Anchor::Start) => points.first().copied(),
            (ElementVars::Spline { points }, Anchor::End) => points.last().copied(),
            (ElementVars::Spline { points }, Anchor::Vertex { index }) => points.get(index).copied(),
            (ElementVars::Rectangle { corners }, Anchor::Vertex { index }) => {
                corners.get(index).copied()
            }
            _ => None,
        };
        point.ok_or_else(|| invalid(id, target, "is not a point"))
    }

    /// Resolve a target to a straight segment.
    fn segment_of(&self, id: Uuid, target: &ElementRef) -> Result<SegmentVar, SolveError> {
        let segment = match (self.vars_of(target)?, target.anchor) {
            (ElementVars::Segment(s), Anchor::Whole) => Some(*s),
            (ElementVars::Rectangle { corners }, Anchor::Edge { index }) => {
                ElementVars::rectangle_edge(corners, index)
            }
            _ => None,
        };
        segment.ok_or_else(|| invalid(id, target, "is not a segment"))
    }

    /// Resolve a target to the radius parameter of a circle or arc.
    fn radius_of(&self, id: Uuid, target: &ElementRef) -> Result<usize, SolveError> {
        match (self.vars_of(target)?, target.anchor) {
            (ElementVars::Arc { radius, .. }, Anchor::Whole | Anchor::Center)
            | (ElementVars::Circle { radius, .. }, Anchor::Whole | Anchor::Center) => Ok(*radius),
            _ => Err(invalid(id, target, "has no radius")),
        }
    }

    /// Points pinned by a fixed constraint: the point itself, or both ends of a
    /// segment.
    fn fixed_points(&self, id: Uuid, target: &ElementRef) -> Result<Vec<PointVar>, SolveError> {
        if target.anchor == Anchor::Whole {
            let s = self.segment_of(id, target)?;
            Ok(vec![s.a, s.b])
        } else {
            Ok(vec![self.point_of(id, target)?])
        }
    }
}

fn required_value(constraint: &SketchConstraint) -> Result<f64, SolveError> {
    match constraint.value {
        Some(value) if value.is_finite() => Ok(value),
        _ => Err(SolveError::MissingValue(constraint.id)),
    }
}

fn invalid(id: Uuid, target: &ElementRef, what: &str) -> SolveError {
    SolveError::InvalidTarget {
        constraint_id: id,
        reason: format!("{:?} of element {} {what}", target.anchor, target.element_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_types::{Point2, SketchElement};

    #[test]
    fn unknown_element_is_reported() {
        let mut system = SolverSystem::from_elements(&[]);
        let missing = Uuid::new_v4();
        let err = system
            .add_constraints(&[SketchConstraint::horizontal(ElementRef::whole(missing))])
            .unwrap_err();
        assert_eq!(err, SolveError::UnknownElement(missing));
    }

    #[test]
    fn circle_has_no_start_point() {
        let circle = SketchElement::circle(Point2::ORIGIN, 1.0);
        let line = SketchElement::line(Point2::ORIGIN, Point2::new(1.0, 0.0));
        let mut system = SolverSystem::from_elements(&[circle.clone(), line.clone()]);
        let err = system
            .add_constraints(&[SketchConstraint::coincident(
                ElementRef::start(circle.id()),
                ElementRef::start(line.id()),
            )])
            .unwrap_err();
        assert!(matches!(err, SolveError::InvalidTarget { .. }));
    }

    #[test]
    fn distance_without_value_is_rejected() {
        let line = SketchElement::line(Point2::ORIGIN, Point2::new(1.0, 0.0));
        let mut system = SolverSystem::from_elements(std::slice::from_ref(&line));
        let constraint = SketchConstraint::new(
            ConstraintKind::Distance,
            vec![ElementRef::whole(line.id())],
            None,
        );
        let err = system.add_constraints(&[constraint.clone()]).unwrap_err();
        assert_eq!(err, SolveError::MissingValue(constraint.id));
    }

    #[test]
    fn rectangle_edges_resolve_to_segments() {
        let rect = SketchElement::rectangle(Point2::ORIGIN, Point2::new(3.0, 2.0));
        let mut system = SolverSystem::from_elements(std::slice::from_ref(&rect));
        system
            .add_constraints(&[SketchConstraint::length(ElementRef::edge(rect.id(), 0), 5.0)])
            .unwrap();
        assert_eq!(system.equations.len(), 5);
        assert!(system
            .add_constraints(&[SketchConstraint::length(ElementRef::edge(rect.id(), 4), 5.0)])
            .is_err());
    }

    #[test]
    fn fixed_segment_pins_both_ends() {
        let line = SketchElement::line(Point2::ORIGIN, Point2::new(1.0, 1.0));
        let mut system = SolverSystem::from_elements(std::slice::from_ref(&line));
        system
            .add_constraints(&[SketchConstraint::fixed(ElementRef::whole(line.id()))])
            .unwrap();
        assert_eq!(system.residual_count(), 4);
    }
}
