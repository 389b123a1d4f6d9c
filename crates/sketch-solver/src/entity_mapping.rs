use std::collections::HashMap;

use model_types::{angle_around, point_on_circle, unwrap_angle, Point2, SketchElement};
use uuid::Uuid;

/// Offset of a point's `x` parameter; `y` follows at `offset + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointVar(pub usize);

impl PointVar {
    pub fn x(self) -> usize {
        self.0
    }

    pub fn y(self) -> usize {
        self.0 + 1
    }
}

/// A segment between two solver points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentVar {
    pub a: PointVar,
    pub b: PointVar,
}

/// Solver primitives standing in for one sketch element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementVars {
    /// line, hline and vline
    Segment(SegmentVar),
    Arc {
        center: PointVar,
        start: PointVar,
        end: PointVar,
        radius: usize,
    },
    Spline {
        points: Vec<PointVar>,
    },
    /// Corners counter-clockwise from the start corner; edge `i` runs from
    /// corner `i` to corner `i + 1`.
    Rectangle {
        corners: [PointVar; 4],
    },
    Circle {
        center: PointVar,
        radius: usize,
    },
}

impl ElementVars {
    pub fn rectangle_edge(corners: &[PointVar; 4], index: usize) -> Option<SegmentVar> {
        (index < 4).then(|| SegmentVar {
            a: corners[index],
            b: corners[(index + 1) % 4],
        })
    }
}

/// One equation of the system. Each contributes one or two residuals.
#[derive(Debug, Clone, PartialEq)]
pub enum Equation {
    Coincident(PointVar, PointVar),
    Distance(PointVar, PointVar, f64),
    /// Both points share a y coordinate.
    Horizontal(PointVar, PointVar),
    /// Both points share an x coordinate.
    Vertical(PointVar, PointVar),
    Parallel(SegmentVar, SegmentVar),
    Perpendicular(SegmentVar, SegmentVar),
    OnCircle {
        point: PointVar,
        center: PointVar,
        radius: usize,
    },
    Radius(usize, f64),
    FixedAt(PointVar, Point2),
}

impl Equation {
    pub fn residual_count(&self) -> usize {
        match self {
            Equation::Coincident(..) | Equation::FixedAt(..) => 2,
            _ => 1,
        }
    }

    /// Append this equation's residuals at `params` to `out`.
    pub fn residuals(&self, params: &[f64], out: &mut Vec<f64>) {
        let point = |p: PointVar| Point2::new(params[p.x()], params[p.y()]);
        match self {
            Equation::Coincident(a, b) => {
                out.push(params[a.x()] - params[b.x()]);
                out.push(params[a.y()] - params[b.y()]);
            }
            Equation::Distance(a, b, d) => out.push(point(*a).distance_to(&point(*b)) - d),
            Equation::Horizontal(a, b) => out.push(params[a.y()] - params[b.y()]),
            Equation::Vertical(a, b) => out.push(params[a.x()] - params[b.x()]),
            Equation::Parallel(s, t) => {
                let (u, v) = (direction(params, *s), direction(params, *t));
                out.push(u.0 * v.1 - u.1 * v.0);
            }
            Equation::Perpendicular(s, t) => {
                let (u, v) = (direction(params, *s), direction(params, *t));
                out.push(u.0 * v.0 + u.1 * v.1);
            }
            Equation::OnCircle {
                point: p,
                center,
                radius,
            } => out.push(point(*p).distance_to(&point(*center)) - params[*radius]),
            Equation::Radius(r, value) => out.push(params[*r] - value),
            Equation::FixedAt(p, at) => {
                out.push(params[p.x()] - at.x);
                out.push(params[p.y()] - at.y);
            }
        }
    }
}

/// Unit direction of a segment; zero-length segments give the zero vector.
fn direction(params: &[f64], s: SegmentVar) -> (f64, f64) {
    let dx = params[s.b.x()] - params[s.a.x()];
    let dy = params[s.b.y()] - params[s.a.y()];
    let len = dx.hypot(dy);
    if len < 1e-12 {
        (0.0, 0.0)
    } else {
        (dx / len, dy / len)
    }
}

/// Numeric system built from sketch elements.
///
/// Holds the flat parameter vector, the mapping from element ids to their
/// primitives, and every equation (implicit and user-authored).
#[derive(Debug, Clone, Default)]
pub struct SolverSystem {
    pub params: Vec<f64>,
    pub equations: Vec<Equation>,
    pub element_vars: HashMap<Uuid, ElementVars>,
}

impl SolverSystem {
    /// Extract solver primitives and implicit equations from `elements`.
    pub fn from_elements(elements: &[SketchElement]) -> Self {
        let mut system = SolverSystem::default();
        for element in elements {
            let vars = system.add_element(element);
            system.element_vars.insert(element.id(), vars);
        }
        system
    }

    fn add_point(&mut self, p: Point2) -> PointVar {
        let offset = self.params.len();
        self.params.push(p.x);
        self.params.push(p.y);
        PointVar(offset)
    }

    fn add_scalar(&mut self, value: f64) -> usize {
        self.params.push(value);
        self.params.len() - 1
    }

    fn add_segment(&mut self, start: Point2, end: Point2) -> SegmentVar {
        SegmentVar {
            a: self.add_point(start),
            b: self.add_point(end),
        }
    }

    fn add_element(&mut self, element: &SketchElement) -> ElementVars {
        match element {
            SketchElement::Line { start, end, .. } => {
                ElementVars::Segment(self.add_segment(*start, *end))
            }
            SketchElement::HLine { start, length, .. } => {
                let seg = self.add_segment(*start, start.offset(*length, 0.0));
                self.equations.push(Equation::Horizontal(seg.a, seg.b));
                ElementVars::Segment(seg)
            }
            SketchElement::VLine { start, length, .. } => {
                let seg = self.add_segment(*start, start.offset(0.0, *length));
                self.equations.push(Equation::Vertical(seg.a, seg.b));
                ElementVars::Segment(seg)
            }
            SketchElement::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                ..
            } => {
                let c = self.add_point(*center);
                let s = self.add_point(point_on_circle(*center, *radius, *start_angle));
                let e = self.add_point(point_on_circle(*center, *radius, *end_angle));
                let r = self.add_scalar(*radius);
                for point in [s, e] {
                    self.equations.push(Equation::OnCircle {
                        point,
                        center: c,
                        radius: r,
                    });
                }
                ElementVars::Arc {
                    center: c,
                    start: s,
                    end: e,
                    radius: r,
                }
            }
            SketchElement::Spline { points, .. } => ElementVars::Spline {
                points: points.iter().map(|p| self.add_point(*p)).collect(),
            },
            SketchElement::Rectangle { start, end, .. } => {
                let c = SketchElement::rectangle_corners(*start, *end).map(|p| self.add_point(p));
                self.equations.push(Equation::Horizontal(c[0], c[1]));
                self.equations.push(Equation::Vertical(c[1], c[2]));
                self.equations.push(Equation::Horizontal(c[2], c[3]));
                self.equations.push(Equation::Vertical(c[3], c[0]));
                ElementVars::Rectangle { corners: c }
            }
            SketchElement::Circle { center, radius, .. } => ElementVars::Circle {
                center: self.add_point(*center),
                radius: self.add_scalar(*radius),
            },
        }
    }

    pub fn residual_count(&self) -> usize {
        self.equations.iter().map(Equation::residual_count).sum()
    }

    /// All residuals at `params`, in equation order.
    pub fn residuals(&self, params: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.residual_count());
        for equation in &self.equations {
            equation.residuals(params, &mut out);
        }
        out
    }

    pub fn point(&self, params: &[f64], p: PointVar) -> Point2 {
        Point2::new(params[p.x()], params[p.y()])
    }

    /// Write solved `params` back into copies of `elements`.
    ///
    /// Arc angles are unwrapped to stay continuous with the original angles.
    pub fn project(&self, elements: &[SketchElement], params: &[f64]) -> Vec<SketchElement> {
        elements
            .iter()
            .map(|element| match self.element_vars.get(&element.id()) {
                Some(vars) => self.project_element(element, vars, params),
                None => element.clone(),
            })
            .collect()
    }

    fn project_element(
        &self,
        element: &SketchElement,
        vars: &ElementVars,
        params: &[f64],
    ) -> SketchElement {
        let at = |p: PointVar| self.point(params, p);
        match (element, vars) {
            (SketchElement::Line { id, .. }, ElementVars::Segment(s)) => SketchElement::Line {
                id: *id,
                start: at(s.a),
                end: at(s.b),
            },
            (SketchElement::HLine { id, .. }, ElementVars::Segment(s)) => SketchElement::HLine {
                id: *id,
                start: at(s.a),
                length: at(s.b).x - at(s.a).x,
            },
            (SketchElement::VLine { id, .. }, ElementVars::Segment(s)) => SketchElement::VLine {
                id: *id,
                start: at(s.a),
                length: at(s.b).y - at(s.a).y,
            },
            (
                SketchElement::Arc {
                    id,
                    start_angle,
                    end_angle,
                    ..
                },
                ElementVars::Arc {
                    center,
                    start,
                    end,
                    radius,
                },
            ) => {
                let c = at(*center);
                SketchElement::Arc {
                    id: *id,
                    center: c,
                    radius: params[*radius],
                    start_angle: unwrap_angle(angle_around(c, at(*start)), *start_angle),
                    end_angle: unwrap_angle(angle_around(c, at(*end)), *end_angle),
                }
            }
            (SketchElement::Spline { id, .. }, ElementVars::Spline { points }) => {
                SketchElement::Spline {
                    id: *id,
                    points: points.iter().map(|p| at(*p)).collect(),
                }
            }
            (SketchElement::Rectangle { id, .. }, ElementVars::Rectangle { corners }) => {
                SketchElement::Rectangle {
                    id: *id,
                    start: at(corners[0]),
                    end: at(corners[2]),
                }
            }
            (SketchElement::Circle { id, .. }, ElementVars::Circle { center, radius }) => {
                SketchElement::Circle {
                    id: *id,
                    center: at(*center),
                    radius: params[*radius],
                }
            }
            _ => element.clone(),
        }
    }
}
