use approx::assert_relative_eq;
use model_types::{ElementRef, Point2, SketchConstraint, SketchElement, SolveStatus, Traversal};
use proptest::prelude::*;
use sketch_solver::*;
use uuid::Uuid;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn p(x: f64, y: f64) -> Point2 {
    Point2::new(x, y)
}

fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> SketchElement {
    SketchElement::line(p(x0, y0), p(x1, y1))
}

fn ids(elements: &[SketchElement]) -> Vec<Uuid> {
    elements.iter().map(SketchElement::id).collect()
}

fn detect(elements: &[SketchElement]) -> DetectedProfiles {
    detect_profiles(elements, PROFILE_TOLERANCE)
}

fn solve(elements: &[SketchElement], constraints: &[SketchConstraint]) -> Result<SolvedSketch, SolveError> {
    solve_sketch(elements, constraints, &SolverConfig::default())
}

fn assert_point_near(actual: Point2, expected: Point2, tol: f64) {
    assert!(
        actual.distance_to(&expected) < tol,
        "point ({:.6}, {:.6}), expected ({:.6}, {:.6}), tol={tol}",
        actual.x,
        actual.y,
        expected.x,
        expected.y,
    );
}

// ── Profile Detection ───────────────────────────────────────────────────────

#[test]
fn profile_triangle_is_one_closed_group() {
    let elements = vec![
        line(0.0, 0.0, 10.0, 0.0),
        line(10.0, 0.0, 5.0, 8.0),
        line(5.0, 8.0, 0.0, 0.0),
    ];
    let detected = detect(&elements);
    assert_eq!(detected.closed.len(), 1);
    assert!(detected.open.is_empty());
    let group = &detected.closed[0];
    assert!(group.closed);
    assert_eq!(group.element_ids, ids(&elements));
    assert!(group.directions.iter().all(|d| *d == Traversal::Forward));
}

#[test]
fn profile_four_lines_make_one_group_of_four() {
    let elements = vec![
        line(0.0, 0.0, 20.0, 0.0),
        line(20.0, 0.0, 20.0, 10.0),
        line(20.0, 10.0, 0.0, 10.0),
        line(0.0, 10.0, 0.0, 0.0),
    ];
    let detected = detect(&elements);
    assert_eq!(detected.closed.len(), 1);
    assert_eq!(detected.closed[0].len(), 4);
}

#[test]
fn profile_shuffled_lines_are_walked_in_chain_order() {
    // Same square, listed out of chain order.
    let elements = vec![
        line(0.0, 0.0, 20.0, 0.0),
        line(20.0, 10.0, 0.0, 10.0),
        line(20.0, 0.0, 20.0, 10.0),
        line(0.0, 10.0, 0.0, 0.0),
    ];
    let detected = detect(&elements);
    assert_eq!(detected.closed.len(), 1);
    assert_eq!(
        detected.closed[0].element_ids,
        vec![elements[0].id(), elements[2].id(), elements[1].id(), elements[3].id()]
    );
}

#[test]
fn profile_c_shape_is_open() {
    let elements = vec![
        line(10.0, 0.0, 0.0, 0.0),
        line(0.0, 0.0, 0.0, 10.0),
        line(0.0, 10.0, 10.0, 10.0),
    ];
    let detected = detect(&elements);
    assert!(detected.closed.is_empty());
    assert_eq!(detected.open.len(), 1);
    assert_eq!(detected.open[0].element_ids, ids(&elements));
    assert!(!detected.open[0].closed);
}

#[test]
fn profile_open_path_starts_at_free_end() {
    // The middle line is listed first; the walk must begin at an end of the chain.
    let elements = vec![
        line(0.0, 0.0, 0.0, 10.0),
        line(10.0, 0.0, 0.0, 0.0),
        line(0.0, 10.0, 10.0, 10.0),
    ];
    let detected = detect(&elements);
    assert_eq!(detected.open.len(), 1);
    let path = &detected.open[0];
    assert_eq!(path.len(), 3);
    assert_eq!(path.element_ids[1], elements[0].id());
}

#[test]
fn profile_branch_is_neither_closed_nor_open() {
    // Triangle with a spur hanging off one corner.
    let elements = vec![
        line(0.0, 0.0, 10.0, 0.0),
        line(10.0, 0.0, 5.0, 8.0),
        line(5.0, 8.0, 0.0, 0.0),
        line(10.0, 0.0, 15.0, 0.0),
    ];
    let detected = detect(&elements);
    assert!(detected.closed.is_empty());
    assert!(detected.open.is_empty());
}

#[test]
fn profile_closed_spline_stands_alone() {
    let spline = SketchElement::spline(vec![p(0.0, 0.0), p(5.0, 5.0), p(10.0, 0.0), p(0.2, 0.1)]);
    let detected = detect(&[spline.clone()]);
    assert_eq!(detected.closed.len(), 1);
    assert_eq!(detected.closed[0].element_ids, vec![spline.id()]);
}

#[test]
fn profile_single_open_spline_is_an_open_path() {
    let spline = SketchElement::spline(vec![p(0.0, 0.0), p(5.0, 5.0), p(10.0, 0.0)]);
    let detected = detect(&[spline]);
    assert!(detected.closed.is_empty());
    assert_eq!(detected.open.len(), 1);
}

#[test]
fn profile_rectangle_and_circle_precede_chains() {
    let rect = SketchElement::rectangle(p(0.0, 0.0), p(4.0, 3.0));
    let circle = SketchElement::circle(p(10.0, 10.0), 2.0);
    let triangle = vec![
        line(20.0, 0.0, 30.0, 0.0),
        line(30.0, 0.0, 25.0, 5.0),
        line(25.0, 5.0, 20.0, 0.0),
    ];
    let mut elements = triangle.clone();
    elements.push(rect.clone());
    elements.push(circle.clone());

    let detected = detect(&elements);
    assert_eq!(detected.closed.len(), 3);
    assert_eq!(detected.closed[0].element_ids, vec![rect.id()]);
    assert_eq!(detected.closed[1].element_ids, vec![circle.id()]);
    assert_eq!(detected.closed[2].element_ids, ids(&triangle));
}

#[test]
fn profile_arc_and_line_close_a_d_shape() {
    let arc = SketchElement::arc(p(0.0, 0.0), 5.0, -std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2);
    let chord = line(0.0, 5.0, 0.0, -5.0);
    let detected = detect(&[arc.clone(), chord.clone()]);
    assert_eq!(detected.closed.len(), 1);
    assert_eq!(detected.closed[0].element_ids, vec![arc.id(), chord.id()]);
}

#[test]
fn profile_hline_and_vline_chain_with_lines() {
    let elements = vec![
        SketchElement::hline(p(0.0, 0.0), 10.0),
        SketchElement::vline(p(10.0, 0.0), 10.0),
        line(10.0, 10.0, 0.0, 0.0),
    ];
    let detected = detect(&elements);
    assert_eq!(detected.closed.len(), 1);
    assert_eq!(detected.closed[0].len(), 3);
}

#[test]
fn profile_tolerance_bounds_coincidence() {
    let within = vec![
        line(0.0, 0.0, 10.0, 0.0),
        line(10.4, 0.0, 5.0, 8.0),
        line(5.0, 8.0, 0.0, 0.0),
    ];
    assert_eq!(detect(&within).closed.len(), 1);

    let beyond = vec![
        line(0.0, 0.0, 10.0, 0.0),
        line(10.6, 0.0, 5.0, 8.0),
        line(5.0, 8.0, 0.0, 0.0),
    ];
    let detected = detect(&beyond);
    assert!(detected.closed.is_empty());
    assert_eq!(detected.open.len(), 1);
}

#[test]
fn profile_two_disjoint_loops() {
    let elements = vec![
        line(0.0, 0.0, 1.0, 0.0),
        line(1.0, 0.0, 0.0, 1.0),
        line(0.0, 1.0, 0.0, 0.0),
        line(10.0, 0.0, 11.0, 0.0),
        line(11.0, 0.0, 10.0, 1.0),
        line(10.0, 1.0, 10.0, 0.0),
    ];
    let detected = detect(&elements);
    assert_eq!(detected.closed.len(), 2);
    assert_ne!(detected.closed[0].id, detected.closed[1].id);
}

#[test]
fn profile_degenerate_spline_is_ignored() {
    let spline = SketchElement::spline(vec![p(1.0, 1.0)]);
    let detected = detect(&[spline]);
    assert!(detected.closed.is_empty());
    assert!(detected.open.is_empty());
}

// ── Solving ─────────────────────────────────────────────────────────────────

#[test]
fn line_with_fixed_start_horizontal_and_length_is_fully_constrained() {
    let l = line(0.0, 0.0, 8.0, 1.0);
    let constraints = [
        SketchConstraint::fixed(ElementRef::start(l.id())),
        SketchConstraint::horizontal(ElementRef::whole(l.id())),
        SketchConstraint::length(ElementRef::whole(l.id()), 10.0),
    ];
    let solved = solve(&[l], &constraints).unwrap();
    assert_eq!(solved.status, SolveStatus::FullyConstrained);
    let (start, end) = solved.elements[0].endpoints().unwrap();
    assert_point_near(start, p(0.0, 0.0), 1e-8);
    assert_point_near(end, p(10.0, 0.0), 1e-6);
}

#[test]
fn distance_between_points_is_reached() {
    let l = line(0.0, 0.0, 3.0, 4.0);
    let constraints = [
        SketchConstraint::fixed(ElementRef::start(l.id())),
        SketchConstraint::distance(ElementRef::start(l.id()), ElementRef::end(l.id()), 10.0),
    ];
    let solved = solve(&[l], &constraints).unwrap();
    let (start, end) = solved.elements[0].endpoints().unwrap();
    assert_relative_eq!(start.distance_to(&end), 10.0, epsilon = 1e-6);
    assert_eq!(solved.status, SolveStatus::UnderConstrained { dof: 1 });
}

#[test]
fn unconstrained_line_reports_its_freedom() {
    let l = line(0.0, 0.0, 5.0, 1.0);
    let constraints = [SketchConstraint::horizontal(ElementRef::whole(l.id()))];
    let solved = solve(&[l], &constraints).unwrap();
    assert_eq!(solved.status, SolveStatus::UnderConstrained { dof: 3 });
}

#[test]
fn rectangle_dimensions_are_driven_by_edge_lengths() {
    let rect = SketchElement::rectangle(p(0.0, 0.0), p(80.0, 40.0));
    let id = rect.id();
    let constraints = [
        SketchConstraint::fixed(ElementRef::vertex(id, 0)),
        SketchConstraint::length(ElementRef::edge(id, 0), 100.0),
        SketchConstraint::length(ElementRef::edge(id, 1), 50.0),
    ];
    let solved = solve(&[rect], &constraints).unwrap();
    assert_eq!(solved.status, SolveStatus::FullyConstrained);
    let SketchElement::Rectangle { start, end, .. } = solved.elements[0] else {
        panic!("expected a rectangle");
    };
    assert_point_near(start, p(0.0, 0.0), 1e-8);
    assert_point_near(end, p(100.0, 50.0), 1e-6);
}

#[test]
fn circle_radius_constraint() {
    let circle = SketchElement::circle(p(2.0, 3.0), 4.0);
    let constraints = [
        SketchConstraint::fixed(ElementRef::center(circle.id())),
        SketchConstraint::radius(ElementRef::whole(circle.id()), 7.5),
    ];
    let solved = solve(&[circle], &constraints).unwrap();
    assert_eq!(solved.status, SolveStatus::FullyConstrained);
    let SketchElement::Circle { center, radius, .. } = solved.elements[0] else {
        panic!("expected a circle");
    };
    assert_point_near(center, p(2.0, 3.0), 1e-8);
    assert_relative_eq!(radius, 7.5, epsilon = 1e-8);
}

#[test]
fn perpendicular_lines() {
    let a = line(0.0, 0.0, 10.0, 0.0);
    let b = line(0.0, 0.0, 1.0, 8.0);
    let constraints = [
        SketchConstraint::fixed(ElementRef::whole(a.id())),
        SketchConstraint::fixed(ElementRef::start(b.id())),
        SketchConstraint::perpendicular(ElementRef::whole(a.id()), ElementRef::whole(b.id())),
    ];
    let solved = solve(&[a, b], &constraints).unwrap();
    let (start, end) = solved.elements[1].endpoints().unwrap();
    assert_relative_eq!(end.x - start.x, 0.0, epsilon = 1e-6);
}

#[test]
fn parallel_lines() {
    let a = line(0.0, 0.0, 10.0, 0.0);
    let b = line(0.0, 5.0, 10.0, 7.0);
    let constraints = [
        SketchConstraint::fixed(ElementRef::whole(a.id())),
        SketchConstraint::fixed(ElementRef::start(b.id())),
        SketchConstraint::parallel(ElementRef::whole(a.id()), ElementRef::whole(b.id())),
    ];
    let solved = solve(&[a, b], &constraints).unwrap();
    let (start, end) = solved.elements[1].endpoints().unwrap();
    assert_relative_eq!(end.y - start.y, 0.0, epsilon = 1e-6);
}

#[test]
fn coincident_joins_line_to_arc() {
    let arc = SketchElement::arc(p(0.0, 0.0), 5.0, 0.0, std::f64::consts::FRAC_PI_2);
    let l = line(6.0, 1.0, 12.0, 0.0);
    let constraints = [
        SketchConstraint::fixed(ElementRef::center(arc.id())),
        SketchConstraint::radius(ElementRef::whole(arc.id()), 5.0),
        SketchConstraint::coincident(ElementRef::start(arc.id()), ElementRef::start(l.id())),
    ];
    let solved = solve(&[arc, l], &constraints).unwrap();
    let (arc_start, _) = solved.elements[0].endpoints().unwrap();
    let (line_start, _) = solved.elements[1].endpoints().unwrap();
    assert_point_near(arc_start, line_start, 1e-6);
    let SketchElement::Arc { radius, .. } = solved.elements[0] else {
        panic!("expected an arc");
    };
    assert_relative_eq!(radius, 5.0, epsilon = 1e-8);
}

#[test]
fn hline_stays_horizontal_under_other_constraints() {
    let h = SketchElement::hline(p(0.0, 0.0), 4.0);
    let constraints = [
        SketchConstraint::fixed(ElementRef::start(h.id())),
        SketchConstraint::length(ElementRef::whole(h.id()), 9.0),
    ];
    let solved = solve(&[h], &constraints).unwrap();
    let SketchElement::HLine { start, length, .. } = solved.elements[0] else {
        panic!("expected an hline");
    };
    assert_point_near(start, p(0.0, 0.0), 1e-8);
    assert_relative_eq!(length, 9.0, epsilon = 1e-6);
    assert_eq!(solved.status, SolveStatus::FullyConstrained);
}

#[test]
fn contradictory_constraints_fail() {
    let l = line(0.0, 0.0, 3.0, 4.0);
    let constraints = [
        SketchConstraint::fixed(ElementRef::whole(l.id())),
        SketchConstraint::length(ElementRef::whole(l.id()), 10.0),
    ];
    let err = solve(&[l], &constraints).unwrap_err();
    assert!(
        matches!(err, SolveError::Stalled { .. } | SolveError::DidNotConverge { .. }),
        "unexpected error: {err:?}"
    );
}

#[test]
fn constraints_on_unknown_elements_fail() {
    let l = line(0.0, 0.0, 1.0, 0.0);
    let ghost = Uuid::new_v4();
    let constraints = [SketchConstraint::vertical(ElementRef::whole(ghost))];
    assert_eq!(solve(&[l], &constraints).unwrap_err(), SolveError::UnknownElement(ghost));
}

#[test]
fn solving_preserves_element_ids_and_order() {
    let elements = vec![
        line(0.0, 0.0, 5.0, 0.5),
        SketchElement::circle(p(1.0, 1.0), 1.0),
        SketchElement::spline(vec![p(0.0, 0.0), p(1.0, 2.0), p(3.0, 1.0)]),
    ];
    let constraints = [SketchConstraint::horizontal(ElementRef::whole(elements[0].id()))];
    let solved = solve(&elements, &constraints).unwrap();
    assert_eq!(ids(&solved.elements), ids(&elements));
}

#[test]
fn solver_config_accepts_partial_json() {
    let config: SolverConfig = serde_json::from_str(r#"{ "maxIterations": 7 }"#).unwrap();
    assert_eq!(config.max_iterations, 7);
    assert_eq!(config.tolerance, SolverConfig::default().tolerance);
}

// ── Properties ──────────────────────────────────────────────────────────────

fn arb_segments() -> impl Strategy<Value = Vec<SketchElement>> {
    // Endpoints on a coarse grid so that coincidences actually happen.
    let coord = (0..6i32).prop_map(|v| f64::from(v) * 2.0);
    let point = (coord.clone(), coord).prop_map(|(x, y)| p(x, y));
    prop::collection::vec((point.clone(), point), 0..10).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(a, b)| SketchElement::line(a, b))
            .collect()
    })
}

proptest! {
    #[test]
    fn detection_is_deterministic_and_disjoint(elements in arb_segments()) {
        let first = detect(&elements);
        let second = detect(&elements);
        prop_assert_eq!(&first, &second);

        let mut seen = std::collections::HashSet::new();
        for group in first.closed.iter().chain(first.open.iter()) {
            prop_assert!(!group.is_empty());
            prop_assert_eq!(group.element_ids.len(), group.directions.len());
            for id in &group.element_ids {
                prop_assert!(seen.insert(*id), "element in two groups");
            }
        }
    }

    #[test]
    fn closed_groups_chain_end_to_end(elements in arb_segments()) {
        let detected = detect(&elements);
        for group in &detected.closed {
            let walked: Vec<(Point2, Point2)> = group
                .element_ids
                .iter()
                .zip(&group.directions)
                .map(|(id, dir)| {
                    let element = elements.iter().find(|e| e.id() == *id).unwrap();
                    let (s, e) = element.endpoints().unwrap();
                    match dir {
                        Traversal::Forward => (s, e),
                        Traversal::Reversed => (e, s),
                    }
                })
                .collect();
            for pair in walked.windows(2) {
                prop_assert!(pair[0].1.distance_to(&pair[1].0) <= PROFILE_TOLERANCE);
            }
        }
    }

    #[test]
    fn length_constraint_is_met(x in 1.0f64..20.0, y in -10.0f64..10.0, target in 1.0f64..50.0) {
        let l = line(0.0, 0.0, x, y);
        let constraints = [
            SketchConstraint::fixed(ElementRef::start(l.id())),
            SketchConstraint::length(ElementRef::whole(l.id()), target),
        ];
        let solved = solve(&[l], &constraints).unwrap();
        let (start, end) = solved.elements[0].endpoints().unwrap();
        prop_assert!((start.distance_to(&end) - target).abs() < 1e-6);
    }
}
