use model_types::{Sketch, SketchConstraint, SketchElement, SolveStatus};
use sketch_solver::{detect_profiles, solve_sketch, SolveError, SolvedSketch};
use uuid::Uuid;

use crate::pending::SolveTicket;
use crate::types::{EngineError, Feature, FeatureUpdate, InvalidSource, Operation};
use crate::Engine;

// Sketch element and constraint commands. Each goes through `edit_sketch`, so a
// failed edit leaves the sketch untouched and commits nothing.
impl Engine {
    pub fn add_sketch_element(
        &mut self,
        sketch_id: Uuid,
        element: SketchElement,
    ) -> Result<Uuid, EngineError> {
        let element_id = element.id();
        let label = format!("Add {}", element.kind_name());
        self.edit_sketch(sketch_id, label, |sketch| {
            sketch.elements.push(element);
            Ok(())
        })?;
        Ok(element_id)
    }

    /// Replace the element with the same id.
    pub fn update_sketch_element(
        &mut self,
        sketch_id: Uuid,
        element: SketchElement,
    ) -> Result<(), EngineError> {
        let label = format!("Update {}", element.kind_name());
        self.edit_sketch(sketch_id, label, |sketch| {
            let element_id = element.id();
            let slot = sketch
                .elements
                .iter_mut()
                .find(|e| e.id() == element_id)
                .ok_or(EngineError::ElementNotFound {
                    sketch_id,
                    element_id,
                })?;
            *slot = element;
            Ok(())
        })
    }

    /// Remove an element and every constraint that refers to it.
    pub fn delete_sketch_element(
        &mut self,
        sketch_id: Uuid,
        element_id: Uuid,
    ) -> Result<(), EngineError> {
        self.edit_sketch(sketch_id, "Delete element", |sketch| {
            let index = sketch
                .element_index(element_id)
                .ok_or(EngineError::ElementNotFound {
                    sketch_id,
                    element_id,
                })?;
            sketch.elements.remove(index);
            sketch.constraints.retain(|c| !c.references(element_id));
            Ok(())
        })
    }

    /// Replace the whole element list, as the sketch editor does on each change.
    ///
    /// Constraints referring to elements that are gone are dropped.
    pub fn set_sketch_elements(
        &mut self,
        sketch_id: Uuid,
        elements: Vec<SketchElement>,
    ) -> Result<(), EngineError> {
        self.edit_sketch(sketch_id, "Edit sketch", |sketch| {
            sketch.elements = elements;
            let elements = &sketch.elements;
            sketch
                .constraints
                .retain(|c| c.targets.iter().all(|t| elements.iter().any(|e| e.id() == t.element_id)));
            Ok(())
        })
    }

    pub fn add_constraint(
        &mut self,
        sketch_id: Uuid,
        constraint: SketchConstraint,
    ) -> Result<Uuid, EngineError> {
        let constraint_id = constraint.id;
        self.edit_sketch(sketch_id, "Add constraint", |sketch| {
            if let Some(missing) = constraint
                .targets
                .iter()
                .find(|t| sketch.element(t.element_id).is_none())
            {
                return Err(EngineError::ElementNotFound {
                    sketch_id,
                    element_id: missing.element_id,
                });
            }
            sketch.constraints.push(constraint);
            Ok(())
        })?;
        Ok(constraint_id)
    }

    pub fn remove_constraint(
        &mut self,
        sketch_id: Uuid,
        constraint_id: Uuid,
    ) -> Result<(), EngineError> {
        self.edit_sketch(sketch_id, "Remove constraint", |sketch| {
            let index = sketch
                .constraint_index(constraint_id)
                .ok_or(EngineError::ConstraintNotFound {
                    sketch_id,
                    constraint_id,
                })?;
            sketch.constraints.remove(index);
            Ok(())
        })
    }

    pub fn update_constraint_value(
        &mut self,
        sketch_id: Uuid,
        constraint_id: Uuid,
        value: f64,
    ) -> Result<(), EngineError> {
        self.edit_sketch(sketch_id, "Update constraint", |sketch| {
            let index = sketch
                .constraint_index(constraint_id)
                .ok_or(EngineError::ConstraintNotFound {
                    sketch_id,
                    constraint_id,
                })?;
            sketch.constraints[index].value = Some(value);
            Ok(())
        })
    }

    // ── Solving ─────────────────────────────────────────────────────────────

    /// Solve a sketch's constraints in place.
    ///
    /// On failure the sketch is marked invalid and keeps its geometry.
    pub fn solve_constraints(&mut self, sketch_id: Uuid) -> Result<SolveStatus, EngineError> {
        let ticket = self.begin_solve(sketch_id)?;
        let result = match ticket.sketch() {
            Some(sketch) => solve_sketch(&sketch.elements, &sketch.constraints, &self.config.solver),
            None => return Err(EngineError::NotASketch { id: sketch_id }),
        };
        self.apply_solve(ticket, result)
    }

    /// Issue a ticket for solving `sketch_id` elsewhere. Supersedes any earlier
    /// ticket for the same sketch.
    pub fn begin_solve(&mut self, sketch_id: Uuid) -> Result<SolveTicket, EngineError> {
        self.sketch(sketch_id)?;
        let basis = self
            .graph
            .get_shared(sketch_id)
            .cloned()
            .ok_or(EngineError::FeatureNotFound { id: sketch_id })?;
        let serial = self.pending.issue(sketch_id);
        tracing::debug!(%sketch_id, serial, "solve dispatched");
        Ok(SolveTicket::new(sketch_id, serial, basis))
    }

    /// Apply the result of a solve issued by [`Engine::begin_solve`].
    ///
    /// Rejected as stale if a newer ticket exists for the sketch, or if the
    /// sketch was removed or edited since dispatch.
    pub fn apply_solve(
        &mut self,
        ticket: SolveTicket,
        result: Result<SolvedSketch, SolveError>,
    ) -> Result<SolveStatus, EngineError> {
        let sketch_id = ticket.sketch_id;
        let current = self.graph.get_shared(sketch_id);
        let fresh = self.pending.is_current(sketch_id, ticket.serial)
            && current.is_some_and(|feature| ticket.matches(feature));
        if !fresh {
            tracing::warn!(%sketch_id, serial = ticket.serial, "stale solve result dropped");
            return Err(EngineError::StaleResult { sketch_id });
        }
        self.pending.complete(sketch_id);

        match result {
            Ok(solved) => {
                let status = solved.status.clone();
                self.write_solved(sketch_id, solved)?;
                self.commit("Solve constraints");
                tracing::debug!(%sketch_id, ?status, "constraints solved");
                Ok(status)
            }
            Err(err) => {
                tracing::warn!(%sketch_id, error = %err, "constraint solve failed");
                self.mark_solve_failed(sketch_id, &err)?;
                self.commit("Solve constraints (failed)");
                Err(EngineError::Solve(err))
            }
        }
    }

    fn write_solved(&mut self, sketch_id: Uuid, solved: SolvedSketch) -> Result<(), EngineError> {
        let mut sketch = self.sketch(sketch_id)?.clone();
        sketch.elements = solved.elements;
        sketch.solve_status = Some(solved.status);
        let operation = self.with_detected_profiles(Operation::Sketch { sketch });
        self.graph
            .update(sketch_id, FeatureUpdate::operation(operation))?;

        let dependencies_present = self
            .graph
            .dependencies(sketch_id)
            .unwrap_or_default()
            .iter()
            .all(|dep| self.graph.contains(*dep));
        if let Some(feature) = self.graph.get_mut(sketch_id) {
            if dependencies_present {
                feature.revalidate();
            }
        }
        self.graph.mark_dirty_with_dependents(sketch_id)?;
        Ok(())
    }

    fn mark_solve_failed(&mut self, sketch_id: Uuid, err: &SolveError) -> Result<(), EngineError> {
        let mut sketch = self.sketch(sketch_id)?.clone();
        sketch.solve_status = Some(SolveStatus::Failed {
            reason: err.to_string(),
        });
        self.graph.update(
            sketch_id,
            FeatureUpdate::operation(Operation::Sketch { sketch }),
        )?;
        if let Some(feature) = self.graph.get_mut(sketch_id) {
            feature.invalidate(
                InvalidSource::Solve,
                format!("Constraint solve failed: {err}"),
            );
        }
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    /// The sketch of feature `id`, or why there is none.
    pub fn sketch(&self, id: Uuid) -> Result<&Sketch, EngineError> {
        let feature: &Feature = self.graph.get(id).ok_or_else(|| {
            tracing::warn!(%id, "unknown sketch");
            EngineError::FeatureNotFound { id }
        })?;
        feature.sketch().ok_or_else(|| {
            tracing::warn!(%id, kind = ?feature.kind(), "feature is not a sketch");
            EngineError::NotASketch { id }
        })
    }

    /// Re-run profile detection on a sketch operation; other operations pass
    /// through.
    pub(crate) fn with_detected_profiles(&self, mut operation: Operation) -> Operation {
        if let Some(sketch) = operation.as_sketch_mut() {
            let detected = detect_profiles(&sketch.elements, self.config.profile_tolerance);
            sketch.closed_profiles = detected.closed;
            sketch.open_paths = Some(detected.open);
        }
        operation
    }

    /// Apply `edit` to a copy of the sketch and commit it if it succeeds.
    fn edit_sketch<F>(
        &mut self,
        sketch_id: Uuid,
        label: impl Into<String>,
        edit: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Sketch) -> Result<(), EngineError>,
    {
        let mut sketch = self.sketch(sketch_id)?.clone();
        if let Err(err) = edit(&mut sketch) {
            tracing::warn!(%sketch_id, error = %err, "sketch edit rejected");
            return Err(err);
        }

        let operation = self.with_detected_profiles(Operation::Sketch { sketch });
        self.graph
            .update(sketch_id, FeatureUpdate::operation(operation))?;
        self.graph.mark_dirty_with_dependents(sketch_id)?;
        self.commit(label);
        Ok(())
    }
}
