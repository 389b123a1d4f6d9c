//! ModelBuilder: fluent API for scripting modeling sessions in tests.
//!
//! Wraps `command_bridge::dispatch()` to test the real dispatch path, not a
//! simulation. Features and sketch elements are addressed by test-chosen
//! names instead of UUIDs.

use std::collections::HashMap;

use command_bridge::{dispatch, EngineToUi, SessionState, UiToEngine};
use feature_engine::*;
use file_format::{MemoryStore, ProjectStore};
use model_types::*;
use uuid::Uuid;

use crate::assertions;
use crate::helpers::HarnessError;

/// A fluent builder for constructing and checking models in tests.
pub struct ModelBuilder {
    pub state: SessionState,
    named_features: HashMap<String, Uuid>,
    named_elements: HashMap<String, Uuid>,
    /// (message, response type) for every dispatched command.
    history: Vec<(String, String)>,
    auto_check: bool,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::with_store(Box::new(MemoryStore::new()))
    }

    pub fn with_store(store: Box<dyn ProjectStore>) -> Self {
        Self::from_state(SessionState::new(store))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::from_state(SessionState::with_config(
            config,
            Box::new(MemoryStore::new()),
        ))
    }

    fn from_state(state: SessionState) -> Self {
        Self {
            state,
            named_features: HashMap::new(),
            named_elements: HashMap::new(),
            history: Vec::new(),
            auto_check: false,
        }
    }

    /// After every command, check the dependents index and evaluation order.
    pub fn with_auto_check(mut self) -> Self {
        self.auto_check = true;
        self
    }

    // ── Features ────────────────────────────────────────────────────────

    /// Add an empty sketch on a standard plane.
    pub fn sketch(&mut self, name: &str, plane: StandardPlane) -> Result<Uuid, HarnessError> {
        self.add(name, Operation::Sketch {
            sketch: Sketch::on_plane(plane, 0.0),
        })
    }

    /// Add an empty sketch on a face of another feature.
    pub fn sketch_on_face(
        &mut self,
        name: &str,
        owner: &str,
        face_index: usize,
        boundary: Vec<[f64; 3]>,
    ) -> Result<Uuid, HarnessError> {
        let feature_id = self.feature_id(owner)?;
        let reference = SketchReference::Face {
            feature_id,
            face_index,
            boundary,
        };
        self.add(name, Operation::Sketch {
            sketch: Sketch::new(reference),
        })
    }

    pub fn extrude(&mut self, name: &str, sketch: &str, depth: f64) -> Result<Uuid, HarnessError> {
        let sketch_id = self.feature_id(sketch)?;
        self.add(name, Operation::Extrusion {
            params: ExtrusionParams {
                sketch_id,
                profile_ids: Vec::new(),
                depth,
                direction: ExtrudeDirection::Normal,
                mode: BodyMode::NewBody,
            },
        })
    }

    pub fn fillet(&mut self, name: &str, target: &str, radius: f64) -> Result<Uuid, HarnessError> {
        let target_id = self.feature_id(target)?;
        self.add(name, Operation::Fillet {
            params: FilletParams {
                target_id,
                radius,
                edges: EdgeSelection::All,
            },
        })
    }

    /// Add any operation under a test name. The name is also the feature name.
    pub fn add(&mut self, name: &str, operation: Operation) -> Result<Uuid, HarnessError> {
        self.check_name_available(name)?;
        let response = self.send(UiToEngine::AddFeature {
            operation,
            name: Some(name.to_string()),
        });
        let id = self.expect_created("AddFeature", response)?;
        self.named_features.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<&mut Self, HarnessError> {
        let id = self.feature_id(name)?;
        let response = self.send(UiToEngine::UpdateFeature {
            feature_id: id,
            name: Some(new_name.to_string()),
            operation: None,
        });
        self.expect_model("UpdateFeature", response)?;
        Ok(self)
    }

    /// Delete a feature by name.
    pub fn delete_feature(&mut self, name: &str) -> Result<&mut Self, HarnessError> {
        let id = self.feature_id(name)?;
        let response = self.send(UiToEngine::DeleteFeature { feature_id: id });
        self.expect_model("DeleteFeature", response)?;
        self.named_features.remove(name);
        Ok(self)
    }

    /// Move a feature by name to a new index.
    pub fn reorder(&mut self, name: &str, index: usize) -> Result<&mut Self, HarnessError> {
        let id = self.feature_id(name)?;
        let response = self.send(UiToEngine::ReorderFeature {
            feature_id: id,
            new_index: index,
        });
        self.expect_model("ReorderFeature", response)?;
        Ok(self)
    }

    // ── Sketch Elements ─────────────────────────────────────────────────

    /// Add an element to a named sketch under a test name.
    pub fn element(
        &mut self,
        sketch: &str,
        name: &str,
        element: SketchElement,
    ) -> Result<Uuid, HarnessError> {
        if self.named_elements.contains_key(name) {
            return Err(HarnessError::DuplicateName {
                name: name.to_string(),
            });
        }
        let sketch_id = self.feature_id(sketch)?;
        let response = self.send(UiToEngine::AddSketchElement { sketch_id, element });
        let id = self.expect_created("AddSketchElement", response)?;
        self.named_elements.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn line(
        &mut self,
        sketch: &str,
        name: &str,
        start: [f64; 2],
        end: [f64; 2],
    ) -> Result<Uuid, HarnessError> {
        let element = SketchElement::line(Point2::new(start[0], start[1]), Point2::new(end[0], end[1]));
        self.element(sketch, name, element)
    }

    /// Replace a sketch's elements. Names of replaced elements are forgotten.
    pub fn set_elements(
        &mut self,
        sketch: &str,
        elements: Vec<SketchElement>,
    ) -> Result<&mut Self, HarnessError> {
        let sketch_id = self.feature_id(sketch)?;
        let kept: Vec<Uuid> = elements.iter().map(SketchElement::id).collect();
        let response = self.send(UiToEngine::SetSketchElements {
            sketch_id,
            elements,
        });
        self.expect_model("SetSketchElements", response)?;
        self.named_elements.retain(|_, id| kept.contains(id));
        Ok(self)
    }

    pub fn delete_element(&mut self, sketch: &str, name: &str) -> Result<&mut Self, HarnessError> {
        let sketch_id = self.feature_id(sketch)?;
        let element_id = self.element_id(name)?;
        let response = self.send(UiToEngine::DeleteSketchElement {
            sketch_id,
            element_id,
        });
        self.expect_model("DeleteSketchElement", response)?;
        self.named_elements.remove(name);
        Ok(self)
    }

    pub fn constrain(
        &mut self,
        sketch: &str,
        constraint: SketchConstraint,
    ) -> Result<Uuid, HarnessError> {
        let sketch_id = self.feature_id(sketch)?;
        let response = self.send(UiToEngine::AddConstraint {
            sketch_id,
            constraint,
        });
        self.expect_created("AddConstraint", response)
    }

    /// Solve a sketch. A failed solve is reported through the returned status.
    pub fn solve(&mut self, sketch: &str) -> Result<SolveStatus, HarnessError> {
        let sketch_id = self.feature_id(sketch)?;
        match self.send(UiToEngine::SolveConstraints { sketch_id }) {
            EngineToUi::SolveFinished { status, .. } => {
                self.after_command()?;
                Ok(status)
            }
            other => Err(unexpected("SolveConstraints", other)),
        }
    }

    // ── History ─────────────────────────────────────────────────────────

    /// Undo the last operation.
    pub fn undo(&mut self) -> Result<&mut Self, HarnessError> {
        let response = self.send(UiToEngine::Undo);
        self.expect_model("Undo", response)?;
        Ok(self)
    }

    /// Redo the last undone operation.
    pub fn redo(&mut self) -> Result<&mut Self, HarnessError> {
        let response = self.send(UiToEngine::Redo);
        self.expect_model("Redo", response)?;
        Ok(self)
    }

    pub fn rollback_to(&mut self, name: &str) -> Result<&mut Self, HarnessError> {
        let feature_id = self.feature_id(name)?;
        let response = self.send(UiToEngine::RollbackToFeature { feature_id });
        self.expect_model("RollbackToFeature", response)?;
        Ok(self)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Get the UUID of a named feature.
    pub fn feature_id(&self, name: &str) -> Result<Uuid, HarnessError> {
        self.named_features
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::FeatureNotFound {
                name: name.to_string(),
            })
    }

    pub fn element_id(&self, name: &str) -> Result<Uuid, HarnessError> {
        self.named_elements
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::ElementNotFound {
                name: name.to_string(),
            })
    }

    /// The live feature behind a test name.
    pub fn feature(&self, name: &str) -> Result<&Feature, HarnessError> {
        let id = self.feature_id(name)?;
        self.engine()
            .feature(id)
            .ok_or_else(|| HarnessError::FeatureNotFound {
                name: name.to_string(),
            })
    }

    pub fn sketch_data(&self, name: &str) -> Result<&Sketch, HarnessError> {
        let id = self.feature_id(name)?;
        self.engine()
            .sketch(id)
            .map_err(|e| HarnessError::DispatchError {
                message: e.to_string(),
            })
    }

    pub fn feature_count(&self) -> usize {
        self.engine().features().len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.engine().features().iter().map(|f| f.name.clone()).collect()
    }

    pub fn engine(&self) -> &Engine {
        &self.state.engine
    }

    /// Every dispatched command with its response type.
    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }

    // ── File I/O ────────────────────────────────────────────────────────

    /// Save the project to the session store.
    pub fn save(&mut self) -> Result<&mut Self, HarnessError> {
        match self.send(UiToEngine::SaveProject) {
            EngineToUi::ProjectSaved { success: true } => Ok(self),
            other => Err(unexpected("SaveProject", other)),
        }
    }

    /// Load the stored project, replacing the current state.
    pub fn load(&mut self) -> Result<&mut Self, HarnessError> {
        match self.send(UiToEngine::LoadProject) {
            EngineToUi::ProjectLoaded { success: true, .. } => {
                self.remap_names();
                self.after_command()?;
                Ok(self)
            }
            other => Err(unexpected("LoadProject", other)),
        }
    }

    // ── Inline Assertions ───────────────────────────────────────────────

    /// Assert the model has exactly `expected` features.
    pub fn assert_feature_count(&self, expected: usize) -> Result<&Self, HarnessError> {
        let actual = self.feature_count();
        if actual == expected {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "expected {} features, got {}. Features: {:?}",
                    expected,
                    actual,
                    self.feature_names()
                ),
            })
        }
    }

    /// Assert every feature is valid.
    pub fn assert_all_valid(&self) -> Result<&Self, HarnessError> {
        let invalid: Vec<(&str, Option<&str>)> = self
            .engine()
            .features()
            .iter()
            .filter(|f| !f.is_valid)
            .map(|f| (f.name.as_str(), f.error_message.as_deref()))
            .collect();
        if invalid.is_empty() {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("expected all features valid, got invalid {invalid:?}"),
            })
        }
    }

    // ── Internal Helpers ────────────────────────────────────────────────

    fn send(&mut self, msg: UiToEngine) -> EngineToUi {
        let label = format!("{msg:?}");
        let label = label.split([' ', '{']).next().unwrap_or_default().to_string();
        let response = dispatch(&mut self.state, msg);
        tracing::debug!(command = %label, response = response_type(&response), "dispatched");
        self.history.push((label, response_type(&response).to_string()));
        response
    }

    fn expect_model(&self, msg_type: &str, response: EngineToUi) -> Result<(), HarnessError> {
        match response {
            EngineToUi::ModelUpdated { .. } => self.after_command(),
            other => Err(unexpected(msg_type, other)),
        }
    }

    fn expect_created(&self, msg_type: &str, response: EngineToUi) -> Result<Uuid, HarnessError> {
        match response {
            EngineToUi::ModelUpdated {
                created: Some(id), ..
            } => {
                self.after_command()?;
                Ok(id)
            }
            other => Err(unexpected(msg_type, other)),
        }
    }

    fn after_command(&self) -> Result<(), HarnessError> {
        if self.auto_check {
            assertions::assert_index_consistent(self.engine(), "auto_check")?;
            assertions::assert_dependencies_first(self.engine(), "auto_check")?;
        }
        Ok(())
    }

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.named_features.contains_key(name) {
            Err(HarnessError::DuplicateName {
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Re-map names from the loaded model; elements keep their ids on load.
    fn remap_names(&mut self) {
        self.named_features = self
            .state
            .engine
            .features()
            .iter()
            .map(|f| (f.name.clone(), f.id))
            .collect();
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn response_type(response: &EngineToUi) -> &'static str {
    match response {
        EngineToUi::ModelUpdated { .. } => "ModelUpdated",
        EngineToUi::SolveFinished { .. } => "SolveFinished",
        EngineToUi::Ids { .. } => "Ids",
        EngineToUi::EvaluationOrder { .. } => "EvaluationOrder",
        EngineToUi::ProjectSaved { .. } => "ProjectSaved",
        EngineToUi::ProjectLoaded { .. } => "ProjectLoaded",
        EngineToUi::SavedProjectExists { .. } => "SavedProjectExists",
        EngineToUi::ExportReady { .. } => "ExportReady",
        EngineToUi::Error { .. } => "Error",
    }
}

fn unexpected(msg_type: &str, response: EngineToUi) -> HarnessError {
    match response {
        EngineToUi::Error { message, .. } => HarnessError::DispatchError { message },
        other => HarnessError::DispatchError {
            message: format!("{msg_type}: unexpected response {}", response_type(&other)),
        },
    }
}
