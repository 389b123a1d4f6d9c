use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use feature_engine::{CycleFault, Engine, Feature, Operation};
use model_types::{SketchConstraint, SketchElement, SolveStatus};

/// Messages from the UI to the engine.
/// Serialized as JSON, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiToEngine {
    // -- Feature operations --
    /// Append a feature. Without a name one is generated from its kind.
    AddFeature {
        operation: Operation,
        #[serde(default)]
        name: Option<String>,
    },
    /// Merge a partial update into a feature.
    UpdateFeature {
        feature_id: Uuid,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        operation: Option<Operation>,
    },
    DeleteFeature {
        feature_id: Uuid,
    },
    ReorderFeature {
        feature_id: Uuid,
        new_index: usize,
    },
    SetActiveFeature {
        feature_id: Option<Uuid>,
    },

    // -- Sketch operations --
    SetEditingSketch {
        sketch_id: Uuid,
    },
    StopEditing,
    AddSketchElement {
        sketch_id: Uuid,
        element: SketchElement,
    },
    UpdateSketchElement {
        sketch_id: Uuid,
        element: SketchElement,
    },
    DeleteSketchElement {
        sketch_id: Uuid,
        element_id: Uuid,
    },
    /// Replace every element of a sketch at once.
    SetSketchElements {
        sketch_id: Uuid,
        elements: Vec<SketchElement>,
    },
    AddConstraint {
        sketch_id: Uuid,
        constraint: SketchConstraint,
    },
    RemoveConstraint {
        sketch_id: Uuid,
        constraint_id: Uuid,
    },
    UpdateConstraintValue {
        sketch_id: Uuid,
        constraint_id: Uuid,
        value: f64,
    },
    SolveConstraints {
        sketch_id: Uuid,
    },

    // -- History --
    Undo,
    Redo,
    RollbackToFeature {
        feature_id: Uuid,
    },
    RollbackToSnapshot {
        index: usize,
    },

    // -- Queries --
    GetDependencies {
        feature_id: Uuid,
    },
    GetDependents {
        feature_id: Uuid,
    },
    GetEvaluationOrder,

    // -- Project --
    /// Write the project to the session's store.
    SaveProject,
    /// Replace the model with the stored project.
    LoadProject,
    /// Remove the stored project. The open model is untouched.
    ClearProject,
    HasSavedProject,
    /// Start over with an empty model and history.
    NewProject,
    /// Serialize the project without storing it.
    ExportProject,
    /// Replace the model with a serialized project.
    ImportProject {
        data: String,
    },
}

/// What the UI needs to redraw the feature list and history controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelView {
    pub features: Vec<Arc<Feature>>,
    pub can_undo: bool,
    pub can_redo: bool,
    /// -1 before any recorded change.
    pub current_snapshot_index: i64,
    pub editing_sketch: Option<Uuid>,
    pub active_feature: Option<Uuid>,
}

impl ModelView {
    pub fn of(engine: &Engine) -> Self {
        Self {
            features: engine.graph().shared(),
            can_undo: engine.can_undo(),
            can_redo: engine.can_redo(),
            current_snapshot_index: engine.history().cursor_index(),
            editing_sketch: engine.editing_sketch(),
            active_feature: engine.active_feature(),
        }
    }
}

/// Messages from the engine to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineToUi {
    /// The model changed, or was queried.
    ModelUpdated {
        #[serde(flatten)]
        model: ModelView,
        /// Id of the feature, element or constraint the command created.
        created: Option<Uuid>,
    },

    /// A constraint solve finished. A failed solve still changes the model.
    SolveFinished {
        sketch_id: Uuid,
        status: SolveStatus,
        #[serde(flatten)]
        model: ModelView,
    },

    /// Answer to a dependency query.
    Ids { ids: Vec<Uuid> },

    EvaluationOrder {
        ids: Vec<Uuid>,
        cycle: Option<CycleFault>,
    },

    ProjectSaved { success: bool },

    /// A load attempt. On failure the model is unchanged.
    ProjectLoaded {
        success: bool,
        #[serde(flatten)]
        model: ModelView,
    },

    SavedProjectExists { exists: bool },

    ExportReady { data: String },

    /// An error occurred in the engine. Nothing changed.
    Error {
        message: String,
        feature_id: Option<Uuid>,
    },
}
