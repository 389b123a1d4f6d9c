use chrono::{DateTime, Utc};
use model_types::Sketch;
use serde::{Deserialize, Serialize};
use sketch_solver::{SolveError, SolverConfig, PROFILE_TOLERANCE};
use uuid::Uuid;

/// A single feature in the parametric model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: Uuid,
    /// User-visible name, unique within the model.
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// False once a dependency is deleted, a constraint solve fails or evaluation fails.
    pub is_valid: bool,
    /// True when the feature or something upstream changed since it was last evaluated.
    pub is_dirty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// What made the feature invalid. `None` while valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_source: Option<InvalidSource>,
    pub operation: Operation,
}

/// Origin of a feature's invalid state.
///
/// `Rebuild` invalidity is re-checked by the next rebuild once the feature is
/// dirty again. The others persist until the edit or solve that caused them
/// is repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvalidSource {
    /// A dependency was deleted or does not exist.
    Dependency,
    /// A constraint solve failed.
    Solve,
    /// An upstream result was unusable or the evaluator failed.
    Rebuild,
}

impl Feature {
    pub fn kind(&self) -> FeatureKind {
        self.operation.kind()
    }

    pub fn invalidate(&mut self, source: InvalidSource, message: impl Into<String>) {
        self.is_valid = false;
        self.invalid_source = Some(source);
        self.error_message = Some(message.into());
    }

    pub fn revalidate(&mut self) {
        self.is_valid = true;
        self.invalid_source = None;
        self.error_message = None;
    }

    pub fn sketch(&self) -> Option<&Sketch> {
        self.operation.as_sketch()
    }
}

/// A modeling operation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    Sketch { sketch: Sketch },
    Extrusion { params: ExtrusionParams },
    Cut { params: CutParams },
    Chamfer { params: ChamferParams },
    Fillet { params: FilletParams },
    Shell { params: ShellParams },
    Sweep { params: SweepParams },
    Loft { params: LoftParams },
    LinearPattern { params: LinearPatternParams },
    PolarPattern { params: PolarPatternParams },
}

/// Discriminant of [`Operation`], used for naming and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKind {
    Sketch,
    Extrusion,
    Cut,
    Chamfer,
    Fillet,
    Shell,
    Sweep,
    Loft,
    LinearPattern,
    PolarPattern,
}

impl FeatureKind {
    /// Base name given to features created without one.
    pub fn display_name(self) -> &'static str {
        match self {
            FeatureKind::Sketch => "Sketch",
            FeatureKind::Extrusion => "Extrusion",
            FeatureKind::Cut => "Cut",
            FeatureKind::Chamfer => "Chamfer",
            FeatureKind::Fillet => "Fillet",
            FeatureKind::Shell => "Shell",
            FeatureKind::Sweep => "Sweep",
            FeatureKind::Loft => "Loft",
            FeatureKind::LinearPattern => "Linear Pattern",
            FeatureKind::PolarPattern => "Polar Pattern",
        }
    }
}

impl Operation {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Operation::Sketch { .. } => FeatureKind::Sketch,
            Operation::Extrusion { .. } => FeatureKind::Extrusion,
            Operation::Cut { .. } => FeatureKind::Cut,
            Operation::Chamfer { .. } => FeatureKind::Chamfer,
            Operation::Fillet { .. } => FeatureKind::Fillet,
            Operation::Shell { .. } => FeatureKind::Shell,
            Operation::Sweep { .. } => FeatureKind::Sweep,
            Operation::Loft { .. } => FeatureKind::Loft,
            Operation::LinearPattern { .. } => FeatureKind::LinearPattern,
            Operation::PolarPattern { .. } => FeatureKind::PolarPattern,
        }
    }

    pub fn as_sketch(&self) -> Option<&Sketch> {
        match self {
            Operation::Sketch { sketch } => Some(sketch),
            _ => None,
        }
    }

    pub fn as_sketch_mut(&mut self) -> Option<&mut Sketch> {
        match self {
            Operation::Sketch { sketch } => Some(sketch),
            _ => None,
        }
    }
}

// ── Operation parameters ────────────────────────────────────────────────────

/// Which way an extrusion grows from its sketch plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtrudeDirection {
    #[default]
    Normal,
    Reverse,
    /// Half the depth on each side of the plane.
    Symmetric,
}

/// How a new solid combines with existing bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyMode {
    #[default]
    NewBody,
    Join,
    Intersect,
}

/// Edges an edge-finishing operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeSelection {
    #[default]
    All,
    Indices { indices: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrusionParams {
    pub sketch_id: Uuid,
    /// Closed profiles to extrude; empty means all of them.
    #[serde(default)]
    pub profile_ids: Vec<Uuid>,
    pub depth: f64,
    #[serde(default)]
    pub direction: ExtrudeDirection,
    #[serde(default)]
    pub mode: BodyMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutParams {
    pub sketch_id: Uuid,
    #[serde(default)]
    pub profile_ids: Vec<Uuid>,
    pub depth: f64,
    #[serde(default)]
    pub through_all: bool,
    #[serde(default)]
    pub direction: ExtrudeDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChamferParams {
    pub target_id: Uuid,
    pub distance: f64,
    #[serde(default)]
    pub edges: EdgeSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilletParams {
    pub target_id: Uuid,
    pub radius: f64,
    #[serde(default)]
    pub edges: EdgeSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellParams {
    pub target_id: Uuid,
    pub thickness: f64,
    #[serde(default)]
    pub removed_faces: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepParams {
    pub profile_sketch_id: Uuid,
    pub path_sketch_id: Uuid,
    /// Closed profile to sweep; the first one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<Uuid>,
    /// Open path to follow; the first one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_id: Option<Uuid>,
    #[serde(default)]
    pub mode: BodyMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoftParams {
    /// Section sketches in loft order.
    pub profile_sketch_ids: Vec<Uuid>,
    #[serde(default)]
    pub ruled: bool,
    #[serde(default)]
    pub mode: BodyMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearPatternParams {
    pub target_id: Uuid,
    pub direction: [f64; 3],
    pub count: u32,
    pub spacing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolarPatternParams {
    pub target_id: Uuid,
    pub axis_origin: [f64; 3],
    pub axis_direction: [f64; 3],
    pub count: u32,
    pub total_angle_degrees: f64,
}

// ── Commands ────────────────────────────────────────────────────────────────

/// Input to `add_feature`. Id, timestamp and flags are assigned by the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub operation: Operation,
}

impl NewFeature {
    pub fn new(operation: Operation) -> Self {
        Self {
            name: None,
            operation,
        }
    }

    pub fn named(name: impl Into<String>, operation: Operation) -> Self {
        Self {
            name: Some(name.into()),
            operation,
        }
    }
}

/// Partial update merged into an existing feature. Absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

impl FeatureUpdate {
    pub fn operation(operation: Operation) -> Self {
        Self {
            name: None,
            operation: Some(operation),
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            operation: None,
        }
    }
}

// ── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Oldest snapshots are evicted past this count.
    pub max_snapshots: usize,
    /// Endpoint coincidence tolerance for profile detection.
    pub profile_tolerance: f64,
    pub solver: SolverConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_snapshots: 50,
            profile_tolerance: PROFILE_TOLERANCE,
            solver: SolverConfig::default(),
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Errors from the feature engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("feature not found: {id}")]
    FeatureNotFound { id: Uuid },

    #[error("feature {id} is not a sketch")]
    NotASketch { id: Uuid },

    #[error("element {element_id} not found in sketch {sketch_id}")]
    ElementNotFound { sketch_id: Uuid, element_id: Uuid },

    #[error("constraint {constraint_id} not found in sketch {sketch_id}")]
    ConstraintNotFound { sketch_id: Uuid, constraint_id: Uuid },

    #[error("no snapshot found for feature {feature_id}")]
    NoSnapshotFound { feature_id: Uuid },

    #[error("snapshot index {index} out of range ({len} snapshots)")]
    SnapshotOutOfRange { index: usize, len: usize },

    #[error("constraint solve failed: {0}")]
    Solve(#[from] SolveError),

    #[error("stale solve result for sketch {sketch_id}")]
    StaleResult { sketch_id: Uuid },
}
