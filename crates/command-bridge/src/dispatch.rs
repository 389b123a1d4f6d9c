use feature_engine::{EngineError, FeatureUpdate, NewFeature};
use model_types::SolveStatus;
use uuid::Uuid;

use crate::messages::{EngineToUi, ModelView, UiToEngine};
use crate::session::{BridgeError, SessionState};

/// Dispatch a UI message to the engine and return a response.
///
/// Each message maps to one engine command; a failed command becomes an
/// [`EngineToUi::Error`] and leaves the model as it was.
pub fn dispatch(state: &mut SessionState, msg: UiToEngine) -> EngineToUi {
    match handle_message(state, msg) {
        Ok(response) => response,
        Err(e) => EngineToUi::Error {
            message: e.to_string(),
            feature_id: error_feature_id(&e),
        },
    }
}

/// Process a JSON message and return a JSON response.
pub fn process_message(state: &mut SessionState, json_input: &str) -> String {
    let response = match serde_json::from_str::<UiToEngine>(json_input) {
        Ok(msg) => dispatch(state, msg),
        Err(e) => {
            let err = BridgeError::Parse {
                reason: e.to_string(),
            };
            tracing::warn!(error = %err, "rejected message");
            EngineToUi::Error {
                message: err.to_string(),
                feature_id: None,
            }
        }
    };

    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"type":"Error","message":"Serialization failed: {}","feature_id":null}}"#,
            e
        )
    })
}

fn handle_message(state: &mut SessionState, msg: UiToEngine) -> Result<EngineToUi, BridgeError> {
    let engine = &mut state.engine;
    match msg {
        // -- Feature operations --
        UiToEngine::AddFeature { operation, name } => {
            let id = engine.add_feature(NewFeature { name, operation });
            Ok(created(state, id))
        }

        UiToEngine::UpdateFeature {
            feature_id,
            name,
            operation,
        } => {
            engine.update_feature(feature_id, FeatureUpdate { name, operation })?;
            Ok(model_updated(state))
        }

        UiToEngine::DeleteFeature { feature_id } => {
            engine.delete_feature(feature_id)?;
            Ok(model_updated(state))
        }

        UiToEngine::ReorderFeature {
            feature_id,
            new_index,
        } => {
            engine.reorder_feature(feature_id, new_index)?;
            Ok(model_updated(state))
        }

        UiToEngine::SetActiveFeature { feature_id } => {
            engine.set_active_feature(feature_id)?;
            Ok(model_updated(state))
        }

        // -- Sketch operations --
        UiToEngine::SetEditingSketch { sketch_id } => {
            engine.set_editing_sketch(sketch_id)?;
            Ok(model_updated(state))
        }

        UiToEngine::StopEditing => {
            engine.stop_editing();
            Ok(model_updated(state))
        }

        UiToEngine::AddSketchElement { sketch_id, element } => {
            let id = engine.add_sketch_element(sketch_id, element)?;
            Ok(created(state, id))
        }

        UiToEngine::UpdateSketchElement { sketch_id, element } => {
            engine.update_sketch_element(sketch_id, element)?;
            Ok(model_updated(state))
        }

        UiToEngine::DeleteSketchElement {
            sketch_id,
            element_id,
        } => {
            engine.delete_sketch_element(sketch_id, element_id)?;
            Ok(model_updated(state))
        }

        UiToEngine::SetSketchElements {
            sketch_id,
            elements,
        } => {
            engine.set_sketch_elements(sketch_id, elements)?;
            Ok(model_updated(state))
        }

        UiToEngine::AddConstraint {
            sketch_id,
            constraint,
        } => {
            let id = engine.add_constraint(sketch_id, constraint)?;
            Ok(created(state, id))
        }

        UiToEngine::RemoveConstraint {
            sketch_id,
            constraint_id,
        } => {
            engine.remove_constraint(sketch_id, constraint_id)?;
            Ok(model_updated(state))
        }

        UiToEngine::UpdateConstraintValue {
            sketch_id,
            constraint_id,
            value,
        } => {
            engine.update_constraint_value(sketch_id, constraint_id, value)?;
            Ok(model_updated(state))
        }

        UiToEngine::SolveConstraints { sketch_id } => {
            let status = match engine.solve_constraints(sketch_id) {
                Ok(status) => status,
                // The failure is recorded on the sketch.
                Err(EngineError::Solve(err)) => engine
                    .sketch(sketch_id)
                    .ok()
                    .and_then(|s| s.solve_status.clone())
                    .unwrap_or(SolveStatus::Failed {
                        reason: err.to_string(),
                    }),
                Err(e) => return Err(e.into()),
            };
            Ok(EngineToUi::SolveFinished {
                sketch_id,
                status,
                model: ModelView::of(&state.engine),
            })
        }

        // -- History --
        UiToEngine::Undo => {
            engine.undo();
            Ok(model_updated(state))
        }

        UiToEngine::Redo => {
            engine.redo();
            Ok(model_updated(state))
        }

        UiToEngine::RollbackToFeature { feature_id } => {
            engine.rollback_to_feature(feature_id)?;
            Ok(model_updated(state))
        }

        UiToEngine::RollbackToSnapshot { index } => {
            engine.rollback_to_snapshot(index)?;
            Ok(model_updated(state))
        }

        // -- Queries --
        UiToEngine::GetDependencies { feature_id } => Ok(EngineToUi::Ids {
            ids: engine.dependencies(feature_id)?,
        }),

        UiToEngine::GetDependents { feature_id } => Ok(EngineToUi::Ids {
            ids: engine.dependents(feature_id)?,
        }),

        UiToEngine::GetEvaluationOrder => {
            let order = engine.evaluation_order();
            Ok(EngineToUi::EvaluationOrder {
                ids: order.ids,
                cycle: order.fault,
            })
        }

        // -- Project --
        UiToEngine::SaveProject => Ok(EngineToUi::ProjectSaved {
            success: state.save(),
        }),

        UiToEngine::LoadProject => {
            let success = state.load();
            Ok(project_loaded(state, success))
        }

        UiToEngine::ImportProject { data } => {
            let success = state.import(&data);
            Ok(project_loaded(state, success))
        }

        UiToEngine::ExportProject => Ok(EngineToUi::ExportReady {
            data: state.export()?,
        }),

        UiToEngine::ClearProject => {
            state.clear_saved();
            Ok(EngineToUi::SavedProjectExists {
                exists: state.has_saved(),
            })
        }

        UiToEngine::HasSavedProject => Ok(EngineToUi::SavedProjectExists {
            exists: state.has_saved(),
        }),

        UiToEngine::NewProject => {
            state.new_project();
            Ok(model_updated(state))
        }
    }
}

fn model_updated(state: &SessionState) -> EngineToUi {
    EngineToUi::ModelUpdated {
        model: ModelView::of(&state.engine),
        created: None,
    }
}

fn created(state: &SessionState, id: Uuid) -> EngineToUi {
    EngineToUi::ModelUpdated {
        model: ModelView::of(&state.engine),
        created: Some(id),
    }
}

fn project_loaded(state: &SessionState, success: bool) -> EngineToUi {
    EngineToUi::ProjectLoaded {
        success,
        model: ModelView::of(&state.engine),
    }
}

/// The feature an error is about, for highlighting in the feature list.
fn error_feature_id(err: &BridgeError) -> Option<Uuid> {
    match err {
        BridgeError::Engine(e) => match e {
            EngineError::FeatureNotFound { id } | EngineError::NotASketch { id } => Some(*id),
            EngineError::ElementNotFound { sketch_id, .. }
            | EngineError::ConstraintNotFound { sketch_id, .. }
            | EngineError::StaleResult { sketch_id } => Some(*sketch_id),
            EngineError::NoSnapshotFound { feature_id } => Some(*feature_id),
            EngineError::SnapshotOutOfRange { .. } | EngineError::Solve(_) => None,
        },
        BridgeError::Parse { .. } | BridgeError::Store(_) => None,
    }
}
