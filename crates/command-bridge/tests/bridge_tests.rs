use command_bridge::*;
use feature_engine::*;
use file_format::MemoryStore;
use model_types::*;
use serde_json::{json, Value};
use uuid::Uuid;

// ── Helper functions ────────────────────────────────────────────────────────

fn make_sketch_op() -> Operation {
    Operation::Sketch {
        sketch: Sketch::on_plane(StandardPlane::Xy, 0.0),
    }
}

fn make_extrude_op(sketch_id: Uuid) -> Operation {
    Operation::Extrusion {
        params: ExtrusionParams {
            sketch_id,
            profile_ids: Vec::new(),
            depth: 5.0,
            direction: ExtrudeDirection::Normal,
            mode: BodyMode::NewBody,
        },
    }
}

fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> SketchElement {
    SketchElement::line(Point2::new(x0, y0), Point2::new(x1, y1))
}

/// Send a message and return the id it created.
fn send_created(state: &mut SessionState, msg: UiToEngine) -> Uuid {
    match dispatch(state, msg) {
        EngineToUi::ModelUpdated {
            created: Some(id), ..
        } => id,
        other => panic!("expected a created id, got {other:?}"),
    }
}

fn add_sketch(state: &mut SessionState) -> Uuid {
    send_created(
        state,
        UiToEngine::AddFeature {
            operation: make_sketch_op(),
            name: None,
        },
    )
}

fn model(response: EngineToUi) -> ModelView {
    match response {
        EngineToUi::ModelUpdated { model, .. } => model,
        other => panic!("expected ModelUpdated, got {other:?}"),
    }
}

// ── Serde Tests ─────────────────────────────────────────────────────────────

#[test]
fn serde_add_feature_carries_type_tag() {
    let msg = UiToEngine::AddFeature {
        operation: make_sketch_op(),
        name: Some("Base".to_string()),
    };
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"type\":\"AddFeature\""));
    let back: UiToEngine = serde_json::from_str(&json).unwrap();
    assert!(matches!(back, UiToEngine::AddFeature { name: Some(n), .. } if n == "Base"));
}

#[test]
fn serde_update_feature_fields_are_optional() {
    let id = Uuid::new_v4();
    let msg: UiToEngine = serde_json::from_value(json!({
        "type": "UpdateFeature",
        "feature_id": id,
        "name": "Renamed"
    }))
    .unwrap();
    assert!(matches!(
        msg,
        UiToEngine::UpdateFeature { feature_id, operation: None, .. } if feature_id == id
    ));
}

#[test]
fn serde_model_updated_flattens_model() {
    let mut state = SessionState::in_memory();
    add_sketch(&mut state);
    let response = dispatch(&mut state, UiToEngine::GetEvaluationOrder);
    assert!(matches!(response, EngineToUi::EvaluationOrder { cycle: None, .. }));

    let response = dispatch(&mut state, UiToEngine::StopEditing);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["type"], "ModelUpdated");
    assert_eq!(json["features"].as_array().unwrap().len(), 1);
    assert_eq!(json["can_undo"], true);
    assert_eq!(json["current_snapshot_index"], 0);
}

// ── Dispatch Tests ──────────────────────────────────────────────────────────

#[test]
fn dispatch_add_feature_returns_created_id() {
    let mut state = SessionState::in_memory();
    let id = add_sketch(&mut state);
    assert!(state.engine.feature(id).is_some());
}

#[test]
fn dispatch_unknown_feature_returns_error() {
    let mut state = SessionState::in_memory();
    let ghost = Uuid::new_v4();
    let response = dispatch(&mut state, UiToEngine::DeleteFeature { feature_id: ghost });
    match response {
        EngineToUi::Error { feature_id, .. } => assert_eq!(feature_id, Some(ghost)),
        other => panic!("expected Error, got {other:?}"),
    }
    assert!(!state.engine.can_undo());
}

#[test]
fn dispatch_update_and_undo() {
    let mut state = SessionState::in_memory();
    let id = add_sketch(&mut state);
    let view = model(dispatch(
        &mut state,
        UiToEngine::UpdateFeature {
            feature_id: id,
            name: Some("Profile".to_string()),
            operation: None,
        },
    ));
    assert_eq!(view.features[0].name, "Profile");

    let view = model(dispatch(&mut state, UiToEngine::Undo));
    assert_eq!(view.features[0].name, "Sketch 1");
    assert!(view.can_redo);
    assert_eq!(view.current_snapshot_index, 0);
}

#[test]
fn dispatch_dependency_queries() {
    let mut state = SessionState::in_memory();
    let s = add_sketch(&mut state);
    let e = send_created(
        &mut state,
        UiToEngine::AddFeature {
            operation: make_extrude_op(s),
            name: None,
        },
    );

    let response = dispatch(&mut state, UiToEngine::GetDependents { feature_id: s });
    assert_eq!(response, EngineToUi::Ids { ids: vec![e] });
    let response = dispatch(&mut state, UiToEngine::GetDependencies { feature_id: e });
    assert_eq!(response, EngineToUi::Ids { ids: vec![s] });
}

#[test]
fn dispatch_sketch_editing_detects_profiles() {
    let mut state = SessionState::in_memory();
    let s = add_sketch(&mut state);
    dispatch(&mut state, UiToEngine::SetEditingSketch { sketch_id: s });
    let view = model(dispatch(
        &mut state,
        UiToEngine::SetSketchElements {
            sketch_id: s,
            elements: vec![
                line(0.0, 0.0, 10.0, 0.0),
                line(10.0, 0.0, 5.0, 8.0),
                line(5.0, 8.0, 0.0, 0.0),
            ],
        },
    ));
    assert_eq!(view.editing_sketch, Some(s));
    let sketch = view.features[0].sketch().unwrap();
    assert_eq!(sketch.closed_profiles.len(), 1);
}

#[test]
fn dispatch_solve_reports_status() {
    let mut state = SessionState::in_memory();
    let s = add_sketch(&mut state);
    let l = send_created(
        &mut state,
        UiToEngine::AddSketchElement {
            sketch_id: s,
            element: line(0.0, 0.0, 3.0, 1.0),
        },
    );
    send_created(
        &mut state,
        UiToEngine::AddConstraint {
            sketch_id: s,
            constraint: SketchConstraint::horizontal(ElementRef::whole(l)),
        },
    );

    match dispatch(&mut state, UiToEngine::SolveConstraints { sketch_id: s }) {
        EngineToUi::SolveFinished { status, .. } => {
            assert_eq!(status, SolveStatus::UnderConstrained { dof: 3 });
        }
        other => panic!("expected SolveFinished, got {other:?}"),
    }
}

#[test]
fn dispatch_failed_solve_still_reports_model() {
    let mut state = SessionState::in_memory();
    let s = add_sketch(&mut state);
    let l = send_created(
        &mut state,
        UiToEngine::AddSketchElement {
            sketch_id: s,
            element: line(0.0, 0.0, 3.0, 4.0),
        },
    );
    for constraint in [
        SketchConstraint::fixed(ElementRef::whole(l)),
        SketchConstraint::length(ElementRef::whole(l), 9.0),
    ] {
        dispatch(&mut state, UiToEngine::AddConstraint { sketch_id: s, constraint });
    }

    match dispatch(&mut state, UiToEngine::SolveConstraints { sketch_id: s }) {
        EngineToUi::SolveFinished { status, model, .. } => {
            assert!(status.is_failed());
            assert!(!model.features[0].is_valid);
        }
        other => panic!("expected SolveFinished, got {other:?}"),
    }
}

// ── Persistence Tests ───────────────────────────────────────────────────────

#[test]
fn save_then_load_restores_model() {
    let mut state = SessionState::in_memory();
    let s = add_sketch(&mut state);
    assert_eq!(
        dispatch(&mut state, UiToEngine::SaveProject),
        EngineToUi::ProjectSaved { success: true }
    );
    assert_eq!(
        dispatch(&mut state, UiToEngine::HasSavedProject),
        EngineToUi::SavedProjectExists { exists: true }
    );

    dispatch(&mut state, UiToEngine::NewProject);
    assert!(state.engine.features().is_empty());

    match dispatch(&mut state, UiToEngine::LoadProject) {
        EngineToUi::ProjectLoaded { success, model } => {
            assert!(success);
            assert_eq!(model.features[0].id, s);
            assert!(model.can_undo);
        }
        other => panic!("expected ProjectLoaded, got {other:?}"),
    }
}

#[test]
fn project_file_survives_a_new_session() {
    let path = std::env::temp_dir().join(format!("session-{}.json", Uuid::new_v4()));
    let mut first = SessionState::with_project_file(&path);
    let s = add_sketch(&mut first);
    assert!(first.save());

    let mut second = SessionState::with_project_file(&path);
    assert!(second.has_saved());
    assert!(second.load());
    assert_eq!(second.engine.features()[0].id, s);

    assert!(second.clear_saved());
    assert!(!path.exists());
}

#[test]
fn load_without_save_reports_failure() {
    let mut state = SessionState::in_memory();
    let s = add_sketch(&mut state);
    assert!(!state.load());
    assert!(state.engine.feature(s).is_some());
}

#[test]
fn bad_payload_leaves_engine_untouched() {
    let mut state = SessionState::new(Box::new(MemoryStore::with_payload("{\"features\": []}")));
    let s = add_sketch(&mut state);
    assert!(!state.load());
    assert!(!state.import("not json"));
    assert_eq!(state.engine.features().len(), 1);
    assert!(state.engine.feature(s).is_some());
}

#[test]
fn clear_project_removes_saved_copy_only() {
    let mut state = SessionState::in_memory();
    add_sketch(&mut state);
    state.save();
    assert_eq!(
        dispatch(&mut state, UiToEngine::ClearProject),
        EngineToUi::SavedProjectExists { exists: false }
    );
    assert_eq!(state.engine.features().len(), 1);
}

#[test]
fn export_then_import_round_trips() {
    let mut source = SessionState::in_memory();
    let s = add_sketch(&mut source);
    let data = match dispatch(&mut source, UiToEngine::ExportProject) {
        EngineToUi::ExportReady { data } => data,
        other => panic!("expected ExportReady, got {other:?}"),
    };

    let mut target = SessionState::in_memory();
    match dispatch(&mut target, UiToEngine::ImportProject { data }) {
        EngineToUi::ProjectLoaded { success, model } => {
            assert!(success);
            assert_eq!(model.features[0].id, s);
        }
        other => panic!("expected ProjectLoaded, got {other:?}"),
    }
}

// ── JSON Entry Point ────────────────────────────────────────────────────────

#[test]
fn process_message_round_trips_json() {
    let mut state = SessionState::in_memory();
    let input = json!({
        "type": "AddFeature",
        "name": "Base",
        "operation": { "type": "sketch", "sketch": serde_json::to_value(
            Sketch::on_plane(StandardPlane::Yz, 0.0)
        ).unwrap() }
    });
    let output: Value =
        serde_json::from_str(&process_message(&mut state, &input.to_string())).unwrap();
    assert_eq!(output["type"], "ModelUpdated");
    assert_eq!(output["features"][0]["name"], "Base");
}

#[test]
fn process_message_rejects_bad_json() {
    let mut state = SessionState::in_memory();
    let output: Value =
        serde_json::from_str(&process_message(&mut state, "{\"type\":\"Bogus\"}")).unwrap();
    assert_eq!(output["type"], "Error");
    assert!(output["message"]
        .as_str()
        .unwrap()
        .starts_with("failed to parse message"));
}
