//! Tests for the ModelBuilder workflow API.

use model_types::StandardPlane;
use test_harness::{HarnessError, ModelBuilder};

#[test]
fn sketch_creates_named_feature() {
    let mut m = ModelBuilder::new();
    let id = m.sketch("my_sketch", StandardPlane::Xy).unwrap();
    assert_eq!(m.feature_count(), 1);
    assert_eq!(m.feature_id("my_sketch").unwrap(), id);
    assert_eq!(m.feature("my_sketch").unwrap().name, "my_sketch");
}

#[test]
fn extrude_by_name() {
    let mut m = ModelBuilder::new();
    m.sketch("sk", StandardPlane::Xy).unwrap();
    let ex_id = m.extrude("box", "sk", 10.0).unwrap();
    assert_eq!(m.feature_count(), 2);
    assert_eq!(m.feature_id("box").unwrap(), ex_id);
    assert_eq!(
        m.engine().dependencies(ex_id).unwrap(),
        vec![m.feature_id("sk").unwrap()]
    );
}

#[test]
fn named_lookup_fails_for_unknown_names() {
    let m = ModelBuilder::new();
    assert!(matches!(
        m.feature_id("nonexistent"),
        Err(HarnessError::FeatureNotFound { .. })
    ));
    assert!(matches!(
        m.element_id("nonexistent"),
        Err(HarnessError::ElementNotFound { .. })
    ));
}

#[test]
fn duplicate_name_returns_error() {
    let mut m = ModelBuilder::new();
    m.sketch("sk", StandardPlane::Xy).unwrap();
    let result = m.sketch("sk", StandardPlane::Xz);
    assert!(matches!(result, Err(HarnessError::DuplicateName { .. })));
    assert_eq!(m.feature_count(), 1);
}

#[test]
fn history_records_each_command() {
    let mut m = ModelBuilder::new();
    m.sketch("sk", StandardPlane::Xy).unwrap();
    m.undo().unwrap();
    let kinds: Vec<&str> = m.history().iter().map(|(msg, _)| msg.as_str()).collect();
    assert_eq!(kinds, vec!["AddFeature", "Undo"]);
    assert!(m.history().iter().all(|(_, r)| r == "ModelUpdated"));
}

#[test]
fn delete_forgets_the_name() {
    let mut m = ModelBuilder::new().with_auto_check();
    m.sketch("sk", StandardPlane::Xy).unwrap();
    m.delete_feature("sk").unwrap();
    assert!(m.feature_id("sk").is_err());
    m.sketch("sk", StandardPlane::Xy).unwrap();
}

#[test]
fn save_and_load_remap_names() {
    let mut m = ModelBuilder::new();
    m.sketch("sk", StandardPlane::Xy).unwrap();
    m.extrude("box", "sk", 4.0).unwrap();
    let box_id = m.feature_id("box").unwrap();
    m.save().unwrap();
    m.delete_feature("box").unwrap();

    m.load().unwrap();
    assert_eq!(m.feature_id("box").unwrap(), box_id);
    m.assert_feature_count(2).unwrap();
}

#[test]
fn load_without_save_is_an_error() {
    let mut m = ModelBuilder::new();
    assert!(m.load().is_err());
}
