//! Integration tests for loading datasets from JSON documents.

use gain_core::prelude::*;
use tempfile::tempdir;

fn write_dataset(dir: &std::path::Path, dataset: &Dataset) -> (std::path::PathBuf, std::path::PathBuf, std::path::PathBuf) {
    let tensor = dir.join("tensor.json");
    let random_matrix = dir.join("random_matrix.json");
    let random_tensor = dir.join("random_tensor.json");
    ArrayDocument::from(&dataset.tensor).write(&tensor).unwrap();
    ArrayDocument::from(&dataset.random_matrix).write(&random_matrix).unwrap();
    ArrayDocument::from(&dataset.random_tensor).write(&random_tensor).unwrap();
    (tensor, random_matrix, random_tensor)
}

#[test]
fn test_load_round_trip() {
    let dir = tempdir().unwrap();
    let original = Dataset::synthetic([3, 3, 4], 5).unwrap();
    let (t, rm, rt) = write_dataset(dir.path(), &original);

    let loaded = Dataset::load(&t, &rm, &rt).unwrap();
    assert_eq!(loaded.tensor, original.tensor);
    assert_eq!(loaded.random_matrix, original.random_matrix);
    assert_eq!(loaded.random_tensor, original.random_tensor);
}

#[test]
fn test_load_rejects_mismatched_random_matrix() {
    let dir = tempdir().unwrap();
    let original = Dataset::synthetic([3, 3, 4], 5).unwrap();
    let (t, rm, rt) = write_dataset(dir.path(), &original);

    let wrong = ArrayDocument {
        shape: vec![3, 4],
        data: vec![0.5; 12],
    };
    wrong.write(&rm).unwrap();

    let err = Dataset::load(&t, &rm, &rt).unwrap_err();
    assert!(matches!(err, GainError::ShapeMismatch { .. }), "got {err}");
}

#[test]
fn test_load_reports_missing_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    let err = Dataset::load(&missing, &missing, &missing).unwrap_err();
    assert!(matches!(err, GainError::Io { .. }));
}

#[test]
fn test_load_reports_bad_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ArrayDocument::read(&path).unwrap_err();
    assert!(matches!(err, GainError::Parse { .. }));
}

#[test]
fn test_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "alpha": 5.0, "max_iter": 10 }"#).unwrap();
    let config = GainConfig::from_json_file(&path).unwrap();
    assert_eq!(config.alpha, 5.0);
    assert_eq!(config.max_iter, 10);

    std::fs::write(&path, r#"{ "alpha": -5.0 }"#).unwrap();
    assert!(matches!(
        GainConfig::from_json_file(&path),
        Err(GainError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_oversized_shape_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("huge.json");
    std::fs::write(&path, r#"{"shape":[4294967296,4294967296,2],"data":[]}"#).unwrap();
    let err = ArrayDocument::read(&path).unwrap().into_tensor3().unwrap_err();
    assert!(matches!(err, GainError::ShapeMismatch { .. }), "got {err}");

    std::fs::write(&path, r#"{"shape":[4294967296,4294967297],"data":[]}"#).unwrap();
    let err = ArrayDocument::read(&path).unwrap().into_matrix().unwrap_err();
    assert!(matches!(err, GainError::ShapeMismatch { .. }), "got {err}");
}

#[test]
fn test_load_rejects_random_values_outside_unit_interval() {
    let dir = tempdir().unwrap();
    let original = Dataset::synthetic([3, 3, 4], 5).unwrap();
    let (t, rm, rt) = write_dataset(dir.path(), &original);

    let mut doc = ArrayDocument::read(&rt).unwrap();
    doc.data[7] = 1.5;
    doc.write(&rt).unwrap();
    let err = Dataset::load(&t, &rm, &rt).unwrap_err();
    assert!(
        matches!(err, GainError::InvalidConfiguration { ref parameter, .. } if parameter == "random_tensor"),
        "got {err}"
    );

    let (t, rm, rt) = write_dataset(dir.path(), &original);
    let mut doc = ArrayDocument::read(&rm).unwrap();
    doc.data[0] = -0.25;
    doc.write(&rm).unwrap();
    let err = Dataset::load(&t, &rm, &rt).unwrap_err();
    assert!(
        matches!(err, GainError::InvalidConfiguration { ref parameter, .. } if parameter == "random_matrix"),
        "got {err}"
    );
}
