use std::fs;

use juamsitu::{dataset::DatasetError, DatasetLoader};

const TWO_FORESTS: &str = r#"
name: pilot
forests:
  - id: karura
    name: Karura Forest
    location: Nairobi
    area_hectares: 1041
    last_updated: 2025-10-01
    metrics: { ndvi: 0.72, tree_density: 600, rainfall: 150, soil_moisture: 48, temperature: 20 }
  - id: ngong
    name: Ngong Road Forest
    location: Nairobi
    area_hectares: 638
    last_updated: 2025-10-01
    metrics: { ndvi: 0.55, tree_density: 420, rainfall: 110, soil_moisture: 38, temperature: 22 }
    trends:
      - { month: Aug, score: 60, ndvi: 0.54, rainfall: 100 }
      - { month: Sep, score: 58, ndvi: 0.55, rainfall: 110 }
"#;

#[test]
fn loads_a_dataset_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("pilot.yaml"), TWO_FORESTS).unwrap();

    let dataset = DatasetLoader::new(dir.path()).load("pilot.yaml").unwrap();
    assert_eq!(dataset.name, "pilot");
    let store = dataset.build_store().unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.first().unwrap().id.as_str(), "karura");
    assert_eq!(store.get("ngong").unwrap().trends.len(), 2);
    assert!(store.get("kakamega").is_none());
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = DatasetLoader::new(dir.path()).load("absent.yaml").unwrap_err();
    match err {
        DatasetError::Io { path, .. } => assert!(path.ends_with("absent.yaml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_metrics_name_the_forest() {
    let dir = tempfile::tempdir().unwrap();
    let broken = TWO_FORESTS.replace("ndvi: 0.55, tree_density", "ndvi: 1.55, tree_density");
    fs::write(dir.path().join("broken.yaml"), broken).unwrap();
    let err = DatasetLoader::new(dir.path()).load("broken.yaml").unwrap_err();
    assert!(matches!(err, DatasetError::Metrics { ref forest, .. } if forest == "ngong"), "{err}");
}
