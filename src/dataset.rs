use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    forest::{Forest, ForestId, ForestMetrics, ForestTrend, MapPosition, MetricsError},
    store::ForestStore,
};

const SEED_DATASET: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/datasets/kenya.yaml"));

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("dataset validation error: {0}")]
    Validation(String),
    #[error("forest '{forest}' has invalid metrics: {source}")]
    Metrics {
        forest: String,
        #[source]
        source: MetricsError,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub description: Option<String>,
    pub forests: Vec<DatasetForest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetForest {
    pub id: String,
    pub name: String,
    pub location: String,
    pub area_hectares: f64,
    pub last_updated: NaiveDate,
    pub metrics: DatasetMetrics,
    #[serde(default)]
    pub trends: Vec<DatasetTrend>,
    #[serde(default)]
    pub position: Option<DatasetPosition>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DatasetMetrics {
    pub ndvi: f64,
    pub tree_density: f64,
    pub rainfall: f64,
    pub soil_moisture: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetTrend {
    pub month: String,
    pub score: i64,
    pub ndvi: f64,
    pub rainfall: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DatasetPosition {
    pub x: f64,
    pub y: f64,
}

pub struct DatasetLoader {
    base_dir: PathBuf,
}

impl DatasetLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Dataset, DatasetError> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;
        let dataset = Dataset::from_yaml(&data)?;
        tracing::debug!(
            path = %path.display(),
            forests = dataset.forests.len(),
            "loaded forest dataset"
        );
        Ok(dataset)
    }
}

impl Dataset {
    /// The reference forests compiled into the binary.
    pub fn seed() -> Result<Self, DatasetError> {
        Self::from_yaml(SEED_DATASET)
    }

    pub fn from_yaml(text: &str) -> Result<Self, DatasetError> {
        let dataset: Dataset = serde_yaml::from_str(text)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.forests.is_empty() {
            return Err(DatasetError::Validation(
                "dataset must define at least one forest".to_string(),
            ));
        }

        let mut known_ids = HashSet::new();
        for forest in &self.forests {
            if forest.id.trim().is_empty() {
                return Err(DatasetError::Validation(format!(
                    "forest '{}' has an empty id",
                    forest.name
                )));
            }
            if !known_ids.insert(forest.id.as_str()) {
                return Err(DatasetError::Validation(format!(
                    "forest id '{}' defined more than once",
                    forest.id
                )));
            }
            if forest.name.trim().is_empty() {
                return Err(DatasetError::Validation(format!(
                    "forest '{}' must have a name",
                    forest.id
                )));
            }
            if !(forest.area_hectares.is_finite() && forest.area_hectares > 0.0) {
                return Err(DatasetError::Validation(format!(
                    "forest '{}' must have a positive area",
                    forest.id
                )));
            }
            forest.metrics().map_err(|source| DatasetError::Metrics {
                forest: forest.id.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn build_store(&self) -> Result<ForestStore, DatasetError> {
        let mut forests = Vec::with_capacity(self.forests.len());
        for entry in &self.forests {
            let current_metrics = entry.metrics().map_err(|source| DatasetError::Metrics {
                forest: entry.id.clone(),
                source,
            })?;
            forests.push(Forest {
                id: ForestId::new(entry.id.clone()),
                name: entry.name.clone(),
                location: entry.location.clone(),
                area_hectares: entry.area_hectares,
                current_metrics,
                trends: entry
                    .trends
                    .iter()
                    .map(|trend| ForestTrend {
                        month: trend.month.clone(),
                        score: trend.score,
                        ndvi: trend.ndvi,
                        rainfall: trend.rainfall,
                    })
                    .collect(),
                last_updated: entry.last_updated,
                position: entry.position.map(|p| MapPosition { x: p.x, y: p.y }),
            });
        }
        ForestStore::from_forests(forests)
            .map_err(|err| DatasetError::Validation(err.to_string()))
    }
}

impl DatasetForest {
    fn metrics(&self) -> Result<ForestMetrics, MetricsError> {
        let m = self.metrics;
        ForestMetrics::new(m.ndvi, m.tree_density, m.rainfall, m.soil_moisture, m.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: test
forests:
  - id: a
    name: Alpha
    location: North
    area_hectares: 10
    last_updated: 2025-01-31
    metrics:
      ndvi: 0.5
      tree_density: 300
      rainfall: 90
      soil_moisture: 40
      temperature: 22
"#;

    #[test]
    fn seed_dataset_has_the_four_reference_forests() {
        let dataset = Dataset::seed().expect("seed parses");
        assert_eq!(dataset.name, "kenya");
        let ids: Vec<_> = dataset.forests.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["kakamega", "mau", "aberdare", "arabuko-sokoke"]);
        assert!(dataset.forests.iter().all(|f| f.trends.len() == 6));
    }

    #[test]
    fn optional_sections_default() {
        let dataset = Dataset::from_yaml(MINIMAL).unwrap();
        let forest = &dataset.forests[0];
        assert!(forest.trends.is_empty());
        assert!(forest.position.is_none());
        assert!(dataset.description.is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = format!(
            "{MINIMAL}{}",
            MINIMAL
                .split_once("forests:\n")
                .map(|(_, rest)| rest)
                .unwrap()
        );
        let err = Dataset::from_yaml(&text).unwrap_err();
        assert!(err.to_string().contains("defined more than once"), "{err}");
    }

    #[test]
    fn out_of_domain_metrics_are_rejected_at_load() {
        let text = MINIMAL.replace("ndvi: 0.5", "ndvi: 1.5");
        match Dataset::from_yaml(&text) {
            Err(DatasetError::Metrics { forest, .. }) => assert_eq!(forest, "a"),
            other => panic!("expected metrics error, got {other:?}"),
        }
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let err = Dataset::from_yaml("name: empty\nforests: []\n").unwrap_err();
        assert!(matches!(err, DatasetError::Validation(_)));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = Dataset::from_yaml("name: [unterminated").unwrap_err();
        assert!(matches!(err, DatasetError::Parse(_)));
    }
}
