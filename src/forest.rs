use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::score::{status_label_for, ScoreResult, StatusLabel};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForestId(String);

impl ForestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ForestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// One satellite/sensor reading for a forest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestMetrics {
    /// Vegetation index, 0..=1.
    pub ndvi: f64,
    /// Trees per hectare.
    pub tree_density: f64,
    /// Millimetres per month.
    pub rainfall: f64,
    /// Percent, 0..=100.
    pub soil_moisture: f64,
    /// Degrees Celsius.
    pub temperature: f64,
}

impl ForestMetrics {
    pub fn new(
        ndvi: f64,
        tree_density: f64,
        rainfall: f64,
        soil_moisture: f64,
        temperature: f64,
    ) -> Result<Self, MetricsError> {
        let metrics = Self::unchecked(ndvi, tree_density, rainfall, soil_moisture, temperature);
        metrics.validate()?;
        Ok(metrics)
    }

    /// Builds a snapshot without domain checks. Scoring accepts any value.
    pub fn unchecked(
        ndvi: f64,
        tree_density: f64,
        rainfall: f64,
        soil_moisture: f64,
        temperature: f64,
    ) -> Self {
        Self {
            ndvi,
            tree_density,
            rainfall,
            soil_moisture,
            temperature,
        }
    }

    pub fn validate(&self) -> Result<(), MetricsError> {
        let fields = [
            ("ndvi", self.ndvi),
            ("tree_density", self.tree_density),
            ("rainfall", self.rainfall),
            ("soil_moisture", self.soil_moisture),
            ("temperature", self.temperature),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(MetricsError::NonFinite { field });
            }
        }
        check_range("ndvi", self.ndvi, 0.0, 1.0)?;
        check_non_negative("tree_density", self.tree_density)?;
        check_non_negative("rainfall", self.rainfall)?;
        check_range("soil_moisture", self.soil_moisture, 0.0, 100.0)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), MetricsError> {
    if value < min || value > max {
        return Err(MetricsError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), MetricsError> {
    if value < 0.0 {
        return Err(MetricsError::Negative { field, value });
    }
    Ok(())
}

/// A past monthly observation. Supplied by the data source, never computed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestTrend {
    pub month: String,
    pub score: i64,
    pub ndvi: f64,
    pub rainfall: f64,
}

/// Marker position on the dashboard map, in percent of width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forest {
    pub id: ForestId,
    pub name: String,
    pub location: String,
    pub area_hectares: f64,
    pub current_metrics: ForestMetrics,
    pub trends: Vec<ForestTrend>,
    pub last_updated: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<MapPosition>,
}

impl Forest {
    pub fn score(&self) -> ScoreResult {
        ScoreResult::evaluate(&self.current_metrics)
    }

    pub fn status(&self) -> StatusLabel {
        status_label_for(self.score().score)
    }
}
