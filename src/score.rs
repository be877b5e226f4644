//! Forest health scoring.
//!
//! The score is a weighted sum of five factor terms. The NDVI, tree density,
//! rainfall and soil moisture terms are capped at 100 before weighting. The
//! temperature term has no floor and the total is not clamped, so extreme
//! temperatures can push a score below zero. No input can push it above 100.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forest::ForestMetrics;

const TERM_CAP: f64 = 100.0;

pub const NDVI_OPTIMUM: f64 = 0.9;
pub const TREE_DENSITY_OPTIMUM: f64 = 800.0;
pub const RAINFALL_OPTIMUM: f64 = 200.0;
pub const SOIL_MOISTURE_OPTIMUM: f64 = 60.0;
pub const TEMPERATURE_OPTIMUM: f64 = 20.0;
pub const TEMPERATURE_TOLERANCE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Factor {
    Ndvi,
    TreeDensity,
    Rainfall,
    SoilMoisture,
    Temperature,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Ndvi,
        Factor::TreeDensity,
        Factor::Rainfall,
        Factor::SoilMoisture,
        Factor::Temperature,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Factor::Ndvi => 0.35,
            Factor::TreeDensity => 0.25,
            Factor::Rainfall => 0.20,
            Factor::SoilMoisture => 0.15,
            Factor::Temperature => 0.05,
        }
    }

    /// Largest contribution the factor can make to the total.
    pub fn max_contribution(self) -> f64 {
        self.weight() * TERM_CAP
    }

    pub fn label(self) -> &'static str {
        match self {
            Factor::Ndvi => "NDVI",
            Factor::TreeDensity => "Tree Density",
            Factor::Rainfall => "Rainfall",
            Factor::SoilMoisture => "Soil Moisture",
            Factor::Temperature => "Temperature",
        }
    }

    /// Optimal band shown next to a reading.
    pub fn optimal_range(self) -> &'static str {
        match self {
            Factor::Ndvi => "0.6-0.9",
            Factor::TreeDensity => "400-800",
            Factor::Rainfall => "100-200mm",
            Factor::SoilMoisture => "40-60%",
            Factor::Temperature => "15-25°C",
        }
    }

    pub fn reading(self, metrics: &ForestMetrics) -> f64 {
        match self {
            Factor::Ndvi => metrics.ndvi,
            Factor::TreeDensity => metrics.tree_density,
            Factor::Rainfall => metrics.rainfall,
            Factor::SoilMoisture => metrics.soil_moisture,
            Factor::Temperature => metrics.temperature,
        }
    }
}

fn capped_ratio(value: f64, optimum: f64) -> f64 {
    (value / optimum * TERM_CAP).min(TERM_CAP)
}

fn temperature_ratio(temperature: f64) -> f64 {
    (1.0 - (TEMPERATURE_OPTIMUM - temperature).abs() / TEMPERATURE_TOLERANCE) * TERM_CAP
}

/// Weighted contribution of each factor, before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub ndvi: f64,
    pub tree_density: f64,
    pub rainfall: f64,
    pub soil_moisture: f64,
    pub temperature: f64,
}

impl ScoreBreakdown {
    pub fn from_metrics(metrics: &ForestMetrics) -> Self {
        Self {
            ndvi: capped_ratio(metrics.ndvi, NDVI_OPTIMUM) * Factor::Ndvi.weight(),
            tree_density: capped_ratio(metrics.tree_density, TREE_DENSITY_OPTIMUM)
                * Factor::TreeDensity.weight(),
            rainfall: capped_ratio(metrics.rainfall, RAINFALL_OPTIMUM) * Factor::Rainfall.weight(),
            soil_moisture: capped_ratio(metrics.soil_moisture, SOIL_MOISTURE_OPTIMUM)
                * Factor::SoilMoisture.weight(),
            temperature: temperature_ratio(metrics.temperature) * Factor::Temperature.weight(),
        }
    }

    pub fn contribution(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Ndvi => self.ndvi,
            Factor::TreeDensity => self.tree_density,
            Factor::Rainfall => self.rainfall,
            Factor::SoilMoisture => self.soil_moisture,
            Factor::Temperature => self.temperature,
        }
    }

    /// Contribution as a fraction of the factor's maximum.
    pub fn attainment(&self, factor: Factor) -> f64 {
        self.contribution(factor) / factor.max_contribution()
    }

    pub fn total(&self) -> f64 {
        self.ndvi + self.tree_density + self.rainfall + self.soil_moisture + self.temperature
    }

    pub fn score(&self) -> i64 {
        self.total().round() as i64
    }
}

/// Computes the 0-100 health score for a metrics snapshot.
///
/// Total over every `f64` input. The result is not clamped: a temperature
/// more than 20 degrees from the optimum makes its term negative and the score
/// can fall below zero. A NaN total saturates to 0.
pub fn compute_score(metrics: &ForestMetrics) -> i64 {
    ScoreBreakdown::from_metrics(metrics).score()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    pub fn label(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown grade '{0}'")]
pub struct UnknownGrade(pub String);

impl FromStr for Grade {
    type Err = UnknownGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            "F" => Ok(Grade::F),
            other => Err(UnknownGrade(other.to_string())),
        }
    }
}

/// Letter grade ladder. Lower bounds are inclusive.
pub fn grade_for(score: i64) -> Grade {
    match score {
        s if s >= 90 => Grade::A,
        s if s >= 80 => Grade::B,
        s if s >= 70 => Grade::C,
        s if s >= 60 => Grade::D,
        s if s >= 50 => Grade::E,
        _ => Grade::F,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusColor {
    Excellent,
    Good,
    Fair,
    AtRisk,
    Muted,
}

impl StatusColor {
    /// Theme token used by presentation layers.
    pub fn token(self) -> &'static str {
        match self {
            StatusColor::Excellent => "success",
            StatusColor::Good => "primary",
            StatusColor::Fair => "warning",
            StatusColor::AtRisk => "destructive",
            StatusColor::Muted => "muted-foreground",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusColor::Excellent => "excellent",
            StatusColor::Good => "good",
            StatusColor::Fair => "fair",
            StatusColor::AtRisk => "at-risk",
            StatusColor::Muted => "muted",
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn color_for(grade: Grade) -> StatusColor {
    match grade {
        Grade::A => StatusColor::Excellent,
        Grade::B => StatusColor::Good,
        Grade::C | Grade::D => StatusColor::Fair,
        Grade::E | Grade::F => StatusColor::AtRisk,
    }
}

/// Color for a grade that arrives as text. Anything that is not one of the
/// six grade letters is muted.
pub fn color_for_label(label: &str) -> StatusColor {
    label
        .parse::<Grade>()
        .map(color_for)
        .unwrap_or(StatusColor::Muted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusLabel {
    pub label: &'static str,
    pub classification: StatusColor,
}

/// Score-card status ladder. Its thresholds sit ten points below the grade
/// ladder's and are kept separate from [`grade_for`].
pub fn status_label_for(score: i64) -> StatusLabel {
    let (label, classification) = match score {
        s if s >= 80 => ("Excellent Health", StatusColor::Excellent),
        s if s >= 70 => ("Good Health", StatusColor::Good),
        s if s >= 60 => ("Fair Health", StatusColor::Fair),
        _ => ("At Risk", StatusColor::AtRisk),
    };
    StatusLabel {
        label,
        classification,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: i64,
    pub grade: Grade,
    pub status_color: StatusColor,
    pub breakdown: ScoreBreakdown,
}

impl ScoreResult {
    pub fn evaluate(metrics: &ForestMetrics) -> Self {
        let breakdown = ScoreBreakdown::from_metrics(metrics);
        let score = breakdown.score();
        let grade = grade_for(score);
        Self {
            score,
            grade,
            status_color: color_for(grade),
            breakdown,
        }
    }

    pub fn status(&self) -> StatusLabel {
        status_label_for(self.score)
    }
}
