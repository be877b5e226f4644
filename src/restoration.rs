use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::forest::Forest;

/// Forest state at one end of a restoration period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationSnapshot {
    pub date: NaiveDate,
    pub score: f64,
    pub ndvi: f64,
    pub tree_density: f64,
    pub soil_moisture: f64,
    pub rainfall: f64,
}

impl RestorationSnapshot {
    pub fn from_forest(forest: &Forest, date: NaiveDate) -> Self {
        let metrics = &forest.current_metrics;
        Self {
            date,
            score: forest.score().score as f64,
            ndvi: metrics.ndvi,
            tree_density: metrics.tree_density,
            soil_moisture: metrics.soil_moisture,
            rainfall: metrics.rainfall,
        }
    }

    /// Illustrative pre-restoration state used by the dashboard demo.
    pub fn demo_baseline(after: &RestorationSnapshot, date: NaiveDate) -> Self {
        Self {
            date,
            score: after.score - 10.0,
            ndvi: after.ndvi - 0.08,
            tree_density: after.tree_density - 100.0,
            soil_moisture: after.soil_moisture - 8.0,
            rainfall: after.rainfall - 20.0,
        }
    }
}

/// Field-wise `after - before`. No rounding and no clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationDelta {
    pub score: f64,
    pub ndvi: f64,
    pub tree_density: f64,
    pub rainfall: f64,
    pub soil_moisture: f64,
}

impl RestorationDelta {
    pub fn between(before: &RestorationSnapshot, after: &RestorationSnapshot) -> Self {
        Self {
            score: after.score - before.score,
            ndvi: after.ndvi - before.ndvi,
            tree_density: after.tree_density - before.tree_density,
            rainfall: after.rainfall - before.rainfall,
            soil_moisture: after.soil_moisture - before.soil_moisture,
        }
    }
}

/// Signed value with a fixed number of decimals: `+1.5`, `-0.3`, `0.0`.
pub fn signed_fixed(value: f64, decimals: usize) -> String {
    if value > 0.0 {
        format!("+{value:.decimals$}")
    } else {
        format!("{value:.decimals$}")
    }
}

/// Signed value using its natural representation: `+100`, `-8`, `0`.
pub fn signed_plain(value: f64) -> String {
    if value > 0.0 {
        format!("+{value}")
    } else {
        format!("{value}")
    }
}

pub fn format_change(value: f64) -> String {
    signed_fixed(value, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(score: f64, ndvi: f64, density: f64, moisture: f64, rainfall: f64) -> RestorationSnapshot {
        RestorationSnapshot {
            date: date(2024, 5, 1),
            score,
            ndvi,
            tree_density: density,
            soil_moisture: moisture,
            rainfall,
        }
    }

    #[test]
    fn delta_is_plain_subtraction() {
        let before = snapshot(76.0, 0.70, 550.0, 44.0, 160.0);
        let after = snapshot(86.0, 0.78, 650.0, 52.0, 180.0);
        let delta = RestorationDelta::between(&before, &after);
        assert_eq!(delta.score, 10.0);
        assert_eq!(delta.ndvi, 0.78 - 0.70);
        assert_eq!(delta.tree_density, 100.0);
        assert_eq!(delta.soil_moisture, 8.0);
        assert_eq!(delta.rainfall, 20.0);
    }

    #[test]
    fn delta_keeps_sign_and_fractions() {
        let before = snapshot(90.5, 0.8, 700.0, 50.0, 190.0);
        let after = snapshot(71.25, 0.6, 640.0, 55.5, 120.0);
        let delta = RestorationDelta::between(&before, &after);
        assert_eq!(delta.score, -19.25);
        assert_eq!(delta.tree_density, -60.0);
        assert_eq!(delta.soil_moisture, 5.5);
        assert_eq!(delta.rainfall, -70.0);
    }

    #[test]
    fn demo_baseline_offsets_each_field() {
        let after = snapshot(86.0, 0.78, 650.0, 52.0, 180.0);
        let before = RestorationSnapshot::demo_baseline(&after, date(2024, 5, 1));
        let delta = RestorationDelta::between(&before, &after);
        assert_relative_eq!(delta.score, 10.0);
        assert_relative_eq!(delta.ndvi, 0.08, epsilon = 1e-12);
        assert_relative_eq!(delta.tree_density, 100.0);
        assert_relative_eq!(delta.soil_moisture, 8.0);
        assert_relative_eq!(delta.rainfall, 20.0);
    }

    #[test]
    fn change_formatting() {
        assert_eq!(format_change(1.54), "+1.5");
        assert_eq!(format_change(-0.26), "-0.3");
        assert_eq!(format_change(0.0), "0.0");
        assert_eq!(signed_fixed(0.08, 3), "+0.080");
        assert_eq!(signed_plain(100.0), "+100");
        assert_eq!(signed_plain(-8.0), "-8");
    }
}
