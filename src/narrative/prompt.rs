use std::fmt::Write as _;

use crate::{
    narrative::{AnalysisRequest, RestorationRequest, DEFAULT_RESTORATION_DETAILS},
    restoration::{signed_fixed, signed_plain, RestorationDelta},
    score::Factor,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const ANALYSIS_SYSTEM: &str = "You are an expert forest ecologist and environmental scientist \
specializing in forest health assessment. Analyze the provided forest data and provide clear, \
actionable insights in plain English.";

const RESTORATION_SYSTEM: &str = "You are a forest restoration expert analyzing the impact of \
conservation and restoration efforts. Provide clear insights on the effectiveness of \
restoration activities.";

pub fn analysis_prompt(request: &AnalysisRequest) -> Prompt {
    let m = &request.metrics;
    let mut user = String::new();
    let _ = writeln!(user, "Analyze the health of {}:", request.forest_name);
    let _ = writeln!(user);
    let _ = writeln!(
        user,
        "Forest Health Score: {}/100 (Grade: {})",
        request.score, request.grade
    );
    let _ = writeln!(user);
    let _ = writeln!(user, "Current Metrics:");
    let _ = writeln!(
        user,
        "- NDVI (Normalized Difference Vegetation Index): {} (Optimal: {})",
        m.ndvi,
        Factor::Ndvi.optimal_range()
    );
    let _ = writeln!(
        user,
        "- Tree Density: {} trees/hectare (Optimal: {})",
        m.tree_density,
        Factor::TreeDensity.optimal_range()
    );
    let _ = writeln!(
        user,
        "- Rainfall: {}mm/month (Optimal: {})",
        m.rainfall,
        Factor::Rainfall.optimal_range()
    );
    let _ = writeln!(
        user,
        "- Soil Moisture: {}% (Optimal: {})",
        m.soil_moisture,
        Factor::SoilMoisture.optimal_range()
    );
    let _ = writeln!(
        user,
        "- Temperature: {}°C (Optimal: {})",
        m.temperature,
        Factor::Temperature.optimal_range()
    );
    let _ = writeln!(user);
    let _ = writeln!(user, "6-Month Trend:");
    for trend in &request.trends {
        let _ = writeln!(user, "{}: Score {}, NDVI {}", trend.month, trend.score, trend.ndvi);
    }
    let _ = writeln!(user);
    user.push_str(
        "Please provide:\n\
         1. A clear explanation of what the current health score means\n\
         2. Key strengths and concerns for this forest\n\
         3. Analysis of the 6-month trend\n\
         4. Prediction for the next 3 months based on current trends\n\
         5. 3-5 specific, actionable recommendations for forest management\n\
         \n\
         Keep the language accessible to non-experts while being scientifically accurate.",
    );

    Prompt {
        system: ANALYSIS_SYSTEM.to_string(),
        user,
    }
}

pub fn restoration_prompt(request: &RestorationRequest, delta: &RestorationDelta) -> Prompt {
    let before = &request.before_data;
    let after = &request.after_data;
    let details = request
        .restoration_details
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_RESTORATION_DETAILS);

    let mut user = String::new();
    let _ = writeln!(user, "Analyze the restoration impact on {}:", request.forest_name);
    for (heading, snapshot) in [("BEFORE", before), ("AFTER", after)] {
        let _ = writeln!(user);
        let _ = writeln!(user, "{heading} RESTORATION ({}):", snapshot.date);
        let _ = writeln!(user, "- Health Score: {}/100", snapshot.score);
        let _ = writeln!(user, "- NDVI: {}", snapshot.ndvi);
        let _ = writeln!(user, "- Tree Density: {} trees/hectare", snapshot.tree_density);
        let _ = writeln!(user, "- Soil Moisture: {}%", snapshot.soil_moisture);
    }
    let _ = writeln!(user);
    let _ = writeln!(user, "RESTORATION ACTIVITIES:");
    let _ = writeln!(user, "{details}");
    let _ = writeln!(user);
    let _ = writeln!(user, "CHANGES:");
    let _ = writeln!(user, "- Health Score: {} points", signed_fixed(delta.score, 1));
    let _ = writeln!(user, "- NDVI: {}", signed_fixed(delta.ndvi, 3));
    let _ = writeln!(
        user,
        "- Tree Density: {} trees/hectare",
        signed_plain(delta.tree_density)
    );
    let _ = writeln!(user, "- Soil Moisture: {}%", signed_plain(delta.soil_moisture));
    let _ = writeln!(user);
    user.push_str(
        "Please provide:\n\
         1. Overall assessment of restoration effectiveness\n\
         2. Analysis of which metrics improved most/least\n\
         3. Ecological significance of the changes\n\
         4. Recommendations for continued restoration efforts\n\
         5. Timeline estimate for reaching optimal forest health\n\
         \n\
         Use accessible language suitable for community stakeholders and conservation teams.",
    );

    Prompt {
        system: RESTORATION_SYSTEM.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        forest::{ForestMetrics, ForestTrend},
        restoration::RestorationSnapshot,
        score::Grade,
    };

    fn analysis_request() -> AnalysisRequest {
        AnalysisRequest {
            forest_name: "Kakamega Forest".into(),
            score: 86,
            grade: Grade::B,
            metrics: ForestMetrics::unchecked(0.78, 650.0, 180.0, 52.0, 21.0),
            trends: vec![
                ForestTrend {
                    month: "Oct".into(),
                    score: 86,
                    ndvi: 0.78,
                    rainfall: 180.0,
                },
                ForestTrend {
                    month: "Nov".into(),
                    score: 87,
                    ndvi: 0.78,
                    rainfall: 180.0,
                },
            ],
        }
    }

    #[test]
    fn analysis_prompt_lists_metrics_with_optimal_ranges() {
        let prompt = analysis_prompt(&analysis_request());
        assert!(prompt.system.contains("forest ecologist"));
        assert!(prompt.user.starts_with("Analyze the health of Kakamega Forest:"));
        assert!(prompt.user.contains("Forest Health Score: 86/100 (Grade: B)"));
        assert!(prompt.user.contains("- Tree Density: 650 trees/hectare (Optimal: 400-800)"));
        assert!(prompt.user.contains("- Soil Moisture: 52% (Optimal: 40-60%)"));
        assert!(prompt.user.contains("Nov: Score 87, NDVI 0.78"));
        assert!(prompt.user.contains("5. 3-5 specific, actionable recommendations"));
    }

    fn restoration_request(details: Option<&str>) -> RestorationRequest {
        let date = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();
        RestorationRequest {
            forest_name: "Mau Forest Complex".into(),
            before_data: RestorationSnapshot {
                date: date(5, 1),
                score: 62.0,
                ndvi: 0.57,
                tree_density: 420.0,
                soil_moisture: 37.0,
                rainfall: 120.0,
            },
            after_data: RestorationSnapshot {
                date: date(11, 21),
                score: 72.0,
                ndvi: 0.65,
                tree_density: 520.0,
                soil_moisture: 45.0,
                rainfall: 140.0,
            },
            restoration_details: details.map(str::to_string),
        }
    }

    #[test]
    fn restoration_prompt_shows_signed_changes() {
        let request = restoration_request(Some("Community tree nurseries"));
        let delta = request.delta();
        let prompt = restoration_prompt(&request, &delta);
        assert!(prompt.user.contains("BEFORE RESTORATION (2024-05-01):"));
        assert!(prompt.user.contains("AFTER RESTORATION (2024-11-21):"));
        assert!(prompt.user.contains("Community tree nurseries"));
        assert!(prompt.user.contains("- Health Score: +10.0 points"));
        assert!(prompt.user.contains("- NDVI: +0.080"));
        assert!(prompt.user.contains("- Tree Density: +100 trees/hectare"));
        assert!(prompt.user.contains("- Soil Moisture: +8%"));
    }

    #[test]
    fn restoration_prompt_falls_back_to_default_activities() {
        for details in [None, Some("   ")] {
            let request = restoration_request(details);
            let prompt = restoration_prompt(&request, &request.delta());
            assert!(prompt.user.contains(DEFAULT_RESTORATION_DETAILS));
        }
    }
}
