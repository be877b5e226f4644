use std::fmt::Write as _;

use crate::{
    comparison::{overall_change, trend_delta},
    narrative::{
        AnalysisRequest, NarrativeBackend, NarrativeContext, NarrativeError, Prompt,
        RestorationRequest,
    },
    restoration::{format_change, RestorationDelta},
    score::{status_label_for, Factor, ScoreBreakdown},
};

const STRENGTH_ATTAINMENT: f64 = 0.9;
const CONCERN_ATTAINMENT: f64 = 0.7;
const MIN_RECOMMENDATIONS: usize = 3;
const MAX_RECOMMENDATIONS: usize = 5;
const OUTLOOK_MONTHS: f64 = 3.0;
const GRADE_A_SCORE: f64 = 90.0;
const DAYS_PER_MONTH: f64 = 30.44;

const GENERAL_RECOMMENDATIONS: [&str; 3] = [
    "Keep monthly satellite monitoring in place and investigate any month-on-month score drop.",
    "Work with neighbouring communities on fire prevention and forest patrols.",
    "Review grazing and fuelwood collection pressure along the forest edge.",
];

fn factor_recommendation(factor: Factor) -> &'static str {
    match factor {
        Factor::Ndvi => {
            "Target canopy gaps flagged in the NDVI imagery with assisted natural regeneration."
        }
        Factor::TreeDensity => {
            "Expand enrichment planting with indigenous species to lift stocking toward 400-800 trees per hectare."
        }
        Factor::Rainfall => {
            "Protect catchments and riparian strips so the forest retains the rainfall it receives."
        }
        Factor::SoilMoisture => {
            "Use mulching and soil conservation structures to hold moisture in the 40-60% band."
        }
        Factor::Temperature => {
            "Maintain continuous canopy cover to buffer local temperature extremes."
        }
    }
}

/// Offline backend that writes a deterministic narrative from the request data.
pub struct TemplateNarrator;

impl TemplateNarrator {
    pub fn new() -> Self {
        Self
    }

    fn analysis(&self, request: &AnalysisRequest) -> String {
        let breakdown = ScoreBreakdown::from_metrics(&request.metrics);
        let status = status_label_for(request.score);
        let mut text = String::new();

        let _ = writeln!(text, "1. What the score means");
        let _ = writeln!(
            text,
            "{} scores {}/100 (Grade {}), which falls in the \"{}\" band.",
            request.forest_name, request.score, request.grade, status.label
        );
        let _ = writeln!(text);

        let strengths: Vec<_> = Factor::ALL
            .into_iter()
            .filter(|f| breakdown.attainment(*f) >= STRENGTH_ATTAINMENT)
            .collect();
        let mut concerns: Vec<_> = Factor::ALL
            .into_iter()
            .filter(|f| breakdown.attainment(*f) < CONCERN_ATTAINMENT)
            .collect();
        concerns.sort_by(|a, b| breakdown.attainment(*a).total_cmp(&breakdown.attainment(*b)));

        let _ = writeln!(text, "2. Strengths and concerns");
        if strengths.is_empty() {
            let _ = writeln!(text, "Strengths: no factor is within 10% of its optimum.");
        } else {
            let _ = writeln!(text, "Strengths: {}.", describe(&strengths, request));
        }
        if concerns.is_empty() {
            let _ = writeln!(text, "Concerns: every factor is at least 70% of its optimum.");
        } else {
            let _ = writeln!(text, "Concerns: {}.", describe(&concerns, request));
        }
        let _ = writeln!(text);

        let _ = writeln!(text, "3. Trend");
        let projected = match (request.trends.first(), request.trends.last()) {
            (Some(first), Some(last)) if request.trends.len() >= 2 => {
                let change = overall_change(&request.trends);
                let months = (request.trends.len() - 1) as f64;
                let _ = writeln!(
                    text,
                    "Over {} observations the score moved from {} ({}) to {} ({}), a change of {} points; the latest month changed by {}.",
                    request.trends.len(),
                    first.score,
                    first.month,
                    last.score,
                    last.month,
                    format_change(change as f64),
                    format_change(trend_delta(&request.trends) as f64),
                );
                last.score as f64 + change as f64 / months * OUTLOOK_MONTHS
            }
            _ => {
                let _ = writeln!(text, "No trend history was supplied.");
                request.score as f64
            }
        };
        let _ = writeln!(text);

        let _ = writeln!(text, "4. Three-month outlook");
        let projected = projected.round().clamp(0.0, 100.0) as i64;
        let _ = writeln!(
            text,
            "If the current pace holds, the score should be around {projected}/100 in three months."
        );
        let _ = writeln!(text);

        let _ = writeln!(text, "5. Recommendations");
        let mut recommendations: Vec<&str> =
            concerns.iter().map(|f| factor_recommendation(*f)).collect();
        for general in GENERAL_RECOMMENDATIONS {
            if recommendations.len() >= MIN_RECOMMENDATIONS {
                break;
            }
            recommendations.push(general);
        }
        for (index, line) in recommendations.iter().take(MAX_RECOMMENDATIONS).enumerate() {
            let _ = writeln!(text, "- ({}) {}", index + 1, line);
        }
        text.trim_end().to_string()
    }

    fn restoration(&self, request: &RestorationRequest, delta: &RestorationDelta) -> String {
        let before = &request.before_data;
        let after = &request.after_data;
        let mut text = String::new();

        let _ = writeln!(text, "1. Overall assessment");
        let verdict = if delta.score > 0.0 {
            "improved"
        } else if delta.score < 0.0 {
            "declined"
        } else {
            "held steady"
        };
        let _ = writeln!(
            text,
            "The health score of {} {verdict} from {} to {} ({} points) between {} and {}.",
            request.forest_name,
            before.score,
            after.score,
            format_change(delta.score),
            before.date,
            after.date
        );
        let _ = writeln!(text);

        let relative = [
            ("NDVI", relative_change(delta.ndvi, before.ndvi)),
            ("tree density", relative_change(delta.tree_density, before.tree_density)),
            ("soil moisture", relative_change(delta.soil_moisture, before.soil_moisture)),
            ("rainfall", relative_change(delta.rainfall, before.rainfall)),
        ];
        let most = relative
            .iter()
            .copied()
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let least = relative
            .iter()
            .copied()
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let _ = writeln!(text, "2. Metric changes");
        if let (Some((most_name, most_pct)), Some((least_name, least_pct))) = (most, least) {
            let _ = writeln!(
                text,
                "Largest relative change: {most_name} ({}%). Smallest: {least_name} ({}%).",
                format_change(most_pct),
                format_change(least_pct)
            );
        }
        let _ = writeln!(text);

        let _ = writeln!(text, "3. Ecological significance");
        let significance = match most.map(|(name, _)| name) {
            Some("NDVI") => "Greener canopy points to recovering photosynthetic activity.",
            Some("tree density") => "Higher stocking means planted and regenerating trees are surviving.",
            Some("soil moisture") => "Wetter soils support seedling survival and reduce fire risk.",
            _ => "Rainfall changes are largely climatic and should be read alongside the other metrics.",
        };
        let _ = writeln!(text, "{significance}");
        let _ = writeln!(text);

        let _ = writeln!(text, "4. Recommendations");
        for (index, line) in GENERAL_RECOMMENDATIONS.iter().enumerate() {
            let _ = writeln!(text, "- ({}) {}", index + 1, line);
        }
        let _ = writeln!(text);

        let _ = writeln!(text, "5. Timeline to optimal health");
        let months = (after.date - before.date).num_days() as f64 / DAYS_PER_MONTH;
        if after.score >= GRADE_A_SCORE {
            let _ = writeln!(text, "The forest is already in the Grade A range.");
        } else if delta.score > 0.0 && months > 0.0 {
            let pace = delta.score / months;
            let remaining = ((GRADE_A_SCORE - after.score) / pace).ceil();
            let _ = writeln!(
                text,
                "At {:.1} points per month, Grade A (90) is about {remaining} months away.",
                pace
            );
        } else {
            let _ = writeln!(
                text,
                "No timeline can be estimated until the score starts improving."
            );
        }
        text.trim_end().to_string()
    }
}

impl Default for TemplateNarrator {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeBackend for TemplateNarrator {
    fn name(&self) -> &str {
        "template"
    }

    fn generate(&self, _prompt: &Prompt, context: NarrativeContext<'_>) -> Result<String, NarrativeError> {
        Ok(match context {
            NarrativeContext::Analysis(request) => self.analysis(request),
            NarrativeContext::Restoration { request, delta } => self.restoration(request, delta),
        })
    }
}

fn describe(factors: &[Factor], request: &AnalysisRequest) -> String {
    factors
        .iter()
        .map(|f| {
            format!(
                "{} {} (optimal {})",
                f.label(),
                f.reading(&request.metrics),
                f.optimal_range()
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn relative_change(delta: f64, before: f64) -> f64 {
    if before == 0.0 {
        0.0
    } else {
        delta / before.abs() * 100.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        forest::{ForestMetrics, ForestTrend},
        narrative::analysis_prompt,
        restoration::RestorationSnapshot,
        score::Grade,
    };

    fn trend(month: &str, score: i64) -> ForestTrend {
        ForestTrend {
            month: month.into(),
            score,
            ndvi: 0.5,
            rainfall: 90.0,
        }
    }

    fn arabuko() -> AnalysisRequest {
        AnalysisRequest {
            forest_name: "Arabuko Sokoke".into(),
            score: 56,
            grade: Grade::E,
            metrics: ForestMetrics::unchecked(0.58, 380.0, 95.0, 35.0, 26.0),
            trends: vec![trend("Jun", 54), trend("Jul", 55), trend("Nov", 59)],
        }
    }

    fn narrate(request: &AnalysisRequest) -> String {
        TemplateNarrator::new()
            .generate(&analysis_prompt(request), NarrativeContext::Analysis(request))
            .unwrap()
    }

    #[test]
    fn weak_factors_become_concerns_and_recommendations() {
        let text = narrate(&arabuko());
        assert!(text.contains("Arabuko Sokoke scores 56/100 (Grade E)"));
        assert!(text.contains("\"At Risk\""));
        assert!(text.contains("Concerns: Tree Density 380 (optimal 400-800)"));
        assert!(text.contains("enrichment planting"));
        assert!(text.contains("a change of +5.0 points"));
    }

    #[test]
    fn outlook_projects_average_pace() {
        // (59 - 54) / 2 months * 3 = 7.5 -> 66.5 -> 67
        let text = narrate(&arabuko());
        assert!(text.contains("around 67/100"), "{text}");
    }

    #[test]
    fn healthy_forest_gets_general_recommendations() {
        let request = AnalysisRequest {
            forest_name: "Aberdare Forest".into(),
            score: 93,
            grade: Grade::A,
            metrics: ForestMetrics::unchecked(0.82, 720.0, 195.0, 58.0, 18.0),
            trends: Vec::new(),
        };
        let text = narrate(&request);
        assert!(text.contains("every factor is at least 70%"));
        assert!(text.contains("No trend history was supplied."));
        assert!(text.contains("around 93/100"));
        assert_eq!(text.matches("- (").count(), MIN_RECOMMENDATIONS);
    }

    #[test]
    fn restoration_timeline_uses_monthly_pace() {
        let snapshot = |date: NaiveDate, score, density| RestorationSnapshot {
            date,
            score,
            ndvi: 0.6,
            tree_density: density,
            soil_moisture: 40.0,
            rainfall: 120.0,
        };
        let request = RestorationRequest {
            forest_name: "Mau Forest Complex".into(),
            before_data: snapshot(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 60.0, 400.0),
            after_data: snapshot(NaiveDate::from_ymd_opt(2024, 11, 26).unwrap(), 70.0, 500.0),
            restoration_details: None,
        };
        let delta = request.delta();
        let text = TemplateNarrator::new()
            .generate(
                &Prompt {
                    system: String::new(),
                    user: String::new(),
                },
                NarrativeContext::Restoration {
                    request: &request,
                    delta: &delta,
                },
            )
            .unwrap();
        assert!(text.contains("improved from 60 to 70 (+10.0 points)"));
        assert!(text.contains("Largest relative change: tree density (+25.0%)"));
        assert!(text.contains("Higher stocking"));
        // 330 days / 30.44 = 10.84 months -> 0.92 points/month -> 21.7 -> 22
        assert!(text.contains("about 22 months away"), "{text}");
    }
}
