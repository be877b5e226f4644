//! Narrative analysis of forest health and restoration impact.
//!
//! A [`NarrativeService`] builds the prompt for a request and hands it to a
//! [`NarrativeBackend`]. Backends that talk to a language model use the prompt;
//! the offline [`TemplateNarrator`] writes its text from the request data.

mod prompt;
mod template;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::NarrativeBackendKind,
    forest::{Forest, ForestMetrics, ForestTrend},
    restoration::{RestorationDelta, RestorationSnapshot},
    score::Grade,
};

pub use prompt::{analysis_prompt, restoration_prompt, Prompt};
pub use template::TemplateNarrator;

pub const DEFAULT_RESTORATION_DETAILS: &str =
    "Reforestation, soil conservation, and water management initiatives";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NarrativeError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("AI usage limit reached. Please add credits to continue.")]
    QuotaExceeded,
    #[error("narrative backend is not configured")]
    NotConfigured,
    #[error("narrative backend error: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub forest_name: String,
    pub score: i64,
    pub grade: Grade,
    pub metrics: ForestMetrics,
    #[serde(default)]
    pub trends: Vec<ForestTrend>,
}

impl AnalysisRequest {
    /// Request for a stored forest, scored from its current metrics.
    pub fn for_forest(forest: &Forest) -> Self {
        let result = forest.score();
        Self {
            forest_name: forest.name.clone(),
            score: result.score,
            grade: result.grade,
            metrics: forest.current_metrics,
            trends: forest.trends.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationRequest {
    pub forest_name: String,
    pub before_data: RestorationSnapshot,
    pub after_data: RestorationSnapshot,
    #[serde(default)]
    pub restoration_details: Option<String>,
}

impl RestorationRequest {
    pub fn delta(&self) -> RestorationDelta {
        RestorationDelta::between(&self.before_data, &self.after_data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub analysis: String,
    pub forest_name: String,
    pub score: i64,
    pub grade: Grade,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationResponse {
    pub comparison: String,
    pub improvements: RestorationDelta,
    pub forest_name: String,
    pub timestamp: DateTime<Utc>,
}

/// What a backend is being asked to narrate.
#[derive(Debug, Clone, Copy)]
pub enum NarrativeContext<'a> {
    Analysis(&'a AnalysisRequest),
    Restoration {
        request: &'a RestorationRequest,
        delta: &'a RestorationDelta,
    },
}

pub trait NarrativeBackend: Send + Sync {
    fn name(&self) -> &str;
    fn generate(
        &self,
        prompt: &Prompt,
        context: NarrativeContext<'_>,
    ) -> Result<String, NarrativeError>;
}

/// Backend used when narrative generation is switched off.
pub struct DisabledNarrator;

impl NarrativeBackend for DisabledNarrator {
    fn name(&self) -> &str {
        "disabled"
    }

    fn generate(&self, _prompt: &Prompt, _context: NarrativeContext<'_>) -> Result<String, NarrativeError> {
        Err(NarrativeError::NotConfigured)
    }
}

#[derive(Clone)]
pub struct NarrativeService {
    backend: Arc<dyn NarrativeBackend>,
}

impl NarrativeService {
    pub fn new(backend: impl NarrativeBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_kind(kind: NarrativeBackendKind) -> Self {
        match kind {
            NarrativeBackendKind::Template => Self::new(TemplateNarrator::new()),
            NarrativeBackendKind::Disabled => Self::new(DisabledNarrator),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, NarrativeError> {
        tracing::info!(forest = %request.forest_name, score = request.score, "analyzing forest health");
        let prompt = analysis_prompt(request);
        tracing::debug!(backend = self.backend.name(), prompt = %prompt.user, "analysis prompt");
        let analysis = self
            .backend
            .generate(&prompt, NarrativeContext::Analysis(request))
            .inspect_err(|err| tracing::error!(forest = %request.forest_name, %err, "analysis failed"))?;
        Ok(AnalysisResponse {
            analysis,
            forest_name: request.forest_name.clone(),
            score: request.score,
            grade: request.grade,
            timestamp: Utc::now(),
        })
    }

    pub fn compare_restoration(
        &self,
        request: &RestorationRequest,
    ) -> Result<RestorationResponse, NarrativeError> {
        tracing::info!(forest = %request.forest_name, "comparing restoration impact");
        let delta = request.delta();
        let prompt = restoration_prompt(request, &delta);
        tracing::debug!(backend = self.backend.name(), prompt = %prompt.user, "restoration prompt");
        let comparison = self
            .backend
            .generate(
                &prompt,
                NarrativeContext::Restoration {
                    request,
                    delta: &delta,
                },
            )
            .inspect_err(|err| tracing::error!(forest = %request.forest_name, %err, "restoration comparison failed"))?;
        Ok(RestorationResponse {
            comparison,
            improvements: delta,
            forest_name: request.forest_name.clone(),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;

    struct Recording {
        prompts: Mutex<Vec<Prompt>>,
        outcome: Result<String, NarrativeError>,
    }

    impl NarrativeBackend for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn generate(&self, prompt: &Prompt, _context: NarrativeContext<'_>) -> Result<String, NarrativeError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.outcome.clone()
        }
    }

    fn analysis_request() -> AnalysisRequest {
        AnalysisRequest {
            forest_name: "Aberdare Forest".into(),
            score: 93,
            grade: Grade::A,
            metrics: ForestMetrics::unchecked(0.82, 720.0, 195.0, 58.0, 18.0),
            trends: Vec::new(),
        }
    }

    #[test]
    fn analysis_response_echoes_request_fields() {
        let service = NarrativeService::new(Recording {
            prompts: Mutex::new(Vec::new()),
            outcome: Ok("looks healthy".into()),
        });
        let response = service.analyze(&analysis_request()).unwrap();
        assert_eq!(response.analysis, "looks healthy");
        assert_eq!(response.forest_name, "Aberdare Forest");
        assert_eq!(response.score, 93);
        assert_eq!(response.grade, Grade::A);
    }

    #[test]
    fn backend_errors_propagate_unchanged() {
        for err in [NarrativeError::RateLimited, NarrativeError::QuotaExceeded] {
            let service = NarrativeService::new(Recording {
                prompts: Mutex::new(Vec::new()),
                outcome: Err(err.clone()),
            });
            assert_eq!(service.analyze(&analysis_request()).unwrap_err(), err);
        }
    }

    #[test]
    fn restoration_response_carries_the_delta() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let snapshot = |score| RestorationSnapshot {
            date,
            score,
            ndvi: 0.5,
            tree_density: 400.0,
            soil_moisture: 40.0,
            rainfall: 100.0,
        };
        let request = RestorationRequest {
            forest_name: "Arabuko Sokoke".into(),
            before_data: snapshot(46.0),
            after_data: snapshot(56.0),
            restoration_details: None,
        };
        let service = NarrativeService::from_kind(NarrativeBackendKind::Template);
        let response = service.compare_restoration(&request).unwrap();
        assert_eq!(response.improvements.score, 10.0);
        assert_eq!(response.improvements.ndvi, 0.0);
        assert!(!response.comparison.is_empty());
    }

    #[test]
    fn disabled_backend_reports_not_configured() {
        let service = NarrativeService::from_kind(NarrativeBackendKind::Disabled);
        assert_eq!(service.backend_name(), "disabled");
        assert_eq!(
            service.analyze(&analysis_request()).unwrap_err(),
            NarrativeError::NotConfigured
        );
    }

    #[test]
    fn requests_deserialize_from_dashboard_json() {
        let json = serde_json::json!({
            "forestName": "Kakamega Forest",
            "score": 86,
            "grade": "B",
            "metrics": {
                "ndvi": 0.78, "treeDensity": 650, "rainfall": 180,
                "soilMoisture": 52, "temperature": 21
            }
        });
        let request: AnalysisRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.grade, Grade::B);
        assert!(request.trends.is_empty());
    }
}
