//! Printable forest health reports.
//!
//! A report is laid out as fixed-width text pages: a cover band on the first
//! page, the score card, current metrics, the trend history and an optional
//! narrative analysis, with a dated, page-numbered footer on every page.

mod layout;

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::{
    forest::{Forest, ForestId, ForestMetrics, ForestTrend},
    score::{Factor, Grade},
};

pub use layout::{format_thousands, spread, wrap_text};

pub const PAGE_WIDTH: usize = 80;
pub const PAGE_LINES: usize = 60;
const FOOTER_LINES: usize = 2;
const BODY_LINES: usize = PAGE_LINES - FOOTER_LINES;
const MARGIN: &str = "  ";
const INDENT: &str = "    ";
/// Start the analysis on a fresh page when less room than this is left.
const ANALYSIS_MIN_ROOM: usize = 10;

const TITLE: &str = "JuaMsitu";
const TAGLINE: &str = "Know Your Forest. Protect Your Future.";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub forest_id: ForestId,
    pub forest_name: String,
    pub location: String,
    pub area_hectares: f64,
    pub score: i64,
    pub grade: Grade,
    pub status: String,
    pub metrics: ForestMetrics,
    pub trends: Vec<ForestTrend>,
    pub analysis: Option<String>,
    pub last_updated: NaiveDate,
    pub generated_on: NaiveDate,
    pub page_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub body: Vec<String>,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub pages: Vec<Page>,
    pub summary: ReportSummary,
}

impl Report {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages separated by form feeds, each padded to full height.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (index, page) in self.pages.iter().enumerate() {
            if index > 0 {
                out.push('\u{c}');
            }
            for line in &page.body {
                out.push_str(line);
                out.push('\n');
            }
            for _ in page.body.len()..BODY_LINES {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(&page.footer);
            out.push('\n');
        }
        out
    }

    /// `Kakamega_Forest_Health_Report_2025-11-21`
    pub fn file_stem(&self) -> String {
        let name = self
            .summary
            .forest_name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        format!("{name}_Health_Report_{}", self.summary.generated_on.format("%Y-%m-%d"))
    }
}

pub struct ReportBuilder<'a> {
    forest: &'a Forest,
    analysis: Option<String>,
    generated_on: NaiveDate,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(forest: &'a Forest, generated_on: NaiveDate) -> Self {
        Self {
            forest,
            analysis: None,
            generated_on,
        }
    }

    pub fn with_analysis(mut self, analysis: impl Into<String>) -> Self {
        let analysis = analysis.into();
        if !analysis.trim().is_empty() {
            self.analysis = Some(analysis);
        }
        self
    }

    pub fn build(self) -> Report {
        let forest = self.forest;
        let result = forest.score();
        let status = forest.status();
        let mut pages = PageCursor::default();

        let band = "=".repeat(PAGE_WIDTH);
        pages.push(band.clone());
        pages.push(format!("{MARGIN}{TITLE}"));
        pages.push(format!("{MARGIN}{TAGLINE}"));
        pages.push(band);
        pages.push(String::new());

        pages.push(format!("{MARGIN}{}", forest.name));
        pages.push(format!(
            "{MARGIN}Location: {} | Area: {} hectares",
            forest.location,
            format_thousands(forest.area_hectares)
        ));
        pages.push(String::new());

        let rule = format!("{MARGIN}+{}+", "-".repeat(PAGE_WIDTH - 6));
        pages.push(rule.clone());
        pages.push(format!(
            "{MARGIN}|{}|",
            spread(
                "  Forest Health Score",
                &format!("{}/100  ", result.score),
                PAGE_WIDTH - 6
            )
        ));
        pages.push(format!(
            "{MARGIN}|{}|",
            spread(
                &format!("  {}", status.label),
                &format!("Grade: {}  ", result.grade),
                PAGE_WIDTH - 6
            )
        ));
        pages.push(rule);
        pages.push(String::new());

        pages.push(format!("{MARGIN}Current Metrics"));
        let m = &forest.current_metrics;
        let metric_lines = [
            format!("NDVI: {:.2} (Optimal: {})", m.ndvi, Factor::Ndvi.optimal_range()),
            format!(
                "Tree Density: {} trees/hectare (Optimal: {})",
                m.tree_density,
                Factor::TreeDensity.optimal_range()
            ),
            format!(
                "Rainfall: {}mm/month (Optimal: {})",
                m.rainfall,
                Factor::Rainfall.optimal_range()
            ),
            format!(
                "Soil Moisture: {}% (Optimal: {})",
                m.soil_moisture,
                Factor::SoilMoisture.optimal_range()
            ),
            format!(
                "Temperature: {}°C (Optimal: {})",
                m.temperature,
                Factor::Temperature.optimal_range()
            ),
        ];
        for line in metric_lines {
            pages.push(format!("{INDENT}{line}"));
        }
        pages.push(String::new());

        pages.push(format!("{MARGIN}{}-Month Health Trend", forest.trends.len()));
        if forest.trends.is_empty() {
            pages.push(format!("{INDENT}No trend history available."));
        }
        for trend in &forest.trends {
            pages.push(format!(
                "{INDENT}{}: Score {} | NDVI {:.2} | Rainfall {}mm",
                trend.month, trend.score, trend.ndvi, trend.rainfall
            ));
        }

        if let Some(analysis) = &self.analysis {
            pages.push(String::new());
            if pages.remaining() < ANALYSIS_MIN_ROOM {
                pages.break_page();
            }
            pages.push(format!("{MARGIN}AI Health Analysis"));
            for line in wrap_text(analysis, PAGE_WIDTH - MARGIN.len() * 2) {
                pages.push(format!("{MARGIN}{line}"));
            }
        }

        let bodies = pages.finish();
        let total = bodies.len();
        let stamp = format!(
            "Generated: {} | Last Updated: {}",
            self.generated_on.format("%Y-%m-%d"),
            forest.last_updated.format("%Y-%m-%d")
        );
        let pages: Vec<Page> = bodies
            .into_iter()
            .enumerate()
            .map(|(index, body)| Page {
                body,
                footer: spread(
                    &format!("{MARGIN}{stamp}"),
                    &format!("Page {} of {total}", index + 1),
                    PAGE_WIDTH,
                ),
            })
            .collect();

        Report {
            summary: ReportSummary {
                forest_id: forest.id.clone(),
                forest_name: forest.name.clone(),
                location: forest.location.clone(),
                area_hectares: forest.area_hectares,
                score: result.score,
                grade: result.grade,
                status: status.label.to_string(),
                metrics: forest.current_metrics,
                trends: forest.trends.clone(),
                analysis: self.analysis,
                last_updated: forest.last_updated,
                generated_on: self.generated_on,
                page_count: pages.len(),
            },
            pages,
        }
    }
}

#[derive(Default)]
struct PageCursor {
    done: Vec<Vec<String>>,
    current: Vec<String>,
}

impl PageCursor {
    fn push(&mut self, line: String) {
        if self.current.len() >= BODY_LINES {
            self.break_page();
        }
        self.current.push(line);
    }

    fn remaining(&self) -> usize {
        BODY_LINES.saturating_sub(self.current.len())
    }

    fn break_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
    }

    fn finish(mut self) -> Vec<Vec<String>> {
        if !self.current.is_empty() || self.done.is_empty() {
            self.done.push(self.current);
        }
        self.done
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub text: PathBuf,
    pub summary: PathBuf,
}

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `<stem>.txt` and `<stem>.json`, replacing earlier copies.
    pub fn write(&self, report: &Report) -> Result<WrittenReport, ReportError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ReportError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let stem = report.file_stem();
        let text = self.output_dir.join(format!("{stem}.txt"));
        fs::write(&text, report.render()).map_err(|source| ReportError::Io {
            path: text.clone(),
            source,
        })?;

        let summary = self.output_dir.join(format!("{stem}.json"));
        let json = serde_json::to_string_pretty(&report.summary)?;
        fs::write(&summary, json).map_err(|source| ReportError::Io {
            path: summary.clone(),
            source,
        })?;

        tracing::info!(
            forest = %report.summary.forest_id,
            pages = report.page_count(),
            path = %text.display(),
            "report written"
        );
        Ok(WrittenReport { text, summary })
    }
}
