pub mod alerts;
pub mod comparison;
pub mod config;
pub mod dataset;
pub mod forest;
pub mod narrative;
pub mod report;
pub mod restoration;
pub mod score;
pub mod store;
pub mod telemetry;
pub mod web;

pub use config::AppConfig;
pub use dataset::{Dataset, DatasetLoader};
pub use forest::{Forest, ForestId, ForestMetrics, ForestTrend};
pub use score::{compute_score, grade_for, status_label_for, Grade, ScoreResult, StatusColor};
pub use store::ForestStore;
