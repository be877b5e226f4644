use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use juamsitu::{
    alerts::{AlertMessage, MockSmsNotifier, Notifier, PhoneNumber},
    comparison::rank_forests,
    config::{AppConfig, NarrativeBackendKind},
    dataset::{Dataset, DatasetLoader},
    narrative::{AnalysisRequest, NarrativeService},
    report::{ReportBuilder, ReportWriter},
    store::ForestStore,
    telemetry,
    web::{self, AppState, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "JuaMsitu forest health service")]
struct Cli {
    /// Path to the service config YAML file
    #[arg(long, global = true, env = "JUAMSITU_CONFIG")]
    config: Option<PathBuf>,

    /// Forest dataset YAML (uses the built-in Kenyan forests when omitted)
    #[arg(long, global = true, env = "JUAMSITU_DATASET")]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "JUAMSITU_HOST")]
        host: Option<String>,
        #[arg(long, env = "JUAMSITU_PORT")]
        port: Option<u16>,
        #[arg(long, value_enum)]
        narrative: Option<NarrativeBackendKind>,
    },
    /// Print health scores
    Score {
        /// Only this forest
        #[arg(long)]
        forest: Option<String>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Rank forests by health score
    Compare,
    /// Write a text report and JSON summary for one forest
    Report {
        #[arg(long)]
        forest: String,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Include the narrative health analysis
        #[arg(long)]
        with_analysis: bool,
    },
    /// Send a health alert for one forest through the mock SMS channel
    Alert {
        #[arg(long)]
        forest: String,
        #[arg(long)]
        phone: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    telemetry::init(&config.logging.level)?;

    let dataset_path = cli.dataset.clone().or_else(|| config.dataset.path.clone());
    let store = load_store(dataset_path)?;

    match cli.command {
        Command::Serve {
            host,
            port,
            narrative,
        } => {
            let narrative =
                NarrativeService::from_kind(narrative.unwrap_or(config.narrative.backend));
            let notifier: Arc<dyn Notifier> = Arc::new(MockSmsNotifier::new());
            let state = Arc::new(AppState::new(Arc::new(store), narrative, notifier));
            let server = WebServerConfig {
                host: host.unwrap_or(config.server.host),
                port: port.unwrap_or(config.server.port),
            };
            web::run(server, state).await?;
        }
        Command::Score { forest, json } => {
            let forests: Vec<_> = match &forest {
                Some(id) => vec![find_forest(&store, id)?],
                None => store.iter().collect(),
            };
            if json {
                let results: Vec<_> = forests
                    .iter()
                    .map(|forest| {
                        serde_json::json!({
                            "id": forest.id,
                            "name": forest.name,
                            "health": forest.score(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for forest in forests {
                    let result = forest.score();
                    println!(
                        "{:<16} {:<32} {:>4}  {}  {}",
                        forest.id.as_str(),
                        forest.name,
                        result.score,
                        result.grade,
                        result.status().label
                    );
                }
            }
        }
        Command::Compare => {
            for ranked in rank_forests(store.iter()) {
                println!(
                    "#{} {:<32} {:>4} ({})  NDVI {:.2}  trend {:+}",
                    ranked.rank,
                    ranked.name,
                    ranked.score,
                    ranked.grade,
                    ranked.ndvi,
                    ranked.trend_delta
                );
            }
        }
        Command::Report {
            forest,
            output_dir,
            with_analysis,
        } => {
            let forest = find_forest(&store, &forest)?;
            let mut builder = ReportBuilder::new(forest, Utc::now().date_naive());
            if with_analysis {
                let narrative = NarrativeService::from_kind(config.narrative.backend);
                let response = narrative
                    .analyze(&AnalysisRequest::for_forest(forest))
                    .context("generating health analysis")?;
                builder = builder.with_analysis(response.analysis);
            }
            let report = builder.build();
            let writer = ReportWriter::new(output_dir.unwrap_or(config.reports.output_dir));
            let written = writer.write(&report)?;
            println!(
                "Report for '{}' written to {} ({} page(s))",
                forest.name,
                written.text.display(),
                report.page_count()
            );
        }
        Command::Alert { forest, phone } => {
            let forest = find_forest(&store, &forest)?;
            let result = forest.score();
            let to = PhoneNumber::parse(&phone)?;
            let message = AlertMessage::compose(&forest.name, result.score, result.grade);
            let receipt = MockSmsNotifier::new().send(&to, &message)?;
            println!("[{}] {} -> {}", receipt.channel, receipt.to, receipt.text);
        }
    }

    Ok(())
}

fn load_store(path: Option<PathBuf>) -> Result<ForestStore> {
    let dataset = match path {
        Some(path) => DatasetLoader::new(".")
            .load(&path)
            .with_context(|| format!("loading dataset {}", path.display()))?,
        None => Dataset::seed().context("loading built-in dataset")?,
    };
    let store = dataset.build_store()?;
    tracing::info!(dataset = %dataset.name, forests = store.len(), "forest store ready");
    Ok(store)
}

fn find_forest<'a>(store: &'a ForestStore, id: &str) -> Result<&'a juamsitu::Forest> {
    store
        .get(id)
        .ok_or_else(|| anyhow!("unknown forest '{id}'"))
}
