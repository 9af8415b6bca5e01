use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use uuid::Uuid;

mod config;
mod db;
mod error;
mod insights;
mod models;
mod report;
mod scoring;
mod store;
mod telemetry;

use config::AppConfig;
use db::PgStore;
use models::ResponseSet;
use scoring::ScoringEngine;

#[derive(Parser)]
#[command(name = "vc-readiness")]
#[command(about = "VC readiness questionnaire scoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the default question bank
    Seed,
    /// Backfill historical completed scores from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Score a JSON object of question id to selected option value
    Score {
        #[arg(long)]
        responses: PathBuf,
        #[arg(long)]
        session: Option<String>,
        /// Persist the assessment and its results
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    /// Generate a markdown report for a stored assessment
    #[command(group(
        ArgGroup::new("target")
            .args(["assessment", "session"])
            .required(true)
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        assessment: Option<i32>,
        #[arg(long)]
        session: Option<String>,
        #[arg(long, requires = "stage")]
        industry: Option<String>,
        #[arg(long, requires = "industry")]
        stage: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.telemetry)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("failed to connect to Postgres")?;

    let outcome = run(cli.command, &config, &pool).await;
    pool.close().await;
    outcome
}

async fn run(command: Commands, config: &AppConfig, pool: &sqlx::PgPool) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool).await?;
            println!("Question bank seeded.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_scores_csv(pool, &csv, config.template_id).await?;
            println!("Inserted {inserted} historical scores from {}.", csv.display());
        }
        Commands::Score {
            responses,
            session,
            save,
        } => {
            let raw = std::fs::read_to_string(&responses)
                .with_context(|| format!("failed to read {}", responses.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", responses.display()))?;
            let responses = ResponseSet::from_json(&payload)?;
            if responses.is_empty() {
                warn!("no answered questions, every category will score 0");
            }

            let store = Arc::new(PgStore::new(pool.clone()));
            let engine = ScoringEngine::new(store.clone(), store);
            let result = engine.calculate_score(&responses, config.template_id).await?;

            println!("{}", serde_json::to_string_pretty(&result)?);

            if save {
                let session_id = session.unwrap_or_else(|| format!("session_{}", Uuid::new_v4()));
                let assessment_id =
                    db::save_assessment(pool, &session_id, config.template_id, &responses, &result)
                        .await?;
                info!(assessment_id, session_id = %session_id, "assessment saved");
                println!("Saved assessment {assessment_id} (session {session_id}).");
            }
        }
        Commands::Report {
            assessment,
            session,
            industry,
            stage,
            out,
        } => {
            let record = match (assessment, session.as_deref()) {
                (Some(id), _) => db::fetch_assessment(pool, id).await?,
                (None, Some(session_id)) => db::fetch_latest_for_session(pool, session_id).await?,
                (None, None) => None,
            }
            .context("assessment not found")?;

            let benchmark = match (industry.as_deref(), stage.as_deref()) {
                (Some(industry), Some(stage)) => {
                    Some(db::fetch_benchmark(pool, industry, stage).await)
                }
                _ => None,
            };

            let report = report::build_report(&record, benchmark.as_ref());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
