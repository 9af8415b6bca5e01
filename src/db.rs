use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Row};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::{
    AssessmentRecord, Benchmark, CategoryId, CategoryScore, Question, QuestionOption, ResponseSet,
    ScoreCounts, ScoreResult,
};
use crate::scoring::DEFAULT_PERCENTILE;
use crate::store::{HistoryStore, QuestionStore};

const SEED_BANK: &str = include_str!("../seed/question_bank.json");

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SeedBank {
    pub template: SeedTemplate,
    pub categories: Vec<SeedCategory>,
    pub questions: Vec<SeedQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct SeedTemplate {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub description: String,
    pub weight: i32,
    pub order_index: i32,
}

#[derive(Debug, Deserialize)]
pub struct SeedQuestion {
    pub category: String,
    pub text: String,
    pub description: String,
    pub weight: i32,
    pub order_index: i32,
    pub options: Vec<QuestionOption>,
}

pub fn seed_bank() -> anyhow::Result<SeedBank> {
    serde_json::from_str(SEED_BANK).context("bundled question bank is malformed")
}

/// Inserts or refreshes the default template, categories and questions.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let bank = seed_bank()?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO vc_readiness.assessment_templates (name, version, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE
        SET version = EXCLUDED.version, description = EXCLUDED.description
        "#,
    )
    .bind(&bank.template.name)
    .bind(&bank.template.version)
    .bind(&bank.template.description)
    .execute(&mut *tx)
    .await?;

    let mut category_ids: HashMap<String, i32> = HashMap::new();
    for category in &bank.categories {
        let id: i32 = sqlx::query(
            r#"
            INSERT INTO vc_readiness.categories (name, description, weight, order_index)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET description = EXCLUDED.description,
                weight = EXCLUDED.weight,
                order_index = EXCLUDED.order_index
            RETURNING id
            "#,
        )
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.weight)
        .bind(category.order_index)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        category_ids.insert(category.name.clone(), id);
    }

    for question in &bank.questions {
        let category_id = category_ids
            .get(&question.category)
            .with_context(|| format!("question references unknown category {}", question.category))?;

        sqlx::query(
            r#"
            INSERT INTO vc_readiness.questions
            (category_id, text, description, weight, options, order_index)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (category_id, order_index) DO UPDATE
            SET text = EXCLUDED.text,
                description = EXCLUDED.description,
                weight = EXCLUDED.weight,
                options = EXCLUDED.options,
                updated_at = now()
            "#,
        )
        .bind(category_id)
        .bind(&question.text)
        .bind(&question.description)
        .bind(question.weight)
        .bind(Json(&question.options))
        .bind(question.order_index)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(
        categories = bank.categories.len(),
        questions = bank.questions.len(),
        "question bank seeded"
    );
    Ok(())
}

/// Postgres-backed question bank and assessment history.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: i32,
    category_id: i32,
    category_name: String,
    category_weight: i32,
    weight: i32,
    options: Json<Vec<QuestionOption>>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            category_name: row.category_name,
            category_weight: row.category_weight,
            weight: row.weight,
            options: row.options.0,
        }
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn list_active_questions(&self) -> Result<Vec<Question>, StoreError> {
        let rows: Vec<QuestionRow> = sqlx::query_as(
            "SELECT q.id, q.category_id, c.name AS category_name, c.weight AS category_weight, \
             q.weight, q.options \
             FROM vc_readiness.questions q \
             JOIN vc_readiness.categories c ON c.id = q.category_id \
             WHERE q.is_active AND c.is_active \
             ORDER BY c.order_index, q.order_index",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Question::from).collect())
    }
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn score_counts(&self, score: f64) -> Result<ScoreCounts, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_count, \
             COUNT(*) FILTER (WHERE total_score < $1) AS lower_count \
             FROM vc_readiness.assessments \
             WHERE total_score IS NOT NULL AND is_completed",
        )
        .bind(score)
        .fetch_one(&self.pool)
        .await?;

        Ok(ScoreCounts {
            total: row.try_get("total_count")?,
            lower: row.try_get("lower_count")?,
        })
    }
}

/// Persists a completed assessment and its insights in one transaction.
pub async fn save_assessment(
    pool: &PgPool,
    session_id: &str,
    template_id: i32,
    responses: &ResponseSet,
    result: &ScoreResult,
) -> anyhow::Result<i32> {
    let mut tx = pool.begin().await?;

    let assessment_id: i32 = sqlx::query(
        r#"
        INSERT INTO vc_readiness.assessments
        (template_id, session_id, responses, total_score, category_scores, is_completed, completed_at)
        VALUES ($1, $2, $3, $4, $5, true, now())
        RETURNING id
        "#,
    )
    .bind(template_id)
    .bind(session_id)
    .bind(Json(responses))
    .bind(result.total_score)
    .bind(Json(&result.category_scores))
    .fetch_one(&mut *tx)
    .await?
    .get("id");

    sqlx::query(
        r#"
        INSERT INTO vc_readiness.assessment_results
        (assessment_id, strengths, weaknesses, recommendations, percentile_rank)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(assessment_id)
    .bind(Json(&result.strengths))
    .bind(Json(&result.weaknesses))
    .bind(Json(&result.recommendations))
    .bind(i16::from(result.percentile_rank))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(assessment_id)
}

#[derive(FromRow)]
struct AssessmentRow {
    id: i32,
    session_id: String,
    template_id: i32,
    responses: Json<ResponseSet>,
    total_score: Option<f64>,
    category_scores: Option<Json<BTreeMap<CategoryId, CategoryScore>>>,
    completed_at: Option<DateTime<Utc>>,
    strengths: Option<Json<Vec<String>>>,
    weaknesses: Option<Json<Vec<String>>>,
    recommendations: Option<Json<Vec<String>>>,
    percentile_rank: Option<i16>,
}

impl From<AssessmentRow> for AssessmentRecord {
    fn from(row: AssessmentRow) -> Self {
        let percentile_rank = row
            .percentile_rank
            .and_then(|rank| u8::try_from(rank).ok())
            .unwrap_or(DEFAULT_PERCENTILE);

        Self {
            id: row.id,
            session_id: row.session_id,
            template_id: row.template_id,
            responses: row.responses.0,
            completed_at: row.completed_at,
            result: ScoreResult {
                total_score: row.total_score.unwrap_or(0.0),
                category_scores: row.category_scores.map(|json| json.0).unwrap_or_default(),
                percentile_rank,
                strengths: row.strengths.map(|json| json.0).unwrap_or_default(),
                weaknesses: row.weaknesses.map(|json| json.0).unwrap_or_default(),
                recommendations: row.recommendations.map(|json| json.0).unwrap_or_default(),
            },
        }
    }
}

const ASSESSMENT_SELECT: &str = "SELECT a.id, a.session_id, a.template_id, a.responses, \
     a.total_score, a.category_scores, a.completed_at, \
     r.strengths, r.weaknesses, r.recommendations, r.percentile_rank \
     FROM vc_readiness.assessments a \
     LEFT JOIN vc_readiness.assessment_results r ON r.assessment_id = a.id";

pub async fn fetch_assessment(pool: &PgPool, id: i32) -> anyhow::Result<Option<AssessmentRecord>> {
    let query = format!("{ASSESSMENT_SELECT} WHERE a.id = $1");
    let row: Option<AssessmentRow> = sqlx::query_as(&query).bind(id).fetch_optional(pool).await?;
    Ok(row.map(AssessmentRecord::from))
}

pub async fn fetch_latest_for_session(
    pool: &PgPool,
    session_id: &str,
) -> anyhow::Result<Option<AssessmentRecord>> {
    let query = format!(
        "{ASSESSMENT_SELECT} WHERE a.session_id = $1 ORDER BY a.created_at DESC LIMIT 1"
    );
    let row: Option<AssessmentRow> = sqlx::query_as(&query)
        .bind(session_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(AssessmentRecord::from))
}

#[derive(Debug, Deserialize)]
pub struct HistoricalScoreRow {
    pub session_id: Option<String>,
    pub total_score: f64,
    pub completed_at: DateTime<Utc>,
    pub source_key: Option<String>,
}

impl HistoricalScoreRow {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.total_score),
            "total_score {} is outside 0-100",
            self.total_score
        );
        Ok(())
    }

    /// Dedupe key for the row. Rows without an explicit `source_key` get one
    /// derived from their session, completion time and score, so importing
    /// the same file twice inserts nothing the second time.
    fn import_key(&self) -> String {
        match &self.source_key {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => format!(
                "import:{}:{}:{}",
                self.session_id.as_deref().unwrap_or("-"),
                self.completed_at.to_rfc3339(),
                self.total_score
            ),
        }
    }
}

/// Backfills completed scores from a CSV export. Rows already imported
/// (matched by `source_key` or the derived import key) and rows whose
/// session already has an assessment are skipped.
pub async fn import_scores_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    template_id: i32,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<HistoricalScoreRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV record {}", line + 1))?;
        row.validate()
            .with_context(|| format!("invalid CSV record {}", line + 1))?;

        let source_key = row.import_key();
        let session_id = row
            .session_id
            .clone()
            .unwrap_or_else(|| format!("import_{source_key}"));

        let result = sqlx::query(
            r#"
            INSERT INTO vc_readiness.assessments
            (template_id, session_id, source_key, total_score, is_completed, completed_at)
            SELECT $1, $2, $3, $4, true, $5
            WHERE NOT EXISTS (
                SELECT 1 FROM vc_readiness.assessments WHERE session_id = $2
            )
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(template_id)
        .bind(&session_id)
        .bind(&source_key)
        .bind(row.total_score)
        .bind(row.completed_at)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[derive(FromRow)]
struct BenchmarkRow {
    industry: String,
    stage: String,
    category_averages: Json<BTreeMap<String, f64>>,
    percentiles: Json<BTreeMap<String, f64>>,
    sample_size: i32,
}

/// Newest benchmark for an industry and stage, falling back to the built-in
/// defaults when none is stored or the lookup fails.
pub async fn fetch_benchmark(pool: &PgPool, industry: &str, stage: &str) -> Benchmark {
    let row: Result<Option<BenchmarkRow>, sqlx::Error> = sqlx::query_as(
        "SELECT industry, stage, category_averages, percentiles, sample_size \
         FROM vc_readiness.benchmarks \
         WHERE industry = $1 AND stage = $2 \
         ORDER BY updated_at DESC LIMIT 1",
    )
    .bind(industry)
    .bind(stage)
    .fetch_optional(pool)
    .await;

    match row {
        Ok(Some(row)) => Benchmark {
            industry: row.industry,
            stage: row.stage,
            category_averages: row.category_averages.0,
            percentiles: row.percentiles.0,
            sample_size: row.sample_size,
        },
        Ok(None) => Benchmark::default_for(industry, stage),
        Err(err) => {
            warn!(error = %err, industry, stage, "benchmark lookup failed, using defaults");
            Benchmark::default_for(industry, stage)
        }
    }
}
