use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ScoringError;
use crate::insights;
use crate::models::{CategoryId, CategoryScore, Question, ResponseSet, ScoreResult};
use crate::store::{HistoryStore, QuestionStore};

pub const DEFAULT_PERCENTILE: u8 = 50;

/// Scores questionnaire responses against the active question bank and the
/// history of completed assessments.
pub struct ScoringEngine<Q, H> {
    questions: Arc<Q>,
    history: Arc<H>,
}

impl<Q, H> ScoringEngine<Q, H>
where
    Q: QuestionStore,
    H: HistoryStore,
{
    pub fn new(questions: Arc<Q>, history: Arc<H>) -> Self {
        Self { questions, history }
    }

    /// Computes the weighted score, percentile rank and insights.
    ///
    /// `template_id` does not narrow the question set: every active question
    /// is scored whatever template the assessment was started from.
    pub async fn calculate_score(
        &self,
        responses: &ResponseSet,
        template_id: i32,
    ) -> Result<ScoreResult, ScoringError> {
        let questions = self.questions.list_active_questions().await?;
        debug!(
            template_id,
            questions = questions.len(),
            answered = responses.len(),
            "scoring assessment"
        );

        let totals = score_responses(&questions, responses)?;
        let percentile_rank = self.percentile_rank(totals.total_score).await;
        let insights = insights::generate(&totals.category_scores);

        Ok(ScoreResult {
            total_score: totals.total_score,
            category_scores: totals.category_scores,
            percentile_rank,
            strengths: insights.strengths,
            weaknesses: insights.weaknesses,
            recommendations: insights.recommendations,
        })
    }

    async fn percentile_rank(&self, total_score: f64) -> u8 {
        match self.history.score_counts(total_score).await {
            Ok(counts) => percentile(counts.lower, counts.total),
            Err(err) => {
                warn!(error = %err, "percentile lookup failed, using default");
                DEFAULT_PERCENTILE
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTotals {
    pub total_score: f64,
    pub category_scores: BTreeMap<CategoryId, CategoryScore>,
}

struct CategoryTally {
    name: String,
    weight: i32,
    score: i64,
    max_score: i64,
}

/// Folds responses into per-category scores and the weighted total.
pub fn score_responses(
    questions: &[Question],
    responses: &ResponseSet,
) -> Result<ScoreTotals, ScoringError> {
    let mut tallies: BTreeMap<CategoryId, CategoryTally> = BTreeMap::new();

    for question in questions {
        let tally = tallies
            .entry(question.category_id)
            .or_insert_with(|| CategoryTally {
                name: question.category_name.clone(),
                weight: question.category_weight,
                score: 0,
                max_score: 0,
            });

        let weight = i64::from(question.weight);
        if let Some(value) = responses.get(question.id) {
            tally.score += i64::from(question.points_for(value)) * weight;
        }
        tally.max_score += i64::from(question.max_points()) * weight;
    }

    if tallies.is_empty() {
        return Err(ScoringError::MetadataUnavailable(
            "no active categories with questions".to_string(),
        ));
    }

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    let mut category_scores = BTreeMap::new();

    for (category_id, tally) in tallies {
        let raw_percentage = if tally.max_score > 0 {
            tally.score as f64 / tally.max_score as f64 * 100.0
        } else {
            0.0
        };

        // A category nothing can be scored in carries no weight. The blend
        // uses the unrounded percentage.
        if tally.max_score > 0 {
            weighted_sum += raw_percentage / 100.0 * f64::from(tally.weight);
            weight_sum += f64::from(tally.weight);
        }

        category_scores.insert(
            category_id,
            CategoryScore {
                score: tally.score,
                max_score: tally.max_score,
                percentage: round2(raw_percentage),
                category_name: tally.name,
            },
        );
    }

    let total_score = if weight_sum > 0.0 {
        round2(weighted_sum / weight_sum * 100.0)
    } else {
        0.0
    };

    Ok(ScoreTotals {
        total_score,
        category_scores,
    })
}

/// Share of historical scores strictly below the current one, clamped to
/// 1..=99. Without history the rank is 50.
pub fn percentile(lower: i64, total: i64) -> u8 {
    if total <= 0 {
        return DEFAULT_PERCENTILE;
    }
    let rank = (lower.max(0) as f64 / total as f64 * 100.0).round();
    rank.clamp(1.0, 99.0) as u8
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
