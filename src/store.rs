use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Question, ScoreCounts};

/// Read access to the active question bank.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Active questions of active categories, each carrying its category's
    /// name and weight, ordered by category then question order.
    async fn list_active_questions(&self) -> Result<Vec<Question>, StoreError>;
}

/// Read access to the scores of previously completed assessments.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn score_counts(&self, score: f64) -> Result<ScoreCounts, StoreError>;
}
