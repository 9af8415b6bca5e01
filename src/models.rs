use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ScoringError;

pub type QuestionId = i32;
pub type CategoryId = i32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub value: i64,
    #[serde(alias = "text")]
    pub label: String,
    pub points: i32,
}

/// An active question together with the name and weight of its category.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: QuestionId,
    pub category_id: CategoryId,
    pub category_name: String,
    pub category_weight: i32,
    pub weight: i32,
    pub options: Vec<QuestionOption>,
}

impl Question {
    pub fn points_for(&self, value: i64) -> i32 {
        self.options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.points)
            .unwrap_or(0)
    }

    /// Highest points any option awards; 0 when the question has no options.
    pub fn max_points(&self) -> i32 {
        self.options
            .iter()
            .map(|option| option.points)
            .max()
            .unwrap_or(0)
    }
}

/// Selected option value per answered question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseSet(BTreeMap<QuestionId, i64>);

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question_id: QuestionId, value: i64) {
        self.0.insert(question_id, value);
    }

    pub fn get(&self, question_id: QuestionId) -> Option<i64> {
        self.0.get(&question_id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds a response set from an untyped JSON payload.
    ///
    /// Anything other than an object is rejected. Entries with a key that is
    /// not a positive integer, or a value that is not a whole number, are
    /// skipped.
    pub fn from_json(payload: &Value) -> Result<Self, ScoringError> {
        let map = payload.as_object().ok_or_else(|| {
            ScoringError::InvalidInput(format!(
                "responses must be an object keyed by question id, got {}",
                json_kind(payload)
            ))
        })?;

        let mut responses = Self::new();
        for (key, value) in map {
            let question_id = match key.trim().parse::<QuestionId>() {
                Ok(id) if id > 0 => id,
                _ => {
                    warn!(key = %key, "skipping response with invalid question id");
                    continue;
                }
            };

            match option_value(value) {
                Some(selected) => responses.insert(question_id, selected),
                None => {
                    warn!(question_id, "skipping response with non-integer value");
                }
            }
        }

        Ok(responses)
    }
}

impl FromIterator<(QuestionId, i64)> for ResponseSet {
    fn from_iter<T: IntoIterator<Item = (QuestionId, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Integer option value; whole floats such as `3.0` count as `3`.
fn option_value(value: &Value) -> Option<i64> {
    if let Some(selected) = value.as_i64() {
        return Some(selected);
    }
    let float = value.as_f64()?;
    let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
    (float.is_finite() && float.fract() == 0.0 && in_range).then_some(float as i64)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub score: i64,
    pub max_score: i64,
    pub percentage: f64,
    pub category_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub total_score: f64,
    pub category_scores: BTreeMap<CategoryId, CategoryScore>,
    pub percentile_rank: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Completed assessments with a total score, and how many of them fall below
/// a given score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreCounts {
    pub total: i64,
    pub lower: i64,
}

#[derive(Debug, Clone)]
pub struct AssessmentRecord {
    pub id: i32,
    pub session_id: String,
    pub template_id: i32,
    pub responses: ResponseSet,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: ScoreResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub industry: String,
    pub stage: String,
    pub category_averages: BTreeMap<String, f64>,
    pub percentiles: BTreeMap<String, f64>,
    pub sample_size: i32,
}

impl Benchmark {
    /// Fallback used when no benchmark row exists for an industry and stage.
    pub fn default_for(industry: &str, stage: &str) -> Self {
        let category_averages = [
            ("Market & Opportunity", 65.0),
            ("Team & Leadership", 60.0),
            ("Product & Technology", 55.0),
            ("Traction & Business Model", 50.0),
            ("Financial Readiness", 45.0),
        ]
        .into_iter()
        .map(|(name, average)| (name.to_string(), average))
        .collect();

        let percentiles = [("25th", 40.0), ("50th", 60.0), ("75th", 80.0), ("90th", 90.0)]
            .into_iter()
            .map(|(label, score)| (label.to_string(), score))
            .collect();

        Self {
            industry: industry.to_string(),
            stage: stage.to_string(),
            category_averages,
            percentiles,
            sample_size: 0,
        }
    }

    pub fn average_for(&self, category_name: &str) -> Option<f64> {
        self.category_averages
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(category_name))
            .map(|(_, average)| *average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(options: Vec<QuestionOption>) -> Question {
        Question {
            id: 1,
            category_id: 1,
            category_name: "Market & Opportunity".to_string(),
            category_weight: 25,
            weight: 5,
            options,
        }
    }

    fn option(value: i64, points: i32) -> QuestionOption {
        QuestionOption {
            value,
            label: format!("option {value}"),
            points,
        }
    }

    #[test]
    fn unmatched_value_scores_zero() {
        let q = question(vec![option(0, 1), option(1, 4)]);
        assert_eq!(q.points_for(1), 4);
        assert_eq!(q.points_for(9), 0);
    }

    #[test]
    fn max_points_of_empty_options_is_zero() {
        assert_eq!(question(Vec::new()).max_points(), 0);
        assert_eq!(question(vec![option(0, 2), option(1, 5)]).max_points(), 5);
    }

    #[test]
    fn responses_reject_non_objects() {
        let err = ResponseSet::from_json(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(_)));
        assert!(ResponseSet::from_json(&json!(null)).is_err());
    }

    #[test]
    fn responses_skip_malformed_entries() {
        let payload = json!({
            "1": 4,
            "2": "three",
            "-3": 1,
            "abc": 2,
            " 7 ": 0,
            "8": 3.0,
            "9": 2.5
        });
        let responses = ResponseSet::from_json(&payload).unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses.get(1), Some(4));
        assert_eq!(responses.get(7), Some(0));
        assert_eq!(responses.get(8), Some(3));
        assert_eq!(responses.get(2), None);
        assert_eq!(responses.get(9), None);
    }

    #[test]
    fn options_accept_text_as_label() {
        let parsed: QuestionOption =
            serde_json::from_value(json!({ "value": 2, "text": "Pilot customers", "points": 2 }))
                .unwrap();
        assert_eq!(parsed.label, "Pilot customers");
    }

    #[test]
    fn benchmark_lookup_is_case_insensitive() {
        let benchmark = Benchmark::default_for("fintech", "seed");
        assert_eq!(benchmark.average_for("team & leadership"), Some(60.0));
        assert_eq!(benchmark.average_for("Unknown"), None);
    }
}
