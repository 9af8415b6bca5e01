use std::fmt::Write;

use crate::models::{AssessmentRecord, Benchmark};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryComparison {
    pub category_name: String,
    pub percentage: f64,
    pub benchmark: Option<f64>,
}

impl CategoryComparison {
    pub fn delta(&self) -> Option<f64> {
        self.benchmark.map(|average| self.percentage - average)
    }
}

/// Lines up each category score against the benchmark average for it.
pub fn compare_to_benchmark(
    record: &AssessmentRecord,
    benchmark: &Benchmark,
) -> Vec<CategoryComparison> {
    record
        .result
        .category_scores
        .values()
        .map(|score| CategoryComparison {
            category_name: score.category_name.clone(),
            percentage: score.percentage,
            benchmark: benchmark.average_for(&score.category_name),
        })
        .collect()
}

/// Readiness band for a total score, used as the report headline.
pub fn readiness_label(total_score: f64) -> &'static str {
    match total_score {
        score if score >= 80.0 => "VC ready",
        score if score >= 60.0 => "Nearly ready",
        score if score >= 40.0 => "Developing",
        _ => "Early stage",
    }
}

pub fn build_report(record: &AssessmentRecord, benchmark: Option<&Benchmark>) -> String {
    let result = &record.result;
    let mut output = String::new();

    let _ = writeln!(output, "# VC Readiness Report");
    let completed = record
        .completed_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "not completed".to_string());
    let _ = writeln!(
        output,
        "Assessment {} (session {}, template {}, completed {})",
        record.id, record.session_id, record.template_id, completed
    );
    let _ = writeln!(output, "Questions answered: {}", record.responses.len());
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "**Total score:** {:.2} / 100 ({})",
        result.total_score,
        readiness_label(result.total_score)
    );
    let _ = writeln!(
        output,
        "**Percentile:** ahead of {}% of completed assessments",
        result.percentile_rank
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Scores");

    if result.category_scores.is_empty() {
        let _ = writeln!(output, "No category breakdown recorded for this assessment.");
    } else {
        for score in result.category_scores.values() {
            let _ = writeln!(
                output,
                "- {}: {:.2}% ({} of {} points)",
                score.category_name, score.percentage, score.score, score.max_score
            );
        }
    }

    write_list(&mut output, "Strengths", &result.strengths, "No specific strengths identified.");
    write_list(&mut output, "Areas to Improve", &result.weaknesses, "No major weaknesses identified.");
    write_list(
        &mut output,
        "Recommendations",
        &result.recommendations,
        "No recommendations recorded.",
    );

    if let Some(benchmark) = benchmark {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## Industry Comparison ({} / {})",
            benchmark.industry, benchmark.stage
        );
        if benchmark.sample_size == 0 {
            let _ = writeln!(output, "Using default benchmark averages.");
        } else {
            let _ = writeln!(output, "Based on {} assessments.", benchmark.sample_size);
        }
        let bands: Vec<String> = benchmark
            .percentiles
            .iter()
            .map(|(label, score)| format!("{label}: {score:.0}"))
            .collect();
        if !bands.is_empty() {
            let _ = writeln!(output, "Score percentiles: {}", bands.join(", "));
        }

        for comparison in compare_to_benchmark(record, benchmark) {
            match (comparison.benchmark, comparison.delta()) {
                (Some(average), Some(delta)) => {
                    let _ = writeln!(
                        output,
                        "- {}: {:.2}% vs {:.0}% average ({:+.2})",
                        comparison.category_name, comparison.percentage, average, delta
                    );
                }
                _ => {
                    let _ = writeln!(
                        output,
                        "- {}: {:.2}% (no benchmark)",
                        comparison.category_name, comparison.percentage
                    );
                }
            }
        }
    }

    output
}

fn write_list(output: &mut String, heading: &str, items: &[String], empty: &str) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {heading}");

    if items.is_empty() {
        let _ = writeln!(output, "{empty}");
    } else {
        for item in items {
            let _ = writeln!(output, "- {item}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{CategoryScore, ResponseSet, ScoreResult};

    fn record(category_scores: BTreeMap<i32, CategoryScore>, strengths: Vec<String>) -> AssessmentRecord {
        AssessmentRecord {
            id: 7,
            session_id: "session-7".to_string(),
            template_id: 1,
            responses: ResponseSet::new(),
            completed_at: None,
            result: ScoreResult {
                total_score: 72.5,
                category_scores,
                percentile_rank: 64,
                strengths,
                weaknesses: Vec::new(),
                recommendations: vec!["Address key weaknesses before approaching tier-1 VCs".to_string()],
            },
        }
    }

    fn category(name: &str, percentage: f64) -> CategoryScore {
        CategoryScore {
            score: percentage as i64,
            max_score: 100,
            percentage,
            category_name: name.to_string(),
        }
    }

    #[test]
    fn readiness_bands() {
        assert_eq!(readiness_label(100.0), "VC ready");
        assert_eq!(readiness_label(65.0), "Nearly ready");
        assert_eq!(readiness_label(40.0), "Developing");
        assert_eq!(readiness_label(12.0), "Early stage");
    }

    #[test]
    fn comparison_uses_benchmark_averages() {
        let scores = BTreeMap::from([
            (1, category("Market & Opportunity", 70.0)),
            (9, category("Regulatory", 30.0)),
        ]);
        let benchmark = Benchmark::default_for("saas", "seed");

        let comparisons = compare_to_benchmark(&record(scores, Vec::new()), &benchmark);
        assert_eq!(comparisons[0].delta(), Some(5.0));
        assert_eq!(comparisons[1].benchmark, None);
    }

    #[test]
    fn report_lists_sections_and_fallbacks() {
        let scores = BTreeMap::from([(1, category("Market & Opportunity", 70.0))]);
        let benchmark = Benchmark::default_for("saas", "seed");
        let report = build_report(&record(scores, Vec::new()), Some(&benchmark));

        assert!(report.contains("**Total score:** 72.50 / 100 (Nearly ready)"));
        assert!(report.contains("ahead of 64% of completed assessments"));
        assert!(report.contains("- Market & Opportunity: 70.00% (70 of 100 points)"));
        assert!(report.contains("No specific strengths identified."));
        assert!(report.contains("- Address key weaknesses before approaching tier-1 VCs"));
        assert!(report.contains("## Industry Comparison (saas / seed)"));
        assert!(report.contains("Score percentiles: 25th: 40, 50th: 60, 75th: 80, 90th: 90"));
        assert!(report.contains("Questions answered: 0"));
        assert!(report.contains("- Market & Opportunity: 70.00% vs 65% average (+5.00)"));
    }

    #[test]
    fn report_without_breakdown_says_so() {
        let report = build_report(&record(BTreeMap::new(), vec!["Strong team".to_string()]), None);
        assert!(report.contains("No category breakdown recorded"));
        assert!(report.contains("- Strong team"));
        assert!(!report.contains("Industry Comparison"));
    }
}
