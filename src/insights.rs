use std::collections::BTreeMap;

use crate::models::{CategoryId, CategoryScore};

const MAX_STRENGTHS: usize = 5;
const MAX_WEAKNESSES: usize = 5;
const MAX_RECOMMENDATIONS: usize = 8;

/// Canned advice per category: two strings for weak scores (<50%), one for
/// middling scores (50-70%).
struct CategoryAdvice {
    name: &'static str,
    weak: [&'static str; 2],
    moderate: &'static str,
}

static CATEGORY_ADVICE: [CategoryAdvice; 5] = [
    CategoryAdvice {
        name: "market & opportunity",
        weak: [
            "Conduct thorough market research and validate your target market size",
            "Develop a clear competitive analysis and positioning strategy",
        ],
        moderate: "Refine your go-to-market strategy and customer segmentation",
    },
    CategoryAdvice {
        name: "team & leadership",
        weak: [
            "Consider adding experienced advisors or co-founders to strengthen your team",
            "Highlight relevant industry experience and past achievements",
        ],
        moderate: "Consider expanding your advisory board with industry experts",
    },
    CategoryAdvice {
        name: "product & technology",
        weak: [
            "Focus on product development and achieving key technical milestones",
            "Consider intellectual property protection for your innovations",
        ],
        moderate: "Focus on product-market fit and user feedback integration",
    },
    CategoryAdvice {
        name: "traction & business model",
        weak: [
            "Develop pilot customers and validate your revenue model",
            "Focus on customer acquisition and retention metrics",
        ],
        moderate: "Scale your customer acquisition efforts and improve unit economics",
    },
    CategoryAdvice {
        name: "financial readiness",
        weak: [
            "Create detailed financial projections and funding requirements",
            "Develop a clear use of funds strategy with measurable milestones",
        ],
        moderate: "Strengthen your financial planning and scenario modeling",
    },
];

/// Opening and closing advice for an overall readiness tier.
struct TierAdvice {
    opening: &'static str,
    closing: &'static str,
}

const FUNDAMENTALS: TierAdvice = TierAdvice {
    opening: "Focus on fundamental business development before seeking VC funding",
    closing: "Consider angel investors or grants as interim funding sources",
};

const DEVELOPING: TierAdvice = TierAdvice {
    opening: "Address key weaknesses before approaching tier-1 VCs",
    closing: "Consider seed-stage investors who can provide strategic guidance",
};

const READY: TierAdvice = TierAdvice {
    opening: "You have a strong foundation for VC fundraising",
    closing: "Focus on perfecting your pitch and identifying the right investor fit",
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Insights {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn generate(category_scores: &BTreeMap<CategoryId, CategoryScore>) -> Insights {
    Insights {
        strengths: identify_strengths(category_scores),
        weaknesses: identify_weaknesses(category_scores),
        recommendations: generate_recommendations(category_scores),
    }
}

pub fn identify_strengths(category_scores: &BTreeMap<CategoryId, CategoryScore>) -> Vec<String> {
    let mut strengths = Vec::new();

    if let Some(top) = strongest(category_scores) {
        if top.percentage >= 60.0 {
            strengths.push(format!("{} is your strongest area", top.category_name));
        }
    }

    for score in category_scores.values() {
        if score.percentage >= 80.0 {
            strengths.push(format!(
                "Strong {} with {}% score",
                score.category_name.to_lowercase(),
                score.percentage
            ));
        } else if score.percentage >= 70.0 {
            strengths.push(format!(
                "Good {} foundation",
                score.category_name.to_lowercase()
            ));
        }
    }

    strengths.truncate(MAX_STRENGTHS);
    strengths
}

pub fn identify_weaknesses(category_scores: &BTreeMap<CategoryId, CategoryScore>) -> Vec<String> {
    let mut weaknesses = Vec::new();

    for score in category_scores.values() {
        if score.percentage < 40.0 {
            weaknesses.push(format!(
                "{} needs significant improvement ({}%)",
                score.category_name, score.percentage
            ));
        } else if score.percentage < 60.0 {
            weaknesses.push(format!("{} has room for improvement", score.category_name));
        }
    }

    weaknesses.truncate(MAX_WEAKNESSES);
    weaknesses
}

pub fn generate_recommendations(
    category_scores: &BTreeMap<CategoryId, CategoryScore>,
) -> Vec<String> {
    let tier = match average_percentage(category_scores) {
        avg if avg < 50.0 => FUNDAMENTALS,
        avg if avg < 70.0 => DEVELOPING,
        _ => READY,
    };

    let mut recommendations = vec![tier.opening.to_string()];

    for score in category_scores.values() {
        let Some(advice) = advice_for(&score.category_name) else {
            continue;
        };

        if score.percentage < 50.0 {
            recommendations.extend(advice.weak.iter().map(|text| text.to_string()));
        } else if score.percentage < 70.0 {
            recommendations.push(advice.moderate.to_string());
        }
    }

    recommendations.push(tier.closing.to_string());
    // Truncating after the closing line is appended can drop it.
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

/// Highest-percentage category; the earliest one wins ties.
fn strongest(category_scores: &BTreeMap<CategoryId, CategoryScore>) -> Option<&CategoryScore> {
    category_scores.values().fold(None, |best, score| match best {
        Some(current) if current.percentage >= score.percentage => Some(current),
        _ => Some(score),
    })
}

fn average_percentage(category_scores: &BTreeMap<CategoryId, CategoryScore>) -> f64 {
    if category_scores.is_empty() {
        return 0.0;
    }
    let sum: f64 = category_scores.values().map(|score| score.percentage).sum();
    sum / category_scores.len() as f64
}

fn advice_for(category_name: &str) -> Option<&'static CategoryAdvice> {
    let name = category_name.to_lowercase();
    CATEGORY_ADVICE.iter().find(|advice| advice.name == name)
}
