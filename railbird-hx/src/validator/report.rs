//! Aggregate error reporting over a validated batch

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AnnotatedHand, HandError, HandErrorKind, Severity};

/// How urgently a recommendation should be acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    Urgent,
    High,
    Medium,
}

/// One actionable follow-up derived from batch-level error patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: RecommendationPriority,
    pub message: String,
    pub affected_hands: Vec<String>,
}

/// Batch-level error report attached to a successful job's output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub total_errors: usize,
    pub errors_by_category: BTreeMap<String, usize>,
    pub errors_by_severity: BTreeMap<String, usize>,
    pub errors_by_hand: BTreeMap<String, Vec<HandError>>,
    /// Mean adjusted confidence across the batch; 1.0 for an empty batch
    pub mean_confidence: f64,
    pub recommendations: Vec<Recommendation>,
}

impl ErrorReport {
    pub fn build(annotated: &[AnnotatedHand]) -> Self {
        let mut errors_by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut errors_by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut errors_by_hand: BTreeMap<String, Vec<HandError>> = BTreeMap::new();
        let mut total_errors = 0;

        for hand in annotated {
            for error in &hand.errors {
                total_errors += 1;
                *errors_by_category
                    .entry(error.category.as_str().to_string())
                    .or_insert(0) += 1;
                *errors_by_severity
                    .entry(error.severity.as_str().to_string())
                    .or_insert(0) += 1;
                errors_by_hand
                    .entry(error.hand_id.clone())
                    .or_default()
                    .push(error.clone());
            }
        }

        let mean_confidence = if annotated.is_empty() {
            1.0
        } else {
            annotated.iter().map(|h| h.confidence).sum::<f64>() / annotated.len() as f64
        };

        let recommendations = build_recommendations(annotated, mean_confidence);

        Self {
            total_errors,
            errors_by_category,
            errors_by_severity,
            errors_by_hand,
            mean_confidence,
            recommendations,
        }
    }
}

const DUPLICATE_CARD_THRESHOLD: usize = 2;
const POT_INCONSISTENCY_THRESHOLD: usize = 3;
const CRITICAL_THRESHOLD: usize = 5;
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.8;

fn hands_matching(
    annotated: &[AnnotatedHand],
    predicate: impl Fn(&HandError) -> bool,
) -> Vec<String> {
    annotated
        .iter()
        .filter(|h| h.errors.iter().any(&predicate))
        .map(|h| h.hand.hand_id.clone())
        .collect()
}

fn build_recommendations(annotated: &[AnnotatedHand], mean_confidence: f64) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let duplicate_hands = hands_matching(annotated, |e| {
        matches!(e.kind, HandErrorKind::DuplicateCard { .. })
    });
    let duplicate_count: usize = annotated
        .iter()
        .flat_map(|h| &h.errors)
        .filter(|e| matches!(e.kind, HandErrorKind::DuplicateCard { .. }))
        .count();
    if duplicate_count > DUPLICATE_CARD_THRESHOLD {
        recommendations.push(Recommendation {
            priority: RecommendationPriority::High,
            message: format!(
                "{} duplicate-card errors; re-check the card region crops for this window",
                duplicate_count
            ),
            affected_hands: duplicate_hands,
        });
    }

    let pot_hands = hands_matching(annotated, |e| {
        matches!(e.kind, HandErrorKind::PotInconsistency { .. })
    });
    if pot_hands.len() > POT_INCONSISTENCY_THRESHOLD {
        recommendations.push(Recommendation {
            priority: RecommendationPriority::High,
            message: format!(
                "{} hands with pot inconsistencies; re-run with a pot display region",
                pot_hands.len()
            ),
            affected_hands: pot_hands,
        });
    }

    let critical_count: usize = annotated
        .iter()
        .flat_map(|h| &h.errors)
        .filter(|e| e.severity == Severity::Critical)
        .count();
    if critical_count > CRITICAL_THRESHOLD {
        recommendations.push(Recommendation {
            priority: RecommendationPriority::Urgent,
            message: format!(
                "{} critical errors in one batch; treat the whole extraction as unreliable",
                critical_count
            ),
            affected_hands: hands_matching(annotated, |e| e.severity == Severity::Critical),
        });
    }

    if !annotated.is_empty() && mean_confidence < LOW_CONFIDENCE_THRESHOLD {
        recommendations.push(Recommendation {
            priority: RecommendationPriority::Medium,
            message: format!(
                "Mean confidence {:.2} is below {:.1}; queue the batch for manual review",
                mean_confidence, LOW_CONFIDENCE_THRESHOLD
            ),
            affected_hands: annotated.iter().map(|h| h.hand.hand_id.clone()).collect(),
        });
    }

    recommendations
}
