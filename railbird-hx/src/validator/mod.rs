//! Hand validation and error detection
//!
//! Inspects candidate hands for internally inconsistent or implausible data,
//! attaches severity-graded errors, adjusts confidence, and aggregates an
//! ErrorReport with prioritized recommendations. Data-quality findings never
//! abort the job; the validator reports, it does not decide acceptance policy
//! (with one exception: a critical error always marks the hand rejected).

mod checks;
mod report;

pub use report::{ErrorReport, Recommendation, RecommendationPriority};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::CandidateHand;

/// Error severity, ordered critical > high > medium > low
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Confidence penalty applied per error of this severity
    pub fn penalty(&self) -> f64 {
        match self {
            Severity::Critical => 0.30,
            Severity::High => 0.15,
            Severity::Medium => 0.05,
            Severity::Low => 0.02,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error category. Relative shares observed in production extractions are
/// used to prioritize fixes, never to change behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Digit/letter confusion in stack or bet sizes (~40%)
    OcrMisread,
    /// Duplicate or non-existent cards (~25%)
    CardRecognition,
    /// Pot, stack, or action-order inconsistencies (~20%)
    PokerLogic,
    /// Hands merged or split at the wrong boundary (~10%)
    BoundaryDetection,
    /// Independent signals disagree about the same event (~5%)
    MultiModalConflict,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::OcrMisread => "ocr_misread",
            ErrorCategory::CardRecognition => "card_recognition",
            ErrorCategory::PokerLogic => "poker_logic",
            ErrorCategory::BoundaryDetection => "boundary_detection",
            ErrorCategory::MultiModalConflict => "multi_modal_conflict",
        }
    }
}

/// Closed taxonomy of detectable hand defects, with structured payloads so
/// handling stays exhaustive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandErrorKind {
    /// Same card appears twice across hole cards and board
    DuplicateCard { card: String },
    /// Card string has a non-existent rank or suit
    InvalidCard { card: String },
    /// Final pot does not match blinds + antes + contributions
    PotInconsistency { expected: f64, reported: f64 },
    /// stack_end inconsistent with stack_start minus contributions
    StackMismatch {
        player: String,
        expected: f64,
        reported: f64,
    },
    /// Action ordering violates table rules (e.g. acting after folding)
    InvalidActionOrder {
        street: String,
        player: String,
        detail: String,
    },
    /// Bet/raise amount implausible against the actor's stack
    ImplausibleAmount {
        player: String,
        amount: f64,
        stack_start: f64,
    },
    /// Amount attached to an action type that takes none
    SpuriousAmount { player: String, action_type: String },
    /// Street has actions but its board cards were never seen; the hand was
    /// likely split at the wrong boundary
    SuspectedSplit { street: String },
    /// Abnormally long action sequence; two hands likely merged
    SuspectedMerge { street: String, action_count: usize },
    /// Reported result contradicts observed actions
    ResultConflict { player: String, detail: String },
}

impl HandErrorKind {
    pub fn severity(&self) -> Severity {
        match self {
            HandErrorKind::DuplicateCard { .. } | HandErrorKind::InvalidCard { .. } => {
                Severity::Critical
            }
            HandErrorKind::PotInconsistency { .. }
            | HandErrorKind::InvalidActionOrder { .. }
            | HandErrorKind::ResultConflict { .. } => Severity::High,
            HandErrorKind::StackMismatch { .. }
            | HandErrorKind::ImplausibleAmount { .. }
            | HandErrorKind::SuspectedSplit { .. }
            | HandErrorKind::SuspectedMerge { .. } => Severity::Medium,
            HandErrorKind::SpuriousAmount { .. } => Severity::Low,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            HandErrorKind::DuplicateCard { .. } | HandErrorKind::InvalidCard { .. } => {
                ErrorCategory::CardRecognition
            }
            HandErrorKind::PotInconsistency { .. }
            | HandErrorKind::InvalidActionOrder { .. } => ErrorCategory::PokerLogic,
            HandErrorKind::StackMismatch { .. }
            | HandErrorKind::ImplausibleAmount { .. }
            | HandErrorKind::SpuriousAmount { .. } => ErrorCategory::OcrMisread,
            HandErrorKind::SuspectedSplit { .. } | HandErrorKind::SuspectedMerge { .. } => {
                ErrorCategory::BoundaryDetection
            }
            HandErrorKind::ResultConflict { .. } => ErrorCategory::MultiModalConflict,
        }
    }

    fn message(&self) -> String {
        match self {
            HandErrorKind::DuplicateCard { card } => {
                format!("Card {} appears more than once across players and board", card)
            }
            HandErrorKind::InvalidCard { card } => {
                format!("'{}' is not a valid card", card)
            }
            HandErrorKind::PotInconsistency { expected, reported } => format!(
                "Final pot {:.2} does not match contributions total {:.2}",
                reported, expected
            ),
            HandErrorKind::StackMismatch {
                player,
                expected,
                reported,
            } => format!(
                "{}: ending stack {:.2} inconsistent with expected {:.2}",
                player, reported, expected
            ),
            HandErrorKind::InvalidActionOrder {
                street,
                player,
                detail,
            } => format!("{} on {}: {}", player, street, detail),
            HandErrorKind::ImplausibleAmount {
                player,
                amount,
                stack_start,
            } => format!(
                "{}: amount {:.2} exceeds starting stack {:.2}",
                player, amount, stack_start
            ),
            HandErrorKind::SpuriousAmount {
                player,
                action_type,
            } => format!("{}: {} carries an amount", player, action_type),
            HandErrorKind::SuspectedSplit { street } => format!(
                "Actions on {} but its board cards were never observed; hand may be split",
                street
            ),
            HandErrorKind::SuspectedMerge {
                street,
                action_count,
            } => format!(
                "{} actions on {} suggests two hands merged into one",
                action_count, street
            ),
            HandErrorKind::ResultConflict { player, detail } => {
                format!("{}: {}", player, detail)
            }
        }
    }

    fn suggested_fix(&self) -> Option<String> {
        match self {
            HandErrorKind::DuplicateCard { .. } | HandErrorKind::InvalidCard { .. } => {
                Some("Re-check the card regions for this timestamp range".to_string())
            }
            HandErrorKind::PotInconsistency { .. } => {
                Some("Re-read the pot display; verify bet amounts against it".to_string())
            }
            HandErrorKind::StackMismatch { .. } | HandErrorKind::ImplausibleAmount { .. } => {
                Some("Re-read the stack display for this player".to_string())
            }
            HandErrorKind::SuspectedSplit { .. } | HandErrorKind::SuspectedMerge { .. } => {
                Some("Re-examine hand boundaries around this timestamp".to_string())
            }
            _ => None,
        }
    }

    fn affected_fields(&self) -> Vec<String> {
        match self {
            HandErrorKind::DuplicateCard { .. } | HandErrorKind::InvalidCard { .. } => {
                vec!["players.hole_cards".to_string(), "board".to_string()]
            }
            HandErrorKind::PotInconsistency { .. } => {
                vec!["result.pot_final".to_string(), "streets".to_string()]
            }
            HandErrorKind::StackMismatch { player, .. } => {
                vec![format!("players[{}].stack_end", player)]
            }
            HandErrorKind::InvalidActionOrder { street, .. } => {
                vec![format!("streets.{}", street)]
            }
            HandErrorKind::ImplausibleAmount { player, .. }
            | HandErrorKind::SpuriousAmount { player, .. } => {
                vec![format!("streets (actions by {})", player)]
            }
            HandErrorKind::SuspectedSplit { street }
            | HandErrorKind::SuspectedMerge { street, .. } => {
                vec![format!("streets.{}", street), "board".to_string()]
            }
            HandErrorKind::ResultConflict { .. } => {
                vec!["result".to_string(), "streets".to_string()]
            }
        }
    }
}

/// One detected defect attached to a candidate hand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandError {
    pub hand_id: String,
    #[serde(flatten)]
    pub kind: HandErrorKind,
    pub message: String,
    pub severity: Severity,
    pub category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    pub affected_fields: Vec<String>,
}

impl HandError {
    pub fn new(hand_id: &str, kind: HandErrorKind) -> Self {
        Self {
            hand_id: hand_id.to_string(),
            message: kind.message(),
            severity: kind.severity(),
            category: kind.category(),
            suggested_fix: kind.suggested_fix(),
            affected_fields: kind.affected_fields(),
            kind,
        }
    }
}

/// A candidate hand after validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedHand {
    pub hand: CandidateHand,
    pub errors: Vec<HandError>,
    /// Adjusted confidence after severity-weighted penalties, floored at 0
    pub confidence: f64,
    /// True when any critical error was found, regardless of confidence
    pub rejected: bool,
}

/// Validator over a batch of candidate hands
#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Run every category check against each hand, adjust confidence, and
    /// build the aggregate report. Never fails for malformed-but-parseable
    /// hands.
    pub fn validate(&self, hands: Vec<CandidateHand>) -> (Vec<AnnotatedHand>, ErrorReport) {
        let mut annotated = Vec::with_capacity(hands.len());

        for hand in hands {
            let mut errors = Vec::new();
            checks::check_cards(&hand, &mut errors);
            checks::check_pot(&hand, &mut errors);
            checks::check_stacks(&hand, &mut errors);
            checks::check_action_order(&hand, &mut errors);
            checks::check_amounts(&hand, &mut errors);
            checks::check_boundaries(&hand, &mut errors);
            checks::check_result(&hand, &mut errors);

            let penalty: f64 = errors.iter().map(|e| e.severity.penalty()).sum();
            let confidence = (hand.confidence - penalty).max(0.0);
            let rejected = errors.iter().any(|e| e.severity == Severity::Critical);

            if !errors.is_empty() {
                tracing::debug!(
                    hand_id = %hand.hand_id,
                    error_count = errors.len(),
                    confidence,
                    rejected,
                    "Hand validation found issues"
                );
            }

            annotated.push(AnnotatedHand {
                hand,
                errors,
                confidence,
                rejected,
            });
        }

        let report = ErrorReport::build(&annotated);
        (annotated, report)
    }
}
