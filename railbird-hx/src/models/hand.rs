//! Candidate hand data model
//!
//! A candidate hand is the reconstructed unit of work: produced by the
//! vision endpoint, annotated by the validator, and either accepted for the
//! persistence handoff or rejected with errors attached.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Betting street
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    pub const ALL: [Street; 4] = [Street::Preflop, Street::Flop, Street::Turn, Street::River];
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        };
        f.write_str(s)
    }
}

/// Player action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Fold => "fold",
            ActionType::Check => "check",
            ActionType::Call => "call",
            ActionType::Bet => "bet",
            ActionType::Raise => "raise",
            ActionType::AllIn => "all-in",
        };
        f.write_str(s)
    }
}

/// Single action within a street
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Acting player name
    pub player: String,
    /// What the player did
    pub action_type: ActionType,
    /// Amount for call/bet/raise/all-in, absent for fold/check
    #[serde(default)]
    pub amount: Option<f64>,
    /// Position within the street, strictly increasing
    pub sequence: u32,
}

/// Player participating in a hand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    /// Table position label (BTN, SB, BB, UTG, ...)
    #[serde(default)]
    pub position: String,
    /// Stack at the start of the hand, in big blinds or chips as reported
    pub stack_start: f64,
    /// Stack at the end of the hand; consistency is checked, not enforced
    #[serde(default)]
    pub stack_end: Option<f64>,
    /// Hole cards when shown (e.g. ["As", "Kd"])
    #[serde(default)]
    pub hole_cards: Option<Vec<String>>,
    #[serde(default)]
    pub is_hero: bool,
}

/// Blind structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blinds {
    pub small_blind: f64,
    pub big_blind: f64,
    #[serde(default)]
    pub ante: f64,
}

/// Actions grouped per street
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreetActions {
    #[serde(default)]
    pub preflop: Vec<Action>,
    #[serde(default)]
    pub flop: Vec<Action>,
    #[serde(default)]
    pub turn: Vec<Action>,
    #[serde(default)]
    pub river: Vec<Action>,
}

impl StreetActions {
    pub fn for_street(&self, street: Street) -> &[Action] {
        match street {
            Street::Preflop => &self.preflop,
            Street::Flop => &self.flop,
            Street::Turn => &self.turn,
            Street::River => &self.river,
        }
    }

    /// All actions in street order
    pub fn iter_all(&self) -> impl Iterator<Item = (Street, &Action)> {
        Street::ALL
            .iter()
            .flat_map(move |s| self.for_street(*s).iter().map(move |a| (*s, a)))
    }
}

/// Community cards as revealed per street
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub flop: Vec<String>,
    #[serde(default)]
    pub turn: Vec<String>,
    #[serde(default)]
    pub river: Vec<String>,
}

impl Board {
    /// All board cards in reveal order
    pub fn all_cards(&self) -> impl Iterator<Item = &String> {
        self.flop.iter().chain(self.turn.iter()).chain(self.river.iter())
    }
}

/// Hand outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandResult {
    /// Winning player name, if determined
    #[serde(default)]
    pub winner: Option<String>,
    /// Final pot size
    #[serde(default)]
    pub pot_final: Option<f64>,
    /// Amount awarded to the winner
    #[serde(default)]
    pub win_amount: Option<f64>,
}

/// Reconstructed hand awaiting validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateHand {
    /// Identifier assigned by the reconstruction output (e.g. "001")
    pub hand_id: String,
    /// Start of the hand within the video, in seconds
    pub timestamp_seconds: f64,
    #[serde(default)]
    pub blinds: Blinds,
    pub players: Vec<Player>,
    #[serde(default)]
    pub streets: StreetActions,
    #[serde(default)]
    pub board: Board,
    #[serde(default)]
    pub result: HandResult,
    /// Model-reported confidence in [0,1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// How the hand was reconstructed (e.g. "vision")
    #[serde(default)]
    pub extraction_method: String,
}

fn default_confidence() -> f64 {
    1.0
}

/// Valid card ranks in notation order
pub const CARD_RANKS: &str = "23456789TJQKA";
/// Valid card suits: spades, hearts, diamonds, clubs
pub const CARD_SUITS: &str = "shdc";

/// Check a two-character card string like "As" or "Td"
pub fn is_valid_card(card: &str) -> bool {
    let mut chars = card.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(rank), Some(suit), None) => {
            CARD_RANKS.contains(rank.to_ascii_uppercase())
                && CARD_SUITS.contains(suit.to_ascii_lowercase())
        }
        _ => false,
    }
}

/// Normalize a card string to canonical "Rs" form (upper rank, lower suit)
pub fn normalize_card(card: &str) -> String {
    let mut chars = card.chars();
    match (chars.next(), chars.next()) {
        (Some(rank), Some(suit)) => {
            format!("{}{}", rank.to_ascii_uppercase(), suit.to_ascii_lowercase())
        }
        _ => card.to_string(),
    }
}
