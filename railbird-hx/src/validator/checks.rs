//! Category-specific hand checks
//!
//! Each check is independent and may emit zero or more errors. Checks only
//! read the hand; confidence adjustment happens in the caller.

use std::collections::{HashMap, HashSet};

use super::{HandError, HandErrorKind};
use crate::models::hand::{
    is_valid_card, normalize_card, ActionType, CandidateHand, Street,
};

/// Tolerance for pot comparisons, in big blinds
const POT_TOLERANCE_BB: f64 = 0.1;
/// Tolerance for stack comparisons
const STACK_TOLERANCE: f64 = 0.1;
/// Postflop streets with more actions than this per player suggest a merge
const MERGE_ACTIONS_PER_PLAYER: usize = 3;

/// Card recognition: invalid rank/suit and duplicates across players + board
pub fn check_cards(hand: &CandidateHand, errors: &mut Vec<HandError>) {
    let mut seen: HashSet<String> = HashSet::new();

    let mut inspect = |card: &str, errors: &mut Vec<HandError>| {
        if !is_valid_card(card) {
            errors.push(HandError::new(
                &hand.hand_id,
                HandErrorKind::InvalidCard {
                    card: card.to_string(),
                },
            ));
            return;
        }
        let canonical = normalize_card(card);
        if !seen.insert(canonical.clone()) {
            errors.push(HandError::new(
                &hand.hand_id,
                HandErrorKind::DuplicateCard { card: canonical },
            ));
        }
    };

    for player in &hand.players {
        if let Some(cards) = &player.hole_cards {
            for card in cards {
                inspect(card, errors);
            }
        }
    }
    for card in hand.board.all_cards() {
        inspect(card, errors);
    }
}

/// Total chips a player put in across all streets
fn player_contribution(hand: &CandidateHand, player: &str) -> f64 {
    hand.streets
        .iter_all()
        .filter(|(_, a)| a.player == player)
        .filter_map(|(_, a)| a.amount)
        .sum()
}

/// Poker logic: final pot must match blinds + antes + street contributions
pub fn check_pot(hand: &CandidateHand, errors: &mut Vec<HandError>) {
    let Some(reported) = hand.result.pot_final else {
        return;
    };

    let contributions: f64 = hand
        .streets
        .iter_all()
        .filter_map(|(_, a)| a.amount)
        .sum();
    let antes = hand.blinds.ante * hand.players.len() as f64;
    let expected = hand.blinds.small_blind + hand.blinds.big_blind + antes + contributions;

    let tolerance = if hand.blinds.big_blind > 0.0 {
        POT_TOLERANCE_BB * hand.blinds.big_blind
    } else {
        POT_TOLERANCE_BB
    };

    if (reported - expected).abs() > tolerance {
        errors.push(HandError::new(
            &hand.hand_id,
            HandErrorKind::PotInconsistency { expected, reported },
        ));
    }
}

/// OCR plausibility: ending stacks must follow from starting stacks
pub fn check_stacks(hand: &CandidateHand, errors: &mut Vec<HandError>) {
    for player in &hand.players {
        let Some(reported) = player.stack_end else {
            continue;
        };

        let winnings = match (&hand.result.winner, hand.result.win_amount) {
            (Some(winner), Some(amount)) if winner == &player.name => amount,
            _ => 0.0,
        };
        let expected = player.stack_start - player_contribution(hand, &player.name) + winnings;

        if (reported - expected).abs() > STACK_TOLERANCE {
            errors.push(HandError::new(
                &hand.hand_id,
                HandErrorKind::StackMismatch {
                    player: player.name.clone(),
                    expected,
                    reported,
                },
            ));
        }
    }
}

/// Poker logic: sequences strictly increasing; nobody acts after folding
pub fn check_action_order(hand: &CandidateHand, errors: &mut Vec<HandError>) {
    let mut folded: HashSet<&str> = HashSet::new();

    for street in Street::ALL {
        let actions = hand.streets.for_street(street);
        let mut last_sequence: Option<u32> = None;

        for action in actions {
            if folded.contains(action.player.as_str()) {
                errors.push(HandError::new(
                    &hand.hand_id,
                    HandErrorKind::InvalidActionOrder {
                        street: street.to_string(),
                        player: action.player.clone(),
                        detail: format!("{} after folding", action.action_type),
                    },
                ));
            }

            if let Some(prev) = last_sequence {
                if action.sequence <= prev {
                    errors.push(HandError::new(
                        &hand.hand_id,
                        HandErrorKind::InvalidActionOrder {
                            street: street.to_string(),
                            player: action.player.clone(),
                            detail: format!(
                                "sequence {} not after {}",
                                action.sequence, prev
                            ),
                        },
                    ));
                }
            }
            last_sequence = Some(action.sequence);

            if action.action_type == ActionType::Fold {
                folded.insert(action.player.as_str());
            }
        }
    }
}

/// OCR plausibility of amounts
pub fn check_amounts(hand: &CandidateHand, errors: &mut Vec<HandError>) {
    let stacks: HashMap<&str, f64> = hand
        .players
        .iter()
        .map(|p| (p.name.as_str(), p.stack_start))
        .collect();

    for (_, action) in hand.streets.iter_all() {
        match action.action_type {
            ActionType::Fold | ActionType::Check => {
                if action.amount.is_some() {
                    errors.push(HandError::new(
                        &hand.hand_id,
                        HandErrorKind::SpuriousAmount {
                            player: action.player.clone(),
                            action_type: action.action_type.to_string(),
                        },
                    ));
                }
            }
            ActionType::Call | ActionType::Bet | ActionType::Raise | ActionType::AllIn => {
                if let (Some(amount), Some(stack)) =
                    (action.amount, stacks.get(action.player.as_str()))
                {
                    if amount > *stack {
                        errors.push(HandError::new(
                            &hand.hand_id,
                            HandErrorKind::ImplausibleAmount {
                                player: action.player.clone(),
                                amount,
                                stack_start: *stack,
                            },
                        ));
                    }
                }
            }
        }
    }
}

/// Boundary detection: split hands leave streets without board cards;
/// merged hands produce abnormally long action sequences
pub fn check_boundaries(hand: &CandidateHand, errors: &mut Vec<HandError>) {
    let postflop = [
        (Street::Flop, !hand.board.flop.is_empty()),
        (Street::Turn, !hand.board.turn.is_empty()),
        (Street::River, !hand.board.river.is_empty()),
    ];

    for (street, has_cards) in postflop {
        let actions = hand.streets.for_street(street);
        if !actions.is_empty() && !has_cards {
            errors.push(HandError::new(
                &hand.hand_id,
                HandErrorKind::SuspectedSplit {
                    street: street.to_string(),
                },
            ));
        }
    }

    let player_count = hand.players.len().max(1);
    for street in [Street::Flop, Street::Turn, Street::River] {
        let count = hand.streets.for_street(street).len();
        if count > MERGE_ACTIONS_PER_PLAYER * player_count {
            errors.push(HandError::new(
                &hand.hand_id,
                HandErrorKind::SuspectedMerge {
                    street: street.to_string(),
                    action_count: count,
                },
            ));
        }
    }
}

/// Multi-modal conflict: result metadata vs observed actions
pub fn check_result(hand: &CandidateHand, errors: &mut Vec<HandError>) {
    let Some(winner) = &hand.result.winner else {
        return;
    };

    if !hand.players.iter().any(|p| &p.name == winner) {
        errors.push(HandError::new(
            &hand.hand_id,
            HandErrorKind::ResultConflict {
                player: winner.clone(),
                detail: "declared winner is not among the hand's players".to_string(),
            },
        ));
        return;
    }

    let winner_folded = hand
        .streets
        .iter_all()
        .any(|(_, a)| &a.player == winner && a.action_type == ActionType::Fold);
    if winner_folded {
        errors.push(HandError::new(
            &hand.hand_id,
            HandErrorKind::ResultConflict {
                player: winner.clone(),
                detail: "declared winner folded during the hand".to_string(),
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::tests::{action, base_hand};
    use crate::validator::Severity;
    use crate::models::hand::Board;

    #[test]
    fn test_duplicate_card_detected_across_players_and_board() {
        let mut hand = base_hand("001");
        hand.players[0].hole_cards = Some(vec!["As".to_string(), "Kd".to_string()]);
        hand.players[1].hole_cards = Some(vec!["kd".to_string(), "2c".to_string()]);

        let mut errors = Vec::new();
        check_cards(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].kind,
            HandErrorKind::DuplicateCard { card } if card == "Kd"
        ));
        assert_eq!(errors[0].severity, Severity::Critical);
    }

    #[test]
    fn test_invalid_card_detected() {
        let mut hand = base_hand("001");
        hand.board = Board {
            flop: vec!["As".to_string(), "1h".to_string(), "2c".to_string()],
            turn: vec![],
            river: vec![],
        };

        let mut errors = Vec::new();
        check_cards(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0].kind, HandErrorKind::InvalidCard { card } if card == "1h"));
    }

    #[test]
    fn test_pot_within_tolerance_passes() {
        let mut hand = base_hand("001");
        hand.streets.preflop = vec![
            action("alice", ActionType::Raise, Some(5.0), 1),
            action("bob", ActionType::Call, Some(3.0), 2),
        ];
        // sb 1 + bb 2 + 5 + 3 = 11; tolerance is 0.1 bb = 0.2
        hand.result.pot_final = Some(11.1);

        let mut errors = Vec::new();
        check_pot(&hand, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_pot_undercount_flagged_at_least_medium() {
        let mut hand = base_hand("001");
        hand.streets.preflop = vec![
            action("alice", ActionType::Bet, Some(10.0), 1),
            action("bob", ActionType::Call, Some(10.0), 2),
        ];
        // Street contributions sum to 23 with blinds; pot reports less
        hand.result.pot_final = Some(15.0);

        let mut errors = Vec::new();
        check_pot(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        // Severity ord runs Critical < High < Medium < Low
        assert!(errors[0].severity <= Severity::Medium);
        assert!(matches!(errors[0].kind, HandErrorKind::PotInconsistency { .. }));
    }

    #[test]
    fn test_pot_includes_antes() {
        let mut hand = base_hand("001");
        hand.blinds.ante = 0.25;
        // sb 1 + bb 2 + ante 0.25*2 = 3.5
        hand.result.pot_final = Some(3.5);

        let mut errors = Vec::new();
        check_pot(&hand, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_stack_mismatch_detected() {
        let mut hand = base_hand("001");
        hand.streets.preflop = vec![action("alice", ActionType::Bet, Some(20.0), 1)];
        hand.players[0].stack_end = Some(95.0); // expected 100 - 20 = 80

        let mut errors = Vec::new();
        check_stacks(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].kind,
            HandErrorKind::StackMismatch { player, .. } if player == "alice"
        ));
    }

    #[test]
    fn test_stack_with_winnings_consistent() {
        let mut hand = base_hand("001");
        hand.streets.preflop = vec![action("alice", ActionType::Bet, Some(20.0), 1)];
        hand.result.winner = Some("alice".to_string());
        hand.result.win_amount = Some(43.0);
        hand.players[0].stack_end = Some(123.0); // 100 - 20 + 43

        let mut errors = Vec::new();
        check_stacks(&hand, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_acting_after_fold_flagged() {
        let mut hand = base_hand("001");
        hand.streets.preflop = vec![action("alice", ActionType::Fold, None, 1)];
        hand.board.flop = vec!["As".to_string(), "7h".to_string(), "2c".to_string()];
        hand.streets.flop = vec![action("alice", ActionType::Bet, Some(5.0), 1)];

        let mut errors = Vec::new();
        check_action_order(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, HandErrorKind::InvalidActionOrder { .. }));
    }

    #[test]
    fn test_non_increasing_sequence_flagged() {
        let mut hand = base_hand("001");
        hand.streets.preflop = vec![
            action("alice", ActionType::Bet, Some(5.0), 2),
            action("bob", ActionType::Call, Some(5.0), 2),
        ];

        let mut errors = Vec::new();
        check_action_order(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_bet_over_stack_flagged_as_ocr() {
        let mut hand = base_hand("001");
        hand.streets.preflop = vec![action("alice", ActionType::Bet, Some(1000.0), 1)];

        let mut errors = Vec::new();
        check_amounts(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category, crate::validator::ErrorCategory::OcrMisread);
    }

    #[test]
    fn test_check_with_amount_flagged_low() {
        let mut hand = base_hand("001");
        hand.streets.flop = vec![action("bob", ActionType::Check, Some(2.0), 1)];
        hand.board.flop = vec!["As".to_string(), "7h".to_string(), "2c".to_string()];

        let mut errors = Vec::new();
        check_amounts(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Low);
    }

    #[test]
    fn test_actions_without_board_cards_suggest_split() {
        let mut hand = base_hand("001");
        hand.streets.turn = vec![action("alice", ActionType::Bet, Some(5.0), 1)];

        let mut errors = Vec::new();
        check_boundaries(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].kind,
            HandErrorKind::SuspectedSplit { street } if street == "turn"
        ));
    }

    #[test]
    fn test_oversized_street_suggests_merge() {
        let mut hand = base_hand("001");
        hand.board.flop = vec!["As".to_string(), "7h".to_string(), "2c".to_string()];
        // 2 players, 7 flop actions > 3 per player
        hand.streets.flop = (1..=7)
            .map(|i| {
                let (player, at) = if i % 2 == 1 {
                    ("alice", ActionType::Bet)
                } else {
                    ("bob", ActionType::Raise)
                };
                action(player, at, Some(i as f64), i)
            })
            .collect();

        let mut errors = Vec::new();
        check_boundaries(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, HandErrorKind::SuspectedMerge { .. }));
    }

    #[test]
    fn test_winner_folded_is_conflict() {
        let mut hand = base_hand("001");
        hand.streets.preflop = vec![action("alice", ActionType::Fold, None, 1)];
        hand.result.winner = Some("alice".to_string());

        let mut errors = Vec::new();
        check_result(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].category,
            crate::validator::ErrorCategory::MultiModalConflict
        );
    }

    #[test]
    fn test_unknown_winner_is_conflict() {
        let mut hand = base_hand("001");
        hand.result.winner = Some("charlie".to_string());

        let mut errors = Vec::new();
        check_result(&hand, &mut errors);
        assert_eq!(errors.len(), 1);
    }
}
