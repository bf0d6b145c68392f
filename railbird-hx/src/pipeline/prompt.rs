//! Prompt assembly for the vision endpoint
//!
//! A request prompt combines the fixed extraction rules, a platform-specific
//! overlay describing the broadcast graphics, and an optional roster of
//! expected player names used as a matching hint. Name matching itself is the
//! model's responsibility, not the client's.

use serde::{Deserialize, Serialize};

/// Broadcast platform whose on-screen graphics the overlay rules describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ept,
    Triton,
    Wsop,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ept => "ept",
            Platform::Triton => "triton",
            Platform::Wsop => "wsop",
        }
    }
}

/// Fixed base extraction rules shared by all platforms
const BASE_RULES: &str = "\
You are reconstructing poker hands from broadcast video frames.
Each image is a cropped region of a frame, labelled with its region name and timestamp.

Extract every complete hand visible in the provided frames and return ONLY a JSON array.
Each element must have this shape:
{
  \"hand_id\": \"001\",
  \"timestamp_seconds\": 0.0,
  \"blinds\": {\"small_blind\": 0, \"big_blind\": 0, \"ante\": 0},
  \"players\": [{\"name\": \"\", \"position\": \"\", \"stack_start\": 0, \"stack_end\": 0, \"hole_cards\": [\"As\", \"Kd\"]}],
  \"streets\": {\"preflop\": [], \"flop\": [], \"turn\": [], \"river\": []},
  \"board\": {\"flop\": [], \"turn\": [], \"river\": []},
  \"result\": {\"winner\": \"\", \"pot_final\": 0},
  \"confidence\": 0.0,
  \"extraction_method\": \"vision\"
}

Rules:
- Actions are {\"player\", \"action_type\", \"amount\", \"sequence\"}; action_type is one of fold, check, call, bet, raise, all-in.
- Cards use two characters: rank 23456789TJQKA and suit s/h/d/c, e.g. \"Th\".
- Number sequence from 1 within each street, in acting order.
- Report confidence in [0,1] honestly; lower it when text is blurry or occluded.
- Do not invent players or actions not visible in the frames.";

/// Platform-specific overlay rules
fn platform_overlay(platform: Platform) -> &'static str {
    match platform {
        Platform::Ept => "\
Platform: EPT broadcast.
- Stack sizes appear in the lower-third player strip, in big blinds.
- The pot total is shown above the board cards, prefixed with 'POT'.
- Hole cards appear beside player names once shown.",
        Platform::Triton => "\
Platform: Triton broadcast.
- Stacks are shown in chips; amounts use k/m suffixes (e.g. 1.2m).
- The ante is posted by the big blind; read it from the blinds banner.
- Player names are upper-case in the side panel.",
        Platform::Wsop => "\
Platform: WSOP broadcast.
- Stacks are shown in chips on the player nameplates.
- Pot size appears below the community cards.
- All-in players are marked with an ALL IN banner.",
    }
}

/// Assemble the full prompt for one reconstruction call
pub fn build_prompt(platform: Platform, known_players: Option<&[String]>) -> String {
    let mut prompt = String::from(BASE_RULES);
    prompt.push_str("\n\n");
    prompt.push_str(platform_overlay(platform));

    if let Some(roster) = known_players {
        if !roster.is_empty() {
            prompt.push_str(
                "\n\nKnown players at this table (prefer exact matches; \
                 map near-misses to the closest roster name):\n",
            );
            for name in roster {
                prompt.push_str("- ");
                prompt.push_str(name);
                prompt.push('\n');
            }
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_base_rules() {
        let prompt = build_prompt(Platform::Ept, None);
        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("action_type"));
    }

    #[test]
    fn test_platform_overlays_differ() {
        let ept = build_prompt(Platform::Ept, None);
        let triton = build_prompt(Platform::Triton, None);
        let wsop = build_prompt(Platform::Wsop, None);

        assert!(ept.contains("EPT"));
        assert!(triton.contains("Triton"));
        assert!(wsop.contains("WSOP"));
        assert_ne!(ept, triton);
        assert_ne!(triton, wsop);
    }

    #[test]
    fn test_roster_appended() {
        let roster = vec!["Ivey".to_string(), "Negreanu".to_string()];
        let prompt = build_prompt(Platform::Triton, Some(&roster));
        assert!(prompt.contains("- Ivey"));
        assert!(prompt.contains("- Negreanu"));
        assert!(prompt.contains("Known players"));
    }

    #[test]
    fn test_empty_roster_omitted() {
        let prompt = build_prompt(Platform::Wsop, Some(&[]));
        assert!(!prompt.contains("Known players"));
    }

    #[test]
    fn test_platform_serde() {
        let p: Platform = serde_json::from_str("\"triton\"").expect("deserialize");
        assert_eq!(p, Platform::Triton);
        assert_eq!(serde_json::to_string(&Platform::Ept).expect("serialize"), "\"ept\"");
    }
}
