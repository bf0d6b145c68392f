//! Data model for the extraction pipeline

pub mod hand;
pub mod job;
pub mod region;

pub use hand::{
    Action, ActionType, Blinds, Board, CandidateHand, HandResult, Player, Street, StreetActions,
};
pub use job::{Job, JobOutput, JobStatus, StatusTransition};
pub use region::{default_regions, validate_regions, PixelRect, Region, RegionSet};

use railbird_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::prompt::Platform;

/// Job submission request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Video source handed to the frame decoder (URL or path)
    pub video_source: String,
    /// Window start within the video, in seconds
    pub start_time: f64,
    /// Window end within the video, in seconds
    pub end_time: f64,
    /// Broadcast platform selecting the prompt overlay
    pub platform: Platform,
    /// Optional roster of expected player names, used as a matching hint
    #[serde(default)]
    pub known_players: Option<Vec<String>>,
    /// Optional region override; defaults to the standard broadcast layout
    #[serde(default)]
    pub regions: Option<RegionSet>,
}

impl SubmitRequest {
    /// Validate request bounds before any job exists.
    ///
    /// The duration cap is a hard precondition: requests exceeding it fail
    /// synchronously and never reach PENDING.
    pub fn validate(&self, max_duration_seconds: f64) -> Result<()> {
        if self.video_source.trim().is_empty() {
            return Err(Error::InvalidInput("video_source is required".to_string()));
        }
        if self.start_time < 0.0 {
            return Err(Error::InvalidInput(format!(
                "start_time must be non-negative, got {}",
                self.start_time
            )));
        }
        if self.end_time <= self.start_time {
            return Err(Error::InvalidInput(format!(
                "end_time ({}) must be after start_time ({})",
                self.end_time, self.start_time
            )));
        }
        let duration = self.end_time - self.start_time;
        if duration > max_duration_seconds {
            return Err(Error::InvalidInput(format!(
                "Requested window of {:.1}s exceeds the {:.0}s maximum",
                duration, max_duration_seconds
            )));
        }
        if let Some(regions) = &self.regions {
            validate_regions(regions)?;
        }
        Ok(())
    }

    pub fn duration_seconds(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: f64, end: f64) -> SubmitRequest {
        SubmitRequest {
            video_source: "https://example.com/broadcast".to_string(),
            start_time: start,
            end_time: end,
            platform: Platform::Ept,
            known_players: None,
            regions: None,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request(10.0, 100.0).validate(300.0).is_ok());
    }

    #[test]
    fn test_rejects_inverted_window() {
        assert!(request(100.0, 100.0).validate(300.0).is_err());
        assert!(request(100.0, 50.0).validate(300.0).is_err());
    }

    #[test]
    fn test_rejects_over_cap() {
        assert!(request(0.0, 301.0).validate(300.0).is_err());
        assert!(request(0.0, 300.0).validate(300.0).is_ok());
    }

    #[test]
    fn test_rejects_empty_source() {
        let mut req = request(0.0, 60.0);
        req.video_source = "  ".to_string();
        assert!(req.validate(300.0).is_err());
    }

    #[test]
    fn test_rejects_bad_region_override() {
        let mut req = request(0.0, 60.0);
        let mut regions = RegionSet::new();
        regions.insert(
            "bogus".to_string(),
            Region {
                x_percent: 150.0,
                y_percent: 0.0,
                width_percent: 10.0,
                height_percent: 10.0,
            },
        );
        req.regions = Some(regions);
        assert!(req.validate(300.0).is_err());
    }
}
