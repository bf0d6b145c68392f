//! Percentage-based crop regions
//!
//! Regions are configured as percentages of the frame so one region set works
//! across resolutions. Pixel math happens at crop time against the actual
//! frame dimensions.

use railbird_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named rectangle within a frame, in percent of frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
}

/// Pixel-space rectangle computed from a Region for a concrete frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Validate percent bounds: offsets in [0,100], extents in (0,100]
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.x_percent) || !in_range(self.y_percent) {
            return Err(Error::InvalidInput(format!(
                "Region offset out of [0,100]: x={} y={}",
                self.x_percent, self.y_percent
            )));
        }
        if self.width_percent <= 0.0
            || self.width_percent > 100.0
            || self.height_percent <= 0.0
            || self.height_percent > 100.0
        {
            return Err(Error::InvalidInput(format!(
                "Region extent out of (0,100]: w={} h={}",
                self.width_percent, self.height_percent
            )));
        }
        Ok(())
    }

    /// Deterministic pixel rectangle: round(percent/100 * dimension).
    ///
    /// Does not bounds-check against the frame; the cropper fails fast on
    /// out-of-bounds rectangles instead of clamping.
    pub fn pixel_rect(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let px = |percent: f64, dim: u32| (percent / 100.0 * dim as f64).round() as u32;
        PixelRect {
            x: px(self.x_percent, frame_width),
            y: px(self.y_percent, frame_height),
            width: px(self.width_percent, frame_width),
            height: px(self.height_percent, frame_height),
        }
    }
}

/// Named region configuration applied to every sampled frame
pub type RegionSet = BTreeMap<String, Region>;

/// Default broadcast layout: player stats strip and board/pot area
pub fn default_regions() -> RegionSet {
    let mut regions = RegionSet::new();
    regions.insert(
        "player-stats".to_string(),
        Region {
            x_percent: 7.8,
            y_percent: 69.4,
            width_percent: 23.4,
            height_percent: 20.8,
        },
    );
    regions.insert(
        "board-cards".to_string(),
        Region {
            x_percent: 31.3,
            y_percent: 13.9,
            width_percent: 37.5,
            height_percent: 27.8,
        },
    );
    regions
}

/// Validate every region in a set
pub fn validate_regions(regions: &RegionSet) -> Result<()> {
    for (name, region) in regions {
        region
            .validate()
            .map_err(|e| Error::InvalidInput(format!("Region '{}': {}", name, e)))?;
    }
    Ok(())
}
