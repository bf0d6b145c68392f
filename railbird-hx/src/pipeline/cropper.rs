//! Region cropping
//!
//! Pure pixel math over sampled frames. Out-of-bounds rectangles fail fast
//! rather than clamping; a silently clamped crop would misalign the region
//! content the vision model is told to expect.

use std::collections::BTreeMap;
use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, ImageFormat};

use super::sampler::Frame;
use super::PipelineError;
use crate::models::{Region, RegionSet};

/// One (frame x region) crop. Lifetime ends once encoded for transmission.
#[derive(Clone)]
pub struct CroppedFrame {
    pub source_frame_index: usize,
    pub timestamp_seconds: f64,
    pub region_name: String,
    pub pixels: DynamicImage,
}

impl std::fmt::Debug for CroppedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CroppedFrame")
            .field("source_frame_index", &self.source_frame_index)
            .field("timestamp_seconds", &self.timestamp_seconds)
            .field("region_name", &self.region_name)
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .finish()
    }
}

/// Crop one region out of one frame.
///
/// Pixel rectangle is `round(percent/100 * dimension)` per axis. The
/// operation is deterministic and idempotent for the same frame + region.
pub fn crop(frame: &Frame, region_name: &str, region: &Region) -> Result<CroppedFrame, PipelineError> {
    let rect = region.pixel_rect(frame.width, frame.height);

    let right = rect.x.checked_add(rect.width);
    let bottom = rect.y.checked_add(rect.height);
    let in_bounds = matches!((right, bottom), (Some(r), Some(b)) if r <= frame.width && b <= frame.height);
    if !in_bounds || rect.width == 0 || rect.height == 0 {
        return Err(PipelineError::RegionOutOfBounds {
            region: region_name.to_string(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            frame_width: frame.width,
            frame_height: frame.height,
        });
    }

    let pixels = frame
        .pixels
        .crop_imm(rect.x, rect.y, rect.width, rect.height);

    Ok(CroppedFrame {
        source_frame_index: frame.index,
        timestamp_seconds: frame.timestamp_seconds,
        region_name: region_name.to_string(),
        pixels,
    })
}

/// Apply every configured region to every frame.
///
/// Returns region name -> crops ordered by source frame. Each (frame, region)
/// pair is independent; any single failure aborts the segment because it is a
/// configuration bug, not a transient condition.
pub fn crop_all(
    frames: &[Frame],
    regions: &RegionSet,
) -> Result<BTreeMap<String, Vec<CroppedFrame>>, PipelineError> {
    let mut out: BTreeMap<String, Vec<CroppedFrame>> = BTreeMap::new();

    for (name, region) in regions {
        let mut crops = Vec::with_capacity(frames.len());
        for frame in frames {
            crops.push(crop(frame, name, region)?);
        }
        out.insert(name.clone(), crops);
    }

    Ok(out)
}

/// Encode a crop as PNG bytes for transmission.
pub fn encode_png(cropped: &CroppedFrame) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Cursor::new(Vec::new());
    cropped
        .pixels
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| PipelineError::ImageEncode(format!("PNG encode failed: {}", e)))?;
    Ok(buf.into_inner())
}

/// PNG bytes base64-encoded for the vision request payload.
pub fn encode_png_base64(cropped: &CroppedFrame) -> Result<String, PipelineError> {
    let png = encode_png(cropped)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame(width: u32, height: u32) -> Frame {
        Frame {
            index: 3,
            timestamp_seconds: 6.0,
            width,
            height,
            pixels: DynamicImage::new_rgb8(width, height),
        }
    }

    fn region(x: f64, y: f64, w: f64, h: f64) -> Region {
        Region {
            x_percent: x,
            y_percent: y,
            width_percent: w,
            height_percent: h,
        }
    }

    #[test]
    fn test_crop_dimensions_match_formula() {
        let frame = test_frame(1280, 720);
        let r = region(10.0, 20.0, 25.0, 50.0);

        let cropped = crop(&frame, "player-stats", &r).expect("crop");
        // round(25/100*1280)=320, round(50/100*720)=360
        assert_eq!(cropped.pixels.width(), 320);
        assert_eq!(cropped.pixels.height(), 360);
        assert_eq!(cropped.source_frame_index, 3);
        assert_eq!(cropped.timestamp_seconds, 6.0);
        assert_eq!(cropped.region_name, "player-stats");
    }

    #[test]
    fn test_crop_is_idempotent() {
        let frame = test_frame(640, 360);
        let r = region(5.0, 5.0, 40.0, 40.0);

        let a = crop(&frame, "board", &r).expect("crop a");
        let b = crop(&frame, "board", &r).expect("crop b");
        assert_eq!(a.pixels.width(), b.pixels.width());
        assert_eq!(a.pixels.height(), b.pixels.height());
        assert_eq!(a.pixels.as_bytes(), b.pixels.as_bytes());
    }

    #[test]
    fn test_crop_full_frame() {
        let frame = test_frame(100, 50);
        let r = region(0.0, 0.0, 100.0, 100.0);

        let cropped = crop(&frame, "full", &r).expect("crop");
        assert_eq!(cropped.pixels.width(), 100);
        assert_eq!(cropped.pixels.height(), 50);
    }

    #[test]
    fn test_crop_out_of_bounds_fails_fast() {
        let frame = test_frame(100, 100);
        // 60% offset + 60% width = 120% of the frame
        let r = region(60.0, 0.0, 60.0, 50.0);

        let result = crop(&frame, "overflow", &r);
        match result {
            Err(PipelineError::RegionOutOfBounds { region, .. }) => {
                assert_eq!(region, "overflow");
            }
            other => panic!("expected RegionOutOfBounds, got {:?}", other.map(|c| c.region_name)),
        }
    }

    #[test]
    fn test_crop_all_applies_every_region_to_every_frame() {
        let frames = vec![test_frame(200, 100), test_frame(200, 100)];
        let mut regions = RegionSet::new();
        regions.insert("a".to_string(), region(0.0, 0.0, 50.0, 50.0));
        regions.insert("b".to_string(), region(50.0, 50.0, 50.0, 50.0));

        let crops = crop_all(&frames, &regions).expect("crop_all");
        assert_eq!(crops.len(), 2);
        assert_eq!(crops["a"].len(), 2);
        assert_eq!(crops["b"].len(), 2);
    }

    #[test]
    fn test_crop_all_fails_on_any_bad_region() {
        let frames = vec![test_frame(100, 100)];
        let mut regions = RegionSet::new();
        regions.insert("ok".to_string(), region(0.0, 0.0, 50.0, 50.0));
        regions.insert("bad".to_string(), region(90.0, 0.0, 50.0, 50.0));

        assert!(crop_all(&frames, &regions).is_err());
    }

    #[test]
    fn test_png_round_trip_preserves_dimensions() {
        let frame = test_frame(320, 180);
        let r = region(25.0, 25.0, 50.0, 50.0);
        let cropped = crop(&frame, "board", &r).expect("crop");

        let png = encode_png(&cropped).expect("encode");
        let decoded = image::load_from_memory(&png).expect("decode");
        assert_eq!(decoded.width(), cropped.pixels.width());
        assert_eq!(decoded.height(), cropped.pixels.height());
    }

    #[test]
    fn test_base64_encoding_is_decodable() {
        let frame = test_frame(64, 64);
        let r = region(0.0, 0.0, 100.0, 100.0);
        let cropped = crop(&frame, "full", &r).expect("crop");

        let b64 = encode_png_base64(&cropped).expect("encode");
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .expect("base64 decode");
        let decoded = image::load_from_memory(&bytes).expect("png decode");
        assert_eq!(decoded.width(), 64);
    }
}
