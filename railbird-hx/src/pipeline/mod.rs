//! The staged extraction pipeline: frame sampling, region cropping, prompt
//! assembly, and vision-assisted hand reconstruction.

pub mod cropper;
pub mod prompt;
pub mod reconstruct;
pub mod sampler;

use thiserror::Error;

/// Call-failure taxonomy for pipeline stages.
///
/// Data-quality findings are not errors at this level; those are HandError
/// entries produced by the validator and never abort a call.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Decoder could not seek/read the video source
    #[error("Decode error: {0}")]
    Decode(String),

    /// Crop rectangle falls outside the frame. Failing fast beats silent
    /// clamping, which would corrupt region alignment downstream.
    #[error(
        "Region '{region}' out of bounds: rect {x},{y} {width}x{height} exceeds frame {frame_width}x{frame_height}"
    )]
    RegionOutOfBounds {
        region: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    /// Vision response was not parseable JSON, even after fenced-block
    /// extraction
    #[error("Response parse error: {0}")]
    ResponseParse(String),

    /// Vision response parsed but the top level was not an array of hands
    #[error("Schema error: {0}")]
    Schema(String),

    /// Connection-level failure talking to an external service
    #[error("Network error: {0}")]
    Network(String),

    /// Per-call timeout exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Vision endpoint signalled rate limiting or overload
    #[error("Rate limited by vision endpoint: {0}")]
    RateLimited(String),

    /// Image encoding failed
    #[error("Image encode error: {0}")]
    ImageEncode(String),
}

impl PipelineError {
    /// Retry predicate for frame decode calls: network-level trouble only.
    pub fn is_transient_for_decode(&self) -> bool {
        matches!(
            self,
            PipelineError::Network(_) | PipelineError::Timeout(_)
        )
    }

    /// Retry predicate for vision calls: network trouble plus rate-limit and
    /// overload signals. Parse and schema failures are retried as a whole
    /// call by the coordinator's policy, not here.
    pub fn is_transient_for_vision(&self) -> bool {
        matches!(
            self,
            PipelineError::Network(_)
                | PipelineError::Timeout(_)
                | PipelineError::RateLimited(_)
        )
    }

    /// Retry predicate for the coordinator's whole-call vision retry. A
    /// malformed response is fatal for that one call but the model may well
    /// produce parseable output on a fresh attempt, so the full request is
    /// worth repeating.
    pub fn is_retryable_vision_call(&self) -> bool {
        self.is_transient_for_vision()
            || matches!(
                self,
                PipelineError::ResponseParse(_) | PipelineError::Schema(_)
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_transience() {
        assert!(PipelineError::Network("reset".into()).is_transient_for_decode());
        assert!(PipelineError::Timeout("30s".into()).is_transient_for_decode());
        assert!(!PipelineError::Decode("bad stream".into()).is_transient_for_decode());
        // Rate limiting is a vision concern, not a decode concern
        assert!(!PipelineError::RateLimited("429".into()).is_transient_for_decode());
    }

    #[test]
    fn test_vision_transience() {
        assert!(PipelineError::RateLimited("429".into()).is_transient_for_vision());
        assert!(PipelineError::Timeout("120s".into()).is_transient_for_vision());
        assert!(!PipelineError::ResponseParse("garbage".into()).is_transient_for_vision());
        assert!(!PipelineError::Schema("not an array".into()).is_transient_for_vision());
    }

    #[test]
    fn test_whole_call_retry_covers_malformed_responses() {
        assert!(PipelineError::ResponseParse("garbage".into()).is_retryable_vision_call());
        assert!(PipelineError::Schema("not an array".into()).is_retryable_vision_call());
        assert!(PipelineError::RateLimited("429".into()).is_retryable_vision_call());
        // Cropping bugs are configuration errors, never retried
        assert!(!PipelineError::ImageEncode("png".into()).is_retryable_vision_call());
        assert!(!PipelineError::Decode("bad stream".into()).is_retryable_vision_call());
    }
}
