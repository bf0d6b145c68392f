//! Job coordination
//!
//! Owns the job lifecycle: accepts submissions, runs the pipeline segment by
//! segment on a background task, publishes progress to the event bus, and
//! records the terminal state in the registry. Concurrency is bounded by a
//! semaphore; cancellation is cooperative at segment boundaries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use railbird_common::config::HxConfig;
use railbird_common::events::{EventBus, ExtractEvent};
use railbird_common::{retry, Error, Result, RetryPolicy};

use crate::models::{default_regions, Job, JobOutput, JobStatus, RegionSet, SubmitRequest};
use crate::pipeline::cropper;
use crate::pipeline::reconstruct::{EncodedCrop, HandReconstructor};
use crate::pipeline::sampler::{FrameDecoder, FrameSampler};
use crate::pipeline::PipelineError;
use crate::registry::JobRegistry;
use crate::validator::{AnnotatedHand, ErrorReport, Validator};

/// Delay cap for the vision retry backoff
const VISION_MAX_DELAY: Duration = Duration::from_secs(60);
/// Fixed delay between frame decode retries
const DECODE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Split a window into consecutive segments of at most `segment_seconds`.
/// The last segment may be shorter.
pub fn segment_plan(start_time: f64, end_time: f64, segment_seconds: f64) -> Vec<(f64, f64)> {
    if end_time <= start_time || segment_seconds <= 0.0 {
        return Vec::new();
    }
    let mut segments = Vec::new();
    let mut cursor = start_time;
    while cursor < end_time {
        let seg_end = (cursor + segment_seconds).min(end_time);
        segments.push((cursor, seg_end));
        cursor = seg_end;
    }
    segments
}

#[derive(Clone)]
pub struct JobCoordinator {
    config: Arc<HxConfig>,
    registry: JobRegistry,
    event_bus: EventBus,
    decoder: Arc<dyn FrameDecoder>,
    reconstructor: Arc<dyn HandReconstructor>,
    concurrency: Arc<Semaphore>,
    cancellations: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
}

impl JobCoordinator {
    pub fn new(
        config: Arc<HxConfig>,
        registry: JobRegistry,
        event_bus: EventBus,
        decoder: Arc<dyn FrameDecoder>,
        reconstructor: Arc<dyn HandReconstructor>,
    ) -> Self {
        let concurrency = Arc::new(Semaphore::new(config.jobs.max_concurrent_jobs));
        Self {
            config,
            registry,
            event_bus,
            decoder,
            reconstructor,
            concurrency,
            cancellations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Accept a submission. Validation failures return synchronously and no
    /// job record is created. On success the job is PENDING and the pipeline
    /// runs on a background task.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Job> {
        request.validate(self.config.pipeline.max_duration_seconds)?;

        let segments = segment_plan(
            request.start_time,
            request.end_time,
            self.config.pipeline.segment_seconds,
        );
        let job = Job::new(segments.len());
        let job_id = job.id;

        self.registry.insert(job.clone()).await;

        let token = CancellationToken::new();
        self.cancellations.write().await.insert(job_id, token.clone());

        self.event_bus.emit_lossy(ExtractEvent::JobSubmitted {
            job_id,
            video_source: request.video_source.clone(),
            total_segments: segments.len(),
            timestamp: Utc::now(),
        });

        tracing::info!(
            job_id = %job_id,
            video_source = %request.video_source,
            total_segments = segments.len(),
            duration_seconds = request.duration_seconds(),
            "Job submitted"
        );

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run(job_id, request, segments, token).await;
        });

        Ok(job)
    }

    /// Request cancellation. An in-flight segment finishes first; the job
    /// then transitions to FAILURE at the next segment boundary.
    pub async fn cancel(&self, job_id: Uuid) -> Result<Job> {
        let job = self
            .registry
            .get(job_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", job_id)))?;

        if job.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "Job {} is already {}",
                job_id,
                job.status.as_str()
            )));
        }

        if let Some(token) = self.cancellations.read().await.get(&job_id) {
            token.cancel();
        }
        tracing::info!(job_id = %job_id, "Cancellation requested");
        Ok(job)
    }

    #[cfg(test)]
    pub(crate) async fn cancellation_count(&self) -> usize {
        self.cancellations.read().await.len()
    }

    async fn run(
        &self,
        job_id: Uuid,
        request: SubmitRequest,
        segments: Vec<(f64, f64)>,
        token: CancellationToken,
    ) {
        // Queue behind the concurrency limit, but honor cancellation while
        // waiting.
        let _permit = tokio::select! {
            permit = self.concurrency.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => {
                    self.finish_failure(job_id, 0, "Job queue shut down", &[]).await;
                    return;
                }
            },
            _ = token.cancelled() => {
                self.finish_failure(job_id, 0, "Job cancelled before start", &[]).await;
                return;
            }
        };

        if let Err(e) = self
            .registry
            .update(job_id, |job| {
                job.transition_to(JobStatus::Executing);
            })
            .await
        {
            tracing::error!(job_id = %job_id, error = %e, "Job vanished before start");
            self.cancellations.write().await.remove(&job_id);
            return;
        }

        let regions: RegionSet = request.regions.clone().unwrap_or_else(default_regions);
        let pipeline = &self.config.pipeline;
        let vision = &self.config.vision;

        let sampler = FrameSampler::new(
            Arc::clone(&self.decoder),
            RetryPolicy::fixed(pipeline.decode_max_retries, DECODE_RETRY_DELAY),
        );
        let vision_policy = RetryPolicy::exponential(
            vision.max_retries,
            Duration::from_millis(vision.retry_initial_delay_ms),
            VISION_MAX_DELAY,
            2.0,
        );
        let validator = Validator::new();

        let mut annotated: Vec<AnnotatedHand> = Vec::new();
        let mut accepted: Vec<AnnotatedHand> = Vec::new();
        let total_segments = segments.len();

        for (index, (seg_start, seg_end)) in segments.into_iter().enumerate() {
            // Cancellation is honored between segments only; an in-flight
            // segment runs to completion so no partial segment state leaks
            if token.is_cancelled() {
                self.finish_failure(job_id, index, "Job cancelled", &annotated)
                    .await;
                return;
            }

            self.log(job_id, format!(
                "Segment {}/{}: sampling {:.1}s-{:.1}s",
                index + 1,
                total_segments,
                seg_start,
                seg_end
            ));

            let segment_work = async {
                let frames = sampler
                    .sample(
                        &request.video_source,
                        seg_start,
                        seg_end,
                        pipeline.frame_interval_seconds,
                        pipeline.frame_width,
                        pipeline.frame_height,
                    )
                    .await
                    .map_err(|e| format!("Frame sampling failed: {}", e))?;

                let crops = cropper::crop_all(&frames, &regions)
                    .map_err(|e| format!("Region cropping failed: {}", e))?;

                let encoded =
                    encode_crops(&crops).map_err(|e| format!("Image encoding failed: {}", e))?;

                retry::retry(
                    "vision_reconstruct",
                    &vision_policy,
                    PipelineError::is_retryable_vision_call,
                    || {
                        self.reconstructor.reconstruct(
                            &encoded,
                            request.platform,
                            request.known_players.as_deref(),
                        )
                    },
                )
                .await
                .map_err(|e| format!("Hand reconstruction failed: {}", e))
            };

            let hands = match segment_work.await {
                Ok(hands) => hands,
                Err(message) => {
                    self.finish_failure(job_id, index, message, &annotated).await;
                    return;
                }
            };

            let (segment_annotated, _) = validator.validate(hands);
            for hand in segment_annotated {
                if !hand.rejected {
                    accepted.push(hand.clone());
                }
                annotated.push(hand);
            }

            let snapshot = match self
                .registry
                .update(job_id, |job| {
                    job.update_progress(index + 1, accepted.len());
                })
                .await
            {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Job vanished mid-run");
                    self.cancellations.write().await.remove(&job_id);
                    return;
                }
            };

            self.event_bus.emit_lossy(ExtractEvent::JobProgress {
                job_id,
                status: snapshot.status.as_str().to_string(),
                progress_percent: snapshot.progress_percent,
                processed_segments: snapshot.processed_segments,
                total_segments,
                hands_found: snapshot.hands_found,
                message: format!("Segment {}/{} complete", index + 1, total_segments),
                timestamp: Utc::now(),
            });
        }

        self.finish_success(job_id, accepted, &annotated).await;
    }

    async fn finish_success(
        &self,
        job_id: Uuid,
        accepted: Vec<AnnotatedHand>,
        all_annotated: &[AnnotatedHand],
    ) {
        let report = ErrorReport::build(all_annotated);
        let total_errors = report.total_errors;

        let mut hands: Vec<_> = accepted.into_iter().map(|a| a.hand).collect();
        hands.sort_by(|a, b| {
            a.timestamp_seconds
                .partial_cmp(&b.timestamp_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let hands_found = hands.len();

        let result = self
            .registry
            .update(job_id, |job| {
                job.hands_found = hands_found;
                job.output = Some(JobOutput {
                    hands: std::mem::take(&mut hands),
                    report: report.clone(),
                });
                job.transition_to(JobStatus::Success);
            })
            .await;

        self.cancellations.write().await.remove(&job_id);

        match result {
            Ok(job) => {
                let duration_seconds =
                    (Utc::now() - job.created_at).num_seconds().max(0) as u64;
                tracing::info!(
                    job_id = %job_id,
                    hands_found,
                    total_errors,
                    duration_seconds,
                    "Job completed"
                );
                self.event_bus.emit_lossy(ExtractEvent::JobCompleted {
                    job_id,
                    hands_found,
                    total_errors,
                    duration_seconds,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Job vanished at completion");
            }
        }
    }

    /// Terminal failure path. No hands are released; the validation report
    /// collected so far is kept for diagnostics.
    async fn finish_failure(
        &self,
        job_id: Uuid,
        processed_segments: usize,
        message: impl Into<String>,
        annotated: &[AnnotatedHand],
    ) {
        let message = message.into();
        let report = ErrorReport::build(annotated);

        let result = self
            .registry
            .update(job_id, |job| {
                job.output = Some(JobOutput {
                    hands: Vec::new(),
                    report: report.clone(),
                });
                job.fail(message.clone());
            })
            .await;

        self.cancellations.write().await.remove(&job_id);

        if result.is_err() {
            tracing::error!(job_id = %job_id, "Job vanished at failure");
            return;
        }

        tracing::warn!(job_id = %job_id, processed_segments, error = %message, "Job failed");
        self.event_bus.emit_lossy(ExtractEvent::JobFailed {
            job_id,
            error: message,
            processed_segments,
            timestamp: Utc::now(),
        });
    }

    fn log(&self, job_id: Uuid, message: String) {
        tracing::debug!(job_id = %job_id, "{}", message);
        self.event_bus.emit_lossy(ExtractEvent::JobLog {
            job_id,
            message,
            timestamp: Utc::now(),
        });
    }
}

/// Flatten region crops into the ordered payload for one vision call.
fn encode_crops(
    crops: &std::collections::BTreeMap<String, Vec<cropper::CroppedFrame>>,
) -> std::result::Result<Vec<EncodedCrop>, PipelineError> {
    let mut encoded = Vec::new();
    for (region, frames) in crops {
        for frame in frames {
            encoded.push(EncodedCrop {
                region: region.clone(),
                timestamp_seconds: frame.timestamp_seconds,
                data: cropper::encode_png_base64(frame)?,
            });
        }
    }
    Ok(encoded)
}
