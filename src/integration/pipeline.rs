//! FramePipeline for running filtering, inference and decoding per frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{info, warn};

use crate::config::{PipelineConfig, ResolvedConfig};
use crate::detection::{DetectionDecoder, ValidatedBox};
use crate::error::{PipelineError, PipelineResult};
use crate::preprocess::{Frame, MedianFilter, TemporalAverager, TensorStager};

use super::{FrameMeta, InferenceEngine, Renderer, VideoSource};

/// Stop conditions checked between frames.
///
/// A frame already in flight always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    stop: Arc<AtomicBool>,
    max_frames: Option<u64>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after this many frames have been read from the source.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Shared flag; setting it to `true` stops the run before the next frame.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_processed: u64,
    pub frames_failed: u64,
    pub detections: u64,
}

/// Per-stream frame pipeline:
/// averaging -> median filter -> staging -> inference -> decoding.
///
/// Owns its temporal window, so each video stream needs its own pipeline.
pub struct FramePipeline<E: InferenceEngine> {
    averager: TemporalAverager,
    median: MedianFilter,
    stager: TensorStager,
    decoder: DetectionDecoder,
    engine: E,
    class_names: Vec<String>,
    progress_interval: u64,
}

impl<E: InferenceEngine> FramePipeline<E> {
    /// Create a pipeline, validating and resolving `config` once.
    pub fn new(engine: E, config: &PipelineConfig) -> PipelineResult<Self> {
        Ok(Self::from_resolved(engine, config.resolve()?))
    }

    pub fn from_resolved(engine: E, config: ResolvedConfig) -> Self {
        info!(
            averaging = ?config.averaging,
            median = ?config.median,
            stage_size = config.stage_size,
            confidence_threshold = config.confidence_threshold,
            num_classes = config.num_classes,
            "frame pipeline configured"
        );
        Self {
            averager: TemporalAverager::new(config.averaging),
            median: MedianFilter::from_setting(config.median),
            stager: TensorStager::new(config.stage_size, config.channel_order),
            decoder: DetectionDecoder::new(
                config.stage_size,
                config.confidence_threshold,
                config.num_classes,
            ),
            engine,
            class_names: config.class_names,
            progress_interval: config.progress_interval,
        }
    }

    /// Run one frame through every stage and return its validated boxes.
    ///
    /// Box coordinates are in `frame`'s pixel space.
    pub fn process_frame(&mut self, frame: &Frame) -> PipelineResult<Vec<ValidatedBox>> {
        let averaged = self.averager.push(frame)?;
        let filtered = self.median.apply(&averaged)?;
        let tensor = self.stager.stage(&filtered)?;
        let output = self
            .engine
            .infer(&tensor)
            .map_err(PipelineError::inference)?;
        self.decoder.decode(&output, frame.width(), frame.height())
    }

    /// Pull frames from `source` until it ends or `control` says stop,
    /// rendering each frame's detections.
    ///
    /// A failing frame (bad input, source, inference or render error) is
    /// logged with its index and counted; the loop always moves on to the
    /// next frame.
    pub fn run<S, R>(&mut self, mut source: S, mut renderer: R, control: &RunControl) -> RunSummary
    where
        S: VideoSource,
        R: Renderer,
    {
        let total = source.frame_count();
        let start = Instant::now();
        let mut summary = RunSummary::default();

        loop {
            if control.is_stop_requested() {
                info!(frame = summary.frames_read, "stop requested");
                break;
            }
            if control
                .max_frames
                .is_some_and(|max| summary.frames_read >= max)
            {
                info!(max_frames = summary.frames_read, "frame limit reached");
                break;
            }
            let Some(next) = source.next_frame() else {
                break;
            };

            summary.frames_read += 1;
            let index = summary.frames_read;
            let result = next
                .map_err(PipelineError::source)
                .and_then(|frame| self.run_frame(&frame, index, total, &mut renderer));

            match result {
                Ok(count) => {
                    summary.frames_processed += 1;
                    summary.detections += count as u64;
                    if self.progress_interval > 0 && index % self.progress_interval == 0 {
                        info!(
                            "Frame {}/{} | Time: {}s | Detections: {}",
                            index,
                            total.map_or_else(|| "?".to_string(), |t| t.to_string()),
                            start.elapsed().as_secs(),
                            count
                        );
                    }
                }
                Err(err) => {
                    summary.frames_failed += 1;
                    warn!(frame = index, error = %err, "frame failed, continuing");
                }
            }
        }

        info!(
            frames_read = summary.frames_read,
            frames_processed = summary.frames_processed,
            frames_failed = summary.frames_failed,
            detections = summary.detections,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "run finished"
        );
        summary
    }

    fn run_frame<R: Renderer>(
        &mut self,
        frame: &Frame,
        index: u64,
        total: Option<u64>,
        renderer: &mut R,
    ) -> PipelineResult<usize> {
        let boxes = self.process_frame(frame)?;
        let meta = FrameMeta {
            index,
            total,
            width: frame.width(),
            height: frame.height(),
        };
        renderer
            .render(frame, &meta, &boxes)
            .map_err(PipelineError::render)?;
        Ok(boxes.len())
    }

    /// Forget buffered frames, e.g. before switching to another stream.
    pub fn reset(&mut self) {
        self.averager.reset();
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Get a reference to the underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Get a mutable reference to the underlying engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn averager(&self) -> &TemporalAverager {
        &self.averager
    }

    pub fn decoder(&self) -> &DetectionDecoder {
        &self.decoder
    }
}
