//! Video frame preprocessing and detection post-processing for object
//! tracking.
//!
//! Per frame: temporal averaging over a sliding window, median filtering,
//! staging into a planar `[1, 3, size, size]` tensor, an external inference
//! call, then decoding of the raw records into [`ValidatedBox`]es clamped to
//! the source frame.

pub mod config;
pub mod detection;
pub mod error;
pub mod integration;
pub mod logging;
pub mod preprocess;

pub use config::{
    ChannelOrder, MAX_AVERAGING_WINDOW, MAX_MEDIAN_WINDOW, PipelineConfig, ResolvedConfig,
    WindowSetting,
};
pub use detection::{DetectionDecoder, DetectionRecord, InferenceOutput, ValidatedBox};
pub use error::{PipelineError, PipelineResult};
pub use integration::{
    FrameMeta, FramePipeline, InferenceEngine, IntoInferenceOutput, IterSource,
    JsonLinesRenderer, NullRenderer, PipelineBuilder, Renderer, ReplayEngine, ReplayError,
    ReplaySource, RunControl, RunSummary, VideoSource,
};
pub use preprocess::{
    Frame, FrameBuffer, MedianFilter, PlanarTensor, TemporalAverager, TensorStager,
};

#[cfg(feature = "burn-backend")]
pub use integration::{BurnEngine, BurnEngineError, BurnModel};
