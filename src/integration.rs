//! Integration module for connecting video sources, inference backends and
//! renderers with the frame pipeline.
//!
//! This module provides the collaborator traits, the per-frame driver
//! that ties them to the preprocessing and decoding stages, and a replay
//! source/engine pair for recorded inference output.

mod builder;
mod engine;
mod pipeline;
mod renderer;
mod replay;
mod source;

pub use builder::PipelineBuilder;
pub use engine::{InferenceEngine, IntoInferenceOutput};
pub use pipeline::{FramePipeline, RunControl, RunSummary};
pub use renderer::{FrameMeta, JsonLinesRenderer, NullRenderer, Renderer};
pub use replay::{ReplayEngine, ReplayError, ReplaySource, replay};
pub use source::{IterSource, VideoSource};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnEngine, BurnEngineError, BurnModel};
