//! Builder for creating FramePipeline objects.

use crate::config::{ChannelOrder, PipelineConfig};
use crate::error::PipelineResult;

use super::{FramePipeline, InferenceEngine};

/// Builder for creating a [`FramePipeline`] from individual options.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one loaded from JSON.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Set the temporal averaging window in frames (`None` or <= 1 disables it).
    pub fn averaging_window(mut self, window: Option<usize>) -> Self {
        self.config.averaging_window = window;
        self
    }

    /// Set the median kernel size (`None` or <= 1 disables it).
    pub fn median_window(mut self, window: Option<usize>) -> Self {
        self.config.median_window = window;
        self
    }

    /// Set the confidence threshold for keeping detections.
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    /// Set the side of the square inference input.
    pub fn stage_size(mut self, size: usize) -> Self {
        self.config.stage_size = size;
        self
    }

    /// Set the class count and drop class names that no longer match it.
    pub fn num_classes(mut self, num_classes: usize) -> Self {
        self.config.num_classes = num_classes;
        if self.config.class_names.len() != num_classes {
            self.config.class_names.clear();
        }
        self
    }

    /// Set class names; the class count follows their number.
    pub fn class_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.class_names = names.into_iter().map(Into::into).collect();
        self.config.num_classes = self.config.class_names.len();
        self
    }

    pub fn channel_order(mut self, order: ChannelOrder) -> Self {
        self.config.channel_order = order;
        self
    }

    /// Frames between progress log lines; 0 disables them.
    pub fn progress_interval(mut self, frames: u64) -> Self {
        self.config.progress_interval = frames;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate the options and build the pipeline around `engine`.
    pub fn build<E: InferenceEngine>(self, engine: E) -> PipelineResult<FramePipeline<E>> {
        FramePipeline::new(engine, &self.config)
    }
}
