//! Pipeline configuration and its one-time resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Largest averaging window whose byte sums stay exact in `f32`
/// (`255 * 65_793 = 2^24 - 1`).
pub const MAX_AVERAGING_WINDOW: usize = 65_793;

/// Largest median kernel side.
pub const MAX_MEDIAN_WINDOW: usize = 255;

/// Channel reordering applied while staging a frame for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrder {
    /// Keep the source channel order.
    Preserve,
    /// Swap channel 0 and channel 2 (BGR <-> RGB).
    #[default]
    SwapRedBlue,
    /// Output channel `i` takes source channel `order[i]`.
    Custom([usize; 3]),
}

impl ChannelOrder {
    /// Source channel index for each output channel.
    pub fn permutation(&self) -> [usize; 3] {
        match self {
            Self::Preserve => [0, 1, 2],
            Self::SwapRedBlue => [2, 1, 0],
            Self::Custom(order) => *order,
        }
    }

    fn validate(&self) -> PipelineResult<()> {
        let order = self.permutation();
        let mut seen = [false; 3];
        for &c in &order {
            if c >= 3 || seen[c] {
                return Err(PipelineError::invalid_config(format!(
                    "channel order {order:?} is not a permutation of [0, 1, 2]"
                )));
            }
            seen[c] = true;
        }
        Ok(())
    }
}

/// Configuration for a [`FramePipeline`](crate::FramePipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frame count for temporal smoothing. Absent or <= 1 disables it.
    pub averaging_window: Option<usize>,
    /// Median kernel size. Absent or <= 1 disables it.
    pub median_window: Option<usize>,
    pub confidence_threshold: f32,
    /// Side of the square inference input.
    pub stage_size: usize,
    pub num_classes: usize,
    pub channel_order: ChannelOrder,
    /// Optional display names, indexed by class id.
    pub class_names: Vec<String>,
    /// Frames between progress log lines; 0 disables them.
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            averaging_window: None,
            median_window: None,
            confidence_threshold: 0.25,
            stage_size: 640,
            num_classes: 3,
            channel_order: ChannelOrder::default(),
            class_names: vec!["airplanes".into(), "birds".into(), "kites".into()],
            progress_interval: 30,
        }
    }
}

/// A window option after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSetting {
    Disabled,
    /// Always >= 2.
    Frames(usize),
}

impl WindowSetting {
    pub fn from_option(value: Option<usize>) -> Self {
        match value {
            Some(n) if n > 1 => Self::Frames(n),
            _ => Self::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Frames(_))
    }
}

/// Validated configuration with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub averaging: WindowSetting,
    pub median: WindowSetting,
    pub confidence_threshold: f32,
    pub stage_size: usize,
    pub num_classes: usize,
    pub channel_order: ChannelOrder,
    pub class_names: Vec<String>,
    pub progress_interval: u64,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate and resolve optional values. Called once per pipeline.
    pub fn resolve(&self) -> PipelineResult<ResolvedConfig> {
        let threshold = self.confidence_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(PipelineError::invalid_config(format!(
                "confidence_threshold must be in [0, 1], got {threshold}"
            )));
        }
        if self.stage_size == 0 {
            return Err(PipelineError::invalid_config("stage_size must be positive"));
        }
        if self.num_classes == 0 {
            return Err(PipelineError::invalid_config("num_classes must be positive"));
        }
        if !self.class_names.is_empty() && self.class_names.len() != self.num_classes {
            return Err(PipelineError::invalid_config(format!(
                "{} class names given for {} classes",
                self.class_names.len(),
                self.num_classes
            )));
        }
        self.channel_order.validate()?;
        check_window("averaging_window", self.averaging_window, MAX_AVERAGING_WINDOW)?;
        check_window("median_window", self.median_window, MAX_MEDIAN_WINDOW)?;

        Ok(ResolvedConfig {
            averaging: WindowSetting::from_option(self.averaging_window),
            median: WindowSetting::from_option(self.median_window),
            confidence_threshold: threshold,
            stage_size: self.stage_size,
            num_classes: self.num_classes,
            channel_order: self.channel_order,
            class_names: self.class_names.clone(),
            progress_interval: self.progress_interval,
        })
    }
}

fn check_window(name: &str, value: Option<usize>, max: usize) -> PipelineResult<()> {
    match value {
        Some(n) if n > max => Err(PipelineError::invalid_config(format!(
            "{name} must be at most {max}, got {n}"
        ))),
        _ => Ok(()),
    }
}
