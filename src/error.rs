//! Error taxonomy for the frame pipeline.

/// Errors raised while processing a single frame or building a pipeline.
///
/// Every variant is fatal to the current frame only. The run loop logs it
/// with the frame index and moves on to the next frame.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A zero-sized frame reached a stage that needs pixels.
    #[error("empty frame")]
    EmptyFrame,

    /// Frame shape differs from the one fixed by the first frame of the stream.
    #[error("frame shape mismatch: expected {expected:?} (h, w, c), got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    /// A channel plane was not laid out contiguously in memory.
    #[error("channel {channel} is not contiguous in memory")]
    NonContiguousChannel { channel: usize },

    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelBufferSize { expected: usize, actual: usize },

    #[error("expected 3 channels per pixel, got {channels}")]
    InvalidChannelCount { channels: usize },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Inference output shape is not `[1, count, stride >= 6]`.
    #[error("invalid inference output shape {shape:?}")]
    InvalidOutputShape { shape: [usize; 3] },

    #[error("inference output truncated: need {expected} values, got {actual}")]
    TruncatedOutput { expected: usize, actual: usize },

    #[error("video source error: {message}")]
    Source { message: String },

    #[error("inference error: {message}")]
    Inference { message: String },

    #[error("render error: {message}")]
    Render { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: msg.into(),
        }
    }

    pub fn source(err: impl std::fmt::Display) -> Self {
        Self::Source {
            message: err.to_string(),
        }
    }

    pub fn inference(err: impl std::fmt::Display) -> Self {
        Self::Inference {
            message: err.to_string(),
        }
    }

    pub fn render(err: impl std::fmt::Display) -> Self {
        Self::Render {
            message: err.to_string(),
        }
    }

    /// True for violations of a stage's input contract, as opposed to
    /// failures reported by an external collaborator.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::EmptyFrame
                | Self::ShapeMismatch { .. }
                | Self::NonContiguousChannel { .. }
                | Self::InvalidChannelCount { .. }
                | Self::PixelBufferSize { .. }
                | Self::InvalidOutputShape { .. }
                | Self::TruncatedOutput { .. }
        )
    }
}
