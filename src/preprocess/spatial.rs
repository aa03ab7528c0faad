//! Square-window median filter.

use ndarray::{Array3, ArrayView3};

use crate::config::{MAX_MEDIAN_WINDOW, WindowSetting};
use crate::error::{PipelineError, PipelineResult};
use crate::preprocess::frame::{CHANNELS, Frame};

/// Force the low bit on: 4 -> 5, 3 -> 3, 1 -> 1, 0 -> 1.
#[inline]
pub fn normalize_kernel(window_size: usize) -> usize {
    window_size | 1
}

/// Per-channel median filter over a `kernel x kernel` window.
///
/// Pixels outside the frame replicate the nearest edge pixel, so border
/// outputs are medians over a window padded with repeated edge values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedianFilter {
    kernel: usize,
}

impl MedianFilter {
    /// `window_size` is normalized to an odd size; 1 makes the filter a copy.
    /// Kernels above [`MAX_MEDIAN_WINDOW`] are rejected by [`apply`](Self::apply).
    pub fn new(window_size: usize) -> Self {
        Self {
            kernel: normalize_kernel(window_size),
        }
    }

    pub fn from_setting(setting: WindowSetting) -> Self {
        match setting {
            WindowSetting::Frames(n) => Self::new(n),
            WindowSetting::Disabled => Self::new(1),
        }
    }

    #[inline]
    pub fn kernel(&self) -> usize {
        self.kernel
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.kernel <= 1
    }

    pub fn apply(&self, frame: &Frame) -> PipelineResult<Frame> {
        if frame.is_empty() {
            return Err(PipelineError::EmptyFrame);
        }
        if self.is_identity() {
            return Ok(frame.clone());
        }
        if self.kernel > MAX_MEDIAN_WINDOW {
            return Err(PipelineError::invalid_config(format!(
                "median kernel {} exceeds {MAX_MEDIAN_WINDOW}",
                self.kernel
            )));
        }
        Ok(Frame::from_array_unchecked(median_blur(
            frame.view(),
            self.kernel,
        )))
    }
}

/// Median-filter `frame` with a square window of `window_size` (normalized to odd).
pub fn median_filter(frame: &Frame, window_size: usize) -> PipelineResult<Frame> {
    MedianFilter::new(window_size).apply(frame)
}

/// Sliding-histogram median: each output costs one column add, one column
/// remove and a walk over at most 256 bins.
fn median_blur(src: ArrayView3<'_, u8>, kernel: usize) -> Array3<u8> {
    let (height, width, _) = src.dim();
    let radius = (kernel / 2) as isize;
    let rank = (kernel * kernel) / 2;
    let clamp_row = |r: isize| r.clamp(0, height as isize - 1) as usize;
    let clamp_col = |c: isize| c.clamp(0, width as isize - 1) as usize;

    let mut out = Array3::<u8>::zeros((height, width, CHANNELS));
    let mut hist = [0u32; 256];

    for c in 0..CHANNELS {
        for y in 0..height {
            let rows: Vec<usize> = (-radius..=radius)
                .map(|dy| clamp_row(y as isize + dy))
                .collect();

            hist.fill(0);
            for dx in -radius..=radius {
                let col = clamp_col(dx);
                for &row in &rows {
                    hist[src[[row, col, c]] as usize] += 1;
                }
            }
            out[[y, 0, c]] = hist_median(&hist, rank);

            for x in 1..width {
                let leaving = clamp_col(x as isize - radius - 1);
                let entering = clamp_col(x as isize + radius);
                for &row in &rows {
                    hist[src[[row, leaving, c]] as usize] -= 1;
                    hist[src[[row, entering, c]] as usize] += 1;
                }
                out[[y, x, c]] = hist_median(&hist, rank);
            }
        }
    }
    out
}

#[inline]
fn hist_median(hist: &[u32; 256], rank: usize) -> u8 {
    let mut seen = 0usize;
    for (value, &count) in hist.iter().enumerate() {
        seen += count as usize;
        if seen > rank {
            return value as u8;
        }
    }
    u8::MAX
}
