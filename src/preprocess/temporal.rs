//! Moving-average filter over the most recent frames.

use ndarray::Array3;

use crate::config::WindowSetting;
use crate::error::{PipelineError, PipelineResult};
use crate::preprocess::frame::Frame;
use crate::preprocess::frame_buffer::FrameBuffer;

/// Temporal smoother producing one averaged frame per input frame.
///
/// Each video stream needs its own instance; the window is per-stream state.
#[derive(Debug, Clone)]
pub struct TemporalAverager {
    window: WindowSetting,
    buffer: Option<FrameBuffer>,
    /// `(height, width, channels)` fixed by the first frame.
    shape: Option<(usize, usize, usize)>,
}

impl TemporalAverager {
    pub fn new(window: WindowSetting) -> Self {
        let buffer = match window {
            WindowSetting::Frames(n) => Some(FrameBuffer::new(n)),
            WindowSetting::Disabled => None,
        };
        Self {
            window,
            buffer,
            shape: None,
        }
    }

    /// Shorthand for `new(WindowSetting::from_option(window))`.
    pub fn with_window(window: Option<usize>) -> Self {
        Self::new(WindowSetting::from_option(window))
    }

    pub fn window(&self) -> WindowSetting {
        self.window
    }

    /// Frames currently contributing to the average.
    pub fn buffered(&self) -> usize {
        self.buffer.as_ref().map_or(0, FrameBuffer::len)
    }

    /// Push a frame and return the average of the current window.
    ///
    /// With averaging disabled the frame is returned unchanged and nothing
    /// is buffered.
    pub fn push(&mut self, frame: &Frame) -> PipelineResult<Frame> {
        if frame.is_empty() {
            return Err(PipelineError::EmptyFrame);
        }
        self.check_shape(frame)?;

        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(frame.clone());
        };

        buffer.push(frame.as_array().mapv(f32::from))?;
        let mean = buffer.mean().ok_or(PipelineError::EmptyFrame)?;
        Ok(Frame::from_array_unchecked(to_bytes(&mean)))
    }

    /// Drop buffered frames and forget the established shape.
    pub fn reset(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.clear();
        }
        self.shape = None;
    }

    fn check_shape(&mut self, frame: &Frame) -> PipelineResult<()> {
        let actual = frame.shape();
        match self.shape {
            None => {
                self.shape = Some(actual);
                Ok(())
            }
            Some(expected) if expected == actual => Ok(()),
            Some(expected) => Err(PipelineError::ShapeMismatch { expected, actual }),
        }
    }
}

/// Round to nearest (ties to even) and saturate into the byte range.
fn to_bytes(values: &Array3<f32>) -> Array3<u8> {
    values.mapv(|v| v.round_ties_even().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(value: u8) -> Frame {
        Frame::filled(4, 3, [value, value, value])
    }

    #[test]
    fn test_disabled_is_identity() {
        for window in [None, Some(0), Some(1)] {
            let mut averager = TemporalAverager::with_window(window);
            let frame = Frame::from_raw(1, 1, vec![10, 20, 30]).unwrap();
            assert_eq!(averager.push(&frame).unwrap(), frame);
            assert_eq!(averager.push(&frame).unwrap(), frame);
            assert_eq!(averager.buffered(), 0);
        }
    }

    #[test]
    fn test_average_of_partial_window() {
        let mut averager = TemporalAverager::with_window(Some(4));
        averager.push(&gray(10)).unwrap();
        let avg = averager.push(&gray(20)).unwrap();
        assert_eq!(avg, gray(15));
        let avg = averager.push(&gray(60)).unwrap();
        assert_eq!(avg, gray(30));
    }

    #[test]
    fn test_oldest_frames_excluded() {
        let mut averager = TemporalAverager::with_window(Some(2));
        averager.push(&gray(100)).unwrap();
        averager.push(&gray(0)).unwrap();
        let avg = averager.push(&gray(50)).unwrap();
        assert_eq!(avg, gray(25));
        assert_eq!(averager.buffered(), 2);
    }

    #[test]
    fn test_no_overflow_at_full_intensity() {
        let mut averager = TemporalAverager::with_window(Some(8));
        let mut last = None;
        for _ in 0..20 {
            last = Some(averager.push(&gray(255)).unwrap());
        }
        assert_eq!(last.unwrap(), gray(255));
    }

    #[test]
    fn test_rounds_to_nearest() {
        let mut averager = TemporalAverager::with_window(Some(3));
        averager.push(&gray(0)).unwrap();
        averager.push(&gray(1)).unwrap();
        let avg = averager.push(&gray(1)).unwrap();
        // 2 / 3 rounds up
        assert_eq!(avg, gray(1));
    }

    #[test]
    fn test_empty_frame_rejected() {
        let mut averager = TemporalAverager::with_window(Some(3));
        let empty = Frame::filled(0, 0, [0, 0, 0]);
        assert!(matches!(
            averager.push(&empty),
            Err(PipelineError::EmptyFrame)
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut averager = TemporalAverager::with_window(Some(3));
        averager.push(&gray(1)).unwrap();
        let other = Frame::filled(5, 3, [1, 1, 1]);
        assert!(matches!(
            averager.push(&other),
            Err(PipelineError::ShapeMismatch {
                expected: (3, 4, 3),
                actual: (3, 5, 3)
            })
        ));
        // the bad frame did not disturb the window
        assert_eq!(averager.buffered(), 1);

        averager.reset();
        assert!(averager.push(&other).is_ok());
    }
}
