//! Interleaved 3-channel 8-bit frame.

use ndarray::{Array3, ArrayView3};

use crate::error::{PipelineError, PipelineResult};

/// Channels per pixel.
pub const CHANNELS: usize = 3;

/// One decoded image, stored as `(height, width, channel)` bytes.
///
/// Every stage produces a new `Frame`; frames are never mutated across
/// stage boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Array3<u8>,
}

impl Frame {
    /// Wrap an `(height, width, 3)` array.
    pub fn new(data: Array3<u8>) -> PipelineResult<Self> {
        let channels = data.dim().2;
        if channels != CHANNELS {
            return Err(PipelineError::InvalidChannelCount { channels });
        }
        Ok(Self { data })
    }

    /// Build a frame from interleaved bytes in row-major order.
    pub fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> PipelineResult<Self> {
        let expected = width * height * CHANNELS;
        let actual = pixels.len();
        Array3::from_shape_vec((height, width, CHANNELS), pixels)
            .map(|data| Self { data })
            .map_err(|_| PipelineError::PixelBufferSize { expected, actual })
    }

    /// Frame with every pixel set to `pixel`.
    pub fn filled(width: usize, height: usize, pixel: [u8; CHANNELS]) -> Self {
        Self {
            data: Array3::from_shape_fn((height, width, CHANNELS), |(_, _, c)| pixel[c]),
        }
    }

    pub(crate) fn from_array_unchecked(data: Array3<u8>) -> Self {
        debug_assert_eq!(data.dim().2, CHANNELS);
        Self { data }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// `(height, width, channels)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; CHANNELS] {
        [
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        ]
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array3<u8> {
        &self.data
    }

    pub fn into_array(self) -> Array3<u8> {
        self.data
    }

    /// Interleaved bytes in row-major order.
    pub fn to_raw(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_layout() {
        let frame = Frame::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 1);
        assert_eq!(frame.pixel(0, 0), [1, 2, 3]);
        assert_eq!(frame.pixel(1, 0), [4, 5, 6]);
        assert_eq!(frame.to_raw(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_from_raw_wrong_length() {
        let err = Frame::from_raw(2, 2, vec![0; 5]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PixelBufferSize {
                expected: 12,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_rejects_wrong_channel_count() {
        let err = Frame::new(Array3::zeros((2, 2, 4))).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidChannelCount { channels: 4 }));
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::new(Array3::zeros((0, 0, 3))).unwrap();
        assert!(frame.is_empty());
    }
}
