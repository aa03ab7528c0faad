//! Resize, reorder, normalize and repack a frame into a planar tensor.

use ndarray::{Array3, Array4, ArrayView2, Axis};

use crate::config::ChannelOrder;
use crate::error::{PipelineError, PipelineResult};
use crate::preprocess::frame::{CHANNELS, Frame};

/// Flat `[1, 3, size, size]` tensor in channel-planar order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarTensor {
    data: Vec<f32>,
    size: usize,
}

impl PlanarTensor {
    /// Canonical shape descriptor `[1, 3, size, size]`.
    pub fn shape(&self) -> [usize; 4] {
        [1, CHANNELS, self.size, self.size]
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Contiguous values of one channel plane.
    pub fn plane(&self, channel: usize) -> &[f32] {
        let len = self.size * self.size;
        &self.data[channel * len..(channel + 1) * len]
    }

    pub fn to_array(&self) -> Array4<f32> {
        let len = self.size * self.size;
        Array4::from_shape_fn(self.shape(), |(_, c, y, x)| {
            self.data[c * len + y * self.size + x]
        })
    }
}

/// Prepares filtered frames for an inference engine with a square input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorStager {
    target_size: usize,
    channel_order: ChannelOrder,
}

impl TensorStager {
    pub fn new(target_size: usize, channel_order: ChannelOrder) -> Self {
        Self {
            target_size,
            channel_order,
        }
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    pub fn stage(&self, frame: &Frame) -> PipelineResult<PlanarTensor> {
        stage(frame, self.target_size, self.channel_order)
    }
}

/// Resize to `target_size` square, reorder channels, scale to [0, 1] and
/// repack into planar layout.
pub fn stage(
    frame: &Frame,
    target_size: usize,
    channel_order: ChannelOrder,
) -> PipelineResult<PlanarTensor> {
    if frame.is_empty() || target_size == 0 {
        return Err(PipelineError::EmptyFrame);
    }

    let resized = resize_bilinear(frame, target_size, target_size)?;
    let reordered = reorder_channels(&resized, channel_order);
    let normalized = reordered.as_array().mapv(|v| f32::from(v) / 255.0);

    // Split into owned planes; the packer verifies each is contiguous.
    let planes: Vec<_> = (0..CHANNELS)
        .map(|c| normalized.index_axis(Axis(2), c).to_owned())
        .collect();
    let views: Vec<ArrayView2<'_, f32>> = planes.iter().map(|p| p.view()).collect();
    let data = pack_planar(&views)?;

    Ok(PlanarTensor {
        data,
        size: target_size,
    })
}

/// Concatenate channel planes. Fails with `NonContiguousChannel` when a
/// plane is not stored in standard row-major order.
pub fn pack_planar(planes: &[ArrayView2<'_, f32>]) -> PipelineResult<Vec<f32>> {
    let total = planes.iter().map(|p| p.len()).sum();
    let mut data = Vec::with_capacity(total);
    for (channel, plane) in planes.iter().enumerate() {
        let slice = plane
            .as_slice()
            .ok_or(PipelineError::NonContiguousChannel { channel })?;
        data.extend_from_slice(slice);
    }
    Ok(data)
}

/// Output channel `i` takes source channel `order.permutation()[i]`.
pub fn reorder_channels(frame: &Frame, order: ChannelOrder) -> Frame {
    let perm = order.permutation();
    if perm == [0, 1, 2] {
        return frame.clone();
    }
    let src = frame.view();
    let (h, w, _) = src.dim();
    Frame::from_array_unchecked(Array3::from_shape_fn((h, w, CHANNELS), |(y, x, c)| {
        src[[y, x, perm[c]]]
    }))
}

/// Bilinear resize with pixel-center alignment and clamped borders.
pub fn resize_bilinear(frame: &Frame, width: usize, height: usize) -> PipelineResult<Frame> {
    if frame.is_empty() || width == 0 || height == 0 {
        return Err(PipelineError::EmptyFrame);
    }
    let (src_h, src_w, _) = frame.shape();
    if (src_w, src_h) == (width, height) {
        return Ok(frame.clone());
    }

    let xs = sample_positions(src_w, width);
    let ys = sample_positions(src_h, height);
    let src = frame.view();

    let out = Array3::from_shape_fn((height, width, CHANNELS), |(y, x, c)| {
        let (y0, y1, fy) = ys[y];
        let (x0, x1, fx) = xs[x];
        let top = lerp(f32::from(src[[y0, x0, c]]), f32::from(src[[y0, x1, c]]), fx);
        let bottom = lerp(f32::from(src[[y1, x0, c]]), f32::from(src[[y1, x1, c]]), fx);
        lerp(top, bottom, fy).round().clamp(0.0, 255.0) as u8
    });
    Ok(Frame::from_array_unchecked(out))
}

/// For each destination index: the two source neighbours and the weight of
/// the second one.
fn sample_positions(src_len: usize, dst_len: usize) -> Vec<(usize, usize, f32)> {
    let scale = src_len as f32 / dst_len as f32;
    let last = src_len - 1;
    (0..dst_len)
        .map(|d| {
            let pos = ((d as f32 + 0.5) * scale - 0.5).max(0.0);
            let i0 = (pos.floor() as usize).min(last);
            let i1 = (i0 + 1).min(last);
            (i0, i1, pos - i0 as f32)
        })
        .collect()
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_output_shape_and_length() {
        let frame = Frame::filled(16, 9, [0, 128, 255]);
        let tensor = stage(&frame, 8, ChannelOrder::Preserve).unwrap();
        assert_eq!(tensor.shape(), [1, 3, 8, 8]);
        assert_eq!(tensor.as_slice().len(), 3 * 8 * 8);
    }

    #[test]
    fn test_planar_normalized_values() {
        let frame = Frame::filled(4, 4, [0, 51, 255]);
        let tensor = stage(&frame, 4, ChannelOrder::Preserve).unwrap();
        assert!(tensor.plane(0).iter().all(|&v| v == 0.0));
        assert!(tensor.plane(1).iter().all(|&v| (v - 0.2).abs() < 1e-6));
        assert!(tensor.plane(2).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_swap_red_blue() {
        let frame = Frame::filled(2, 2, [10, 20, 30]);
        let swapped = reorder_channels(&frame, ChannelOrder::SwapRedBlue);
        assert_eq!(swapped.pixel(1, 1), [30, 20, 10]);

        let tensor = stage(&frame, 2, ChannelOrder::SwapRedBlue).unwrap();
        assert!((tensor.plane(0)[0] - 30.0 / 255.0).abs() < 1e-6);
        assert!((tensor.plane(2)[0] - 10.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_custom_order() {
        let frame = Frame::filled(1, 1, [1, 2, 3]);
        let out = reorder_channels(&frame, ChannelOrder::Custom([1, 2, 0]));
        assert_eq!(out.pixel(0, 0), [2, 3, 1]);
    }

    #[test]
    fn test_resize_constant_stays_constant() {
        let frame = Frame::filled(7, 3, [40, 90, 140]);
        let out = resize_bilinear(&frame, 5, 5).unwrap();
        assert_eq!(out.shape(), (5, 5, 3));
        assert_eq!(out, Frame::filled(5, 5, [40, 90, 140]));
    }

    #[test]
    fn test_resize_downscale_by_two_averages_pairs() {
        // Halving a row maps each output onto the midpoint of two inputs.
        let raw = [0u8, 100, 200, 250]
            .iter()
            .flat_map(|&v| [v, v, v])
            .collect();
        let frame = Frame::from_raw(4, 1, raw).unwrap();
        let out = resize_bilinear(&frame, 2, 1).unwrap();
        assert_eq!(out.pixel(0, 0)[0], 50);
        assert_eq!(out.pixel(1, 0)[0], 225);
    }

    #[test]
    fn test_pack_planar_rejects_non_contiguous() {
        let plane = Array2::<f32>::zeros((4, 4));
        let transposed = plane.t();
        let err = pack_planar(&[plane.view(), transposed]).unwrap_err();
        assert!(matches!(err, PipelineError::NonContiguousChannel { channel: 1 }));
    }

    #[test]
    fn test_to_array_matches_planes() {
        let frame = Frame::filled(3, 3, [0, 255, 0]);
        let tensor = stage(&frame, 3, ChannelOrder::Preserve).unwrap();
        let array = tensor.to_array();
        assert_eq!(array[[0, 1, 2, 2]], 1.0);
        assert_eq!(array[[0, 0, 2, 2]], 0.0);
    }

    #[test]
    fn test_empty_frame_rejected() {
        let frame = Frame::filled(0, 0, [0, 0, 0]);
        assert!(matches!(
            stage(&frame, 4, ChannelOrder::Preserve),
            Err(PipelineError::EmptyFrame)
        ));
    }
}
