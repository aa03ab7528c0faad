//! Per-frame preprocessing: temporal averaging, median filtering and
//! staging into the planar tensor an inference engine expects.

mod frame;
mod frame_buffer;
mod spatial;
mod stager;
mod temporal;

pub use frame::{CHANNELS, Frame};
pub use frame_buffer::FrameBuffer;
pub use spatial::{MedianFilter, median_filter, normalize_kernel};
pub use stager::{
    PlanarTensor, TensorStager, pack_planar, reorder_channels, resize_bilinear, stage,
};
pub use temporal::TemporalAverager;
