//! Raw inference output and the fixed-width records inside it.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Minimum values per record: x1, y1, x2, y2, confidence, class id.
pub const MIN_RECORD_STRIDE: usize = 6;

/// One raw detection in stage-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionRecord {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    /// Class id as emitted by the engine (a float holding an integer).
    pub class_id: f32,
}

impl DetectionRecord {
    /// Read the first six values of `values`.
    #[inline]
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        match values {
            [x1, y1, x2, y2, confidence, class_id, ..] => Some(Self {
                x1: *x1,
                y1: *y1,
                x2: *x2,
                y2: *y2,
                confidence: *confidence,
                class_id: *class_id,
            }),
            _ => None,
        }
    }

    /// Class id truncated toward zero; `None` when it is not finite.
    #[inline]
    pub fn class_index(&self) -> Option<i64> {
        self.class_id
            .is_finite()
            .then(|| self.class_id.trunc() as i64)
    }
}

/// Flat output buffer plus its `[batch, record_count, record_stride]` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutput {
    pub data: Vec<f32>,
    pub shape: [usize; 3],
}

impl InferenceOutput {
    pub fn new(data: Vec<f32>, shape: [usize; 3]) -> Self {
        Self { data, shape }
    }

    /// Build an output holding `records`, each padded to `stride` values.
    pub fn from_records(records: &[[f32; 6]], stride: usize) -> Self {
        let stride = stride.max(MIN_RECORD_STRIDE);
        let mut data = vec![0.0; records.len() * stride];
        for (chunk, record) in data.chunks_mut(stride).zip(records) {
            chunk[..MIN_RECORD_STRIDE].copy_from_slice(record);
        }
        Self {
            data,
            shape: [1, records.len(), stride],
        }
    }

    #[inline]
    pub fn record_count(&self) -> usize {
        self.shape[1]
    }

    #[inline]
    pub fn record_stride(&self) -> usize {
        self.shape[2]
    }

    /// Check the shape contract: one image, `stride >= 6`, enough data.
    pub fn validate(&self) -> PipelineResult<()> {
        let [batch, count, stride] = self.shape;
        if batch != 1 || stride < MIN_RECORD_STRIDE {
            return Err(PipelineError::InvalidOutputShape { shape: self.shape });
        }
        check_len(self.data.len(), count, stride)
    }

    /// Records in emission order. Call [`validate`](Self::validate) first.
    pub fn records(&self) -> impl Iterator<Item = DetectionRecord> + '_ {
        records(&self.data, self.record_count(), self.record_stride())
    }
}

pub(crate) fn check_len(len: usize, count: usize, stride: usize) -> PipelineResult<()> {
    let expected = count
        .checked_mul(stride)
        .ok_or(PipelineError::InvalidOutputShape {
            shape: [1, count, stride],
        })?;
    if len < expected {
        return Err(PipelineError::TruncatedOutput {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Iterate `count` records of `stride` values from the start of `data`.
pub fn records(
    data: &[f32],
    count: usize,
    stride: usize,
) -> impl Iterator<Item = DetectionRecord> + '_ {
    data.chunks(stride.max(1))
        .take(count)
        .filter_map(DetectionRecord::from_slice)
}
