//! Decoding of raw inference records into validated boxes.

use tracing::{debug, trace};

use crate::detection::record::{self, DetectionRecord, InferenceOutput, MIN_RECORD_STRIDE};
use crate::detection::validated_box::ValidatedBox;
use crate::error::{PipelineError, PipelineResult};

/// Filters, rescales and clamps raw detection records.
///
/// Low-confidence records, unknown classes and boxes that collapse after
/// clamping are dropped silently; they are normal inference output. Record
/// order is preserved and no suppression of overlapping boxes is done here,
/// the engine is expected to have de-duplicated its output already.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionDecoder {
    stage_size: usize,
    confidence_threshold: f32,
    num_classes: usize,
}

impl DetectionDecoder {
    pub fn new(stage_size: usize, confidence_threshold: f32, num_classes: usize) -> Self {
        Self {
            stage_size,
            confidence_threshold,
            num_classes,
        }
    }

    pub fn stage_size(&self) -> usize {
        self.stage_size
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Decode a validated engine output for a `frame_width x frame_height` frame.
    pub fn decode(
        &self,
        output: &InferenceOutput,
        frame_width: usize,
        frame_height: usize,
    ) -> PipelineResult<Vec<ValidatedBox>> {
        output.validate()?;
        self.decode_raw(
            &output.data,
            output.record_count(),
            output.record_stride(),
            frame_width,
            frame_height,
        )
    }

    /// Decode `record_count` records laid out every `record_stride` values.
    pub fn decode_raw(
        &self,
        raw: &[f32],
        record_count: usize,
        record_stride: usize,
        frame_width: usize,
        frame_height: usize,
    ) -> PipelineResult<Vec<ValidatedBox>> {
        if record_stride < MIN_RECORD_STRIDE {
            return Err(PipelineError::InvalidOutputShape {
                shape: [1, record_count, record_stride],
            });
        }
        record::check_len(raw.len(), record_count, record_stride)?;
        if frame_width == 0 || frame_height == 0 || self.stage_size == 0 {
            return Err(PipelineError::EmptyFrame);
        }

        let scale = Scale {
            x: frame_width as f32 / self.stage_size as f32,
            y: frame_height as f32 / self.stage_size as f32,
            width: frame_width as i64,
            height: frame_height as i64,
        };

        let boxes: Vec<ValidatedBox> = record::records(raw, record_count, record_stride)
            .filter_map(|r| self.decode_record(&r, &scale))
            .collect();
        trace!(
            records = record_count,
            kept = boxes.len(),
            "decoded inference output"
        );
        Ok(boxes)
    }

    fn decode_record(&self, record: &DetectionRecord, scale: &Scale) -> Option<ValidatedBox> {
        // Threshold checks come first only to skip work; `!(a >= b)` also
        // drops NaN confidences.
        if !(record.confidence >= self.confidence_threshold) {
            return None;
        }
        let class_id = record.class_index()?;
        if class_id < 0 || class_id >= self.num_classes as i64 {
            return None;
        }

        // Truncate toward zero, like the integer cast the engine's consumers use.
        let left = (record.x1 * scale.x) as i64;
        let top = (record.y1 * scale.y) as i64;
        let right = (record.x2 * scale.x) as i64;
        let bottom = (record.y2 * scale.y) as i64;

        if scale.needs_clamp(left, top, right, bottom) {
            debug!(left, top, right, bottom, "box extends outside the frame, clamping");
        }

        let left = left.clamp(0, scale.width - 1);
        let top = top.clamp(0, scale.height - 1);
        let right = right.clamp(0, scale.width);
        let bottom = bottom.clamp(0, scale.height);

        if right <= left || bottom <= top {
            debug!(left, top, right, bottom, "dropping degenerate box");
            return None;
        }

        Some(ValidatedBox::new(
            left as u32,
            top as u32,
            right as u32,
            bottom as u32,
            class_id as usize,
            record.confidence,
        ))
    }
}

struct Scale {
    x: f32,
    y: f32,
    width: i64,
    height: i64,
}

impl Scale {
    /// True when clamping to `[0, dim - 1]` (left, top) or `[0, dim]`
    /// (right, bottom) would move any coordinate.
    fn needs_clamp(&self, left: i64, top: i64, right: i64, bottom: i64) -> bool {
        let outside = |start: i64, end: i64, dim: i64| {
            !(0..dim).contains(&start) || !(0..=dim).contains(&end)
        };
        outside(left, right, self.width) || outside(top, bottom, self.height)
    }
}

/// Free-standing form of [`DetectionDecoder::decode_raw`].
#[allow(clippy::too_many_arguments)]
pub fn decode(
    raw: &[f32],
    record_count: usize,
    record_stride: usize,
    frame_width: usize,
    frame_height: usize,
    stage_size: usize,
    confidence_threshold: f32,
    num_classes: usize,
) -> PipelineResult<Vec<ValidatedBox>> {
    DetectionDecoder::new(stage_size, confidence_threshold, num_classes).decode_raw(
        raw,
        record_count,
        record_stride,
        frame_width,
        frame_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> DetectionDecoder {
        DetectionDecoder::new(640, 0.25, 3)
    }

    fn output(records: &[[f32; 6]]) -> InferenceOutput {
        InferenceOutput::from_records(records, 6)
    }

    #[test]
    fn test_rescales_to_frame() {
        let out = output(&[[100.0, 100.0, 540.0, 540.0, 0.9, 1.0]]);
        let boxes = decoder().decode(&out, 1280, 720).unwrap();

        assert_eq!(boxes.len(), 1);
        let b = boxes[0];
        assert_eq!(b.to_tlbr(), [200, 112, 1080, 607]);
        assert_eq!(b.class_id(), 1);
        assert!((b.confidence() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_low_confidence_dropped() {
        let out = output(&[[100.0, 100.0, 540.0, 540.0, 0.1, 1.0]]);
        assert!(decoder().decode(&out, 1280, 720).unwrap().is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let out = output(&[[100.0, 100.0, 540.0, 540.0, 0.25, 0.0]]);
        assert_eq!(decoder().decode(&out, 1280, 720).unwrap().len(), 1);
    }

    #[test]
    fn test_nan_confidence_dropped() {
        let out = output(&[[100.0, 100.0, 540.0, 540.0, f32::NAN, 0.0]]);
        assert!(decoder().decode(&out, 1280, 720).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_class_dropped() {
        let out = output(&[
            [100.0, 100.0, 540.0, 540.0, 0.9, 3.0],
            [100.0, 100.0, 540.0, 540.0, 0.9, -1.0],
            [100.0, 100.0, 540.0, 540.0, 0.9, f32::INFINITY],
        ]);
        assert!(decoder().decode(&out, 1280, 720).unwrap().is_empty());
    }

    #[test]
    fn test_clamps_to_frame_bounds() {
        let out = output(&[[-50.0, -10.0, 700.0, 900.0, 0.9, 0.0]]);
        let boxes = decoder().decode(&out, 640, 480).unwrap();
        // y scale is 0.75: bottom 675 clamps to 480
        assert_eq!(boxes[0].to_tlbr(), [0, 0, 640, 480]);
    }

    #[test]
    fn test_degenerate_dropped() {
        // inverted, zero-width, and entirely above the frame
        let out = output(&[
            [300.0, 100.0, 200.0, 200.0, 0.9, 0.0],
            [100.0, 100.0, 100.0, 200.0, 0.9, 0.0],
            [100.0, -90.0, 200.0, -10.0, 0.9, 0.0],
        ]);
        assert!(decoder().decode(&out, 640, 640).unwrap().is_empty());
    }

    #[test]
    fn test_box_past_right_edge_keeps_one_column() {
        let out = output(&[[700.0, 10.0, 800.0, 20.0, 0.9, 0.0]]);
        let boxes = decoder().decode(&out, 640, 640).unwrap();
        assert_eq!(boxes[0].to_tlbr(), [639, 10, 640, 20]);
    }

    #[test]
    fn test_clamp_detection_matches_clamp_bounds() {
        let scale = Scale {
            x: 1.0,
            y: 1.0,
            width: 640,
            height: 480,
        };
        assert!(!scale.needs_clamp(0, 0, 640, 480));
        assert!(!scale.needs_clamp(639, 479, 639, 479));
        // left == right == width clamps left to width - 1
        assert!(scale.needs_clamp(640, 10, 640, 20));
        assert!(scale.needs_clamp(10, 480, 20, 480));
        assert!(scale.needs_clamp(10, 10, 641, 20));
        assert!(scale.needs_clamp(-1, 10, 20, 20));
        assert!(scale.needs_clamp(10, 10, 20, 481));
    }

    #[test]
    fn test_preserves_order() {
        let out = output(&[
            [10.0, 10.0, 20.0, 20.0, 0.5, 2.0],
            [30.0, 30.0, 40.0, 40.0, 0.1, 0.0],
            [50.0, 50.0, 60.0, 60.0, 0.9, 0.0],
            [0.0, 0.0, 5.0, 5.0, 0.7, 1.0],
        ]);
        let boxes = decoder().decode(&out, 640, 640).unwrap();
        let lefts: Vec<u32> = boxes.iter().map(|b| b.left()).collect();
        assert_eq!(lefts, vec![10, 50, 0]);
    }

    #[test]
    fn test_wide_stride_and_free_function() {
        let raw = vec![
            100.0, 100.0, 540.0, 540.0, 0.9, 1.0, 42.0, //
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ];
        let boxes = decode(&raw, 2, 7, 1280, 720, 640, 0.25, 3).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].to_tlbr(), [200, 112, 1080, 607]);
    }

    #[test]
    fn test_rejects_bad_layout() {
        assert!(matches!(
            decode(&[0.0; 10], 2, 5, 640, 640, 640, 0.25, 3),
            Err(PipelineError::InvalidOutputShape { .. })
        ));
        assert!(matches!(
            decode(&[0.0; 10], 2, 6, 640, 640, 640, 0.25, 3),
            Err(PipelineError::TruncatedOutput { .. })
        ));
        assert!(matches!(
            decode(&[0.0; 6], 1, 6, 0, 640, 640, 0.25, 3),
            Err(PipelineError::EmptyFrame)
        ));
    }
}
