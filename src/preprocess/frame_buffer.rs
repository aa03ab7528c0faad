//! Bounded ring of recent frames with a running elementwise sum.

use std::mem;

use ndarray::Array3;

use crate::error::{PipelineError, PipelineResult};

/// Fixed-capacity FIFO of widened frames plus their running sum.
///
/// Invariant: `sum` equals the elementwise total of every frame currently
/// held, and at most `capacity` frames are held. Pushing and evicting each
/// cost one elementwise add or subtract, independent of the capacity.
///
/// Sums are exact while every held value is an integer and the total stays
/// below 2^24, i.e. up to [`MAX_AVERAGING_WINDOW`](crate::config::MAX_AVERAGING_WINDOW)
/// byte frames.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    slots: Vec<Array3<f32>>,
    /// Index of the oldest frame once the ring is full.
    head: usize,
    capacity: usize,
    sum: Option<Array3<f32>>,
}

impl FrameBuffer {
    /// Create an empty buffer. A capacity of 0 is treated as 1.
    ///
    /// Slots are allocated as frames arrive, not up front.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::new(),
            head: 0,
            capacity,
            sum: None,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Running elementwise sum of the held frames.
    pub fn sum(&self) -> Option<&Array3<f32>> {
        self.sum.as_ref()
    }

    /// Append a frame, evicting and returning the oldest one if the ring
    /// was already full.
    ///
    /// Fails with `ShapeMismatch`, leaving the buffer untouched, when `frame`
    /// differs in shape from the frames already held.
    pub fn push(&mut self, frame: Array3<f32>) -> PipelineResult<Option<Array3<f32>>> {
        match self.sum.as_mut() {
            None => self.sum = Some(frame.clone()),
            Some(sum) => {
                if sum.dim() != frame.dim() {
                    return Err(PipelineError::ShapeMismatch {
                        expected: sum.dim(),
                        actual: frame.dim(),
                    });
                }
                *sum += &frame;
            }
        }

        if self.slots.len() < self.capacity {
            self.slots.push(frame);
            return Ok(None);
        }

        let evicted = mem::replace(&mut self.slots[self.head], frame);
        if let Some(sum) = self.sum.as_mut() {
            *sum -= &evicted;
        }
        self.head = (self.head + 1) % self.capacity;
        Ok(Some(evicted))
    }

    /// Elementwise mean of the held frames, or `None` when empty.
    pub fn mean(&self) -> Option<Array3<f32>> {
        let count = self.slots.len() as f32;
        self.sum.as_ref().map(|sum| sum / count)
    }

    /// Frames from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Array3<f32>> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
        self.sum = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f32) -> Array3<f32> {
        Array3::from_elem((2, 2, 3), value)
    }

    #[test]
    fn test_fills_then_evicts_fifo() {
        let mut buffer = FrameBuffer::new(3);
        assert!(buffer.push(constant(1.0)).unwrap().is_none());
        assert!(buffer.push(constant(2.0)).unwrap().is_none());
        assert!(buffer.push(constant(3.0)).unwrap().is_none());
        assert_eq!(buffer.len(), 3);

        let evicted = buffer.push(constant(4.0)).unwrap().unwrap();
        assert_eq!(evicted, constant(1.0));
        let evicted = buffer.push(constant(5.0)).unwrap().unwrap();
        assert_eq!(evicted, constant(2.0));
        assert_eq!(buffer.len(), 3);

        let order: Vec<f32> = buffer.iter().map(|f| f[[0, 0, 0]]).collect();
        assert_eq!(order, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_sum_tracks_contents() {
        let mut buffer = FrameBuffer::new(2);
        buffer.push(constant(10.0)).unwrap();
        buffer.push(constant(20.0)).unwrap();
        buffer.push(constant(40.0)).unwrap();

        assert_eq!(buffer.sum().unwrap(), &constant(60.0));
        let recomputed = buffer.iter().fold(constant(0.0), |acc, f| acc + f);
        assert_eq!(buffer.sum().unwrap(), &recomputed);
        assert_eq!(buffer.mean().unwrap(), constant(30.0));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut buffer = FrameBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.push(constant(7.0)).unwrap();
        buffer.push(constant(9.0)).unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.mean().unwrap(), constant(9.0));
    }

    #[test]
    fn test_clear() {
        let mut buffer = FrameBuffer::new(2);
        buffer.push(constant(1.0)).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.sum().is_none());
        assert!(buffer.mean().is_none());
    }

    #[test]
    fn test_rejects_mismatched_shape() {
        let mut buffer = FrameBuffer::new(3);
        buffer.push(constant(1.0)).unwrap();
        let err = buffer.push(Array3::from_elem((3, 2, 3), 1.0)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ShapeMismatch {
                expected: (2, 2, 3),
                actual: (3, 2, 3),
            }
        ));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.sum().unwrap(), &constant(1.0));
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut buffer = FrameBuffer::new(usize::MAX / 2);
        buffer.push(constant(2.0)).unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.mean().unwrap(), constant(2.0));
    }
}
