//! Trait for frame producers.

use crate::preprocess::Frame;

/// A sequence of fixed-shape frames, typically a decoded video.
///
/// `None` from [`next_frame`](Self::next_frame) is the clean end of the
/// stream. `Some(Err(_))` reports one unreadable frame; the pipeline logs it
/// and asks for the next one, so a source must advance past bad frames.
pub trait VideoSource {
    type Error: std::fmt::Display;

    fn next_frame(&mut self) -> Option<Result<Frame, Self::Error>>;

    /// Total frame count, if the source knows it.
    fn frame_count(&self) -> Option<u64> {
        None
    }
}

impl<S: VideoSource + ?Sized> VideoSource for &mut S {
    type Error = S::Error;

    fn next_frame(&mut self) -> Option<Result<Frame, Self::Error>> {
        (**self).next_frame()
    }

    fn frame_count(&self) -> Option<u64> {
        (**self).frame_count()
    }
}

/// Adapts any iterator of frame results into a [`VideoSource`].
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    frames: I,
    frame_count: Option<u64>,
}

impl<I> IterSource<I> {
    pub fn new(frames: I) -> Self {
        Self {
            frames,
            frame_count: None,
        }
    }

    pub fn with_frame_count(mut self, frame_count: u64) -> Self {
        self.frame_count = Some(frame_count);
        self
    }
}

impl<I, E> VideoSource for IterSource<I>
where
    I: Iterator<Item = Result<Frame, E>>,
    E: std::fmt::Display,
{
    type Error = E;

    fn next_frame(&mut self) -> Option<Result<Frame, E>> {
        self.frames.next()
    }

    fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }
}
