//! Replays recorded inference outputs in step with a frame source.
//!
//! The recording holds one JSON `InferenceOutput` per line, one line per
//! source frame. Lines are consumed by the source side, so a frame that
//! fails before inference (unreadable, wrong shape) still uses up its own
//! line and later frames stay aligned with their recordings.

use std::cell::Cell;
use std::io::{BufRead, Lines};
use std::rc::Rc;

use crate::detection::InferenceOutput;
use crate::preprocess::{Frame, PlanarTensor};

use super::{InferenceEngine, VideoSource};

type Slot = Rc<Cell<Option<Result<InferenceOutput, ReplayError>>>>;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("reading recorded outputs: {0}")]
    Io(#[from] std::io::Error),

    #[error("recorded output for frame {frame} (line {line}): {source}")]
    Parse {
        frame: u64,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("no recorded output left for frame {frame}")]
    Exhausted { frame: u64 },

    /// `infer` was called without a frame having been read first.
    #[error("no recorded output pending")]
    NotPending,
}

/// Pair `source` with the recording in `recorded`.
///
/// Feed the returned source and engine to the same
/// [`FramePipeline`](super::FramePipeline).
pub fn replay<S, R>(source: S, recorded: R) -> (ReplaySource<S, R>, ReplayEngine)
where
    S: VideoSource,
    R: BufRead,
{
    let slot = Slot::default();
    let engine = ReplayEngine {
        slot: Rc::clone(&slot),
    };
    let source = ReplaySource {
        source,
        lines: recorded.lines(),
        line_no: 0,
        frame: 0,
        slot,
    };
    (source, engine)
}

/// Wraps a [`VideoSource`], reading one recorded line per frame it yields.
pub struct ReplaySource<S, R> {
    source: S,
    lines: Lines<R>,
    line_no: usize,
    frame: u64,
    slot: Slot,
}

impl<S, R: BufRead> ReplaySource<S, R> {
    fn next_recorded(&mut self) -> Result<InferenceOutput, ReplayError> {
        loop {
            let Some(line) = self.lines.next() else {
                return Err(ReplayError::Exhausted { frame: self.frame });
            };
            let line = line?;
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                frame: self.frame,
                line: self.line_no,
                source,
            });
        }
    }
}

impl<S: VideoSource, R: BufRead> VideoSource for ReplaySource<S, R> {
    type Error = S::Error;

    fn next_frame(&mut self) -> Option<Result<Frame, Self::Error>> {
        let frame = self.source.next_frame()?;
        self.frame += 1;
        let recorded = self.next_recorded();
        self.slot.set(Some(recorded));
        Some(frame)
    }

    fn frame_count(&self) -> Option<u64> {
        self.source.frame_count()
    }
}

/// Answers each inference call with the recording of the current frame.
pub struct ReplayEngine {
    slot: Slot,
}

impl InferenceEngine for ReplayEngine {
    type Error = ReplayError;

    fn infer(&mut self, _input: &PlanarTensor) -> Result<InferenceOutput, Self::Error> {
        self.slot.take().unwrap_or(Err(ReplayError::NotPending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelOrder;
    use crate::detection::ValidatedBox;
    use crate::integration::{FrameMeta, IterSource, PipelineBuilder, Renderer, RunControl};

    #[derive(Default)]
    struct Collect {
        lefts: Vec<(u64, Vec<u32>)>,
    }

    impl Renderer for Collect {
        type Error = std::convert::Infallible;

        fn render(
            &mut self,
            _frame: &Frame,
            meta: &FrameMeta,
            detections: &[ValidatedBox],
        ) -> Result<(), Self::Error> {
            self.lefts
                .push((meta.index, detections.iter().map(|b| b.left()).collect()));
            Ok(())
        }
    }

    fn line(left: f32) -> String {
        format!(r#"{{"data": [{left}, 1, 7, 7, 0.9, 0], "shape": [1, 1, 6]}}"#)
    }

    fn frame() -> Frame {
        Frame::filled(8, 8, [10, 10, 10])
    }

    fn run(frames: Vec<Result<Frame, String>>, recording: &str) -> Vec<(u64, Vec<u32>)> {
        let (source, engine) = replay(IterSource::new(frames.into_iter()), recording.as_bytes());
        let mut pipeline = PipelineBuilder::new()
            .stage_size(8)
            .channel_order(ChannelOrder::Preserve)
            .build(engine)
            .unwrap();
        let mut renderer = Collect::default();
        pipeline.run(source, &mut renderer, &RunControl::new());
        renderer.lefts
    }

    #[test]
    fn test_source_error_keeps_recordings_aligned() {
        let recording = [line(1.0), line(2.0), line(3.0)].join("\n");
        let rendered = run(vec![Ok(frame()), Err("corrupt".into()), Ok(frame())], &recording);
        assert_eq!(rendered, vec![(1, vec![1]), (3, vec![3])]);
    }

    #[test]
    fn test_shape_mismatch_keeps_recordings_aligned() {
        let recording = [line(1.0), line(2.0), line(3.0)].join("\n");
        let frames = vec![Ok(frame()), Ok(Frame::filled(4, 4, [0; 3])), Ok(frame())];
        assert_eq!(run(frames, &recording), vec![(1, vec![1]), (3, vec![3])]);
    }

    #[test]
    fn test_bad_line_fails_only_its_frame() {
        let recording = format!("{}\n\nnot json\n{}\n", line(1.0), line(3.0));
        let frames = vec![Ok(frame()), Ok(frame()), Ok(frame()), Ok(frame())];
        // line 3 is malformed, and the fourth frame has no recording left
        assert_eq!(run(frames, &recording), vec![(1, vec![1]), (3, vec![3])]);
    }

    #[test]
    fn test_infer_without_frame() {
        let recording = line(1.0);
        let (_source, mut engine) = replay(
            IterSource::new(std::iter::empty::<Result<Frame, String>>()),
            recording.as_bytes(),
        );
        let tensor = crate::preprocess::stage(&frame(), 8, ChannelOrder::Preserve).unwrap();
        assert!(matches!(engine.infer(&tensor), Err(ReplayError::NotPending)));
    }
}
