//! Sinks for per-frame detection results.

use std::convert::Infallible;
use std::io::Write;

use serde::Serialize;

use crate::detection::ValidatedBox;
use crate::preprocess::Frame;

/// Metadata passed alongside each rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameMeta {
    /// 1-based position in the stream.
    pub index: u64,
    pub total: Option<u64>,
    pub width: usize,
    pub height: usize,
}

/// Consumer of validated detections. Purely a sink: nothing it returns
/// other than an error feeds back into the pipeline.
pub trait Renderer {
    type Error: std::fmt::Display;

    /// `frame` is the original, unfiltered frame.
    fn render(
        &mut self,
        frame: &Frame,
        meta: &FrameMeta,
        detections: &[ValidatedBox],
    ) -> Result<(), Self::Error>;
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    type Error = R::Error;

    fn render(
        &mut self,
        frame: &Frame,
        meta: &FrameMeta,
        detections: &[ValidatedBox],
    ) -> Result<(), Self::Error> {
        (**self).render(frame, meta, detections)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    type Error = Infallible;

    fn render(&mut self, _: &Frame, _: &FrameMeta, _: &[ValidatedBox]) -> Result<(), Infallible> {
        Ok(())
    }
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    #[serde(flatten)]
    meta: &'a FrameMeta,
    detections: Vec<LabelledBox<'a>>,
}

#[derive(Serialize)]
struct LabelledBox<'a> {
    #[serde(flatten)]
    bbox: &'a ValidatedBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<&'a str>,
    label: String,
}

/// Writes one JSON object per frame, one per line.
pub struct JsonLinesRenderer<W: Write> {
    writer: W,
    class_names: Vec<String>,
}

impl<W: Write> JsonLinesRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            class_names: Vec::new(),
        }
    }

    /// Attach a `class_name` field to each box whose id has a name. Every box
    /// also carries a display `label`.
    pub fn with_class_names(mut self, class_names: Vec<String>) -> Self {
        self.class_names = class_names;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Renderer for JsonLinesRenderer<W> {
    type Error = serde_json::Error;

    fn render(
        &mut self,
        _frame: &Frame,
        meta: &FrameMeta,
        detections: &[ValidatedBox],
    ) -> Result<(), Self::Error> {
        let record = FrameRecord {
            meta,
            detections: detections
                .iter()
                .map(|bbox| LabelledBox {
                    bbox,
                    class_name: self.class_names.get(bbox.class_id()).map(String::as_str),
                    label: bbox.label(&self.class_names),
                })
                .collect(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(serde_json::Error::io)
    }
}
