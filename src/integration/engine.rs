//! Trait for neural inference backends.

use ndarray::Array3;

use crate::detection::InferenceOutput;
use crate::preprocess::PlanarTensor;

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the pipeline.
/// The engine must return one output buffer shaped
/// `[1, record_count, record_stride >= 6]` with overlapping detections
/// already suppressed.
///
/// # Example
///
/// ```ignore
/// use trackprep_rs::{InferenceEngine, InferenceOutput, PlanarTensor};
///
/// struct MyEngine {
///     // Your model here
/// }
///
/// impl InferenceEngine for MyEngine {
///     type Error = std::io::Error;
///
///     fn infer(&mut self, input: &PlanarTensor) -> Result<InferenceOutput, Self::Error> {
///         // Run inference on input.as_slice() with shape input.shape()
///         Ok(InferenceOutput::new(vec![], [1, 0, 6]))
///     }
/// }
/// ```
pub trait InferenceEngine {
    /// Error type for inference failures.
    type Error: std::fmt::Display;

    /// Run inference on a `[1, 3, size, size]` planar tensor.
    fn infer(&mut self, input: &PlanarTensor) -> Result<InferenceOutput, Self::Error>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for &mut E {
    type Error = E::Error;

    fn infer(&mut self, input: &PlanarTensor) -> Result<InferenceOutput, Self::Error> {
        (**self).infer(input)
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    type Error = E::Error;

    fn infer(&mut self, input: &PlanarTensor) -> Result<InferenceOutput, Self::Error> {
        (**self).infer(input)
    }
}

/// Helper trait for converting model-specific outputs to [`InferenceOutput`].
///
/// Implement this for your model's output format to enable easy conversion.
pub trait IntoInferenceOutput {
    /// Convert the output into a flat buffer plus shape.
    fn into_inference_output(self) -> InferenceOutput;
}

impl IntoInferenceOutput for InferenceOutput {
    fn into_inference_output(self) -> InferenceOutput {
        self
    }
}

impl IntoInferenceOutput for (Vec<f32>, [usize; 3]) {
    fn into_inference_output(self) -> InferenceOutput {
        InferenceOutput::new(self.0, self.1)
    }
}

impl IntoInferenceOutput for Array3<f32> {
    fn into_inference_output(self) -> InferenceOutput {
        let (batch, count, stride) = self.dim();
        let data = self.iter().copied().collect();
        InferenceOutput::new(data, [batch, count, stride])
    }
}
