//! Burn inference backend for object detection.
//!
//! This module provides a `BurnEngine` that implements `InferenceEngine`
//! for running detection models built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use trackprep_rs::{BurnEngine, BurnModel};
//! use burn::backend::NdArray;
//!
//! // Implement BurnModel for your detection model
//! struct MyYoloModel { /* ... */ }
//!
//! impl BurnModel<NdArray> for MyYoloModel {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> burn::tensor::Tensor<NdArray, 3> {
//!         // Run inference, returning [1, records, 6]
//!     }
//! }
//!
//! let model = MyYoloModel::load("model.bin");
//! let engine = BurnEngine::new(model, Default::default());
//! ```

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use super::{InferenceEngine, IntoInferenceOutput};
use crate::detection::{InferenceOutput, MIN_RECORD_STRIDE};
use crate::preprocess::PlanarTensor;

/// Error type for Burn inference failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BurnEngineError {
    /// Input tensor does not match the model's input size.
    #[error("invalid input dimensions: expected {expected:?}, got {got:?}")]
    InvalidInputDimensions {
        expected: [usize; 4],
        got: [usize; 4],
    },
    /// Model output could not be read back as `f32`.
    #[error("postprocessing error: {0}")]
    PostprocessingError(String),
    /// Model output is not `[batch, records, stride >= 6]`.
    #[error("invalid output dimensions {0:?}")]
    InvalidOutputDimensions([usize; 3]),
}

/// Trait for Burn-based detection models.
///
/// Implement this trait for your specific model architecture.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Run forward pass on the input tensor.
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape [1, 3, size, size], values in [0, 1]
    ///
    /// # Returns
    /// Tensor of shape [1, records, stride] with rows
    /// `[x1, y1, x2, y2, confidence, class_id, ...]`, after suppression.
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 3>;

    /// Get the expected input size (square side).
    fn input_size(&self) -> usize {
        640 // Default YOLO input size
    }
}

/// Burn-based inference engine implementing `InferenceEngine`.
pub struct BurnEngine<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
}

impl<B: Backend, M: BurnModel<B>> BurnEngine<B, M> {
    /// Create a new Burn engine with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Copy a staged tensor onto the device.
    pub fn to_device_tensor(&self, input: &PlanarTensor) -> Result<Tensor<B, 4>, BurnEngineError> {
        let size = self.model.input_size();
        let expected = [1, 3, size, size];
        if input.shape() != expected {
            return Err(BurnEngineError::InvalidInputDimensions {
                expected,
                got: input.shape(),
            });
        }
        let data = TensorData::new(input.as_slice().to_vec(), input.shape());
        Ok(Tensor::<B, 4>::from_data(data, &self.device))
    }

    /// Read the model output back into a flat host buffer.
    fn postprocess(&self, output: Tensor<B, 3>) -> Result<InferenceOutput, BurnEngineError> {
        let dims = output.dims();
        if dims[2] < MIN_RECORD_STRIDE {
            return Err(BurnEngineError::InvalidOutputDimensions(dims));
        }
        let values = output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| BurnEngineError::PostprocessingError(format!("{e:?}")))?;
        Ok((values, dims).into_inference_output())
    }
}

impl<B: Backend, M: BurnModel<B>> InferenceEngine for BurnEngine<B, M> {
    type Error = BurnEngineError;

    fn infer(&mut self, input: &PlanarTensor) -> Result<InferenceOutput, Self::Error> {
        let tensor = self.to_device_tensor(input)?;
        let output = self.model.forward(tensor);
        self.postprocess(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelOrder;
    use crate::preprocess::{Frame, stage};
    use burn::backend::NdArray;

    /// Emits one box covering the input's center quarter, with the mean
    /// of channel 0 as confidence.
    struct CenterModel;

    impl BurnModel<NdArray> for CenterModel {
        fn forward(&self, input: Tensor<NdArray, 4>) -> Tensor<NdArray, 3> {
            let device = input.device();
            let confidence = input
                .narrow(1, 0, 1)
                .mean()
                .into_data()
                .to_vec::<f32>()
                .unwrap()[0];
            let row = TensorData::new(vec![2.0, 2.0, 6.0, 6.0, confidence, 0.0], [1, 1, 6]);
            Tensor::from_data(row, &device)
        }

        fn input_size(&self) -> usize {
            8
        }
    }

    #[test]
    fn test_burn_engine_round_trip() {
        let mut engine = BurnEngine::<NdArray, _>::new(CenterModel, Default::default());
        let tensor = stage(&Frame::filled(8, 8, [255, 0, 0]), 8, ChannelOrder::Preserve).unwrap();
        let output = engine.infer(&tensor).unwrap();

        assert_eq!(output.shape, [1, 1, 6]);
        assert_eq!(&output.data[..4], &[2.0, 2.0, 6.0, 6.0]);
        assert!((output.data[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_burn_engine_rejects_wrong_size() {
        let mut engine = BurnEngine::<NdArray, _>::new(CenterModel, Default::default());
        let tensor = stage(&Frame::filled(8, 8, [0, 0, 0]), 4, ChannelOrder::Preserve).unwrap();
        assert!(matches!(
            engine.infer(&tensor),
            Err(BurnEngineError::InvalidInputDimensions { .. })
        ));
    }
}
