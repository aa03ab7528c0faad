//! Detection post-processing: raw engine records to validated boxes.

mod decoder;
mod record;
mod validated_box;

pub use decoder::{DetectionDecoder, decode};
pub use record::{DetectionRecord, InferenceOutput, MIN_RECORD_STRIDE, records};
pub use validated_box::ValidatedBox;
