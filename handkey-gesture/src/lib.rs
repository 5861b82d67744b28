//! Hand-pose credential pipeline: landmarks → features → buckets → digest.
//!
//! Everything here is a pure function of its inputs. Landmark detection from pixels
//! lives outside this crate; [`capture`] only reads what a detector wrote.

pub mod capture;
pub mod features;
pub mod hash;
pub mod landmark;
pub mod pipeline;
pub mod quantize;

// Re-export commonly used types
pub use capture::{CaptureFileSource, LandmarkSource};
pub use features::{FeatureVector, FingerState, Gesture, JointTable};
pub use hash::{bit_similarity, HashProfile};
pub use landmark::{Landmark, LandmarkSet, LANDMARK_COUNT};
pub use pipeline::{Credential, Derivation, Pipeline, PipelineParams};
pub use quantize::{FlagSchedule, QuantizedVector, Quantizer, MAX_BINS};
