pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod matcher;
pub mod registry;
pub mod storage;

pub use auth::{AttemptState, Authenticator, Enrollment, Verification};
pub use error::{AuthError, StoreError};
pub use matcher::{Decision, MatchPolicy};
pub use registry::GestureRegistry;
pub use storage::{CredentialStore, FileStore, MemoryStore};

// Re-export pipeline types for convenience
pub use handkey_gesture::{
    capture, features, hash, landmark, pipeline, quantize, CaptureFileSource, Credential,
    Gesture, LandmarkSet, LandmarkSource, Pipeline, PipelineParams,
};
