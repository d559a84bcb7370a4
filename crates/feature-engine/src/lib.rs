//! Feature Engineering Engine
//!
//! Converts facial landmark frames into per-frame features: eye aspect
//! ratio, mouth aspect ratio and head pitch/yaw/roll. Geometry failures
//! never surface as errors; they degrade to zeroed features.

mod features;
pub mod geometry;
pub mod pose;
pub mod synthetic;

pub use features::{FeatureExtractor, FeatureVector};
pub use pose::{HeadPose, PoseError, PoseSolver};
pub use synthetic::SyntheticFace;
