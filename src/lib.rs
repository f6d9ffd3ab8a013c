//! SegmentForge: predict a customer's segment from a pre-fitted scaler and K-Means model
//!
//! The pipeline is `FeatureVector -> StandardScaler -> KMeansModel -> ClusterLabel`.
//! Both artifacts are loaded once into a [`SegmentationContext`] and shared read-only.

pub mod artifacts;
pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod session;

// Re-export public items for easier access
pub use artifacts::{SegmentationContext, MODEL_FILE, SCALER_FILE};
pub use cli::{parse_feature_values, Args};
pub use data::{FeatureVector, StandardScaler, FEATURE_BOUNDS, FEATURE_NAMES, N_FEATURES};
pub use error::SegmentError;
pub use model::{predict_segment, ClusterLabel, KMeansModel, SegmentAssignment};
pub use session::{run_session, SessionSummary};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, SegmentError>;
