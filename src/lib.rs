//! Crop Disease Risk API
//!
//! Serves a single trained disease-risk model over a minimal web API:
//! given a crop, growth stage, and a handful of environmental readings,
//! return a ranked risk percentage and qualitative band for each disease
//! tracked at that crop/stage combination.
//!
//! - `encodings`: name → integer-code tables and the stage-disease map
//! - `model`: the pre-trained network, loaded once at startup
//! - `scorer`: validate → vectorize → infer → band → rank
//! - `api_server`: axum router, handlers, and application state

pub mod encodings;
pub mod model;
pub mod scorer;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use encodings::EncodingTables;
pub use model::RiskModel;
pub use scorer::{DiseaseRisk, RiskError, RiskLevel, RiskRequest, RiskScorer};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
