pub mod advisor;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;

pub use advisor::{
    default_reference_data, load_reference_data, RecommendationEngine, RecommendationResult,
    ReferenceData, ResolveRequest,
};
pub use catalog::{Capability, Material, MaterialCatalog, PolymerFamily};
pub use error::AdvisorError;
