//! Flexible-packaging laminate recommendation engine.
//!
//! This module turns an application, a sustainability priority and sets of
//! barrier, mechanical and material-restriction flags into a conventional
//! and a sustainable laminate recommendation, each scored for recyclability
//! and placed on the OTR/WVTR barrier chart.
//!
//! # Architecture
//!
//! - **Reference data**: Materials, structure rules and barrier profiles loaded
//!   from TOML at startup (or embedded defaults), validated once, never mutated
//! - **Resolution**: Exact match -> application-only match -> generic fallback,
//!   with the stage reported on the result
//! - **Overrides**: Aluminium and nylon restrictions swap layers on copies of
//!   both structures
//! - **Checks**: Advisory warnings for unmet barrier and mechanical needs
//! - **Scoring & chart**: Recyclability class and log-scaled barrier point
//!
//! # Example
//!
//! ```ignore
//! use laminate_advisor::advisor::{
//!     default_reference_data, Application, RecommendationEngine, ResolveRequest, Restriction,
//! };
//!
//! let engine = RecommendationEngine::new(default_reference_data());
//!
//! let request = ResolveRequest::new(Application::Retort, 2)
//!     .with_restrictions([Restriction::AvoidAluminium]);
//!
//! let result = engine.resolve(&request);
//!
//! println!("{} ({})", result.conventional.label, result.conventional.profile_key());
//! println!("Recyclability: {} {}", result.conventional_score.score, result.conventional_score.label);
//!
//! for warning in &result.warnings {
//!     println!("Warning: {}", warning);
//! }
//! ```

mod barrier;
mod engine;
mod overrides;
mod recyclability;
mod resolver;
mod rules;
mod types;
mod validator;

pub use barrier::{grade_otr, grade_wvtr, log_scale, BarrierProfileMapper, LOG_FLOOR};
pub use engine::{clamp_sustainability, RecommendationEngine};
pub use overrides::RestrictionOverrideEngine;
pub use recyclability::RecyclabilityScorer;
pub use resolver::{ResolvedRule, RuleResolver};
pub use rules::{
    default_reference_data, load_reference_data, ReferenceData, BARRIER_PROFILES_FILE,
    MATERIALS_FILE, RULES_FILE,
};
pub use types::*;
pub use validator::{implied_mechanical, required_capability, ConstraintValidator};
