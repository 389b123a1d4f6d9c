pub mod constraint_mapping;
pub mod entity_mapping;
pub mod profiles;
pub mod solver;
pub mod status;
pub mod types;

pub use entity_mapping::SolverSystem;
pub use profiles::{detect_profiles, DetectedProfiles, PROFILE_TOLERANCE};
pub use solver::solve_sketch;
pub use types::*;
