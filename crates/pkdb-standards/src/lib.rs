#![deny(unsafe_code)]

pub mod csv;
pub mod doctor;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod registry;

pub use crate::doctor::DoctorReport;
pub use crate::error::StandardsError;
pub use crate::paths::{STANDARDS_ENV_VAR, standards_root};
pub use crate::registry::{StandardsRegistry, VerifySummary, sha256_hex};

/// Verifies and loads the standards directory found by [`standards_root`].
pub fn load_default_standards() -> Result<StandardsRegistry, StandardsError> {
    let (registry, _) = StandardsRegistry::verify_and_load(&standards_root())?;
    Ok(registry)
}
