//! Normalization of measurement records to canonical units.
//!
//! - **statistics**: derivation of missing sd, se and cv
//! - **substance**: elimination of the substance-amount dimension via molar mass
//! - **normalizer**: the per-record normalization, written once over
//!   [`pkdb_model::StatColumn`] so scalar records and time courses share it

pub mod error;
pub mod normalizer;
pub mod statistics;
pub mod substance;

pub use error::{NormalizationError, Result};
pub use normalizer::{Normalization, NormalizationContext, UnitChange};
pub use statistics::{
    Completed, StatisticsError, complete_record_statistics, complete_statistics,
};
pub use substance::{Reduction, reduce};
