//! Unit registry and dimensional algebra.
//!
//! Units are parsed compositionally from their written form (`µg*h/ml`,
//! `ml/min/1.73m^2`, `mmol·l⁻¹`) against a registry of atomic units and SI
//! prefixes, producing a [`PhysicalUnit`] that knows its magnitude relative
//! to the base units and its [`Dimension`].

pub mod category;
pub mod dimension;
pub mod error;
mod parser;
pub mod registry;
pub mod unit;

pub use category::{CanonicalUnitTable, CategoryUnits, TIME_CATEGORY};
pub use dimension::{BaseDimension, Dimension};
pub use error::{Result, UnitError};
pub use parser::MAX_EXPONENT;
pub use registry::{AtomicUnit, Prefix, Resolved, UnitRegistry};
pub use unit::{PhysicalUnit, UnitTerm};
