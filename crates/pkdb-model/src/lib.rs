pub mod enums;
pub mod error;
pub mod issues;
pub mod options;
pub mod provenance;
pub mod records;
pub mod statistics;
pub mod study;
pub mod subject;
pub mod substance;

pub use enums::{CentralTendency, MeasurementKind, RecordKind, StatField};
pub use error::{ModelError, Result};
pub use issues::{IssueReport, IssueSeverity, RecordIssue};
pub use options::NormalizationOptions;
pub use provenance::{Normed, RecordId};
pub use records::{
    CONCENTRATION, Characteristica, DOSING, Intervention, MEDICATION, Measurement, Output,
    Timecourse, WEIGHT,
};
pub use statistics::{Scalar, Series, StatColumn, Statistics};
pub use study::Study;
pub use subject::{Group, Individual};
pub use substance::{Substance, SubstanceCatalog};
