use thiserror::Error;

use crate::enums::StatField;
use crate::provenance::RecordId;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{record}: time course has no time axis")]
    EmptyTimeAxis { record: RecordId },
    #[error("{record}: time axis has a null entry at index {index}")]
    NullTime { record: RecordId, index: usize },
    #[error("{record}: `{field}` has {actual} entries but the time axis has {expected}")]
    LengthMismatch {
        record: RecordId,
        field: StatField,
        expected: usize,
        actual: usize,
    },
    #[error("{record}: `{category}` intervention requires `{field}`")]
    MissingField {
        record: RecordId,
        category: String,
        field: &'static str,
    },
    #[error(
        "{record}: application `{application}` is not allowed for dosing \
         (expected `single dose` or `constant infusion`)"
    )]
    InvalidApplication {
        record: RecordId,
        application: String,
    },
    #[error("unknown substance `{0}`")]
    UnknownSubstance(String),
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
}

impl ModelError {
    /// The statistic a validation failure is about, if any.
    pub fn field(&self) -> Option<StatField> {
        match self {
            ModelError::LengthMismatch { field, .. } => Some(*field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
