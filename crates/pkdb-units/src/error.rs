use thiserror::Error;

use pkdb_model::MeasurementKind;

use crate::dimension::Dimension;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("cannot parse unit `{unit}`: {reason}")]
    Parse { unit: String, reason: String },

    #[error("incompatible units: `{from}` {from_dimension} cannot be converted to `{to}` {to_dimension}")]
    Incompatible {
        from: String,
        to: String,
        from_dimension: Dimension,
        to_dimension: Dimension,
    },

    #[error("no canonical unit registered for {kind} category `{category}`")]
    UnknownCategory {
        kind: MeasurementKind,
        category: String,
    },

    #[error("invalid unit definition `{symbol}`: {reason}")]
    InvalidDefinition { symbol: String, reason: String },
}

impl UnitError {
    pub(crate) fn parse(unit: &str, reason: impl Into<String>) -> Self {
        UnitError::Parse {
            unit: unit.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(symbol: &str, reason: impl Into<String>) -> Self {
        UnitError::InvalidDefinition {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UnitError>;
