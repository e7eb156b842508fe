use pkdb_model::MeasurementKind;
use pkdb_units::UnitError;
use thiserror::Error;

/// Failure normalizing one record. The record is left untouched.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error("unit `{unit}` is not accepted for {kind} `{category}`")]
    NotAllowed {
        unit: String,
        kind: MeasurementKind,
        category: String,
    },

    #[error("time unit `{unit}`: {source}")]
    TimeUnit {
        unit: String,
        #[source]
        source: UnitError,
    },

    #[error("time is set without a time unit")]
    MissingTimeUnit,

    #[error("substance `{0}` is not defined")]
    UnknownSubstance(String),

    #[error("substance reduction of `{unit}` produced `{reduced}`: {source}")]
    Reduction {
        unit: String,
        reduced: String,
        #[source]
        source: UnitError,
    },
}

impl NormalizationError {
    /// True for errors raised while handling the time axis rather than the
    /// statistic unit.
    pub fn is_time_error(&self) -> bool {
        matches!(self, Self::TimeUnit { .. } | Self::MissingTimeUnit)
    }
}

pub type Result<T> = std::result::Result<T, NormalizationError>;
