//! Type-safe enumerations for the measurement model.
//!
//! Categories themselves (`"concentration"`, `"dosing"`, `"weight"`) are
//! configuration-driven strings; the enums here fix the small closed sets
//! that the normalization engine dispatches on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which canonical-unit table a category is looked up in.
///
/// Outputs and time courses share the `Output` table (keyed by pktype),
/// time axes use the dedicated `Time` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Intervention,
    Output,
    Characteristic,
    Time,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 4] = [
        MeasurementKind::Intervention,
        MeasurementKind::Output,
        MeasurementKind::Characteristic,
        MeasurementKind::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::Intervention => "intervention",
            MeasurementKind::Output => "output",
            MeasurementKind::Characteristic => "characteristic",
            MeasurementKind::Time => "time",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MeasurementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "intervention" | "interventions" => Ok(MeasurementKind::Intervention),
            "output" | "outputs" | "pktype" => Ok(MeasurementKind::Output),
            "characteristic" | "characteristica" => Ok(MeasurementKind::Characteristic),
            "time" => Ok(MeasurementKind::Time),
            _ => Err(format!("Unknown measurement kind: {s}")),
        }
    }
}

/// Concrete record variant a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Intervention,
    Output,
    Timecourse,
    Characteristica,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Intervention => "intervention",
            RecordKind::Output => "output",
            RecordKind::Timecourse => "timecourse",
            RecordKind::Characteristica => "characteristica",
        }
    }

    /// Table the record's category is resolved against.
    pub fn measurement_kind(&self) -> MeasurementKind {
        match self {
            RecordKind::Intervention => MeasurementKind::Intervention,
            RecordKind::Output | RecordKind::Timecourse => MeasurementKind::Output,
            RecordKind::Characteristica => MeasurementKind::Characteristic,
        }
    }

    /// Returns true for records whose statistic fields are sequences.
    pub fn is_series(&self) -> bool {
        matches!(self, RecordKind::Timecourse)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the statistic fields carried by every measurement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatField {
    Value,
    Mean,
    Median,
    Min,
    Max,
    Sd,
    Se,
    Cv,
}

impl StatField {
    pub const ALL: [StatField; 8] = [
        StatField::Value,
        StatField::Mean,
        StatField::Median,
        StatField::Min,
        StatField::Max,
        StatField::Sd,
        StatField::Se,
        StatField::Cv,
    ];

    /// Fields expressed in the record's unit. `cv` is a ratio and is excluded.
    pub const DIMENSIONAL: [StatField; 7] = [
        StatField::Value,
        StatField::Mean,
        StatField::Median,
        StatField::Min,
        StatField::Max,
        StatField::Sd,
        StatField::Se,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatField::Value => "value",
            StatField::Mean => "mean",
            StatField::Median => "median",
            StatField::Min => "min",
            StatField::Max => "max",
            StatField::Sd => "sd",
            StatField::Se => "se",
            StatField::Cv => "cv",
        }
    }

    /// Returns true if the field scales with the unit.
    pub fn is_dimensional(&self) -> bool {
        !matches!(self, StatField::Cv)
    }
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StatField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        StatField::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| format!("Unknown statistic field: {s}"))
    }
}

/// The "central" statistic a derived value was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralTendency {
    Value,
    Mean,
    Median,
}

impl CentralTendency {
    /// Precedence used for concentration profiles.
    pub const CONCENTRATION_ORDER: [CentralTendency; 3] = [
        CentralTendency::Mean,
        CentralTendency::Median,
        CentralTendency::Value,
    ];

    /// Precedence used for subject characteristics such as bodyweight.
    pub const CHARACTERISTIC_ORDER: [CentralTendency; 3] = [
        CentralTendency::Value,
        CentralTendency::Mean,
        CentralTendency::Median,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CentralTendency::Value => "value",
            CentralTendency::Mean => "mean",
            CentralTendency::Median => "median",
        }
    }

    pub fn field(&self) -> StatField {
        match self {
            CentralTendency::Value => StatField::Value,
            CentralTendency::Mean => StatField::Mean,
            CentralTendency::Median => StatField::Median,
        }
    }
}

impl fmt::Display for CentralTendency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_kind_from_str() {
        assert_eq!(
            "Output".parse::<MeasurementKind>().unwrap(),
            MeasurementKind::Output
        );
        assert_eq!(
            " characteristica ".parse::<MeasurementKind>().unwrap(),
            MeasurementKind::Characteristic
        );
        assert!("dosing".parse::<MeasurementKind>().is_err());
    }

    #[test]
    fn test_timecourse_uses_output_table() {
        assert_eq!(
            RecordKind::Timecourse.measurement_kind(),
            MeasurementKind::Output
        );
        assert!(RecordKind::Timecourse.is_series());
        assert!(!RecordKind::Output.is_series());
    }

    #[test]
    fn test_cv_is_not_dimensional() {
        assert!(!StatField::Cv.is_dimensional());
        assert!(!StatField::DIMENSIONAL.contains(&StatField::Cv));
        assert_eq!("SD".parse::<StatField>().unwrap(), StatField::Sd);
    }
}
