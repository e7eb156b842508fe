//! Measurement records.
//!
//! Every record carries the same statistic fields and a unit; they differ in
//! how the category is named (`category` or `pktype`), in whether the
//! statistics are scalars or time-aligned series, and in which optional
//! context (substance, time, subject) they reference.

use serde::{Deserialize, Serialize};

use crate::enums::{RecordKind, StatField};
use crate::error::{ModelError, Result};
use crate::provenance::RecordId;
use crate::statistics::{Scalar, Series, StatColumn, Statistics};

pub const DOSING: &str = "dosing";
pub const MEDICATION: &str = "medication";
pub const WEIGHT: &str = "weight";
pub const CONCENTRATION: &str = "concentration";

const DOSING_APPLICATIONS: [&str; 2] = ["single dose", "constant infusion"];

/// Uniform access to the fields normalization reads and rewrites.
///
/// Implemented once per record type; scalar records expose `Option<f64>`
/// columns and time courses expose `Option<Vec<Option<f64>>>` columns.
pub trait Measurement: Clone + PartialEq {
    type Column: StatColumn;

    const KIND: RecordKind;

    /// Category (or pktype) the canonical unit is looked up by.
    fn category(&self) -> &str;

    fn unit(&self) -> Option<&str>;

    fn set_unit(&mut self, unit: String);

    /// Name of the referenced substance.
    fn substance(&self) -> Option<&str> {
        None
    }

    /// The record's own sample count.
    fn count(&self) -> Option<u32> {
        None
    }

    /// Group the record was measured on, used for sample-count fallback.
    fn group(&self) -> Option<&str> {
        None
    }

    /// Individual the record was measured on.
    fn individual(&self) -> Option<&str> {
        None
    }

    fn statistics(&self) -> &Statistics<Self::Column>;

    fn statistics_mut(&mut self) -> &mut Statistics<Self::Column>;

    /// Time column and its unit, for time-indexed records.
    fn time(&self) -> Option<(&Self::Column, Option<&str>)> {
        None
    }

    fn time_mut(&mut self) -> Option<(&mut Self::Column, &mut Option<String>)> {
        None
    }

    fn is_final(&self) -> bool;

    fn set_final(&mut self, value: bool);

    /// Structural checks run before normalization.
    fn validate(&self, _id: &RecordId) -> Result<()> {
        Ok(())
    }
}

/// A study step: dosing, medication, lifestyle change and similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(flatten)]
    pub statistics: Statistics<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<String>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

impl Intervention {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            choice: None,
            substance: None,
            route: None,
            form: None,
            application: None,
            statistics: Statistics::default(),
            unit: None,
            time: None,
            time_unit: None,
            is_final: false,
        }
    }

    pub fn is_dosing(&self) -> bool {
        self.category == DOSING
    }

    fn require(&self, id: &RecordId, field: &'static str, present: bool) -> Result<()> {
        if present {
            Ok(())
        } else {
            Err(ModelError::MissingField {
                record: id.clone(),
                category: self.category.clone(),
                field,
            })
        }
    }
}

impl Measurement for Intervention {
    type Column = Scalar;

    const KIND: RecordKind = RecordKind::Intervention;

    fn category(&self) -> &str {
        &self.category
    }

    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    fn set_unit(&mut self, unit: String) {
        self.unit = Some(unit);
    }

    fn substance(&self) -> Option<&str> {
        self.substance.as_deref()
    }

    fn statistics(&self) -> &Statistics<Scalar> {
        &self.statistics
    }

    fn statistics_mut(&mut self) -> &mut Statistics<Scalar> {
        &mut self.statistics
    }

    fn time(&self) -> Option<(&Scalar, Option<&str>)> {
        Some((&self.time, self.time_unit.as_deref()))
    }

    fn time_mut(&mut self) -> Option<(&mut Scalar, &mut Option<String>)> {
        Some((&mut self.time, &mut self.time_unit))
    }

    fn is_final(&self) -> bool {
        self.is_final
    }

    fn set_final(&mut self, value: bool) {
        self.is_final = value;
    }

    fn validate(&self, id: &RecordId) -> Result<()> {
        if self.category != DOSING && self.category != MEDICATION {
            return Ok(());
        }
        self.require(id, "substance", self.substance.is_some())?;
        self.require(id, "route", self.route.is_some())?;
        self.require(id, "value", self.statistics.value.is_some())?;
        self.require(id, "unit", self.unit.is_some())?;
        if self.category == DOSING {
            self.require(id, "application", self.application.is_some())?;
            self.require(id, "time", self.time.is_some())?;
            self.require(id, "time_unit", self.time_unit.is_some())?;
            if let Some(application) = &self.application
                && !DOSING_APPLICATIONS.contains(&application.as_str())
            {
                return Err(ModelError::InvalidApplication {
                    record: id.clone(),
                    application: application.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A scalar pharmacokinetic measurement (AUC, clearance, half-life, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub pktype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tissue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interventions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(flatten)]
    pub statistics: Statistics<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<String>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

impl Output {
    pub fn new(pktype: impl Into<String>) -> Self {
        Self {
            pktype: pktype.into(),
            substance: None,
            tissue: None,
            group: None,
            individual: None,
            interventions: Vec::new(),
            count: None,
            statistics: Statistics::default(),
            unit: None,
            time: None,
            time_unit: None,
            is_final: false,
        }
    }
}

impl Measurement for Output {
    type Column = Scalar;

    const KIND: RecordKind = RecordKind::Output;

    fn category(&self) -> &str {
        &self.pktype
    }

    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    fn set_unit(&mut self, unit: String) {
        self.unit = Some(unit);
    }

    fn substance(&self) -> Option<&str> {
        self.substance.as_deref()
    }

    fn count(&self) -> Option<u32> {
        self.count
    }

    fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn individual(&self) -> Option<&str> {
        self.individual.as_deref()
    }

    fn statistics(&self) -> &Statistics<Scalar> {
        &self.statistics
    }

    fn statistics_mut(&mut self) -> &mut Statistics<Scalar> {
        &mut self.statistics
    }

    fn time(&self) -> Option<(&Scalar, Option<&str>)> {
        Some((&self.time, self.time_unit.as_deref()))
    }

    fn time_mut(&mut self) -> Option<(&mut Scalar, &mut Option<String>)> {
        Some((&mut self.time, &mut self.time_unit))
    }

    fn is_final(&self) -> bool {
        self.is_final
    }

    fn set_final(&mut self, value: bool) {
        self.is_final = value;
    }
}

/// A measured profile over time. All statistic columns align with `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timecourse {
    pub pktype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tissue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interventions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(flatten)]
    pub statistics: Statistics<Series>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub time: Series,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<String>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

impl Timecourse {
    pub fn new(pktype: impl Into<String>, time: Vec<f64>) -> Self {
        Self {
            pktype: pktype.into(),
            substance: None,
            tissue: None,
            group: None,
            individual: None,
            interventions: Vec::new(),
            count: None,
            statistics: Statistics::default(),
            unit: None,
            time: Some(time.into_iter().map(Some).collect()),
            time_unit: None,
            is_final: false,
        }
    }
}

impl Measurement for Timecourse {
    type Column = Series;

    const KIND: RecordKind = RecordKind::Timecourse;

    fn category(&self) -> &str {
        &self.pktype
    }

    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    fn set_unit(&mut self, unit: String) {
        self.unit = Some(unit);
    }

    fn substance(&self) -> Option<&str> {
        self.substance.as_deref()
    }

    fn count(&self) -> Option<u32> {
        self.count
    }

    fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn individual(&self) -> Option<&str> {
        self.individual.as_deref()
    }

    fn statistics(&self) -> &Statistics<Series> {
        &self.statistics
    }

    fn statistics_mut(&mut self) -> &mut Statistics<Series> {
        &mut self.statistics
    }

    fn time(&self) -> Option<(&Series, Option<&str>)> {
        Some((&self.time, self.time_unit.as_deref()))
    }

    fn time_mut(&mut self) -> Option<(&mut Series, &mut Option<String>)> {
        Some((&mut self.time, &mut self.time_unit))
    }

    fn is_final(&self) -> bool {
        self.is_final
    }

    fn set_final(&mut self, value: bool) {
        self.is_final = value;
    }

    fn validate(&self, id: &RecordId) -> Result<()> {
        let expected = self.time.len();
        if expected == 0 {
            return Err(ModelError::EmptyTimeAxis { record: id.clone() });
        }
        if let Some(index) = (0..expected).find(|index| self.time.get(*index).is_none()) {
            return Err(ModelError::NullTime {
                record: id.clone(),
                index,
            });
        }
        for field in StatField::ALL {
            let column = self.statistics.get(field);
            if column.is_none() {
                continue;
            }
            let actual = column.len();
            if actual != expected {
                return Err(ModelError::LengthMismatch {
                    record: id.clone(),
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// A subject characteristic such as age, weight or sex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristica {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(flatten)]
    pub statistics: Statistics<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

impl Characteristica {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            choice: None,
            count: None,
            statistics: Statistics::default(),
            unit: None,
            is_final: false,
        }
    }
}

impl Measurement for Characteristica {
    type Column = Scalar;

    const KIND: RecordKind = RecordKind::Characteristica;

    fn category(&self) -> &str {
        &self.category
    }

    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    fn set_unit(&mut self, unit: String) {
        self.unit = Some(unit);
    }

    fn count(&self) -> Option<u32> {
        self.count
    }

    fn statistics(&self) -> &Statistics<Scalar> {
        &self.statistics
    }

    fn statistics_mut(&mut self) -> &mut Statistics<Scalar> {
        &mut self.statistics
    }

    fn is_final(&self) -> bool {
        self.is_final
    }

    fn set_final(&mut self, value: bool) {
        self.is_final = value;
    }
}
