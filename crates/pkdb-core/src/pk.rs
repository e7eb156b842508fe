//! Pharmacokinetic input derivation.
//!
//! A concentration time course is turned into a [`PkInputBundle`]: the
//! profile itself plus the dose and bodyweight context a fitting routine
//! needs. No fitting happens here.

use polars::prelude::{Column, DataFrame, NamedFrom, PolarsError, Series};
use serde::Serialize;
use thiserror::Error;

use pkdb_model::{
    CentralTendency, Intervention, Measurement, RecordId, StatColumn, Study, Timecourse, WEIGHT,
};
use pkdb_units::{BaseDimension, Dimension, UnitError, UnitRegistry};

#[derive(Debug, Error)]
pub enum PkDerivationError {
    #[error("{record}: time course has no substance")]
    MissingSubstance { record: RecordId },
    #[error("{record}: time course has no unit")]
    MissingUnit { record: RecordId },
    #[error("{record}: time course has no time unit")]
    MissingTimeUnit { record: RecordId },
    #[error("{record}: time course has no mean, median or value")]
    NoConcentration { record: RecordId },
    #[error("{record}: time axis has a null entry at index {index}")]
    NullTime { record: RecordId, index: usize },
    #[error("{record}: {source}")]
    Unit {
        record: RecordId,
        #[source]
        source: UnitError,
    },
    #[error("failed to build frame: {0}")]
    Frame(#[from] PolarsError),
}

/// Inputs for pharmacokinetic parameter fitting of one time course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PkInputBundle {
    pub source: RecordId,
    pub compound: String,
    pub time: Vec<f64>,
    pub time_unit: String,
    pub concentration: Vec<Option<f64>>,
    pub concentration_unit: String,
    /// Statistic the concentration was taken from.
    pub concentration_type: CentralTendency,
    pub dose: Option<f64>,
    pub dose_unit: Option<String>,
    /// Unit a volume of distribution fitted from this bundle comes out in.
    pub vd_unit: Option<String>,
    pub bodyweight: Option<f64>,
    pub bodyweight_unit: Option<String>,
    pub bodyweight_type: Option<CentralTendency>,
}

/// Bundle metadata without the profile arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PkBundleSummary {
    pub source: RecordId,
    pub compound: String,
    pub points: usize,
    pub time_unit: String,
    pub concentration_unit: String,
    pub concentration_type: CentralTendency,
    pub dose: Option<f64>,
    pub dose_unit: Option<String>,
    pub vd_unit: Option<String>,
    pub bodyweight: Option<f64>,
    pub bodyweight_unit: Option<String>,
    pub bodyweight_type: Option<CentralTendency>,
}

impl PkInputBundle {
    pub fn has_dose(&self) -> bool {
        self.dose.is_some()
    }

    /// Profile as a two-column frame (`time`, `concentration`).
    pub fn to_frame(&self) -> Result<DataFrame, PkDerivationError> {
        let columns: Vec<Column> = vec![
            Series::new("time".into(), self.time.clone()).into(),
            Series::new("concentration".into(), self.concentration.clone()).into(),
        ];
        Ok(DataFrame::new(columns)?)
    }

    pub fn summary(&self) -> PkBundleSummary {
        PkBundleSummary {
            source: self.source.clone(),
            compound: self.compound.clone(),
            points: self.time.len(),
            time_unit: self.time_unit.clone(),
            concentration_unit: self.concentration_unit.clone(),
            concentration_type: self.concentration_type,
            dose: self.dose,
            dose_unit: self.dose_unit.clone(),
            vd_unit: self.vd_unit.clone(),
            bodyweight: self.bodyweight,
            bodyweight_unit: self.bodyweight_unit.clone(),
            bodyweight_type: self.bodyweight_type,
        }
    }
}

/// Builds the PK inputs of a normalized concentration time course.
///
/// `study` must already hold normalized, final interventions and subject
/// characteristica. Dosing is taken from the single final `dosing`
/// intervention the time course references; none or several leave the dose
/// out. The dose is only used when its unit is an absolute amount.
pub fn derive_pk_context(
    units: &UnitRegistry,
    study: &Study,
    id: &RecordId,
    timecourse: &Timecourse,
) -> Result<PkInputBundle, PkDerivationError> {
    let compound = timecourse
        .substance
        .clone()
        .ok_or_else(|| PkDerivationError::MissingSubstance { record: id.clone() })?;
    let concentration_unit = timecourse
        .unit
        .clone()
        .ok_or_else(|| PkDerivationError::MissingUnit { record: id.clone() })?;
    let time_unit = timecourse
        .time_unit
        .clone()
        .ok_or_else(|| PkDerivationError::MissingTimeUnit { record: id.clone() })?;

    let time = timecourse
        .time
        .values()
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            value.ok_or_else(|| PkDerivationError::NullTime {
                record: id.clone(),
                index,
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let (concentration_type, column) = timecourse
        .statistics
        .central(&CentralTendency::CONCENTRATION_ORDER)
        .ok_or_else(|| PkDerivationError::NoConcentration { record: id.clone() })?;
    let mut concentration = column.sanitized().values();
    concentration.resize(time.len(), None);

    let mut bundle = PkInputBundle {
        source: id.clone(),
        compound,
        time,
        time_unit,
        concentration,
        concentration_unit,
        concentration_type,
        dose: None,
        dose_unit: None,
        vd_unit: None,
        bodyweight: None,
        bodyweight_unit: None,
        bodyweight_type: None,
    };

    if let Some(dosing) = single_dosing(study, timecourse)
        && let (Some(dose), Some(dose_unit)) = (dosing.statistics.value, dosing.unit.as_deref())
    {
        match units.parse_unit(dose_unit) {
            Ok(unit) if unit.dimension() == Dimension::base(BaseDimension::Mass) => {
                let concentration = units
                    .parse_unit(&bundle.concentration_unit)
                    .map_err(|source| PkDerivationError::Unit {
                        record: id.clone(),
                        source,
                    })?;
                bundle.dose = Some(dose);
                bundle.dose_unit = Some(dose_unit.to_string());
                bundle.vd_unit = Some(unit.divide(&concentration).symbol().to_string());
            }
            Ok(unit) => {
                tracing::debug!(record = %id, unit = %unit, "dose is not an absolute amount");
            }
            Err(err) => {
                tracing::debug!(record = %id, %err, "dose unit not usable");
            }
        }
    }

    let weight = study.subject_characteristica(
        timecourse.group(),
        timecourse.individual(),
        WEIGHT,
    );
    if let Some(weight) = weight
        && let Some((tendency, value)) = weight
            .statistics
            .central(&CentralTendency::CHARACTERISTIC_ORDER)
    {
        bundle.bodyweight = value.sanitized();
        bundle.bodyweight_unit = weight.unit.clone();
        bundle.bodyweight_type = Some(tendency);
    }

    tracing::debug!(
        record = %id,
        points = bundle.time.len(),
        dose = bundle.has_dose(),
        bodyweight = bundle.bodyweight.is_some(),
        "pk inputs derived"
    );
    Ok(bundle)
}

/// The one final dosing intervention referenced by `timecourse`.
fn single_dosing<'a>(study: &'a Study, timecourse: &'a Timecourse) -> Option<&'a Intervention> {
    let mut dosings = study
        .interventions_named(&timecourse.interventions)
        .filter(|intervention| intervention.is_dosing() && intervention.is_final);
    let first = dosings.next()?;
    if dosings.next().is_some() {
        tracing::debug!(pktype = %timecourse.pktype, "several final dosings, dose omitted");
        return None;
    }
    Some(first)
}
