//! Canonical-unit normalization of a single record.
//!
//! Normalization is planned first and applied second: every lookup and
//! conversion that can fail runs against the untouched record, so a failing
//! record is never partially rewritten.

use pkdb_model::{
    Measurement, NormalizationOptions, StatColumn, StatField, Substance, SubstanceCatalog,
};
use pkdb_units::{CanonicalUnitTable, PhysicalUnit, UnitRegistry};

use crate::error::{NormalizationError, Result};
use crate::statistics::complete_record_statistics;
use crate::substance::reduce;

/// A unit rewrite: every value is multiplied by `factor`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitChange {
    pub from: String,
    pub to: String,
    pub factor: f64,
}

/// What normalization changed on a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalization {
    pub unit: Option<UnitChange>,
    pub time: Option<UnitChange>,
    /// Statistics filled in by completion.
    pub derived: Vec<StatField>,
}

impl Normalization {
    pub fn is_noop(&self) -> bool {
        self.unit.is_none() && self.time.is_none() && self.derived.is_empty()
    }
}

/// Conversions computed for a record before it is touched.
#[derive(Debug, Clone, Default)]
struct Plan {
    unit: Option<UnitChange>,
    time: Option<UnitChange>,
}

/// Read-only lookups shared by every record of a study.
#[derive(Debug, Clone, Copy)]
pub struct NormalizationContext<'a> {
    pub units: &'a UnitRegistry,
    pub canonical: &'a CanonicalUnitTable,
    pub substances: &'a SubstanceCatalog,
    pub options: NormalizationOptions,
}

impl<'a> NormalizationContext<'a> {
    pub fn new(
        units: &'a UnitRegistry,
        canonical: &'a CanonicalUnitTable,
        substances: &'a SubstanceCatalog,
    ) -> Self {
        Self {
            units,
            canonical,
            substances,
            options: NormalizationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: NormalizationOptions) -> Self {
        self.options = options;
        self
    }

    /// Normalizes `record` in place using its own sample count.
    pub fn normalize<R: Measurement>(&self, record: &mut R) -> Result<Normalization> {
        let count = record.count();
        self.normalize_with_count(record, count)
    }

    /// Normalizes `record` in place.
    ///
    /// The substance amount is eliminated, every dimensional statistic is
    /// converted to the canonical unit of the record's category, the time
    /// axis is converted to the canonical time unit, and missing dispersion
    /// statistics are derived with `count`. `cv` is never rescaled. A record
    /// already in canonical units is left as it is.
    pub fn normalize_with_count<R: Measurement>(
        &self,
        record: &mut R,
        count: Option<u32>,
    ) -> Result<Normalization> {
        let plan = self.plan(record)?;

        if let Some(change) = &plan.unit {
            let factor = change.factor;
            let statistics = record.statistics_mut();
            for field in StatField::DIMENSIONAL {
                let scaled = statistics.get(field).map_values(|v| v * factor);
                statistics.set(field, scaled);
            }
            record.set_unit(change.to.clone());
        }

        if let Some(change) = &plan.time
            && let Some((column, unit)) = record.time_mut()
        {
            let factor = change.factor;
            *column = column.map_values(|v| v * factor);
            *unit = Some(change.to.clone());
        }

        let derived = if self.options.derive_statistics {
            complete_record_statistics(record.statistics_mut(), count)
        } else {
            Vec::new()
        };

        Ok(Normalization {
            unit: plan.unit,
            time: plan.time,
            derived,
        })
    }

    fn plan<R: Measurement>(&self, record: &R) -> Result<Plan> {
        Ok(Plan {
            unit: self.plan_unit(record)?,
            time: self.plan_time(record)?,
        })
    }

    fn plan_unit<R: Measurement>(&self, record: &R) -> Result<Option<UnitChange>> {
        let Some(source) = record.unit() else {
            return Ok(None);
        };
        let kind = R::KIND.measurement_kind();
        let category = record.category();
        let entry = self.canonical.get(kind, category)?;
        let unit = self.units.parse_unit(source)?;

        if self.options.enforce_allowed_units && !entry.accepts(&unit) {
            return Err(NormalizationError::NotAllowed {
                unit: source.to_string(),
                kind,
                category: category.to_string(),
            });
        }

        let reduction = reduce(self.units, &unit, self.substance(record, &unit)?)?;
        let canonical = self
            .canonical
            .canonical_unit_for(kind, category, &reduction.unit)?;

        if source == canonical.symbol() {
            return Ok(None);
        }

        let factor = reduction.factor * reduction.unit.conversion_factor_to(canonical)?;
        tracing::debug!(
            from = source,
            to = canonical.symbol(),
            factor,
            category,
            "unit converted"
        );
        Ok(Some(UnitChange {
            from: source.to_string(),
            to: canonical.symbol().to_string(),
            factor,
        }))
    }

    fn plan_time<R: Measurement>(&self, record: &R) -> Result<Option<UnitChange>> {
        let Some((column, unit)) = record.time() else {
            return Ok(None);
        };
        // A unit without time values is still rewritten to the canonical one.
        let Some(unit) = unit else {
            if column.is_null() {
                return Ok(None);
            }
            return Err(NormalizationError::MissingTimeUnit);
        };
        let target = self.canonical.time_unit()?;
        if unit == target.symbol() {
            return Ok(None);
        }
        let time_error = |source| NormalizationError::TimeUnit {
            unit: unit.to_string(),
            source,
        };
        let source = self.units.parse_unit(unit).map_err(time_error)?;
        let factor = source.conversion_factor_to(target).map_err(time_error)?;
        Ok(Some(UnitChange {
            from: unit.to_string(),
            to: target.symbol().to_string(),
            factor,
        }))
    }

    /// Substance whose molar mass applies to `unit`. Only looked up when the
    /// unit carries a substance amount.
    fn substance<R: Measurement>(
        &self,
        record: &R,
        unit: &PhysicalUnit,
    ) -> Result<Option<&'a Substance>> {
        if unit.substance_exponent() == 0 {
            return Ok(None);
        }
        record
            .substance()
            .map(|name| {
                self.substances
                    .get(name)
                    .ok_or_else(|| NormalizationError::UnknownSubstance(name.to_string()))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkdb_model::{MeasurementKind, Output, Timecourse};

    fn table(units: &UnitRegistry) -> CanonicalUnitTable {
        let mut table = CanonicalUnitTable::new();
        table
            .register(units, MeasurementKind::Output, "concentration", "µg/ml", &[])
            .unwrap();
        table
            .register(units, MeasurementKind::Time, "time", "h", &[])
            .unwrap();
        table
    }

    #[test]
    fn record_without_unit_only_completes_statistics() {
        let units = UnitRegistry::builtin();
        let table = table(&units);
        let substances = SubstanceCatalog::new();
        let context = NormalizationContext::new(&units, &table, &substances);

        let mut output = Output::new("concentration");
        output.statistics.mean = Some(2.0);
        output.statistics.sd = Some(1.0);
        let result = context.normalize(&mut output).unwrap();
        assert_eq!(result.unit, None);
        assert_eq!(result.derived, vec![StatField::Cv]);
        assert_eq!(output.statistics.cv, Some(0.5));
    }

    #[test]
    fn time_without_unit_is_rejected() {
        let units = UnitRegistry::builtin();
        let table = table(&units);
        let substances = SubstanceCatalog::new();
        let context = NormalizationContext::new(&units, &table, &substances);

        let mut tc = Timecourse::new("concentration", vec![0.0, 30.0]);
        tc.unit = Some("mg/l".to_string());
        let before = tc.clone();
        let err = context.normalize(&mut tc).unwrap_err();
        assert!(matches!(err, NormalizationError::MissingTimeUnit));
        assert!(err.is_time_error());
        assert_eq!(tc, before);
    }
}
