//! Canonical units per measurement category.

use std::collections::BTreeMap;

use pkdb_model::MeasurementKind;

use crate::dimension::{BaseDimension, Dimension};
use crate::error::{Result, UnitError};
use crate::registry::UnitRegistry;
use crate::unit::PhysicalUnit;

/// Category of the canonical time axis in the `time` table.
pub const TIME_CATEGORY: &str = "time";

/// Canonical and accepted units of one category.
#[derive(Debug, Clone)]
pub struct CategoryUnits {
    pub kind: MeasurementKind,
    pub category: String,
    /// Primary canonical unit first, then one variant per further dimension.
    pub canonical: Vec<PhysicalUnit>,
    /// Source units accepted for the category. Empty means unrestricted.
    pub allowed: Vec<PhysicalUnit>,
}

impl CategoryUnits {
    pub fn primary(&self) -> &PhysicalUnit {
        &self.canonical[0]
    }

    /// Canonical unit with the same dimension as `unit`.
    pub fn canonical_for(&self, unit: &PhysicalUnit) -> Option<&PhysicalUnit> {
        self.canonical
            .iter()
            .find(|canonical| canonical.is_compatible(unit))
    }

    pub fn accepts(&self, unit: &PhysicalUnit) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        self.canonical
            .iter()
            .chain(&self.allowed)
            .any(|allowed| allowed.is_equivalent(unit))
    }
}

/// Canonical unit lookup keyed by `(kind, category)`. Loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct CanonicalUnitTable {
    entries: BTreeMap<(MeasurementKind, String), CategoryUnits>,
}

impl CanonicalUnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `canonical` for a category. A second registration for the
    /// same category adds a variant for another dimension.
    pub fn insert(
        &mut self,
        kind: MeasurementKind,
        category: &str,
        canonical: PhysicalUnit,
        allowed: Vec<PhysicalUnit>,
    ) -> Result<()> {
        if canonical.substance_exponent() != 0 {
            return Err(UnitError::invalid(
                canonical.symbol(),
                format!("canonical unit of {kind} `{category}` carries a substance amount"),
            ));
        }
        let key = (kind, category.to_string());
        match self.entries.get_mut(&key) {
            Some(entry) => {
                if entry.canonical_for(&canonical).is_some() {
                    return Err(UnitError::invalid(
                        canonical.symbol(),
                        format!("{kind} `{category}` already has a canonical unit of this dimension"),
                    ));
                }
                entry.canonical.push(canonical);
                entry.allowed.extend(allowed);
            }
            None => {
                self.entries.insert(
                    key,
                    CategoryUnits {
                        kind,
                        category: category.to_string(),
                        canonical: vec![canonical],
                        allowed,
                    },
                );
            }
        }
        Ok(())
    }

    /// Parses `canonical` and `allowed` with `registry` and registers them.
    pub fn register(
        &mut self,
        registry: &UnitRegistry,
        kind: MeasurementKind,
        category: &str,
        canonical: &str,
        allowed: &[&str],
    ) -> Result<()> {
        let canonical = registry.parse_unit(canonical)?;
        let allowed = allowed
            .iter()
            .map(|unit| registry.parse_unit(unit))
            .collect::<Result<Vec<_>>>()?;
        self.insert(kind, category, canonical, allowed)
    }

    pub fn get(&self, kind: MeasurementKind, category: &str) -> Result<&CategoryUnits> {
        self.entries
            .get(&(kind, category.to_string()))
            .ok_or_else(|| UnitError::UnknownCategory {
                kind,
                category: category.to_string(),
            })
    }

    pub fn contains(&self, kind: MeasurementKind, category: &str) -> bool {
        self.entries.contains_key(&(kind, category.to_string()))
    }

    /// Primary canonical unit of a category.
    pub fn canonical_unit(&self, kind: MeasurementKind, category: &str) -> Result<&PhysicalUnit> {
        Ok(self.get(kind, category)?.primary())
    }

    /// Canonical unit of a category matching the dimension of `unit`.
    pub fn canonical_unit_for(
        &self,
        kind: MeasurementKind,
        category: &str,
        unit: &PhysicalUnit,
    ) -> Result<&PhysicalUnit> {
        let entry = self.get(kind, category)?;
        entry.canonical_for(unit).ok_or_else(|| {
            let primary = entry.primary();
            UnitError::Incompatible {
                from: unit.symbol().to_string(),
                to: primary.symbol().to_string(),
                from_dimension: unit.dimension(),
                to_dimension: primary.dimension(),
            }
        })
    }

    /// Whether `unit` is an accepted source unit for the category.
    pub fn is_valid_unit(
        &self,
        kind: MeasurementKind,
        category: &str,
        unit: &PhysicalUnit,
    ) -> Result<bool> {
        Ok(self.get(kind, category)?.accepts(unit))
    }

    /// Canonical unit of time axes.
    pub fn time_unit(&self) -> Result<&PhysicalUnit> {
        self.canonical_unit(MeasurementKind::Time, TIME_CATEGORY)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryUnits> {
        self.entries.values()
    }

    pub fn categories(&self, kind: MeasurementKind) -> impl Iterator<Item = &CategoryUnits> {
        self.entries
            .values()
            .filter(move |entry| entry.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks invariants that must hold before the table is used.
    pub fn validate(&self) -> Result<()> {
        let time = self.time_unit()?;
        if time.dimension() != Dimension::base(BaseDimension::Time) {
            return Err(UnitError::invalid(
                time.symbol(),
                "canonical time unit must have the time dimension",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CanonicalUnitTable {
        let registry = UnitRegistry::builtin();
        let mut table = CanonicalUnitTable::new();
        let output = MeasurementKind::Output;
        table
            .register(&registry, output, "concentration", "µg/ml", &["mg/l", "µmol/l", "ng/ml"])
            .unwrap();
        table
            .register(&registry, output, "clearance", "ml/min", &["l/h"])
            .unwrap();
        table
            .register(&registry, output, "clearance", "ml/min/kg", &["l/h/kg"])
            .unwrap();
        table
            .register(&registry, MeasurementKind::Time, TIME_CATEGORY, "h", &[])
            .unwrap();
        table
    }

    #[test]
    fn unknown_category() {
        let err = table()
            .canonical_unit(MeasurementKind::Output, "auc_inf")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "no canonical unit registered for output category `auc_inf`"
        );
    }

    #[test]
    fn variant_selected_by_dimension() {
        let registry = UnitRegistry::builtin();
        let table = table();
        let per_kg = registry.parse_unit("l/h/kg").unwrap();
        let canonical = table
            .canonical_unit_for(MeasurementKind::Output, "clearance", &per_kg)
            .unwrap();
        assert_eq!(canonical.symbol(), "ml/min/kg");
        assert_eq!(
            table
                .canonical_unit(MeasurementKind::Output, "clearance")
                .unwrap()
                .symbol(),
            "ml/min"
        );
        let mass = registry.parse_unit("mg").unwrap();
        assert!(matches!(
            table.canonical_unit_for(MeasurementKind::Output, "clearance", &mass),
            Err(UnitError::Incompatible { .. })
        ));
    }

    #[test]
    fn allowed_units_compare_parsed() {
        let registry = UnitRegistry::builtin();
        let table = table();
        let ok = registry.parse_unit("µg/mL").unwrap();
        let listed = registry.parse_unit("mg/L").unwrap();
        let other = registry.parse_unit("g/l").unwrap();
        let kind = MeasurementKind::Output;
        assert!(table.is_valid_unit(kind, "concentration", &ok).unwrap());
        assert!(table.is_valid_unit(kind, "concentration", &listed).unwrap());
        assert!(!table.is_valid_unit(kind, "concentration", &other).unwrap());
    }

    #[test]
    fn substance_canonical_is_rejected() {
        let registry = UnitRegistry::builtin();
        let result = CanonicalUnitTable::new().register(
            &registry,
            MeasurementKind::Output,
            "concentration",
            "mmol/l",
            &[],
        );
        assert!(matches!(result, Err(UnitError::InvalidDefinition { .. })));
    }

    #[test]
    fn time_unit_is_hours() {
        let table = table();
        assert_eq!(table.time_unit().unwrap().symbol(), "h");
        assert!(table.validate().is_ok());
    }
}
