//! Elimination of the substance-amount dimension.
//!
//! A unit such as `µmol/l` measures an amount of substance. Multiplying by
//! the substance's molar mass (g/mol) raised to the unit's substance
//! exponent turns it into a mass unit (`µg/l`), which is what canonical
//! units are expressed in.

use pkdb_model::Substance;
use pkdb_units::{PhysicalUnit, UnitRegistry};

use crate::error::{NormalizationError, Result};

/// Outcome of a substance-amount reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// Multiplier applied to every dimensional statistic.
    pub factor: f64,
    pub unit: PhysicalUnit,
}

impl Reduction {
    fn unchanged(unit: &PhysicalUnit) -> Self {
        Self {
            factor: 1.0,
            unit: unit.clone(),
        }
    }
}

/// Removes the substance-amount dimension from `unit` using the molar mass
/// of `substance`.
///
/// A missing substance, an unknown or derived molar mass, or a unit without
/// a substance-amount term leave the unit as it is with factor 1.
pub fn reduce(
    registry: &UnitRegistry,
    unit: &PhysicalUnit,
    substance: Option<&Substance>,
) -> Result<Reduction> {
    let exponent = unit.substance_exponent();
    if exponent == 0 {
        return Ok(Reduction::unchanged(unit));
    }
    let Some(molar_mass) = substance.and_then(Substance::molar_mass) else {
        tracing::debug!(unit = %unit, "no molar mass, substance amount kept");
        return Ok(Reduction::unchanged(unit));
    };

    let symbol = rewrite_symbol(registry, unit);
    let reduced = registry
        .parse_unit(&symbol)
        .map_err(|source| NormalizationError::Reduction {
            unit: unit.symbol().to_string(),
            reduced: symbol.clone(),
            source,
        })?;

    if reduced.dimension() != unit.dimension().reduce_substance() {
        return Err(NormalizationError::Reduction {
            unit: unit.symbol().to_string(),
            reduced: symbol,
            source: pkdb_units::UnitError::Incompatible {
                from: unit.symbol().to_string(),
                to: reduced.symbol().to_string(),
                from_dimension: unit.dimension().reduce_substance(),
                to_dimension: reduced.dimension(),
            },
        });
    }

    let factor = molar_mass.powi(exponent) * unit.factor() / reduced.factor();
    tracing::debug!(
        unit = %unit,
        reduced = %reduced,
        molar_mass,
        factor,
        "substance amount reduced"
    );
    Ok(Reduction {
        factor,
        unit: reduced,
    })
}

/// Replaces every substance-amount atom in the written unit by its mass
/// equivalent, keeping prefixes, exponents and layout (`µmol/l` -> `µg/l`).
fn rewrite_symbol(registry: &UnitRegistry, unit: &PhysicalUnit) -> String {
    let mut replacements: Vec<_> = unit
        .terms()
        .iter()
        .filter_map(|term| {
            let target = registry.atom(&term.atom)?.mass_equivalent.as_deref()?;
            Some((term.span.clone(), target))
        })
        .collect();
    replacements.sort_by_key(|(span, _)| std::cmp::Reverse(span.start));

    let mut symbol = unit.symbol().to_string();
    for (span, target) in replacements {
        symbol.replace_range(span, target);
    }
    symbol
}
