//! The `PhysicalUnit` value type.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::dimension::{BaseDimension, Dimension};
use crate::error::{Result, UnitError};

const RELATIVE_TOLERANCE: f64 = 1e-9;

/// One atomic unit occurrence inside a unit expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTerm {
    /// Prefix symbol as written (`µ`, `m`, `k`, ...).
    pub prefix: Option<String>,
    /// Canonical symbol of the atomic unit.
    pub atom: String,
    /// Net exponent after division and grouping are applied.
    pub exponent: i32,
    /// Byte range of the atom text (prefix excluded) in the unit symbol.
    pub span: Range<usize>,
}

/// A unit of measurement: its written form, its magnitude relative to the
/// base units (g, m, s, mol, IU) and its dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalUnit {
    symbol: String,
    factor: f64,
    dimension: Dimension,
    terms: Vec<UnitTerm>,
}

impl PhysicalUnit {
    pub fn new(
        symbol: impl Into<String>,
        factor: f64,
        dimension: Dimension,
        terms: Vec<UnitTerm>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            factor,
            dimension,
            terms,
        }
    }

    pub fn dimensionless() -> Self {
        Self::new("-", 1.0, Dimension::DIMENSIONLESS, Vec::new())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn terms(&self) -> &[UnitTerm] {
        &self.terms
    }

    pub fn dimensionality(&self) -> BTreeMap<&'static str, i32> {
        self.dimension.to_map()
    }

    pub fn substance_exponent(&self) -> i32 {
        self.dimension.exponent(BaseDimension::Substance)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    pub fn is_compatible(&self, other: &PhysicalUnit) -> bool {
        self.dimension == other.dimension
    }

    /// Same dimension and same magnitude, regardless of spelling.
    pub fn is_equivalent(&self, other: &PhysicalUnit) -> bool {
        self.is_compatible(other) && approx_eq(self.factor, other.factor)
    }

    /// Multiplier taking a quantity in `self` to a quantity in `target`.
    pub fn conversion_factor_to(&self, target: &PhysicalUnit) -> Result<f64> {
        if !self.is_compatible(target) {
            return Err(UnitError::Incompatible {
                from: self.symbol.clone(),
                to: target.symbol.clone(),
                from_dimension: self.dimension,
                to_dimension: target.dimension,
            });
        }
        Ok(self.factor / target.factor)
    }

    pub fn convert_value(&self, value: f64, target: &PhysicalUnit) -> Result<f64> {
        Ok(value * self.conversion_factor_to(target)?)
    }

    pub fn multiply(&self, other: &PhysicalUnit) -> PhysicalUnit {
        self.combine(other, '*', 1)
    }

    pub fn divide(&self, other: &PhysicalUnit) -> PhysicalUnit {
        self.combine(other, '/', -1)
    }

    pub fn pow(&self, power: i32) -> PhysicalUnit {
        let (base, offset) = wrapped(&self.symbol);
        let terms = self
            .terms
            .iter()
            .map(|term| shifted(term, offset, power))
            .collect();
        PhysicalUnit {
            symbol: format!("{base}^{power}"),
            factor: self.factor.powi(power),
            dimension: self.dimension.pow(power),
            terms,
        }
    }

    fn combine(&self, other: &PhysicalUnit, operator: char, sign: i32) -> PhysicalUnit {
        let (rhs, wrap_offset) = wrapped(&other.symbol);
        let offset = self.symbol.len() + operator.len_utf8() + wrap_offset;
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().map(|term| shifted(term, offset, sign)));
        let factor = if sign > 0 {
            self.factor * other.factor
        } else {
            self.factor / other.factor
        };
        PhysicalUnit {
            symbol: format!("{}{operator}{rhs}", self.symbol),
            factor,
            dimension: self.dimension.multiply(&other.dimension.pow(sign)),
            terms,
        }
    }
}

impl fmt::Display for PhysicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs())
}

/// Parenthesizes compound symbols. Returns the text and the byte offset of
/// the original symbol inside it.
fn wrapped(symbol: &str) -> (String, usize) {
    let compound = symbol
        .chars()
        .any(|c| matches!(c, '*' | '/' | '.' | '·' | '^' | ' '));
    if compound {
        (format!("({symbol})"), 1)
    } else {
        (symbol.to_string(), 0)
    }
}

fn shifted(term: &UnitTerm, offset: usize, power: i32) -> UnitTerm {
    UnitTerm {
        prefix: term.prefix.clone(),
        atom: term.atom.clone(),
        exponent: term.exponent.saturating_mul(power),
        span: term.span.start + offset..term.span.end + offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mass(symbol: &str, factor: f64) -> PhysicalUnit {
        PhysicalUnit::new(symbol, factor, Dimension::base(BaseDimension::Mass), Vec::new())
    }

    fn volume(symbol: &str, factor: f64) -> PhysicalUnit {
        PhysicalUnit::new(
            symbol,
            factor,
            Dimension::base(BaseDimension::Length).pow(3),
            Vec::new(),
        )
    }

    #[test]
    fn divide_parenthesizes_compound_denominator() {
        let dose = mass("mg", 1e-3);
        let concentration = mass("µg", 1e-6).divide(&volume("ml", 1e-6));
        assert_eq!(concentration.symbol(), "µg/ml");
        let vd = dose.divide(&concentration);
        assert_eq!(vd.symbol(), "mg/(µg/ml)");
        assert!(approx_eq(vd.factor(), 1e-3));
        assert_eq!(vd.dimension(), Dimension::base(BaseDimension::Length).pow(3));
    }

    #[test]
    fn incompatible_conversion_fails() {
        let err = mass("mg", 1e-3)
            .conversion_factor_to(&volume("l", 1e-3))
            .unwrap_err();
        assert!(matches!(err, UnitError::Incompatible { .. }));
    }

    #[test]
    fn equivalence_ignores_spelling() {
        let a = mass("mg", 1e-3);
        let b = mass("milligram", 0.001);
        assert!(a.is_equivalent(&b));
        assert_ne!(a, b);
    }
}
