//! Physical dimensions as integer exponent vectors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseDimension {
    Mass,
    Length,
    Time,
    /// Amount of substance (mol).
    Substance,
    /// Biological activity in international units.
    InternationalUnit,
}

impl BaseDimension {
    pub const ALL: [BaseDimension; 5] = [
        BaseDimension::Mass,
        BaseDimension::Length,
        BaseDimension::Time,
        BaseDimension::Substance,
        BaseDimension::InternationalUnit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseDimension::Mass => "mass",
            BaseDimension::Length => "length",
            BaseDimension::Time => "time",
            BaseDimension::Substance => "substance",
            BaseDimension::InternationalUnit => "iu",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BaseDimension::Mass => "M",
            BaseDimension::Length => "L",
            BaseDimension::Time => "T",
            BaseDimension::Substance => "N",
            BaseDimension::InternationalUnit => "IU",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Exponents over the base dimensions. The all-zero vector is dimensionless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    exponents: [i32; 5],
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension { exponents: [0; 5] };

    pub fn base(base: BaseDimension) -> Self {
        Self::DIMENSIONLESS.with(base, 1)
    }

    pub fn with(mut self, base: BaseDimension, exponent: i32) -> Self {
        self.exponents[base.index()] = exponent;
        self
    }

    pub fn exponent(&self, base: BaseDimension) -> i32 {
        self.exponents[base.index()]
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|e| *e == 0)
    }

    pub fn multiply(&self, other: &Dimension) -> Dimension {
        let mut exponents = self.exponents;
        for (lhs, rhs) in exponents.iter_mut().zip(other.exponents) {
            *lhs = lhs.saturating_add(rhs);
        }
        Dimension { exponents }
    }

    /// `None` when an exponent overflows.
    pub fn checked_multiply(&self, other: &Dimension) -> Option<Dimension> {
        let mut exponents = self.exponents;
        for (lhs, rhs) in exponents.iter_mut().zip(other.exponents) {
            *lhs = lhs.checked_add(rhs)?;
        }
        Some(Dimension { exponents })
    }

    pub fn divide(&self, other: &Dimension) -> Dimension {
        self.multiply(&other.pow(-1))
    }

    pub fn pow(&self, power: i32) -> Dimension {
        Dimension {
            exponents: self.exponents.map(|e| e.saturating_mul(power)),
        }
    }

    /// `None` when an exponent overflows.
    pub fn checked_pow(&self, power: i32) -> Option<Dimension> {
        let mut exponents = self.exponents;
        for exponent in &mut exponents {
            *exponent = exponent.checked_mul(power)?;
        }
        Some(Dimension { exponents })
    }

    /// Largest absolute exponent over all bases.
    pub fn max_abs_exponent(&self) -> u32 {
        self.exponents
            .iter()
            .map(|e| e.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// Moves the substance exponent onto mass, as multiplying by a molar
    /// mass (g/mol) raised to that exponent does.
    pub fn reduce_substance(&self) -> Dimension {
        let substance = self.exponent(BaseDimension::Substance);
        self.with(BaseDimension::Substance, 0).with(
            BaseDimension::Mass,
            self.exponent(BaseDimension::Mass).saturating_add(substance),
        )
    }

    /// Exponent of every base dimension, keyed by name.
    pub fn to_map(&self) -> BTreeMap<&'static str, i32> {
        BaseDimension::ALL
            .into_iter()
            .map(|base| (base.as_str(), self.exponent(base)))
            .collect()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "[1]");
        }
        let parts: Vec<String> = BaseDimension::ALL
            .into_iter()
            .filter(|base| self.exponent(*base) != 0)
            .map(|base| match self.exponent(base) {
                1 => base.symbol().to_string(),
                e => format!("{}^{e}", base.symbol()),
            })
            .collect();
        write!(f, "[{}]", parts.join(" "))
    }
}
