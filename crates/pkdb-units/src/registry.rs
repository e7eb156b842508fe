//! Atomic units, SI prefixes and symbol resolution.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::dimension::{BaseDimension, Dimension};
use crate::error::{Result, UnitError};
use crate::parser;
use crate::unit::PhysicalUnit;

/// A registered unit symbol with its magnitude in base units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicUnit {
    pub symbol: String,
    pub name: String,
    pub factor: f64,
    pub dimension: Dimension,
    /// Accepts SI prefixes (`mg`, `µmol`, `ml`).
    pub prefixable: bool,
    /// Mass atom a substance-amount atom reduces to (`mol` -> `g`).
    pub mass_equivalent: Option<String>,
    pub aliases: Vec<String>,
}

impl AtomicUnit {
    pub fn new(symbol: &str, name: &str, factor: f64, dimension: Dimension) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            factor,
            dimension,
            prefixable: false,
            mass_equivalent: None,
            aliases: Vec::new(),
        }
    }

    pub fn prefixable(mut self) -> Self {
        self.prefixable = true;
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| (*a).to_string()).collect();
        self
    }

    pub fn with_mass_equivalent(mut self, symbol: &str) -> Self {
        self.mass_equivalent = Some(symbol.to_string());
        self
    }

    pub fn carries_substance(&self) -> bool {
        self.dimension.exponent(BaseDimension::Substance) != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    pub symbol: String,
    pub name: String,
    pub factor: f64,
}

impl Prefix {
    pub fn new(symbol: &str, name: &str, factor: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            factor,
        }
    }
}

/// Resolved symbol: optional prefix plus the atomic unit.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub prefix: Option<&'a Prefix>,
    pub atom: &'a AtomicUnit,
    /// Byte length of the prefix text in the resolved symbol.
    pub prefix_len: usize,
}

impl Resolved<'_> {
    pub fn factor(&self) -> f64 {
        self.prefix.map_or(1.0, |p| p.factor) * self.atom.factor
    }
}

/// Registry of atomic units and prefixes. Built once and then only read.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    atoms: Vec<AtomicUnit>,
    by_symbol: HashMap<String, usize>,
    prefixes: Vec<Prefix>,
}

impl UnitRegistry {
    /// Builds a registry, rejecting malformed or conflicting definitions.
    pub fn new(atoms: Vec<AtomicUnit>, prefixes: Vec<Prefix>) -> Result<Self> {
        let mut by_symbol = HashMap::new();
        for (index, atom) in atoms.iter().enumerate() {
            validate_symbol(&atom.symbol)?;
            if !(atom.factor.is_finite() && atom.factor > 0.0) {
                return Err(UnitError::invalid(
                    &atom.symbol,
                    format!("factor {} must be a positive finite number", atom.factor),
                ));
            }
            for symbol in std::iter::once(&atom.symbol).chain(&atom.aliases) {
                validate_symbol(symbol)?;
                if by_symbol.insert(symbol.clone(), index).is_some() {
                    return Err(UnitError::invalid(symbol, "symbol is defined twice"));
                }
            }
        }
        for prefix in &prefixes {
            validate_symbol(&prefix.symbol)?;
            if !(prefix.factor.is_finite() && prefix.factor > 0.0) {
                return Err(UnitError::invalid(
                    &prefix.symbol,
                    "prefix factor must be a positive finite number",
                ));
            }
        }
        let registry = Self {
            atoms,
            by_symbol,
            prefixes,
        };
        registry.validate_mass_equivalents()?;
        tracing::debug!(
            atoms = registry.atoms.len(),
            prefixes = registry.prefixes.len(),
            "unit registry built"
        );
        Ok(registry)
    }

    /// The built-in unit set used when no configuration is supplied.
    pub fn builtin() -> Self {
        let mass = Dimension::base(BaseDimension::Mass);
        let length = Dimension::base(BaseDimension::Length);
        let time = Dimension::base(BaseDimension::Time);
        let atoms = vec![
            AtomicUnit::new("g", "gram", 1.0, mass).prefixable(),
            AtomicUnit::new("m", "metre", 1.0, length).prefixable(),
            AtomicUnit::new("s", "second", 1.0, time)
                .prefixable()
                .with_aliases(&["sec"]),
            AtomicUnit::new("mol", "mole", 1.0, Dimension::base(BaseDimension::Substance))
                .prefixable()
                .with_mass_equivalent("g"),
            AtomicUnit::new("l", "litre", 1e-3, length.pow(3))
                .prefixable()
                .with_aliases(&["L"]),
            AtomicUnit::new("min", "minute", 60.0, time),
            AtomicUnit::new("h", "hour", 3600.0, time).with_aliases(&["hr"]),
            AtomicUnit::new("day", "day", 86_400.0, time).with_aliases(&["d"]),
            AtomicUnit::new("week", "week", 604_800.0, time).with_aliases(&["wk"]),
            AtomicUnit::new("yr", "year", 31_557_600.0, time).with_aliases(&["year"]),
            AtomicUnit::new(
                "IU",
                "international unit",
                1.0,
                Dimension::base(BaseDimension::InternationalUnit),
            )
            .prefixable(),
            AtomicUnit::new(
                "mmHg",
                "millimetre of mercury",
                133_322.387_415,
                mass.divide(&length).divide(&time.pow(2)),
            ),
            AtomicUnit::new("%", "percent", 0.01, Dimension::DIMENSIONLESS),
        ];
        let prefixes = vec![
            Prefix::new("G", "giga", 1e9),
            Prefix::new("M", "mega", 1e6),
            Prefix::new("k", "kilo", 1e3),
            Prefix::new("d", "deci", 1e-1),
            Prefix::new("c", "centi", 1e-2),
            Prefix::new("m", "milli", 1e-3),
            Prefix::new("µ", "micro", 1e-6),
            Prefix::new("μ", "micro", 1e-6),
            Prefix::new("u", "micro", 1e-6),
            Prefix::new("n", "nano", 1e-9),
            Prefix::new("p", "pico", 1e-12),
            Prefix::new("f", "femto", 1e-15),
        ];
        let by_symbol = index_symbols(&atoms);
        Self {
            atoms,
            by_symbol,
            prefixes,
        }
    }

    pub fn atoms(&self) -> &[AtomicUnit] {
        &self.atoms
    }

    pub fn prefixes(&self) -> &[Prefix] {
        &self.prefixes
    }

    /// Atom registered under `symbol` or one of its aliases.
    pub fn atom(&self, symbol: &str) -> Option<&AtomicUnit> {
        self.by_symbol.get(symbol).map(|index| &self.atoms[*index])
    }

    /// Resolves a symbol: an exact atom or alias wins, otherwise a prefix
    /// followed by a prefixable atom.
    pub fn resolve(&self, symbol: &str) -> Option<Resolved<'_>> {
        if let Some(atom) = self.atom(symbol) {
            return Some(Resolved {
                prefix: None,
                atom,
                prefix_len: 0,
            });
        }
        self.prefixes.iter().find_map(|prefix| {
            let rest = symbol.strip_prefix(prefix.symbol.as_str())?;
            let atom = self.atom(rest).filter(|atom| atom.prefixable)?;
            Some(Resolved {
                prefix: Some(prefix),
                atom,
                prefix_len: prefix.symbol.len(),
            })
        })
    }

    pub fn parse_unit(&self, unit: &str) -> Result<PhysicalUnit> {
        parser::parse(self, unit)
    }

    pub fn dimensionality(&self, unit: &str) -> Result<BTreeMap<&'static str, i32>> {
        Ok(self.parse_unit(unit)?.dimensionality())
    }

    /// Converts `value` from one unit string to another.
    pub fn convert(&self, value: f64, from: &str, to: &str) -> Result<f64> {
        let from = self.parse_unit(from)?;
        let to = self.parse_unit(to)?;
        from.convert_value(value, &to)
    }

    fn validate_mass_equivalents(&self) -> Result<()> {
        for atom in &self.atoms {
            match (&atom.mass_equivalent, atom.carries_substance()) {
                (None, true) => {
                    return Err(UnitError::invalid(
                        &atom.symbol,
                        "substance-amount unit needs a mass equivalent",
                    ));
                }
                (Some(target), _) => {
                    let mass = Dimension::base(BaseDimension::Mass);
                    let resolved = self.atom(target).ok_or_else(|| {
                        UnitError::invalid(
                            &atom.symbol,
                            format!("mass equivalent `{target}` is not registered"),
                        )
                    })?;
                    if resolved.dimension != mass
                        || atom.dimension.reduce_substance() != mass
                    {
                        return Err(UnitError::invalid(
                            &atom.symbol,
                            format!("mass equivalent `{target}` must be a pure mass unit"),
                        ));
                    }
                }
                (None, false) => {}
            }
        }
        Ok(())
    }
}

fn index_symbols(atoms: &[AtomicUnit]) -> HashMap<String, usize> {
    let mut by_symbol = HashMap::new();
    for (index, atom) in atoms.iter().enumerate() {
        by_symbol.insert(atom.symbol.clone(), index);
        for alias in &atom.aliases {
            by_symbol.insert(alias.clone(), index);
        }
    }
    by_symbol
}

fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() {
        return Err(UnitError::invalid(symbol, "symbol is empty"));
    }
    if symbol
        .chars()
        .any(|c| c.is_whitespace() || c.is_ascii_digit() || "*/.·^()-+".contains(c))
    {
        return Err(UnitError::invalid(
            symbol,
            "symbol contains an operator, digit or whitespace",
        ));
    }
    Ok(())
}
