use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A substance from the study's substance taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    pub name: String,
    /// Molar mass in g/mol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chebi: Option<String>,
    /// Substances this one is combined from. Non-empty for derived substances.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl Substance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mass: None,
            charge: None,
            formula: None,
            chebi: None,
            parents: Vec::new(),
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn derived_from(mut self, parents: &[&str]) -> Self {
        self.parents = parents.iter().map(|p| (*p).to_string()).collect();
        self
    }

    pub fn is_derived(&self) -> bool {
        !self.parents.is_empty()
    }

    /// Molar mass usable for substance-amount reduction.
    ///
    /// Derived substances never qualify, and a mass that is not a positive
    /// finite number is treated as unknown.
    pub fn molar_mass(&self) -> Option<f64> {
        if self.is_derived() {
            return None;
        }
        self.mass.filter(|mass| mass.is_finite() && *mass > 0.0)
    }
}

/// Name-indexed lookup of substances.
#[derive(Debug, Clone, Default)]
pub struct SubstanceCatalog {
    by_name: BTreeMap<String, Substance>,
}

impl SubstanceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, substance: Substance) {
        self.by_name.insert(substance.name.clone(), substance);
    }

    pub fn get(&self, name: &str) -> Option<&Substance> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Substance> {
        self.by_name.values()
    }
}

impl FromIterator<Substance> for SubstanceCatalog {
    fn from_iter<T: IntoIterator<Item = Substance>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for substance in iter {
            catalog.insert(substance);
        }
        catalog
    }
}
