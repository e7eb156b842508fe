//! The study container deserialized from an upload.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::records::{Characteristica, Intervention, Output, Timecourse};
use crate::subject::{Group, Individual};
use crate::substance::{Substance, SubstanceCatalog};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub name: String,
    #[serde(default)]
    pub substances: Vec<Substance>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub individuals: Vec<Individual>,
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub timecourses: Vec<Timecourse>,
}

impl Study {
    pub fn substance_catalog(&self) -> SubstanceCatalog {
        self.substances.iter().cloned().collect()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn individual(&self, name: &str) -> Option<&Individual> {
        self.individuals
            .iter()
            .find(|individual| individual.name == name)
    }

    /// Interventions referenced by name, in first-reference order. A name
    /// listed twice yields its intervention once.
    pub fn interventions_named<'a>(&'a self, names: &'a [String]) -> impl Iterator<Item = &'a Intervention> + 'a {
        names
            .iter()
            .enumerate()
            .filter(|(index, name)| !names[..*index].contains(*name))
            .filter_map(move |(_, name)| {
                self.interventions
                    .iter()
                    .find(|intervention| intervention.name == *name)
            })
    }

    /// Sample count of a record attached to `group` (and no individual).
    pub fn group_count(&self, group: Option<&str>, individual: Option<&str>) -> Option<u32> {
        if individual.is_some() {
            return None;
        }
        group.and_then(|name| self.group(name)).and_then(|g| g.count)
    }

    /// Final characteristica of `category` for a subject. An individual uses
    /// its own first, then its group's.
    pub fn subject_characteristica(
        &self,
        group: Option<&str>,
        individual: Option<&str>,
        category: &str,
    ) -> Option<&Characteristica> {
        if let Some(individual) = individual.and_then(|name| self.individual(name)) {
            if let Some(found) = individual.final_characteristica(category) {
                return Some(found);
            }
            return individual
                .group
                .as_deref()
                .and_then(|name| self.group(name))
                .and_then(|g| g.final_characteristica(category));
        }
        group
            .and_then(|name| self.group(name))
            .and_then(|g| g.final_characteristica(category))
    }

    /// Checks that every record's substance and group references resolve.
    pub fn check_references(&self) -> Result<()> {
        let catalog = self.substance_catalog();
        let substance_refs = self
            .interventions
            .iter()
            .filter_map(|i| i.substance.as_deref())
            .chain(self.outputs.iter().filter_map(|o| o.substance.as_deref()))
            .chain(self.timecourses.iter().filter_map(|t| t.substance.as_deref()));
        for name in substance_refs {
            if !catalog.contains(name) {
                return Err(ModelError::UnknownSubstance(name.to_string()));
            }
        }
        let group_refs = self
            .individuals
            .iter()
            .filter_map(|i| i.group.as_deref())
            .chain(self.outputs.iter().filter_map(|o| o.group.as_deref()))
            .chain(self.timecourses.iter().filter_map(|t| t.group.as_deref()));
        for name in group_refs {
            if self.group(name).is_none() {
                return Err(ModelError::UnknownGroup(name.to_string()));
            }
        }
        Ok(())
    }
}
