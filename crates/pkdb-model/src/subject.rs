use serde::{Deserialize, Serialize};

use crate::records::{Characteristica, Measurement};

/// A group of subjects with shared characteristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub characteristica: Vec<Characteristica>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: None,
            parent: None,
            characteristica: Vec::new(),
        }
    }

    /// First final characteristica of `category`.
    pub fn final_characteristica(&self, category: &str) -> Option<&Characteristica> {
        find_final(&self.characteristica, category)
    }
}

/// A single study subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub characteristica: Vec<Characteristica>,
}

impl Individual {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            characteristica: Vec::new(),
        }
    }

    pub fn final_characteristica(&self, category: &str) -> Option<&Characteristica> {
        find_final(&self.characteristica, category)
    }
}

fn find_final<'a>(items: &'a [Characteristica], category: &str) -> Option<&'a Characteristica> {
    items
        .iter()
        .find(|item| item.is_final() && item.category == category)
}
