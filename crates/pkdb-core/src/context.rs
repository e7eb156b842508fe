use pkdb_model::{NormalizationOptions, SubstanceCatalog};
use pkdb_normalization::NormalizationContext;
use pkdb_standards::StandardsRegistry;
use pkdb_units::{CanonicalUnitTable, UnitRegistry};

/// Read-only configuration shared by every study processed in a run.
#[derive(Debug, Clone, Copy)]
pub struct StudyContext<'a> {
    pub units: &'a UnitRegistry,
    pub canonical: &'a CanonicalUnitTable,
    pub options: NormalizationOptions,
}

impl<'a> StudyContext<'a> {
    pub fn new(units: &'a UnitRegistry, canonical: &'a CanonicalUnitTable) -> Self {
        Self {
            units,
            canonical,
            options: NormalizationOptions::default(),
        }
    }

    pub fn from_standards(standards: &'a StandardsRegistry) -> Self {
        Self::new(&standards.units, &standards.canonical)
    }

    pub fn with_options(mut self, options: NormalizationOptions) -> Self {
        self.options = options;
        self
    }

    /// Normalization context bound to a study's substances.
    pub fn normalizer<'s>(&self, substances: &'s SubstanceCatalog) -> NormalizationContext<'s>
    where
        'a: 's,
    {
        NormalizationContext::new(self.units, self.canonical, substances).with_options(self.options)
    }
}
