//! Record identity and the raw/normalized record pair.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::enums::RecordKind;
use crate::records::Measurement;

/// Source position of a record within a study upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    pub kind: RecordKind,
    /// Zero-based position within the record list of its kind.
    pub index: usize,
    /// Human-readable label (name, pktype, or owner/category).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl RecordId {
    pub fn new(kind: RecordKind, index: usize) -> Self {
        Self {
            kind,
            index,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.index)?;
        if let Some(label) = &self.label {
            write!(f, " ({label})")?;
        }
        Ok(())
    }
}

/// A normalized record together with the raw record it was derived from.
///
/// The raw record is shared and never mutated again. Only the normalized
/// side points back; the raw side holds no reference forward.
#[derive(Debug, Clone)]
pub struct Normed<R> {
    pub id: RecordId,
    pub raw: Arc<R>,
    pub record: R,
    converted: bool,
}

impl<R: Measurement> Normed<R> {
    /// Pairs a raw record with a distinct normalized counterpart.
    pub fn converted(id: RecordId, mut raw: R, mut record: R) -> Self {
        raw.set_final(false);
        record.set_final(true);
        Self {
            id,
            raw: Arc::new(raw),
            record,
            converted: true,
        }
    }

    /// Wraps a record that normalization left untouched. The raw record is
    /// itself the authoritative version.
    pub fn unchanged(id: RecordId, mut raw: R) -> Self {
        raw.set_final(true);
        let record = raw.clone();
        Self {
            id,
            raw: Arc::new(raw),
            record,
            converted: false,
        }
    }

    /// True when a distinct normalized record exists.
    pub fn is_converted(&self) -> bool {
        self.converted
    }
}
