use serde::{Deserialize, Serialize};

use crate::enums::StatField;
use crate::provenance::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// The record was not normalized.
    Reject,
    Warning,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Reject => "reject",
            IssueSeverity::Warning => "warning",
        }
    }
}

/// A problem found while processing one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordIssue {
    pub record: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<StatField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub message: String,
    pub severity: IssueSeverity,
}

impl RecordIssue {
    pub fn reject(record: RecordId, message: impl Into<String>) -> Self {
        Self {
            record,
            field: None,
            unit: None,
            message: message.into(),
            severity: IssueSeverity::Reject,
        }
    }

    pub fn warning(record: RecordId, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            ..Self::reject(record, message)
        }
    }

    pub fn with_unit(mut self, unit: Option<&str>) -> Self {
        self.unit = unit.map(str::to_string);
        self
    }

    pub fn with_field(mut self, field: StatField) -> Self {
        self.field = Some(field);
        self
    }
}

/// Issues collected over a study.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueReport {
    pub study: String,
    pub issues: Vec<RecordIssue>,
}

impl IssueReport {
    pub fn new(study: impl Into<String>) -> Self {
        Self {
            study: study.into(),
            issues: Vec::new(),
        }
    }

    pub fn push(&mut self, issue: RecordIssue) {
        self.issues.push(issue);
    }

    pub fn reject_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Reject)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.reject_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}
