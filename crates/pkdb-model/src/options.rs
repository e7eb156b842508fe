//! Configuration options for study normalization.

use serde::{Deserialize, Serialize};

/// Options for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationOptions {
    /// Reject records whose source unit is not in the category's allowed list.
    /// Default: false.
    pub enforce_allowed_units: bool,

    /// Fill missing sd/se/cv from the populated statistics.
    /// Default: true.
    pub derive_statistics: bool,

    /// Abort the study on the first rejected record instead of reporting it.
    /// Default: false.
    pub fail_fast: bool,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            enforce_allowed_units: false,
            derive_statistics: true,
            fail_fast: false,
        }
    }
}

impl NormalizationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_units(mut self, enforce: bool) -> Self {
        self.enforce_allowed_units = enforce;
        self
    }

    pub fn with_statistics(mut self, derive: bool) -> Self {
        self.derive_statistics = derive;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}
