use serde::{Deserialize, Serialize};

/// Configuration for assertion synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssertConfig {
    /// Relative tolerance for floating comparisons (default: 1e-6).
    pub tolerance: f64,
    /// Assert on fields read through accessors, not only public fields (default: true).
    pub derived_fields: bool,
}

impl Default for AssertConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            derived_fields: true,
        }
    }
}
