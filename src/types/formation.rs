//! Derived formation intervals

use serde::{Deserialize, Serialize};

/// Label used for depths not covered by any known formation.
pub const UNKNOWN_FORMATION: &str = "Unknown";

/// A named depth interval, half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationInterval {
    pub start: f64,
    pub end: f64,
    pub name: String,
}

impl FormationInterval {
    pub fn new(start: f64, end: f64, name: impl Into<String>) -> Self {
        Self {
            start,
            end,
            name: name.into(),
        }
    }

    pub fn contains(&self, depth: f64) -> bool {
        depth >= self.start && depth < self.end
    }
}
