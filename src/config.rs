use serde::{Deserialize, Serialize};

use crate::expression::Grade;

/// Knobs for evaluation. Deserializable so callers can embed it in their
/// own configuration files; every field has a default.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Minimum grade for a course leaf with no explicit grade and no
    /// enclosing grade floor.
    pub default_min_grade: Grade,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            default_min_grade: Grade::C,
        }
    }
}
