//! Request loader configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Settings for the request loader shared by every fetch and write
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Maximum number of requests running at once
    pub max_concurrent: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { max_concurrent: 8 }
    }
}

impl ConfigSection for LoaderConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![Validator::in_range(
            self.max_concurrent,
            1,
            256,
            "loader.max_concurrent",
        )])
    }

    fn merge(&mut self, other: Self) {
        self.max_concurrent = other.max_concurrent;
    }

    fn section_name(&self) -> &'static str {
        "loader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LoaderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = LoaderConfig::default();
        config.max_concurrent = 0;
        assert!(config.validate().is_err());

        config.max_concurrent = 257;
        assert!(config.validate().is_err());

        config.max_concurrent = 256;
        assert!(config.validate().is_ok());
    }
}
