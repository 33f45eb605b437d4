//! Sync engine configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Defaults for tracked resource operations and sync passes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// 0 runs sibling strategies in parallel, anything else sequentially
    pub strategy_batch_size: usize,

    /// 0 hydrates collection items in parallel, anything else one at a time
    pub batch_size: usize,

    /// Propagate load failures instead of recording them in the state
    pub throw_on_load_error: bool,

    /// Propagate create failures instead of returning nothing
    pub throw_on_create_error: bool,

    /// Propagate update failures instead of recording them in the state
    pub throw_on_update_error: bool,

    /// Propagate delete failures instead of recording them in the state
    pub throw_on_delete_error: bool,

    /// Attribute that compact feed titles are mapped onto
    pub title_attribute: String,

    /// Secondary identity attribute for matching document items (empty disables)
    pub match_attribute: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy_batch_size: 0,
            batch_size: 0,
            throw_on_load_error: false,
            throw_on_create_error: false,
            throw_on_update_error: false,
            throw_on_delete_error: false,
            title_attribute: "name".to_string(),
            match_attribute: "name".to_string(),
        }
    }
}

impl SyncConfig {
    /// The secondary identity attribute, if enabled
    pub fn match_attribute(&self) -> Option<&str> {
        let name = self.match_attribute.trim();
        (!name.is_empty()).then_some(name)
    }
}

impl ConfigSection for SyncConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.strategy_batch_size, 0, 1024, "sync.strategy_batch_size"),
            Validator::in_range(self.batch_size, 0, 1024, "sync.batch_size"),
            Validator::not_empty(&self.title_attribute, "sync.title_attribute"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.strategy_batch_size = other.strategy_batch_size;
        self.batch_size = other.batch_size;
        self.throw_on_load_error = other.throw_on_load_error;
        self.throw_on_create_error = other.throw_on_create_error;
        self.throw_on_update_error = other.throw_on_update_error;
        self.throw_on_delete_error = other.throw_on_delete_error;
        self.title_attribute = other.title_attribute;
        self.match_attribute = other.match_attribute;
    }

    fn section_name(&self) -> &'static str {
        "sync"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn test_match_attribute_can_be_disabled() {
        let mut config = SyncConfig::default();
        assert_eq!(config.match_attribute(), Some("name"));

        config.match_attribute = String::new();
        assert_eq!(config.match_attribute(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_title_attribute() {
        let mut config = SyncConfig::default();
        config.title_attribute = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge() {
        let mut base = SyncConfig::default();
        let mut other = SyncConfig::default();
        other.strategy_batch_size = 1;
        other.throw_on_create_error = true;
        other.title_attribute = "title".to_string();

        base.merge(other);
        assert_eq!(base.strategy_batch_size, 1);
        assert!(base.throw_on_create_error);
        assert_eq!(base.title_attribute, "title");
    }
}
