//! HTTP transport configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Settings for the reference HTTP transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Maximum redirects to follow
    pub max_redirects: usize,

    /// Attempts per GET, including the first
    pub retry_attempts: usize,

    /// Delay before the first retry, in milliseconds
    pub retry_initial_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "semnet/0.1".to_string(),
            max_redirects: 10,
            retry_attempts: 3,
            retry_initial_delay_ms: 100,
        }
    }
}

impl ConfigSection for TransportConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.timeout_secs, 1, 600, "transport.timeout_secs"),
            Validator::not_empty(&self.user_agent, "transport.user_agent"),
            Validator::in_range(self.max_redirects, 0, 20, "transport.max_redirects"),
            Validator::in_range(self.retry_attempts, 1, 10, "transport.retry_attempts"),
            Validator::in_range(
                self.retry_initial_delay_ms,
                1,
                60_000,
                "transport.retry_initial_delay_ms",
            ),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.timeout_secs = other.timeout_secs;
        self.user_agent = other.user_agent;
        self.max_redirects = other.max_redirects;
        self.retry_attempts = other.retry_attempts;
        self.retry_initial_delay_ms = other.retry_initial_delay_ms;
    }

    fn section_name(&self) -> &'static str {
        "transport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TransportConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_user_agent() {
        let mut config = TransportConfig::default();
        config.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_collects_every_error() {
        let config = TransportConfig {
            timeout_secs: 0,
            user_agent: String::new(),
            max_redirects: 50,
            retry_attempts: 0,
            retry_initial_delay_ms: 0,
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
    }
}
