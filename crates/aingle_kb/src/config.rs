//! Configuration for a `KnowledgeBase`.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Knowledge base settings.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use aingle_kb::KbConfig;
///
/// let config = KbConfig::from_json(r#"{ "strict_retract": true }"#).unwrap();
/// assert!(config.strict_retract);
/// assert_eq!(config.fact_capacity, KbConfig::default().fact_capacity);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    /// When `true`, retracting an item that is not stored returns
    /// `Error::NotFound`. When `false` it is a logged no-op reporting
    /// `Retraction::NotFound`.
    pub strict_retract: bool,
    /// Number of facts to pre-allocate room for.
    pub fact_capacity: usize,
    /// Number of rules to pre-allocate room for.
    pub rule_capacity: usize,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            strict_retract: false,
            fact_capacity: 64,
            rule_capacity: 16,
        }
    }
}

impl KbConfig {
    /// A configuration that reports retraction of absent items as errors.
    pub fn strict() -> Self {
        Self {
            strict_retract: true,
            ..Self::default()
        }
    }

    /// A configuration sized for large rule bases.
    pub fn large() -> Self {
        Self {
            strict_retract: false,
            fact_capacity: 16 * 1024,
            rule_capacity: 4 * 1024,
        }
    }

    /// Reads a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_lenient() {
        assert!(!KbConfig::default().strict_retract);
        assert!(KbConfig::strict().strict_retract);
    }

    #[test]
    fn test_json_round_trip() {
        let config = KbConfig::large();
        let json = config.to_json().unwrap();
        assert_eq!(KbConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(KbConfig::from_json("{ strict_retract: yes").is_err());
    }
}
