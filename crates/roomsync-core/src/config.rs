//! Engine configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::DEFAULT_RETENTION;

/// Label shown for messages whose sender provided no name.
pub const DEFAULT_FALLBACK_NAME: &str = "Guest";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Retention must keep at least one message.
    #[error("retention must be at least 1")]
    ZeroRetention,
}

/// Tunables for [`crate::SyncEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of retained messages.
    pub retention: usize,
    /// Author label for messages without a sender name.
    pub fallback_sender_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            fallback_sender_name: DEFAULT_FALLBACK_NAME.to_string(),
        }
    }
}

impl SyncConfig {
    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// - `ConfigError::ZeroRetention` if `retention` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention == 0 {
            return Err(ConfigError::ZeroRetention);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&ciborium::Value::Map(vec![(
            ciborium::Value::Text("retention".into()),
            ciborium::Value::Integer(50u64.into()),
        )]), &mut buf)
        .expect("encode");

        let config: SyncConfig = ciborium::de::from_reader(buf.as_slice()).expect("decode");

        assert_eq!(config.retention, 50);
        assert_eq!(config.fallback_sender_name, "Guest");
    }

    #[test]
    fn zero_retention_rejected() {
        let config = SyncConfig { retention: 0, ..SyncConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRetention));
        assert!(SyncConfig::default().validate().is_ok());
    }
}
