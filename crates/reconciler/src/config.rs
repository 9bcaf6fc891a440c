//! Reconciler configuration.
//!
//! Loaded from TOML; every key is optional and falls back to the values the
//! provider's behaviour was tuned against:
//!
//! ```toml
//! [create_retry]
//! max_attempts = 10
//! interval_secs = 10
//!
//! [delete_retry]
//! max_attempts = 6
//! interval_secs = 10
//!
//! [delete_poll]
//! interval_secs = 20
//! timeout_secs = 300
//!
//! [timeouts]
//! create_secs = 600
//! update_secs = 600
//! delete_secs = 600
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::poller::Poller;
use crate::retry::RetryPolicy;

/// Attempt budget for a retried call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl RetrySettings {
    /// Create retry: rides out role propagation lag.
    pub const fn create_default() -> Self {
        Self {
            max_attempts: 10,
            interval_secs: 10,
        }
    }

    /// Delete retry: roughly a one-minute window for a constraint that is
    /// mid-transition.
    pub const fn delete_default() -> Self {
        Self {
            max_attempts: 6,
            interval_secs: 10,
        }
    }

    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.interval())
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::invalid_config(format!(
                "{name}.max_attempts must be at least 1"
            )));
        }
        if self.interval_secs == 0 {
            return Err(Error::invalid_config(format!(
                "{name}.interval_secs must be at least 1"
            )));
        }
        Ok(())
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::create_default()
    }
}

/// Deletion-settle polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl PollSettings {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn poller(&self) -> Poller {
        Poller::new(self.interval(), self.timeout())
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 20,
            timeout_secs: 300,
        }
    }
}

/// Overall deadline per operation, on top of the caller's cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationTimeouts {
    pub create_secs: u64,
    pub update_secs: u64,
    pub delete_secs: u64,
}

impl OperationTimeouts {
    pub const fn create(&self) -> Duration {
        Duration::from_secs(self.create_secs)
    }

    pub const fn update(&self) -> Duration {
        Duration::from_secs(self.update_secs)
    }

    pub const fn delete(&self) -> Duration {
        Duration::from_secs(self.delete_secs)
    }
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            create_secs: 600,
            update_secs: 600,
            delete_secs: 600,
        }
    }
}

/// Configuration for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcilerConfig {
    pub create_retry: RetrySettings,
    pub delete_retry: RetrySettings,
    pub delete_poll: PollSettings,
    pub timeouts: OperationTimeouts,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            create_retry: RetrySettings::create_default(),
            delete_retry: RetrySettings::delete_default(),
            delete_poll: PollSettings::default(),
            timeouts: OperationTimeouts::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for malformed TOML, unknown keys, or
    /// values [`validate`](Self::validate) rejects.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(document).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&document)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Reject budgets that would make the reconciler spin or never wait.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        self.create_retry.validate("create_retry")?;
        self.delete_retry.validate("delete_retry")?;
        if self.delete_poll.interval_secs == 0 || self.delete_poll.timeout_secs == 0 {
            return Err(Error::invalid_config(
                "delete_poll.interval_secs and delete_poll.timeout_secs must be at least 1",
            ));
        }
        let timeouts = [
            ("timeouts.create_secs", self.timeouts.create_secs),
            ("timeouts.update_secs", self.timeouts.update_secs),
            ("timeouts.delete_secs", self.timeouts.delete_secs),
        ];
        match timeouts.iter().find(|(_, secs)| *secs == 0) {
            Some((name, _)) => Err(Error::invalid_config(format!("{name} must be at least 1"))),
            None => Ok(()),
        }
    }

    /// Set the create retry budget.
    #[must_use]
    pub const fn with_create_retry(mut self, max_attempts: u32, interval_secs: u64) -> Self {
        self.create_retry = RetrySettings {
            max_attempts,
            interval_secs,
        };
        self
    }

    /// Set the delete retry budget.
    #[must_use]
    pub const fn with_delete_retry(mut self, max_attempts: u32, interval_secs: u64) -> Self {
        self.delete_retry = RetrySettings {
            max_attempts,
            interval_secs,
        };
        self
    }

    /// Set deletion-settle polling.
    #[must_use]
    pub const fn with_delete_poll(mut self, interval_secs: u64, timeout_secs: u64) -> Self {
        self.delete_poll = PollSettings {
            interval_secs,
            timeout_secs,
        };
        self
    }

    /// Set per-operation deadlines.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: OperationTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}
