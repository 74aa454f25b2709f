//! Engine configuration.
//!
//! Values are layered: compiled-in defaults, then an optional
//! `booking-engine.toml`, then `BOOKING__`-prefixed environment variables
//! (e.g. `BOOKING__DATABASE_URL`, `BOOKING__PSP__API_KEY`,
//! `BOOKING__WORKERS__CAPTURE_INTERVAL_SECS`). Later layers win.

use serde::Deserialize;
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingEngineConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// PSP connection settings.
    pub psp: PspConfig,
    /// Scheduled-job cadence settings.
    #[serde(default)]
    pub workers: WorkerConfig,
}

/// PSP connection settings.
#[derive(Clone, Deserialize)]
pub struct PspConfig {
    /// PSP API base URL.
    pub base_url: String,
    /// PSP API secret key. Never logged — see the redacting [`std::fmt::Debug`] impl.
    pub api_key: String,
    /// Client-side timeout for PSP calls.
    #[serde(default = "PspConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl PspConfig {
    const fn default_timeout_secs() -> u64 {
        10
    }

    /// The configured timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for PspConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PspConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Scheduled-job cadence, matching spec §4.4's job table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// `processScheduledAuthorizations` interval.
    pub authorization_interval_secs: u64,
    /// `retryFailedAuthorizations` interval.
    pub auth_retry_interval_secs: u64,
    /// `captureCompletedLessons` interval.
    pub capture_interval_secs: u64,
    /// `retryFailedCaptures` interval.
    pub capture_retry_interval_secs: u64,
    /// `resolveUndisputedNoShows` interval.
    pub no_show_resolution_interval_secs: u64,
    /// `authorizationHealthCheck` interval.
    pub health_check_interval_secs: u64,
    /// `auditPayoutSchedules` interval (nightly).
    pub payout_audit_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            authorization_interval_secs: 30 * 60,
            auth_retry_interval_secs: 30 * 60,
            capture_interval_secs: 60 * 60,
            capture_retry_interval_secs: 4 * 60 * 60,
            no_show_resolution_interval_secs: 60 * 60,
            health_check_interval_secs: 15 * 60,
            payout_audit_interval_secs: 24 * 60 * 60,
        }
    }
}

impl BookingEngineConfig {
    /// Load configuration from the layered sources described above.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse or a required field is
    /// missing from every layer.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("workers.authorization_interval_secs", 30 * 60)?
            .set_default("workers.auth_retry_interval_secs", 30 * 60)?
            .set_default("workers.capture_interval_secs", 60 * 60)?
            .set_default("workers.capture_retry_interval_secs", 4 * 60 * 60)?
            .set_default("workers.no_show_resolution_interval_secs", 60 * 60)?
            .set_default("workers.health_check_interval_secs", 15 * 60)?
            .set_default("workers.payout_audit_interval_secs", 24 * 60 * 60)?
            .set_default("psp.timeout_secs", 10)?
            .add_source(config::File::with_name("booking-engine").required(false))
            .add_source(config::Environment::with_prefix("BOOKING").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_config_default_matches_spec_cadences() {
        let config = WorkerConfig::default();
        assert_eq!(config.authorization_interval_secs, 1800);
        assert_eq!(config.capture_interval_secs, 3600);
        assert_eq!(config.capture_retry_interval_secs, 14400);
        assert_eq!(config.health_check_interval_secs, 900);
    }

    #[test]
    fn psp_config_debug_redacts_api_key() {
        let config = PspConfig {
            base_url: "https://psp.example.com".to_string(),
            api_key: "sk_live_super_secret".to_string(),
            timeout_secs: 10,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk_live_super_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
