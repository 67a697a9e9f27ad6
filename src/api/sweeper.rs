//! Scheduled purge of expired one-time codes.
//!
//! Sweeping is storage hygiene, not a correctness dependency: the verifier
//! checks expiry on its own, so a failed sweep is logged and retried on the
//! next tick.

use crate::api::handlers::auth::storage::sweep_expired_codes;
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

#[derive(Clone, Copy, Debug)]
pub struct SweeperConfig {
    interval: Duration,
}

impl SweeperConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub fn spawn_code_sweeper(pool: PgPool, config: SweeperConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = config.interval();
        if interval.is_zero() {
            interval = Duration::from_secs(1);
        }

        loop {
            match sweep_expired_codes(&pool).await {
                Ok(deleted) if deleted > 0 => {
                    debug!(deleted, "swept expired one-time codes");
                }
                Ok(_) => {}
                Err(err) => {
                    error!("code sweep failed: {err}");
                }
            }

            sleep(interval).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweeper_config_defaults_and_overrides() {
        let config = SweeperConfig::new();
        assert_eq!(config.interval(), Duration::from_secs(15 * 60));

        let config = config.with_interval(Duration::from_secs(30));
        assert_eq!(config.interval(), Duration::from_secs(30));
    }
}
