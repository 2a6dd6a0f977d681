//! # License Cache
//!
//! Time-bounded cache in front of the identity provider's seat check.
//!
//! - A fresh entry is served without calling out.
//! - An expired entry is treated exactly like a miss.
//! - A failed or timed-out check is cached as a negative "license unavailable"
//!   result for the shorter error TTL instead of being returned as an error.
//!
//! Map guards are never held across the upstream call.

use crate::config::LicenseCacheConfig;
use crate::error::MigratorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// Seat details returned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub has_seat: bool,
    pub seat_type: Option<String>,
}

/// Identity provider seat-check endpoint
#[async_trait]
pub trait SeatChecker: Send + Sync {
    async fn check_seat(&self, token: &str) -> Result<SeatInfo, MigratorError>;
}

/// Cached outcome of a seat check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseStatus {
    pub has_seat: bool,
    pub seat_type: Option<String>,
    /// False when the upstream check failed and this is a degraded result
    pub available: bool,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl LicenseStatus {
    fn from_seat(seat: SeatInfo) -> Self {
        Self {
            has_seat: seat.has_seat,
            seat_type: seat.seat_type,
            available: true,
            error: None,
            checked_at: Utc::now(),
        }
    }

    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            has_seat: false,
            seat_type: None,
            available: false,
            error: Some(reason.into()),
            checked_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedLicense {
    status: LicenseStatus,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct LicenseCache<C: SeatChecker> {
    checker: Arc<C>,
    entries: DashMap<String, CachedLicense>,
    ttl: Duration,
    error_ttl: Duration,
    check_timeout: Duration,
}

impl<C: SeatChecker> LicenseCache<C> {
    pub fn new(checker: Arc<C>, config: &LicenseCacheConfig) -> Self {
        Self {
            checker,
            entries: DashMap::new(),
            ttl: config.ttl(),
            error_ttl: config.error_ttl(),
            check_timeout: config.check_timeout(),
        }
    }

    /// Fresh cached status for `key`, without calling out
    pub fn cached(&self, key: &str) -> Option<LicenseStatus> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.status.clone())
    }

    /// Cached status for `key`, or a fresh upstream check using `token` on a miss.
    pub async fn check(&self, key: &str, token: &str) -> LicenseStatus {
        if let Some(status) = self.cached(key) {
            debug!(key = %key, "License cache hit");
            return status;
        }

        let (status, ttl) = match timeout(self.check_timeout, self.checker.check_seat(token)).await
        {
            Ok(Ok(seat)) => (LicenseStatus::from_seat(seat), self.ttl),
            Ok(Err(err)) => {
                warn!(key = %key, error = %err, "Seat check failed; caching unavailable license");
                (LicenseStatus::unavailable(err.to_string()), self.error_ttl)
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = self.check_timeout.as_millis() as u64,
                    "Seat check timed out; caching unavailable license"
                );
                (
                    LicenseStatus::unavailable(format!(
                        "Seat check timed out after {}ms",
                        self.check_timeout.as_millis()
                    )),
                    self.error_ttl,
                )
            }
        };

        self.entries.insert(
            key.to_string(),
            CachedLicense {
                status: status.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        status
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop expired entries and return how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
