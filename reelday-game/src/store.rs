//! Per-day persistence adapter.
//!
//! [`StateStore`] is the only component that reads or writes game state, and
//! it gates both directions through the [`StateNormalizer`]: nothing corrupt
//! reaches storage, and nothing stale reaches the caller. Persistence is best
//! effort; failures are logged and the in-memory state stays authoritative.
use chrono::{Days, NaiveDate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_KEY_PREFIX, DEFAULT_RETENTION_DAYS};
use crate::keys::{day_key, format_date, parse_day_key};
use crate::normalize::{Normalized, StateNormalizer};
use crate::state::{GameState, RawGameState};
use crate::storage::KeyValueStore;

/// Storage layout and retention settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "StoreConfig::default_retention_days")]
    pub retention_days: u32,
}

impl StoreConfig {
    fn default_key_prefix() -> String {
        DEFAULT_KEY_PREFIX.to_string()
    }

    const fn default_retention_days() -> u32 {
        DEFAULT_RETENTION_DAYS
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: Self::default_key_prefix(),
            retention_days: Self::default_retention_days(),
        }
    }
}

/// Why a read or write did not reach the backend.
#[derive(Debug, Error)]
pub enum PersistenceFailure<E>
where
    E: std::error::Error + 'static,
{
    #[error("backend error: {0}")]
    Backend(#[source] E),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of one retention sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Records dated strictly before this day are removed.
    pub cutoff: NaiveDate,
    pub scanned: usize,
    pub deleted: Vec<NaiveDate>,
    pub failures: usize,
}

pub struct StateStore<S>
where
    S: KeyValueStore,
{
    backend: S,
    normalizer: StateNormalizer,
    config: StoreConfig,
}

impl<S> StateStore<S>
where
    S: KeyValueStore,
{
    /// Store with the default policy and layout.
    pub fn new(backend: S) -> Self {
        Self::with_config(backend, StateNormalizer::default(), StoreConfig::default())
    }

    pub const fn with_config(
        backend: S,
        normalizer: StateNormalizer,
        config: StoreConfig,
    ) -> Self {
        Self {
            backend,
            normalizer,
            config,
        }
    }

    pub const fn backend(&self) -> &S {
        &self.backend
    }

    pub const fn normalizer(&self) -> &StateNormalizer {
        &self.normalizer
    }

    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn key_for(&self, date: NaiveDate) -> String {
        day_key(&self.config.key_prefix, date)
    }

    /// Load the normalized record for `date`.
    ///
    /// Missing records, unreadable backends and unparseable blobs all come
    /// back as `None`: the caller starts the day fresh.
    pub fn load(&self, date: NaiveDate) -> Option<GameState> {
        self.load_report(date).and_then(|report| report.validated_state)
    }

    /// Like [`StateStore::load`], keeping the repair diagnostics.
    pub fn load_report(&self, date: NaiveDate) -> Option<Normalized> {
        let key = self.key_for(date);
        let blob = match self.try_load_raw(date) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(err) => {
                warn!("failed to read {key}: {err}");
                return None;
            }
        };
        let mut raw = match RawGameState::from_json(&blob) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("discarding unparseable record {key}: {err}");
                return None;
            }
        };
        self.stamp_date(&mut raw, date);
        let report = self.normalizer.normalize(Some(raw));
        if report.was_fixed {
            debug!("repaired {key} on load: {}", report.issues.join("; "));
        }
        Some(report)
    }

    /// Raw blob for `date`, exactly as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn try_load_raw(
        &self,
        date: NaiveDate,
    ) -> Result<Option<String>, PersistenceFailure<S::Error>> {
        self.backend
            .get(&self.key_for(date))
            .map_err(PersistenceFailure::Backend)
    }

    /// Normalize and persist `state` under `date`, logging any failure.
    pub fn save(&self, date: NaiveDate, state: &GameState) {
        if let Err(err) = self.try_save(date, state) {
            warn!("failed to persist {}: {err}", self.key_for(date));
        }
    }

    /// Normalize and persist `state`, returning what was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized or the backend
    /// rejects the write.
    pub fn try_save(
        &self,
        date: NaiveDate,
        state: &GameState,
    ) -> Result<GameState, PersistenceFailure<S::Error>> {
        let key = self.key_for(date);
        let mut raw = RawGameState::from(state);
        self.stamp_date(&mut raw, date);
        let (validated, issues) = self.normalizer.repair(raw);
        if !issues.is_empty() {
            debug!("repaired {key} before save: {}", issues.join("; "));
        }
        let blob = serde_json::to_string(&validated)?;
        self.backend
            .set(&key, &blob)
            .map_err(PersistenceFailure::Backend)?;
        Ok(validated)
    }

    /// Remove the record for `date`, logging any failure.
    pub fn delete(&self, date: NaiveDate) {
        let key = self.key_for(date);
        if let Err(err) = self.backend.delete(&key) {
            warn!("failed to delete {key}: {err}");
        }
    }

    /// Every date with a stored record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot list its keys.
    pub fn stored_dates(&self) -> Result<Vec<NaiveDate>, PersistenceFailure<S::Error>> {
        let keys = self.backend.keys().map_err(PersistenceFailure::Backend)?;
        let mut dates: Vec<NaiveDate> = keys
            .iter()
            .filter_map(|key| parse_day_key(&self.config.key_prefix, key))
            .collect();
        dates.sort_unstable();
        dates.dedup();
        Ok(dates)
    }

    /// Load every stored record, oldest first, skipping unreadable ones.
    pub fn load_all(&self) -> Vec<GameState> {
        match self.stored_dates() {
            Ok(dates) => dates.into_iter().filter_map(|date| self.load(date)).collect(),
            Err(err) => {
                warn!("failed to list stored records: {err}");
                Vec::new()
            }
        }
    }

    /// Delete every per-day record older than the retention window.
    ///
    /// Keys that do not embed a date under this store's prefix are left alone.
    pub fn sweep(&self, today: NaiveDate) -> SweepReport {
        let cutoff = today
            .checked_sub_days(Days::new(u64::from(self.config.retention_days)))
            .unwrap_or(NaiveDate::MIN);
        let mut report = SweepReport {
            cutoff,
            scanned: 0,
            deleted: Vec::new(),
            failures: 0,
        };

        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!("retention sweep could not list keys: {err}");
                report.failures += 1;
                return report;
            }
        };

        for key in keys {
            let Some(date) = parse_day_key(&self.config.key_prefix, &key) else {
                continue;
            };
            report.scanned += 1;
            if date >= cutoff {
                continue;
            }
            match self.backend.delete(&key) {
                Ok(()) => {
                    info!("retention sweep removed {key}");
                    report.deleted.push(date);
                }
                Err(err) => {
                    warn!("retention sweep failed to remove {key}: {err}");
                    report.failures += 1;
                }
            }
        }
        report.deleted.sort_unstable();
        report
    }

    /// The key is the record's identity; a disagreeing embedded date loses.
    fn stamp_date(&self, raw: &mut RawGameState, date: NaiveDate) {
        let expected = format_date(date);
        if let Some(stored) = raw.date.as_deref()
            && !stored.is_empty()
            && stored != expected
        {
            warn!(
                "record under {} claims date {stored:?}; using {expected}",
                self.key_for(date)
            );
        }
        raw.date = Some(expected);
    }
}
