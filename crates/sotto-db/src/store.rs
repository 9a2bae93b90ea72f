//! The staleness-bounded settings cache.
//!
//! [`ConfigStore`] sits between the controller and the database. Reads are
//! served from a per-field cache while the cached value is younger than the
//! stale limit; writes go through to the database immediately and refresh
//! the cache. All access happens on the controller task, so the store takes
//! `&mut self` and needs no locking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use sotto_core::{ConfigField, Error as ValueError, MixerMode};

use crate::error::StoreResult;
use crate::Database;

struct CacheEntry {
    value: String,
    fetched_at: Instant,
}

/// Read/write-through settings store.
pub struct ConfigStore {
    db: Database,
    stale_limit: Duration,
    cache: HashMap<ConfigField, CacheEntry>,
}

impl ConfigStore {
    /// How long a cached value is trusted before it is re-read.
    pub const DEFAULT_STALE_LIMIT: Duration = Duration::from_secs(1);

    /// Create a store over an open database.
    #[must_use]
    pub fn new(db: Database, stale_limit: Duration) -> Self {
        Self { db, stale_limit, cache: HashMap::new() }
    }

    /// Fetch every field once so later reads start from a warm cache.
    ///
    /// # Errors
    /// Returns an error if any field cannot be read.
    pub fn warm(&mut self) -> StoreResult<()> {
        for field in ConfigField::ALL {
            self.get(field)?;
        }
        debug!("Settings cache warmed");
        Ok(())
    }

    /// Access the underlying database handle.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Read a field, from cache when fresh enough.
    ///
    /// A failed database read falls back to the last cached value when one
    /// exists; the failure is logged, not surfaced.
    ///
    /// # Errors
    /// Returns an error if the read fails and no cached value exists.
    pub fn get(&mut self, field: ConfigField) -> StoreResult<String> {
        if let Some(entry) = self.cache.get(&field) {
            if entry.fetched_at.elapsed() < self.stale_limit {
                return Ok(entry.value.clone());
            }
        }

        match self.db.read_setting(field.key()) {
            Ok(value) => {
                self.cache
                    .insert(field, CacheEntry { value: value.clone(), fetched_at: Instant::now() });
                Ok(value)
            }
            Err(e) => match self.cache.get(&field) {
                Some(entry) => {
                    warn!(field = %field, error = %e, "Settings read failed, serving cached value");
                    Ok(entry.value.clone())
                }
                None => Err(e.into()),
            },
        }
    }

    /// Write a field through to the database and refresh the cache.
    ///
    /// A write of the already-cached value is skipped; the cache timestamp
    /// is refreshed so an immediately following read stays local.
    ///
    /// # Errors
    /// Returns an error if the database write fails; the cache is left
    /// untouched in that case.
    pub fn set(&mut self, field: ConfigField, value: &str) -> StoreResult<()> {
        if let Some(entry) = self.cache.get_mut(&field) {
            if entry.value == value {
                entry.fetched_at = Instant::now();
                return Ok(());
            }
        }

        self.db.write_setting(field.key(), value)?;
        debug!(field = %field, value, "Setting written");
        self.cache
            .insert(field, CacheEntry { value: value.to_string(), fetched_at: Instant::now() });
        Ok(())
    }

    /// The persisted desired level.
    ///
    /// # Errors
    /// Returns an error on read failure or a non-level value in the store.
    pub fn level(&mut self) -> StoreResult<u8> {
        let raw = self.get(ConfigField::Level)?;
        parse_level("level", &raw)
    }

    /// Persist the desired level.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn set_level(&mut self, level: u8) -> StoreResult<()> {
        self.set(ConfigField::Level, &level.to_string())
    }

    /// Whether output is muted.
    ///
    /// # Errors
    /// Returns an error on read failure or a non-boolean value in the store.
    pub fn mute(&mut self) -> StoreResult<bool> {
        let raw = self.get(ConfigField::Mute)?;
        parse_flag("mute", &raw)
    }

    /// Persist the mute state.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn set_mute(&mut self, muted: bool) -> StoreResult<()> {
        self.set(ConfigField::Mute, flag_str(muted))
    }

    /// The upper clamp for level changes.
    ///
    /// # Errors
    /// Returns an error on read failure or a non-level value in the store.
    pub fn warning_level(&mut self) -> StoreResult<u8> {
        let raw = self.get(ConfigField::WarningLevel)?;
        parse_level("warning_level", &raw)
    }

    /// Whether the mapped-volume curve is enabled.
    ///
    /// # Errors
    /// Returns an error on read failure or a non-boolean value in the store.
    pub fn volume_curve(&mut self) -> StoreResult<bool> {
        let raw = self.get(ConfigField::VolumeCurve)?;
        parse_flag("volume_curve", &raw)
    }

    /// The hardware mixer control name.
    ///
    /// # Errors
    /// Returns an error on read failure.
    pub fn mixer_name(&mut self) -> StoreResult<String> {
        self.get(ConfigField::MixerName)
    }

    /// Whether levels drive the hardware mixer or the player.
    ///
    /// # Errors
    /// Returns an error on read failure or an unknown mode in the store.
    pub fn mixer_mode(&mut self) -> StoreResult<MixerMode> {
        let raw = self.get(ConfigField::MixerMode)?;
        Ok(raw.parse::<MixerMode>()?)
    }
}

fn parse_level(field: &'static str, raw: &str) -> StoreResult<u8> {
    raw.parse::<u8>()
        .ok()
        .filter(|n| *n <= 100)
        .ok_or_else(|| ValueError::invalid(field, raw).into())
}

fn parse_flag(field: &'static str, raw: &str) -> StoreResult<bool> {
    match raw {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(ValueError::invalid(field, other).into()),
    }
}

fn flag_str(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use assert_matches::assert_matches;

    fn store_with_limit(stale_limit: Duration) -> ConfigStore {
        let db = Database::open_in_memory().expect("Failed to create test database");
        ConfigStore::new(db, stale_limit)
    }

    fn write_row(store: &ConfigStore, key: &str, value: &str) {
        store
            .database()
            .conn()
            .execute("UPDATE settings SET value = ? WHERE key = ?", [value, key])
            .unwrap();
    }

    fn delete_row(store: &ConfigStore, key: &str) {
        store.database().conn().execute("DELETE FROM settings WHERE key = ?", [key]).unwrap();
    }

    #[test]
    fn test_defaults() {
        let mut store = store_with_limit(ConfigStore::DEFAULT_STALE_LIMIT);

        assert_eq!(store.level().unwrap(), 50);
        assert!(!store.mute().unwrap());
        assert_eq!(store.warning_level().unwrap(), 100);
        assert!(!store.volume_curve().unwrap());
        assert_eq!(store.mixer_name().unwrap(), "Digital");
        assert_eq!(store.mixer_mode().unwrap(), MixerMode::Hardware);
    }

    #[test]
    fn test_fresh_value_served_from_cache() {
        let mut store = store_with_limit(Duration::from_secs(3600));

        assert_eq!(store.level().unwrap(), 50);

        // A change behind the cache's back stays invisible inside the window.
        write_row(&store, "level", "80");
        assert_eq!(store.level().unwrap(), 50);
    }

    #[test]
    fn test_stale_value_is_refetched() {
        let mut store = store_with_limit(Duration::ZERO);

        assert_eq!(store.level().unwrap(), 50);
        write_row(&store, "level", "80");
        assert_eq!(store.level().unwrap(), 80);
    }

    #[test]
    fn test_set_writes_through_and_caches() {
        let mut store = store_with_limit(Duration::from_secs(3600));

        store.set_level(64).unwrap();

        let in_db: String = store
            .database()
            .conn()
            .query_row("SELECT value FROM settings WHERE key = 'level'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(in_db, "64");

        // The read after a write never needs the database.
        write_row(&store, "level", "99");
        assert_eq!(store.level().unwrap(), 64);
    }

    #[test]
    fn test_unchanged_set_skips_the_write() {
        let mut store = store_with_limit(Duration::ZERO);

        assert!(!store.mute().unwrap());
        // With the row gone, a real write would fail; the no-op set must not.
        delete_row(&store, "mute");
        store.set_mute(false).unwrap();
    }

    #[test]
    fn test_failed_read_falls_back_to_cache() {
        let mut store = store_with_limit(Duration::ZERO);

        assert_eq!(store.level().unwrap(), 50);
        delete_row(&store, "level");
        assert_eq!(store.level().unwrap(), 50);
    }

    #[test]
    fn test_failed_read_without_cache_is_an_error() {
        let mut store = store_with_limit(Duration::ZERO);

        delete_row(&store, "level");
        assert_matches!(store.level(), Err(StoreError::Db(_)));
    }

    #[test]
    fn test_failed_write_is_reported_and_cache_untouched() {
        let mut store = store_with_limit(Duration::ZERO);

        assert_eq!(store.level().unwrap(), 50);
        delete_row(&store, "level");

        assert_matches!(store.set_level(70), Err(StoreError::Db(_)));
        // The failed write must not poison the cache with the new value.
        assert_eq!(store.level().unwrap(), 50);
    }

    #[test]
    fn test_invalid_stored_value_is_rejected() {
        let mut store = store_with_limit(Duration::ZERO);

        write_row(&store, "level", "loud");
        assert_matches!(store.level(), Err(StoreError::Invalid(_)));

        write_row(&store, "mute", "maybe");
        assert_matches!(store.mute(), Err(StoreError::Invalid(_)));

        write_row(&store, "mixer_mode", "telepathy");
        assert_matches!(store.mixer_mode(), Err(StoreError::Invalid(_)));
    }

    #[test]
    fn test_warm_populates_every_field() {
        let mut store = store_with_limit(Duration::from_secs(3600));
        store.warm().unwrap();

        // After warming, reads survive the backing rows disappearing.
        for field in ConfigField::ALL {
            delete_row(&store, field.key());
        }
        assert_eq!(store.level().unwrap(), 50);
        assert_eq!(store.mixer_name().unwrap(), "Digital");
    }
}
