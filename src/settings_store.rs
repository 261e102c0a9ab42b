use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    eval::evaluate_feature,
    profile::ConfigurationProfile,
    settings::{Settings, SettingsSnapshot},
};

/// Settings accepted from the server, along with their cache validators.
#[derive(Debug, Clone)]
pub struct CachedSettings {
    /// ETag of the response that delivered (or last confirmed) these settings.
    pub etag: Option<String>,
    /// Settings document.
    pub settings: Settings,
    /// Change version of the settings document.
    pub change_version: Option<i64>,
    /// When the server last delivered or confirmed these settings.
    pub fetched_at: DateTime<Utc>,
}

/// `SettingsStore` keeps the last good settings document and allows concurrent access for
/// readers and writers.
///
/// Feed every [`SettingsSnapshot`] into [`SettingsStore::apply`]: a `200` replaces the cached
/// settings, a `304` confirms them, and a failed fetch leaves them untouched.
#[derive(Debug, Default)]
pub struct SettingsStore {
    cached: RwLock<Option<Arc<CachedSettings>>>,
}

impl SettingsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            cached: RwLock::new(None),
        }
    }

    /// Current settings, or `None` if nothing has been fetched yet.
    pub fn get(&self) -> Option<Arc<CachedSettings>> {
        // self.cached.read() should always return Ok(). Err() is possible only if the lock is
        // poisoned (writer panicked while holding the lock), which should never happen. Still,
        // using .ok()? here to not crash the app.
        let cached = self.cached.read().ok()?;
        cached.clone()
    }

    /// ETag to send with the next request.
    pub fn etag(&self) -> Option<String> {
        self.get()?.etag.clone()
    }

    /// Apply a fetch result and return how long to wait before fetching again.
    pub fn apply(&self, snapshot: SettingsSnapshot) -> Duration {
        let next_fetch = snapshot.refresh_interval();

        if snapshot.has_error {
            log::debug!(target: "onesettings", "keeping cached settings after failed fetch");
            return next_fetch;
        }

        match snapshot.status_code {
            200 => {
                let previous = self.set(CachedSettings {
                    etag: snapshot.etag,
                    settings: snapshot.settings,
                    change_version: snapshot.change_version,
                    fetched_at: Utc::now(),
                });
                let previous_version = previous.and_then(|previous| previous.change_version);
                if previous_version != snapshot.change_version {
                    log::debug!(target: "onesettings",
                                previous_version:serde,
                                change_version:serde = snapshot.change_version;
                                "settings changed");
                }
            }
            304 => {
                let Some(current) = self.get() else {
                    log::debug!(target: "onesettings", "not modified, but nothing is cached");
                    return next_fetch;
                };
                self.set(CachedSettings {
                    etag: snapshot.etag.or_else(|| current.etag.clone()),
                    fetched_at: Utc::now(),
                    ..(*current).clone()
                });
            }
            status => {
                log::debug!(target: "onesettings", status; "keeping cached settings");
            }
        }

        next_fetch
    }

    /// Evaluate `feature` against the cached settings.
    ///
    /// Returns `None` if nothing has been fetched yet or the feature is not found.
    pub fn evaluate_feature(&self, feature: &str, profile: &ConfigurationProfile) -> Option<Value> {
        let Some(cached) = self.get() else {
            log::warn!(target: "onesettings", feature; "evaluating a feature before settings have been fetched");
            return None;
        };
        evaluate_feature(feature, &cached.settings, profile)
    }

    /// Set new settings, returning the previous ones.
    fn set(&self, cached: CachedSettings) -> Option<Arc<CachedSettings>> {
        // Constructing new value before requesting the lock to minimize lock span.
        let new_value = Some(Arc::new(cached));

        let mut slot = self.cached.write().ok()?;
        std::mem::replace(&mut *slot, new_value)
    }
}
