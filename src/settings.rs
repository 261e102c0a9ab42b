use std::time::Duration;

use derive_more::From;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Refresh interval used when the server does not provide one, or when a fetch fails.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 1800;

/// Reserved settings key carrying the revision of the settings content.
pub const CHANGE_VERSION_KEY: &str = "CHANGE_VERSION";

/// Response header carrying the refresh interval, in minutes.
pub const REFRESH_INTERVAL_HEADER: &str = "x-ms-onesetinterval";

/// Key/value settings document as delivered by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, From)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    /// Create an empty settings document.
    pub fn new() -> Settings {
        Settings::default()
    }

    /// Get the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if the document has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys in the document.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over setting keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Parse the reserved change-version key.
    ///
    /// Both `"5"` and `5` are accepted. Returns `None` when the key is missing or its value is not
    /// an integer.
    pub fn change_version(&self) -> Option<i64> {
        match self.get(CHANGE_VERSION_KEY)? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

impl FromIterator<(String, Value)> for Settings {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Settings(iter.into_iter().collect())
    }
}

/// The outcome of a single fetch-and-parse cycle.
///
/// When `has_error` is `true`, every other field holds its default value. In particular
/// `status_code` is reset to `200` even if the server answered with an error status: on failure
/// callers should look at `has_error` only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsSnapshot {
    /// Cache validation token, echoed back through `If-None-Match` on the next request.
    pub etag: Option<String>,
    /// How long to wait before the next fetch, in seconds.
    pub refresh_interval_secs: u64,
    /// Settings document. Empty for anything but a successful `200` response.
    pub settings: Settings,
    /// Revision of the settings content, parsed from [`CHANGE_VERSION_KEY`].
    pub change_version: Option<i64>,
    /// HTTP status the snapshot was built from.
    pub status_code: u16,
    /// Whether the fetch failed.
    pub has_error: bool,
}

impl SettingsSnapshot {
    /// Snapshot with default values for the given status code.
    pub fn with_status(status_code: u16) -> SettingsSnapshot {
        SettingsSnapshot {
            status_code,
            ..SettingsSnapshot::default()
        }
    }

    /// Snapshot representing a failed fetch.
    pub fn failed() -> SettingsSnapshot {
        SettingsSnapshot {
            has_error: true,
            ..SettingsSnapshot::default()
        }
    }

    /// Refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Returns `true` if the server reported that cached settings are still current.
    pub fn is_not_modified(&self) -> bool {
        !self.has_error && self.status_code == 304
    }
}

impl Default for SettingsSnapshot {
    fn default() -> SettingsSnapshot {
        SettingsSnapshot {
            etag: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            settings: Settings::new(),
            change_version: None,
            status_code: 200,
            has_error: false,
        }
    }
}

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed value.
    Parsed(T),
    /// Raw JSON that did not match the expected shape.
    ParseFailed(Value),
}
impl<T> From<TryParse<T>> for Option<T> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}
impl<'a, T> From<&'a TryParse<T>> for Option<&'a T> {
    fn from(value: &TryParse<T>) -> Option<&T> {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_snapshot() {
        let snapshot = SettingsSnapshot::default();

        assert_eq!(snapshot.etag, None);
        assert_eq!(snapshot.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
        assert!(snapshot.settings.is_empty());
        assert_eq!(snapshot.change_version, None);
        assert_eq!(snapshot.status_code, 200);
        assert!(!snapshot.has_error);
    }

    #[test]
    fn failed_snapshot_keeps_defaults() {
        let snapshot = SettingsSnapshot::failed();

        assert!(snapshot.has_error);
        assert_eq!(
            snapshot,
            SettingsSnapshot {
                has_error: true,
                ..SettingsSnapshot::default()
            }
        );
        assert_eq!(snapshot.status_code, 200);
        assert_eq!(snapshot.refresh_interval(), Duration::from_secs(1800));
    }

    #[test]
    fn change_version_accepts_strings_and_numbers() {
        let settings: Settings = serde_json::from_value(json!({ CHANGE_VERSION_KEY: "5" })).unwrap();
        assert_eq!(settings.change_version(), Some(5));

        let settings: Settings = serde_json::from_value(json!({ CHANGE_VERSION_KEY: 7 })).unwrap();
        assert_eq!(settings.change_version(), Some(7));
    }

    #[test]
    fn change_version_tolerates_garbage() {
        let settings: Settings =
            serde_json::from_value(json!({ CHANGE_VERSION_KEY: "latest" })).unwrap();
        assert_eq!(settings.change_version(), None);

        assert_eq!(Settings::new().change_version(), None);
    }

    #[test]
    fn try_parse_keeps_raw_value() {
        let parsed: Vec<TryParse<u32>> = serde_json::from_value(json!([1, "two"])).unwrap();
        assert!(matches!(parsed[0], TryParse::Parsed(1)));
        assert!(matches!(&parsed[1], TryParse::ParseFailed(v) if v == "two"));
    }
}
