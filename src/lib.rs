//! Remote settings fetching and feature evaluation.
//!
//! # Overview
//!
//! A settings service publishes a JSON document of feature definitions. [`SettingsFetcher`]
//! retrieves it with a single conditional GET and turns the response into a
//! [`SettingsSnapshot`]: the settings themselves, the ETag to send back next time, how long to
//! wait before fetching again, and the change version of the content.
//!
//! Features are evaluated against a [`ConfigurationProfile`], the write-once set of facts about
//! the running process (operating system, resource provider, attach method, version, component,
//! region). Each feature has a default value and an ordered list of override rules. The first
//! rule whose conditions all match the profile supplies the value.
//!
//! ```json
//! {
//!   "settings": {
//!     "live_metrics": {
//!       "default": false,
//!       "overrides": [
//!         { "conditions": { "region": "westus", "version": ">=1.2.0-beta" }, "value": true }
//!       ]
//!     },
//!     "CHANGE_VERSION": "12"
//!   }
//! }
//! ```
//!
//! [`SettingsStore`] keeps the last good settings across fetches. Scheduling fetches is up to
//! the caller; [`SettingsStore::apply`] returns the delay the server asked for.
//!
//! # Error Handling
//!
//! Neither fetching nor evaluation ever fails the caller. [`SettingsFetcher::fetch`] reports any
//! failure through [`SettingsSnapshot::has_error`], and [`evaluate_feature`] returns `None` for
//! missing or malformed features. The `try_` variants return the underlying [`Error`] or
//! [`EvaluationError`] for debugging.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages,
//! under the `onesettings` target. Consider integrating a `log`-compatible logger implementation
//! for better visibility into fetches and evaluations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod config;
mod error;
mod eval;
mod fetcher;
mod profile;
pub mod response;
pub mod rules;
mod settings;
mod settings_store;
pub mod version;

pub use config::FetcherConfig;
pub use error::{Error, EvaluationError, Result};
pub use eval::{evaluate_feature, is_feature_enabled, try_evaluate_feature, FeatureDefinition};
pub use fetcher::{HttpTransport, RawResponse, SettingsFetcher, SettingsRequest, Transport};
pub use profile::{ConfigurationProfile, ProfileFields};
pub use rules::{ConditionValue, Dimension, OverrideRule};
pub use settings::{
    Settings, SettingsSnapshot, TryParse, CHANGE_VERSION_KEY, DEFAULT_REFRESH_INTERVAL_SECS,
    REFRESH_INTERVAL_HEADER,
};
pub use settings_store::{CachedSettings, SettingsStore};
