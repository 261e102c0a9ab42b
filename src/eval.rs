use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    profile::{ConfigurationProfile, ProfileFields},
    rules::{evaluate_overrides, OverrideRule},
    settings::{Settings, TryParse},
    EvaluationError,
};

/// Definition of a single feature inside a settings document.
///
/// ```json
/// { "default": false, "overrides": [{ "conditions": { "region": "westus" }, "value": true }] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDefinition {
    /// Value used when no override matches.
    pub default: Value,
    /// Override rules, in evaluation order. Rules that fail to parse are skipped.
    #[serde(default)]
    pub overrides: Vec<TryParse<OverrideRule>>,
}

impl FeatureDefinition {
    /// Evaluate the definition against `profile`.
    pub fn eval(&self, feature: &str, profile: &ProfileFields) -> &Value {
        let rules = self.overrides.iter().filter_map(|rule| match rule {
            TryParse::Parsed(rule) => Some(rule),
            TryParse::ParseFailed(raw) => {
                log::warn!(target: "onesettings",
                           feature,
                           rule:serde = raw;
                           "skipping malformed override rule");
                None
            }
        });

        evaluate_overrides(rules, profile).unwrap_or(&self.default)
    }
}

impl Settings {
    /// Evaluate `feature` against `profile`.
    pub fn try_evaluate_feature(
        &self,
        feature: &str,
        profile: &ProfileFields,
    ) -> Result<Value, EvaluationError> {
        let raw = self.get(feature).ok_or(EvaluationError::FeatureNotFound)?;

        let definition = FeatureDefinition::deserialize(raw).map_err(|err| {
            log::warn!(target: "onesettings",
                       feature;
                       "malformed feature definition: {}", err);
            EvaluationError::MalformedFeature
        })?;

        let value = definition.eval(feature, profile).clone();

        log::trace!(target: "onesettings",
                    feature,
                    profile:serde,
                    value:serde;
                    "evaluated a feature");

        Ok(value)
    }
}

/// Evaluate `feature` from `settings` for the given profile.
///
/// Distinguishes a missing feature from a malformed one. Most callers want [`evaluate_feature`].
pub fn try_evaluate_feature(
    feature: &str,
    settings: &Settings,
    profile: &ConfigurationProfile,
) -> Result<Value, EvaluationError> {
    settings.try_evaluate_feature(feature, &profile.snapshot())
}

/// Evaluate `feature` from `settings` for the given profile.
///
/// Returns the value of the first matching override, or the feature default. Returns `None` if
/// the feature is absent or its definition is malformed.
pub fn evaluate_feature(
    feature: &str,
    settings: &Settings,
    profile: &ConfigurationProfile,
) -> Option<Value> {
    try_evaluate_feature(feature, settings, profile).ok()
}

/// Evaluate a boolean feature, returning `fallback` when it is missing or not a boolean.
pub fn is_feature_enabled(
    feature: &str,
    settings: &Settings,
    profile: &ConfigurationProfile,
    fallback: bool,
) -> bool {
    evaluate_feature(feature, settings, profile)
        .and_then(|value| value.as_bool())
        .unwrap_or(fallback)
}
