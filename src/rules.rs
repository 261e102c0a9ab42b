//! Override rules and the conditions they are made of.
use std::{collections::HashMap, fmt, str::FromStr};

use derive_more::From;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{profile::ProfileFields, version::satisfies_range};

/// A profile dimension that override conditions can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// `os`
    #[serde(rename = "os")]
    Os,
    /// `rp`
    #[serde(rename = "rp")]
    ResourceProvider,
    /// `attach`
    #[serde(rename = "attach")]
    Attach,
    /// `version`, matched as a version range.
    #[serde(rename = "version")]
    Version,
    /// `component`
    #[serde(rename = "component")]
    Component,
    /// `region`
    #[serde(rename = "region")]
    Region,
}

impl Dimension {
    /// All dimensions.
    pub const ALL: [Dimension; 6] = [
        Dimension::Os,
        Dimension::ResourceProvider,
        Dimension::Attach,
        Dimension::Version,
        Dimension::Component,
        Dimension::Region,
    ];

    /// Condition name used in settings documents.
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Os => "os",
            Dimension::ResourceProvider => "rp",
            Dimension::Attach => "attach",
            Dimension::Version => "version",
            Dimension::Component => "component",
            Dimension::Region => "region",
        }
    }
}

impl FromStr for Dimension {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|dimension| dimension.name() == s)
            .ok_or(())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected value of a condition.
///
/// For [`Dimension::Version`] the string is a version range (`>=1.2.0-beta`), for every other
/// dimension it is compared for exact, case-sensitive equality. A list matches if any of its
/// elements does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum ConditionValue {
    /// Single expected value.
    Single(String),
    /// Any of the listed values.
    Multiple(Vec<String>),
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl ConditionValue {
    fn any(&self, f: impl Fn(&str) -> bool) -> bool {
        match self {
            ConditionValue::Single(s) => f(s),
            ConditionValue::Multiple(values) => values.iter().any(|s| f(s)),
        }
    }
}

/// Returns `true` if the condition `name` with `value` holds for `profile`.
///
/// Unknown condition names never match. A profile field that is unset never matches either.
pub fn matches_condition(name: &str, value: &ConditionValue, profile: &ProfileFields) -> bool {
    let Ok(dimension) = name.parse::<Dimension>() else {
        log::debug!(target: "onesettings", condition = name; "unknown condition");
        return false;
    };

    let actual = profile.get(dimension);
    if actual.is_empty() {
        return false;
    }

    match dimension {
        Dimension::Version => value.any(|range| satisfies_range(actual, range)),
        _ => value.any(|expected| expected == actual),
    }
}

/// A conditional replacement for a feature's default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    /// Conditions that must all hold.
    #[serde(default)]
    pub conditions: HashMap<String, ConditionValue>,
    /// Value the feature takes when the rule matches.
    pub value: Value,
}

impl OverrideRule {
    /// Returns `true` if every condition matches. A rule without conditions always matches.
    pub fn matches(&self, profile: &ProfileFields) -> bool {
        self.conditions
            .iter()
            .all(|(name, value)| matches_condition(name, value, profile))
    }
}

/// Return the value of the first rule matching `profile`, or `None` if none does.
pub fn evaluate_overrides<'a>(
    rules: impl IntoIterator<Item = &'a OverrideRule>,
    profile: &ProfileFields,
) -> Option<&'a Value> {
    rules
        .into_iter()
        .find(|rule| rule.matches(profile))
        .map(|rule| &rule.value)
}
