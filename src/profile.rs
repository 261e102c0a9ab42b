use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::rules::Dimension;

/// Environment facts that override rules are matched against.
///
/// An empty string means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    /// Operating system.
    pub os: String,
    /// Hosting resource provider.
    pub rp: String,
    /// How the SDK was attached to the process.
    pub attach: String,
    /// Software version.
    pub version: String,
    /// Component name.
    pub component: String,
    /// Deployment region.
    pub region: String,
}

impl ProfileFields {
    /// Create a new `ProfileFields` with all fields unknown.
    pub fn new() -> ProfileFields {
        ProfileFields::default()
    }

    /// Update operating system with `os`.
    pub fn with_os(mut self, os: impl Into<String>) -> ProfileFields {
        self.os = os.into();
        self
    }

    /// Update resource provider with `rp`.
    pub fn with_rp(mut self, rp: impl Into<String>) -> ProfileFields {
        self.rp = rp.into();
        self
    }

    /// Update attach method with `attach`.
    pub fn with_attach(mut self, attach: impl Into<String>) -> ProfileFields {
        self.attach = attach.into();
        self
    }

    /// Update software version with `version`.
    pub fn with_version(mut self, version: impl Into<String>) -> ProfileFields {
        self.version = version.into();
        self
    }

    /// Update component name with `component`.
    pub fn with_component(mut self, component: impl Into<String>) -> ProfileFields {
        self.component = component.into();
        self
    }

    /// Update deployment region with `region`.
    pub fn with_region(mut self, region: impl Into<String>) -> ProfileFields {
        self.region = region.into();
        self
    }

    /// Get the field backing `dimension`.
    pub fn get(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Os => &self.os,
            Dimension::ResourceProvider => &self.rp,
            Dimension::Attach => &self.attach,
            Dimension::Version => &self.version,
            Dimension::Component => &self.component,
            Dimension::Region => &self.region,
        }
    }

    fn slot_mut(&mut self, dimension: Dimension) -> &mut String {
        match dimension {
            Dimension::Os => &mut self.os,
            Dimension::ResourceProvider => &mut self.rp,
            Dimension::Attach => &mut self.attach,
            Dimension::Version => &mut self.version,
            Dimension::Component => &mut self.component,
            Dimension::Region => &mut self.region,
        }
    }
}

/// Write-once profile of the running process.
///
/// Each field can be set once: [`ConfigurationProfile::fill`] only writes fields that are still
/// empty, so the first writer wins. The profile is meant to be filled during startup and read for
/// the rest of the process lifetime. Writers are serialized by an internal lock, and reads are
/// safe from any thread.
#[derive(Debug, Default)]
pub struct ConfigurationProfile {
    fields: RwLock<ProfileFields>,
}

impl ConfigurationProfile {
    /// Create an empty profile.
    pub fn new() -> ConfigurationProfile {
        ConfigurationProfile::default()
    }

    /// Set every non-empty field of `update` whose current value is still empty.
    ///
    /// Fields that are already set are left untouched.
    pub fn fill(&self, update: ProfileFields) {
        // A poisoned lock still holds consistent data: every write is a single assignment.
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        for dimension in Dimension::ALL {
            let value = update.get(dimension);
            let slot = fields.slot_mut(dimension);
            if slot.is_empty() && !value.is_empty() {
                *slot = value.to_owned();
            } else if !value.is_empty() && slot.as_str() != value {
                log::debug!(target: "onesettings",
                            dimension:display = dimension,
                            current = slot.as_str(),
                            ignored = value;
                            "profile field already set");
            }
        }
    }

    /// Copy of the current profile.
    pub fn snapshot(&self) -> ProfileFields {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current value of a single field.
    pub fn get(&self, dimension: Dimension) -> String {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dimension)
            .to_owned()
    }
}

impl From<ProfileFields> for ConfigurationProfile {
    fn from(fields: ProfileFields) -> Self {
        ConfigurationProfile {
            fields: RwLock::new(fields),
        }
    }
}
