//! Typed permission sets attached to member tiers.
//!
//! A tier's permissions are a set of feature flags plus named numeric limits.
//! The shape is fixed by the type: unknown top-level fields are rejected at
//! deserialization, and [`PermissionSet::validate`] checks names once at the
//! API boundary so stored values never need re-parsing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ValidationError;

const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionSet {
    /// Feature flags enabled for the tier.
    #[serde(default)]
    pub features: BTreeSet<String>,

    /// Named numeric quotas, e.g. `"projects": 10`.
    #[serde(default)]
    pub limits: BTreeMap<String, u64>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    pub fn with_limit(mut self, name: impl Into<String>, value: u64) -> Self {
        self.limits.insert(name.into(), value);
        self
    }

    pub fn allows(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    pub fn limit(&self, name: &str) -> Option<u64> {
        self.limits.get(name).copied()
    }

    /// Parse an untyped JSON document into a permission set and validate it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        let set: PermissionSet =
            serde_json::from_value(value).map_err(|e| ValidationError::InvalidValue {
                field: "permissions".to_string(),
                reason: e.to_string(),
            })?;
        set.validate()?;
        Ok(set)
    }

    /// Check every feature and limit name.
    ///
    /// Names must be 1 to 64 characters from `[a-z0-9_.:-]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for name in self.features.iter().chain(self.limits.keys()) {
            validate_name(name)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ValidationError::LengthOutOfRange {
            field: "permissions".to_string(),
            min: 1,
            max: MAX_NAME_LEN,
        });
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | ':' | '-'));
    if !valid {
        return Err(ValidationError::InvalidValue {
            field: "permissions".to_string(),
            reason: format!("invalid permission name '{}'", name),
        });
    }
    Ok(())
}
