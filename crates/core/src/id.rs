// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance ID generation

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Opaque unique identifier for an instance.
///
/// Format is `srv-{nanoid}` with a 19-character random suffix. The id is
/// stable for the life of the instance and doubles as its directory name
/// under the workspace/data/logs roots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(SmolStr);

impl InstanceId {
    pub const PREFIX: &'static str = "srv-";

    /// Generate a new random ID with the type prefix
    pub fn generate() -> Self {
        Self(SmolStr::new(format!("{}{}", Self::PREFIX, nanoid::nanoid!(19))))
    }

    /// Create ID from an existing string (for parsing/deserialization)
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the ID suffix (without prefix)
    pub fn suffix(&self) -> &str {
        self.0.as_str().strip_prefix(Self::PREFIX).unwrap_or(self.0.as_str())
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for InstanceId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for InstanceId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<str> for InstanceId {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

impl PartialEq<&str> for InstanceId {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_str() == *other
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
