//! The résumé record as supplied by the persistence layer.
//!
//! The record is kept as an open JSON object rather than a fixed struct: the AI
//! rewrite must hand back the same keys it received, and the layouts read any
//! field they reference. Sections used by the bundled layouts are listed in
//! [`SECTION_KEYS`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persistence metadata that must never reach the AI backend or a layout.
pub const METADATA_KEYS: &[&str] = &[
    "_id",
    "__v",
    "id",
    "user",
    "userId",
    "createdAt",
    "updatedAt",
];

/// Top-level sections the bundled layouts render.
pub const SECTION_KEYS: &[&str] = &[
    "fullname",
    "email",
    "phone",
    "linkedin",
    "github",
    "portfolio",
    "profileSummary",
    "education",
    "technicalSkills",
    "workExperience",
    "projects",
    "certifications",
    "languages",
    "interests",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeRecord(Map<String, Value>);

/// Top-level key differences between two records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl KeyDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl ResumeRecord {
    /// Wraps a JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns a copy without identity fields and timestamps.
    pub fn without_metadata(&self) -> Self {
        let map = self
            .0
            .iter()
            .filter(|(key, _)| !METADATA_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Keys present in `other` but not here (`added`) and the reverse (`removed`).
    pub fn key_diff(&self, other: &ResumeRecord) -> KeyDiff {
        let ours: BTreeSet<&String> = self.0.keys().collect();
        let theirs: BTreeSet<&String> = other.0.keys().collect();

        KeyDiff {
            added: theirs.difference(&ours).map(|k| k.to_string()).collect(),
            removed: ours.difference(&theirs).map(|k| k.to_string()).collect(),
        }
    }
}
