// Target unit domain model
use serde::{Deserialize, Serialize};

/// One entry of the unit directory as served by the HTTP endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UnitRecord {
    #[serde(default)]
    pub unit_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TargetUnit {
    pub id: String,
    pub display_name: String,
}

impl TargetUnit {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Returns `None` for records without a usable id.
    pub fn from_record(record: UnitRecord) -> Option<Self> {
        let id = Self::label(record.unit_id)?;

        let display_name = Self::label(record.name)
            .or_else(|| Self::label(record.unit_name))
            .unwrap_or_else(|| id.clone());

        Some(Self { id, display_name })
    }

    fn label(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
