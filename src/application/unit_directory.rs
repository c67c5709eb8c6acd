// Directory of selectable target units, loaded once at startup
use crate::application::unit_source::UnitSource;
use crate::domain::unit::TargetUnit;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("unknown unit: {0}")]
    UnknownUnit(String),
    #[error("unit directory is still loading")]
    NotLoaded,
}

/// Where the directory entries came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryOrigin {
    Remote,
    EmptyFallback,
    ErrorFallback,
}

/// Non-empty list of units with exactly one active entry.
#[derive(Debug, Clone)]
pub struct UnitDirectory {
    units: Vec<TargetUnit>,
    active: usize,
    origin: DirectoryOrigin,
}

impl UnitDirectory {
    /// Fetch the unit list; falls back to local defaults on empty or failed responses.
    pub async fn load(source: &dyn UnitSource) -> Self {
        match source.fetch_units().await {
            Ok(records) => {
                let mut seen = HashSet::new();
                let units: Vec<TargetUnit> = records
                    .into_iter()
                    .filter_map(TargetUnit::from_record)
                    .filter(|u| seen.insert(u.id.clone()))
                    .collect();

                if units.is_empty() {
                    tracing::warn!("Unit directory returned no units, using defaults");
                    Self::empty_fallback()
                } else {
                    tracing::info!("Loaded {} units from directory", units.len());
                    Self {
                        units,
                        active: 0,
                        origin: DirectoryOrigin::Remote,
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Unit directory fetch failed: {:#}", e);
                Self::error_fallback()
            }
        }
    }

    pub fn empty_fallback() -> Self {
        Self {
            units: vec![
                TargetUnit::new("unit01", "Factory Unit A-01"),
                TargetUnit::new("unit02", "Factory Unit B-02"),
            ],
            active: 0,
            origin: DirectoryOrigin::EmptyFallback,
        }
    }

    pub fn error_fallback() -> Self {
        Self {
            units: vec![TargetUnit::new("unit01", "Demo Unit 01")],
            active: 0,
            origin: DirectoryOrigin::ErrorFallback,
        }
    }

    pub fn units(&self) -> &[TargetUnit] {
        &self.units
    }

    pub fn active(&self) -> &TargetUnit {
        &self.units[self.active]
    }

    pub fn origin(&self) -> DirectoryOrigin {
        self.origin
    }

    pub fn select(&mut self, unit_id: &str) -> Result<&TargetUnit, SelectError> {
        let index = self
            .units
            .iter()
            .position(|u| u.id == unit_id)
            .ok_or_else(|| SelectError::UnknownUnit(unit_id.to_string()))?;
        self.active = index;
        Ok(&self.units[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::StaticUnitSource;

    #[tokio::test]
    async fn test_load_selects_first_remote_unit() {
        let source = StaticUnitSource::records(&[
            ("u7", Some("Seven")),
            ("u8", None),
            ("u7", Some("Dup")),
        ]);
        let directory = UnitDirectory::load(&source).await;

        assert_eq!(directory.origin(), DirectoryOrigin::Remote);
        assert_eq!(directory.units().len(), 2);
        assert_eq!(directory.active(), &TargetUnit::new("u7", "Seven"));
        assert_eq!(directory.units()[1].display_name, "u8");
    }

    #[tokio::test]
    async fn test_load_empty_response_uses_defaults() {
        let directory = UnitDirectory::load(&StaticUnitSource::records(&[])).await;

        assert_eq!(directory.origin(), DirectoryOrigin::EmptyFallback);
        assert_eq!(directory.units().len(), 2);
        assert_eq!(directory.active().id, "unit01");
        assert_eq!(directory.active().display_name, "Factory Unit A-01");
    }

    #[tokio::test]
    async fn test_load_failure_uses_demo_unit() {
        let directory = UnitDirectory::load(&StaticUnitSource::failing("connection refused")).await;

        assert_eq!(directory.origin(), DirectoryOrigin::ErrorFallback);
        assert!(!directory.units().is_empty());
        assert_eq!(directory.active(), &TargetUnit::new("unit01", "Demo Unit 01"));
    }

    #[test]
    fn test_select_validates_membership() {
        let mut directory = UnitDirectory::empty_fallback();

        assert_eq!(directory.select("unit02").unwrap().display_name, "Factory Unit B-02");
        assert_eq!(directory.active().id, "unit02");

        assert_eq!(
            directory.select("unit99").unwrap_err(),
            SelectError::UnknownUnit("unit99".to_string())
        );
        assert_eq!(directory.active().id, "unit02");
    }
}
