//! Filter configuration loading.
//!
//! Criteria can come from a YAML file, from command-line flags, or both.
//! Flags win over file values field by field.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{NotifyError, NotifyResult};
use crate::filter::FilterCriteria;

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct FilterOverrides {
    pub min_forecast_period: Option<i64>,
    pub max_forecast_period: Option<i64>,
    pub diagnostics: Vec<String>,
}

impl FilterCriteria {
    /// Load criteria from a YAML file.
    ///
    /// ```yaml
    /// min_forecast_period: 0
    /// max_forecast_period: 43200
    /// diagnostics: [surface_temperature, relative_humidity]
    /// ```
    pub fn load(path: &Path) -> NotifyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NotifyError::Config(format!(
                "Failed to read filter config {}: {}",
                path.display(),
                e
            ))
        })?;

        let criteria: FilterCriteria = serde_yaml::from_str(&content).map_err(|e| {
            NotifyError::Config(format!(
                "Failed to parse filter config {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), ?criteria, "Loaded filter config");
        Ok(criteria)
    }

    /// Replace fields with the explicitly given overrides.
    pub fn with_overrides(mut self, overrides: FilterOverrides) -> Self {
        if overrides.min_forecast_period.is_some() {
            self.min_forecast_period = overrides.min_forecast_period;
        }
        if overrides.max_forecast_period.is_some() {
            self.max_forecast_period = overrides.max_forecast_period;
        }
        if !overrides.diagnostics.is_empty() {
            self.allowed_diagnostics = overrides.diagnostics.into_iter().collect();
        }
        self
    }
}

/// Resolve the effective criteria from an optional file and flag overrides.
pub fn resolve_criteria(
    file: Option<&Path>,
    overrides: FilterOverrides,
) -> NotifyResult<FilterCriteria> {
    let base = match file {
        Some(path) => FilterCriteria::load(path)?,
        None => FilterCriteria::default(),
    };

    let criteria = base.with_overrides(overrides);
    criteria.validate()?;

    info!(
        min_forecast_period = ?criteria.min_forecast_period,
        max_forecast_period = ?criteria.max_forecast_period,
        diagnostics = ?criteria.allowed_diagnostics,
        "Resolved filter criteria"
    );
    Ok(criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_yaml() {
        let file = write_yaml(
            r#"
min_forecast_period: 0
max_forecast_period: 43200
diagnostics:
  - surface_temperature
  - relative_humidity
"#,
        );
        let criteria = FilterCriteria::load(file.path()).unwrap();
        assert_eq!(criteria.min_forecast_period, Some(0));
        assert_eq!(criteria.max_forecast_period, Some(43200));
        assert!(criteria.allowed_diagnostics.contains("relative_humidity"));
    }

    #[test]
    fn test_empty_yaml_is_match_all() {
        let file = write_yaml("{}\n");
        assert!(FilterCriteria::load(file.path()).unwrap().is_match_all());
    }

    #[test]
    fn test_overrides_win_per_field() {
        let file = write_yaml("min_forecast_period: 10\nmax_forecast_period: 20\n");
        let criteria = resolve_criteria(
            Some(file.path()),
            FilterOverrides {
                max_forecast_period: Some(30),
                diagnostics: vec!["surface_temperature".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(criteria.min_forecast_period, Some(10));
        assert_eq!(criteria.max_forecast_period, Some(30));
        assert_eq!(criteria.allowed_diagnostics.len(), 1);
    }

    #[test]
    fn test_resolve_validates_merged_bounds() {
        let file = write_yaml("min_forecast_period: 10\n");
        let err = resolve_criteria(
            Some(file.path()),
            FilterOverrides {
                max_forecast_period: Some(5),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = FilterCriteria::load(Path::new("/nonexistent/filter.yaml")).unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
