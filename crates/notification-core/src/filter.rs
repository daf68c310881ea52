//! Notification filtering by forecast period and diagnostic name.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{NotifyError, NotifyResult};
use crate::notification::Metadata;

/// Seconds per hour; upstream `forecast_period` values are in seconds.
pub const SECONDS_PER_HOUR: i64 = 60 * 60;

/// Short diagnostic aliases accepted on the command line.
const DIAGNOSTIC_ALIASES: &[(&str, &str)] = &[
    ("temperature", "surface_temperature"),
    ("pressure", "surface_air_pressure"),
    ("humidity", "relative_humidity"),
];

/// Which notifications should trigger a download.
///
/// Every field is optional. An unset bound and an empty allow-list impose
/// no constraint, so the default value matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Inclusive lower bound on `forecast_period`.
    #[serde(default)]
    pub min_forecast_period: Option<i64>,
    /// Inclusive upper bound on `forecast_period`.
    #[serde(default)]
    pub max_forecast_period: Option<i64>,
    /// Diagnostic names to accept; empty accepts all.
    #[serde(default, rename = "diagnostics")]
    pub allowed_diagnostics: BTreeSet<String>,
}

impl FilterCriteria {
    pub fn new(
        min_forecast_period: Option<i64>,
        max_forecast_period: Option<i64>,
        allowed_diagnostics: impl IntoIterator<Item = String>,
    ) -> NotifyResult<Self> {
        let criteria = Self {
            min_forecast_period,
            max_forecast_period,
            allowed_diagnostics: allowed_diagnostics.into_iter().collect(),
        };
        criteria.validate()?;
        Ok(criteria)
    }

    /// Build criteria from a forecast window given in hours.
    pub fn from_hours(
        start_hours: i64,
        end_hours: i64,
        allowed_diagnostics: impl IntoIterator<Item = String>,
    ) -> NotifyResult<Self> {
        if start_hours > end_hours {
            return Err(NotifyError::Config(
                "End time should be greater than or equal to start time".to_string(),
            ));
        }
        Self::new(
            Some(hours_to_seconds(start_hours)?),
            Some(hours_to_seconds(end_hours)?),
            allowed_diagnostics,
        )
    }

    /// Reject a maximum below the minimum.
    pub fn validate(&self) -> NotifyResult<()> {
        if let (Some(min), Some(max)) = (self.min_forecast_period, self.max_forecast_period) {
            if max < min {
                return Err(NotifyError::Config(format!(
                    "Maximum forecast_period ({}) must not be less than minimum forecast_period ({})",
                    max, min
                )));
            }
        }
        Ok(())
    }

    /// Whether any clause is active.
    pub fn is_match_all(&self) -> bool {
        self.min_forecast_period.is_none()
            && self.max_forecast_period.is_none()
            && self.allowed_diagnostics.is_empty()
    }

    /// Decide whether a notification with this metadata should be fetched.
    ///
    /// A missing `forecast_period` fails the range clauses. One that is
    /// present but not an integer is an `InvalidField` error whenever a
    /// range clause is active.
    pub fn matches(&self, metadata: &Metadata) -> NotifyResult<bool> {
        if !self.in_forecast_window(metadata)? {
            return Ok(false);
        }

        if !self.allowed_diagnostics.is_empty() {
            return Ok(metadata
                .name()
                .is_some_and(|name| self.allowed_diagnostics.contains(&name)));
        }

        Ok(true)
    }

    fn in_forecast_window(&self, metadata: &Metadata) -> NotifyResult<bool> {
        if self.min_forecast_period.is_none() && self.max_forecast_period.is_none() {
            return Ok(true);
        }

        let forecast_period = match metadata.forecast_period() {
            Ok(fp) => fp,
            Err(NotifyError::MissingField(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        Ok(self.min_forecast_period.map_or(true, |min| forecast_period >= min)
            && self.max_forecast_period.map_or(true, |max| forecast_period <= max))
    }
}

fn hours_to_seconds(hours: i64) -> NotifyResult<i64> {
    hours.checked_mul(SECONDS_PER_HOUR).ok_or_else(|| {
        NotifyError::Config(format!("Forecast window of {} hours is out of range", hours))
    })
}

/// Expand short diagnostic aliases into metadata names.
///
/// Full names (anything containing `_`) pass through; unknown short names
/// are dropped.
pub fn resolve_diagnostic_aliases<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    let mut resolved = Vec::new();
    for item in requested {
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }
        let name = match DIAGNOSTIC_ALIASES.iter().find(|(alias, _)| *alias == item) {
            Some((_, name)) => name.to_string(),
            None if item.contains('_') => item.to_string(),
            None => {
                warn!(diagnostic = %item, "Ignoring unrecognised diagnostic");
                continue;
            }
        };
        if !resolved.contains(&name) {
            resolved.push(name);
        }
    }
    resolved
}
