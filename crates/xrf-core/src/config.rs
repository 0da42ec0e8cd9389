//! JSON fitting session: calibration, fitted series and the filter chain.

use crate::filter::{FilterConfig, FilterError, FilterSet};
use crate::fitting::{DetectorResolution, EscapePeakType, FittingSet, ResidualPolicy};
use crate::peaktable::{
    Element, PeakTable, SerializedTransitionSeries, TransitionSeries, TransitionSeriesType,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Accepted pile-up multiplicity of one series entry. Line lists grow as `lines^count`.
pub const SERIES_COUNT_RANGE: RangeInclusive<usize> = 1..=4;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("energyPerChannel must be finite and positive, got {value}")]
    InvalidCalibration { value: f32 },
    #[error("detector resolution must be finite, non-negative and produce a positive width")]
    InvalidResolution,
    #[error(
        "series {element} {series_type} requests count {count}; expected {}..={}",
        SERIES_COUNT_RANGE.start(),
        SERIES_COUNT_RANGE.end()
    )]
    InvalidSeriesCount {
        element: Element,
        series_type: TransitionSeriesType,
        count: usize,
    },
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// One fitted series: a catalog entry, optionally as its `count`-fold pile-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEntry {
    pub element: Element,
    pub series_type: TransitionSeriesType,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    1
}

impl SeriesEntry {
    pub fn serialized(&self) -> SerializedTransitionSeries {
        SerializedTransitionSeries {
            element: self.element,
            series_type: self.series_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FittingConfig {
    pub energy_per_channel: f32,
    #[serde(default)]
    pub escape: EscapePeakType,
    #[serde(default)]
    pub residual: ResidualPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<DetectorResolution>,
    #[serde(default)]
    pub series: Vec<SeriesEntry>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

pub fn load_fitting_config(path: impl AsRef<Path>) -> Result<FittingConfig, ConfigError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl FittingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.energy_per_channel.is_finite() || self.energy_per_channel <= 0.0 {
            return Err(ConfigError::InvalidCalibration {
                value: self.energy_per_channel,
            });
        }
        if self
            .resolution
            .is_some_and(|resolution| !resolution.is_valid())
        {
            return Err(ConfigError::InvalidResolution);
        }
        if let Some(entry) = self
            .series
            .iter()
            .find(|entry| !SERIES_COUNT_RANGE.contains(&entry.count))
        {
            return Err(ConfigError::InvalidSeriesCount {
                element: entry.element,
                series_type: entry.series_type,
                count: entry.count,
            });
        }
        for filter in &self.filters {
            filter.validate()?;
        }
        Ok(())
    }

    /// Validate and resolve the configured series against `table`, in file order.
    ///
    /// Entries missing from the catalog are skipped.
    pub fn build_fitting_set(&self, table: &PeakTable) -> Result<FittingSet, ConfigError> {
        self.validate()?;

        let set = FittingSet::new(self.energy_per_channel, self.escape);
        set.set_residual_policy(self.residual);
        if let Some(resolution) = self.resolution {
            set.set_resolution(resolution);
        }

        for entry in &self.series {
            let Some(base) = table.lookup(&entry.serialized()) else {
                warn!(
                    element = %entry.element,
                    series_type = %entry.series_type,
                    "series not in catalog, skipping"
                );
                continue;
            };
            let repeated = vec![base.clone(); entry.count];
            let Some(series) = TransitionSeries::summation_of(&repeated) else {
                continue;
            };
            if !set.add_transition_series(series) {
                warn!(
                    element = %entry.element,
                    series_type = %entry.series_type,
                    count = entry.count,
                    "duplicate series ignored"
                );
            }
        }
        Ok(set)
    }

    pub fn filter_set(&self) -> Result<FilterSet, ConfigError> {
        Ok(FilterSet::from_configs(&self.filters)?)
    }
}
