//! Spectrum filters: background removal and simple arithmetic transforms.
//!
//! A [`Filter`] never modifies its input; it reads through [`ReadOnlySpectrum`] and returns
//! a new [`Spectrum`]. Filters are chained with a [`FilterSet`] and persisted as
//! [`FilterConfig`] values.

pub mod background;
pub mod math;

pub use background::{
    BackgroundFilter, BackgroundParameters, BruknerFilter, BruknerParameters, DEFAULT_PERCENT,
    LinearTrimFilter, LinearTrimParameters, ParabolicFilter, ParabolicParameters,
    SquareSnipFilter, SquareSnipParameters,
};
pub use math::{DerivativeFilter, SubtractionFilter};

use crate::spectrum::{ReadOnlySpectrum, Spectrum};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("{filter} filter rejected {parameter}={value}: expected {expected}")]
    InvalidParameter {
        filter: &'static str,
        parameter: &'static str,
        value: String,
        expected: String,
    },
}

pub(crate) fn check_range(
    filter: &'static str,
    parameter: &'static str,
    value: usize,
    range: RangeInclusive<usize>,
) -> Result<(), FilterError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(FilterError::InvalidParameter {
        filter,
        parameter,
        value: value.to_string(),
        expected: format!("{}..={}", range.start(), range.end()),
    })
}

pub trait Filter: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn filter(&self, data: &dyn ReadOnlySpectrum) -> Spectrum;

    fn to_config(&self) -> FilterConfig;
}

fn default_percent() -> u8 {
    DEFAULT_PERCENT
}

/// Persisted form of a filter and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterConfig {
    LinearTrim {
        width: usize,
        iterations: usize,
        #[serde(default = "default_percent")]
        percent: u8,
    },
    SquareSnip {
        #[serde(rename = "halfWindow")]
        half_window: usize,
        iterations: usize,
        #[serde(default = "default_percent")]
        percent: u8,
    },
    Brukner {
        width: usize,
        iterations: usize,
        #[serde(default = "default_percent")]
        percent: u8,
    },
    Parabolic {
        width: usize,
        power: u32,
        #[serde(default = "default_percent")]
        percent: u8,
    },
    Derivative,
    Subtraction {
        amount: f32,
    },
}

impl FilterConfig {
    pub fn build(&self) -> Result<Box<dyn Filter>, FilterError> {
        let filter: Box<dyn Filter> = match *self {
            Self::LinearTrim {
                width,
                iterations,
                percent,
            } => Box::new(LinearTrimFilter::new(
                LinearTrimParameters { width, iterations },
                percent,
            )?),
            Self::SquareSnip {
                half_window,
                iterations,
                percent,
            } => Box::new(SquareSnipFilter::new(
                SquareSnipParameters {
                    half_window,
                    iterations,
                },
                percent,
            )?),
            Self::Brukner {
                width,
                iterations,
                percent,
            } => Box::new(BruknerFilter::new(
                BruknerParameters { width, iterations },
                percent,
            )?),
            Self::Parabolic {
                width,
                power,
                percent,
            } => Box::new(ParabolicFilter::new(
                ParabolicParameters { width, power },
                percent,
            )?),
            Self::Derivative => Box::new(DerivativeFilter),
            Self::Subtraction { amount } => Box::new(SubtractionFilter::new(amount)?),
        };
        Ok(filter)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        self.build().map(|_| ())
    }
}

#[derive(Debug)]
struct FilterEntry {
    filter: Box<dyn Filter>,
    enabled: bool,
}

/// Ordered filter chain. Disabled filters stay in the chain but are skipped.
#[derive(Debug, Default)]
pub struct FilterSet {
    entries: Vec<FilterEntry>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: &[FilterConfig]) -> Result<Self, FilterError> {
        let mut set = Self::new();
        for config in configs {
            set.entries.push(FilterEntry {
                filter: config.build()?,
                enabled: true,
            });
        }
        Ok(set)
    }

    pub fn push(&mut self, filter: impl Filter + 'static) {
        self.entries.push(FilterEntry {
            filter: Box::new(filter),
            enabled: true,
        });
    }

    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Filter>> {
        (index < self.entries.len()).then(|| self.entries.remove(index).filter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `false` when `index` is out of range.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, index: usize) -> Option<bool> {
        self.entries.get(index).map(|entry| entry.enabled)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.filter.name()).collect()
    }

    pub fn to_configs(&self) -> Vec<FilterConfig> {
        self.entries
            .iter()
            .map(|entry| entry.filter.to_config())
            .collect()
    }

    pub fn apply(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .fold(data.to_spectrum(), |current, entry| {
                entry.filter.filter(&current)
            })
    }

    /// Filter independent spectra in parallel.
    pub fn apply_all(&self, spectra: &[Spectrum]) -> Vec<Spectrum> {
        spectra.par_iter().map(|spectrum| self.apply(spectrum)).collect()
    }
}
