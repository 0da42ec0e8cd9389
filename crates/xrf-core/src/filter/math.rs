use super::{Filter, FilterConfig, FilterError};
use crate::spectrum::{ReadOnlySpectrum, Spectrum};

/// Replaces every channel with its difference from the previous channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivativeFilter;

impl Filter for DerivativeFilter {
    fn name(&self) -> &'static str {
        "Derivative"
    }

    fn description(&self) -> &'static str {
        "Each channel becomes the difference between itself and the channel before it."
    }

    fn filter(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        data.to_spectrum().derivative()
    }

    fn to_config(&self) -> FilterConfig {
        FilterConfig::Derivative
    }
}

/// Subtracts a constant from every channel, never going below zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubtractionFilter {
    amount: f32,
}

impl SubtractionFilter {
    pub fn new(amount: f32) -> Result<Self, FilterError> {
        if !(amount.is_finite() && amount >= 0.0) {
            return Err(FilterError::InvalidParameter {
                filter: "Subtract",
                parameter: "amount",
                value: amount.to_string(),
                expected: "a finite value >= 0".to_string(),
            });
        }
        Ok(Self { amount })
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }
}

impl Default for SubtractionFilter {
    fn default() -> Self {
        Self { amount: 1.0 }
    }
}

impl Filter for SubtractionFilter {
    fn name(&self) -> &'static str {
        "Subtract"
    }

    fn description(&self) -> &'static str {
        "Subtracts a constant value from every channel."
    }

    fn filter(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        data.values()
            .iter()
            .map(|value| (value - self.amount).max(0.0))
            .collect()
    }

    fn to_config(&self) -> FilterConfig {
        FilterConfig::Subtraction {
            amount: self.amount,
        }
    }
}
