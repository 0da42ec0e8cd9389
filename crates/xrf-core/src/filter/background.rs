use super::{Filter, FilterConfig, FilterError, check_range};
use crate::background;
use crate::spectrum::{ReadOnlySpectrum, Spectrum};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub const DEFAULT_PERCENT: u8 = 90;

/// Parameters of one background estimation algorithm.
pub trait BackgroundParameters: Copy + Debug + Default + PartialEq + Send + Sync {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn validate(&self) -> Result<(), FilterError>;

    /// Full-strength background estimate for `data`.
    fn estimate(&self, data: &dyn ReadOnlySpectrum) -> Spectrum;

    fn to_config(&self, percent: u8) -> FilterConfig;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearTrimParameters {
    pub width: usize,
    pub iterations: usize,
}

impl Default for LinearTrimParameters {
    fn default() -> Self {
        Self {
            width: 100,
            iterations: 2,
        }
    }
}

impl BackgroundParameters for LinearTrimParameters {
    const NAME: &'static str = "Linear Trim";
    const DESCRIPTION: &'static str = "Removes any signal above straight lines joining channel pairs a fixed width apart.";

    fn validate(&self) -> Result<(), FilterError> {
        check_range(Self::NAME, "width", self.width, 10..=400)?;
        check_range(Self::NAME, "iterations", self.iterations, 1..=20)
    }

    fn estimate(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        background::linear_trim(data, self.width, self.iterations)
    }

    fn to_config(&self, percent: u8) -> FilterConfig {
        FilterConfig::LinearTrim {
            width: self.width,
            iterations: self.iterations,
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquareSnipParameters {
    pub half_window: usize,
    pub iterations: usize,
}

impl Default for SquareSnipParameters {
    fn default() -> Self {
        Self {
            half_window: 150,
            iterations: 10,
        }
    }
}

impl BackgroundParameters for SquareSnipParameters {
    const NAME: &'static str = "Square Snip";
    const DESCRIPTION: &'static str = "Peak stripping on double-square-root compressed data.";

    fn validate(&self) -> Result<(), FilterError> {
        check_range(Self::NAME, "halfWindow", self.half_window, 50..=200)?;
        check_range(Self::NAME, "iterations", self.iterations, 5..=50)
    }

    fn estimate(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        background::square_snip(data, self.half_window, self.iterations)
    }

    fn to_config(&self, percent: u8) -> FilterConfig {
        FilterConfig::SquareSnip {
            half_window: self.half_window,
            iterations: self.iterations,
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BruknerParameters {
    pub width: usize,
    pub iterations: usize,
}

impl Default for BruknerParameters {
    fn default() -> Self {
        Self {
            width: 100,
            iterations: 10,
        }
    }
}

impl BackgroundParameters for BruknerParameters {
    const NAME: &'static str = "Brukner";
    const DESCRIPTION: &'static str = "Repeated moving-average smoothing that only ever lowers the signal.";

    fn validate(&self) -> Result<(), FilterError> {
        check_range(Self::NAME, "width", self.width, 10..=400)?;
        check_range(Self::NAME, "iterations", self.iterations, 0..=50)
    }

    fn estimate(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        background::brukner(data, self.width, self.iterations)
    }

    fn to_config(&self, percent: u8) -> FilterConfig {
        FilterConfig::Brukner {
            width: self.width,
            iterations: self.iterations,
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParabolicParameters {
    pub width: usize,
    pub power: u32,
}

impl Default for ParabolicParameters {
    fn default() -> Self {
        Self {
            width: 100,
            power: 3,
        }
    }
}

impl BackgroundParameters for ParabolicParameters {
    const NAME: &'static str = "Parabolic";
    const DESCRIPTION: &'static str = "Fits inverted polynomial curves underneath the signal.";

    fn validate(&self) -> Result<(), FilterError> {
        check_range(Self::NAME, "width", self.width, 10..=400)?;
        check_range(Self::NAME, "power", self.power as usize, 0..=16)
    }

    fn estimate(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        background::calc_background_parabolic(data, self.width, self.power)
    }

    fn to_config(&self, percent: u8) -> FilterConfig {
        FilterConfig::Parabolic {
            width: self.width,
            power: self.power,
            percent,
        }
    }
}

/// Background removal: `filter(data) = data - estimate(data) * percent / 100`.
///
/// Parameters are validated whenever they change; a rejected update leaves the filter
/// exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundFilter<P> {
    parameters: P,
    percent: u8,
}

pub type LinearTrimFilter = BackgroundFilter<LinearTrimParameters>;
pub type SquareSnipFilter = BackgroundFilter<SquareSnipParameters>;
pub type BruknerFilter = BackgroundFilter<BruknerParameters>;
pub type ParabolicFilter = BackgroundFilter<ParabolicParameters>;

impl<P: BackgroundParameters> BackgroundFilter<P> {
    pub fn new(parameters: P, percent: u8) -> Result<Self, FilterError> {
        parameters.validate()?;
        validate_percent(P::NAME, percent)?;
        Ok(Self {
            parameters,
            percent,
        })
    }

    pub fn parameters(&self) -> P {
        self.parameters
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn set_parameters(&mut self, parameters: P) -> Result<(), FilterError> {
        if let Err(error) = parameters.validate() {
            tracing::warn!(filter = P::NAME, %error, "rejected filter parameters, keeping previous values");
            return Err(error);
        }
        self.parameters = parameters;
        Ok(())
    }

    pub fn set_percent(&mut self, percent: u8) -> Result<(), FilterError> {
        if let Err(error) = validate_percent(P::NAME, percent) {
            tracing::warn!(filter = P::NAME, %error, "rejected removal percentage, keeping previous value");
            return Err(error);
        }
        self.percent = percent;
        Ok(())
    }

    /// The portion of `data` this filter removes.
    pub fn background(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        self.parameters
            .estimate(data)
            .multiply_by(f32::from(self.percent) / 100.0)
    }
}

impl<P: BackgroundParameters> Default for BackgroundFilter<P> {
    fn default() -> Self {
        Self {
            parameters: P::default(),
            percent: DEFAULT_PERCENT,
        }
    }
}

impl<P: BackgroundParameters> Filter for BackgroundFilter<P> {
    fn name(&self) -> &'static str {
        P::NAME
    }

    fn description(&self) -> &'static str {
        P::DESCRIPTION
    }

    fn filter(&self, data: &dyn ReadOnlySpectrum) -> Spectrum {
        let background = self.background(data);
        data.values()
            .iter()
            .zip(background.values())
            .map(|(value, removed)| value - removed)
            .collect()
    }

    fn to_config(&self) -> FilterConfig {
        self.parameters.to_config(self.percent)
    }
}

fn validate_percent(filter: &'static str, percent: u8) -> Result<(), FilterError> {
    check_range(filter, "percent", usize::from(percent), 0..=100)
}
