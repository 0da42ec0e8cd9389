use crate::peaktable::TransitionSeries;
use crate::spectrum::{ReadOnlySpectrum, Spectrum};
use serde::{Deserialize, Serialize};

/// How the running residual is updated after each fitted curve is subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResidualPolicy {
    /// Channels that would go negative are clamped to zero.
    #[default]
    FloorAtZero,
    Unclamped,
}

impl ResidualPolicy {
    pub(crate) fn subtract(self, remaining: &mut Spectrum, curve: &Spectrum) {
        for (value, fitted) in remaining.values_mut().iter_mut().zip(curve.values()) {
            let next = *value - fitted;
            *value = match self {
                Self::FloorAtZero => next.max(0.0),
                Self::Unclamped => next,
            };
        }
    }
}

/// One series' share of a fitted spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct FittingResult {
    pub curve: Spectrum,
    pub series: TransitionSeries,
    pub scale: f32,
    pub normalization: f32,
}

impl FittingResult {
    /// Summed intensity of the fitted curve.
    pub fn area(&self) -> f32 {
        self.curve.sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittingResultSet {
    pub fits: Vec<FittingResult>,
    pub total_fit: Spectrum,
    pub residual: Spectrum,
}

impl FittingResultSet {
    /// An unfitted result: no fits, a zero total and the data itself as the residual.
    pub fn empty(data: &dyn ReadOnlySpectrum) -> Self {
        Self {
            fits: Vec::new(),
            total_fit: Spectrum::new(data.size()),
            residual: data.to_spectrum(),
        }
    }

    pub fn fits(&self) -> &[FittingResult] {
        &self.fits
    }

    pub fn total_fit(&self) -> &Spectrum {
        &self.total_fit
    }

    pub fn residual(&self) -> &Spectrum {
        &self.residual
    }

    pub fn fit_for(&self, series: &TransitionSeries) -> Option<&FittingResult> {
        self.fits.iter().find(|fit| &fit.series == series)
    }
}
