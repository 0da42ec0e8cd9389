//! X-ray fluorescence spectral fitting.
//!
//! Spectra are fixed-width channel arrays; the peak table describes which emission lines
//! each element produces; background filters strip the continuum; and a [`FittingSet`]
//! greedily attributes the remaining intensity to transition series in priority order.

pub mod background;
pub mod concentration;
pub mod config;
pub mod domain;
pub mod filter;
pub mod fitting;
pub mod mapping;
pub mod peaktable;
pub mod spectrum;

pub use domain::{XrfError, XrfErrorCategory, XrfResult};
pub use fitting::{FittingResultSet, FittingSet};
pub use peaktable::{Element, PeakTable, TransitionSeries, TransitionSeriesType};
pub use spectrum::{ReadOnlySpectrum, Spectrum, SpectrumView};
