//! Curve fitting: rendering transition series for a detector calibration and attributing
//! spectrum intensity to them.

pub mod curve;
pub mod detector;
pub mod results;
pub mod set;

pub use curve::{INTENSE_CHANNEL_THRESHOLD, TransitionSeriesFitting};
pub use detector::{DetectorResolution, EscapePeakType, FWHM_PER_SIGMA};
pub use results::{FittingResult, FittingResultSet, ResidualPolicy};
pub use set::{FittingSet, FittingSnapshot};
