use super::detector::{DetectorResolution, EscapePeakType};
use crate::peaktable::TransitionSeries;
use crate::spectrum::{ReadOnlySpectrum, Spectrum};

/// Normalized curve channels at or above this value decide the fit scale.
pub const INTENSE_CHANNEL_THRESHOLD: f32 = 0.5;

/// Gaussians are evaluated this many standard deviations either side of their centre.
const PEAK_REACH_SIGMAS: f64 = 6.0;

/// A transition series rendered for one calibration: channel count, keV per channel and
/// escape peak mode.
///
/// The stored curve is normalized so its tallest channel is `1.0`; the original height is
/// kept as the normalization scale. Fittings are rebuilt, never updated, when the
/// calibration changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSeriesFitting {
    series: TransitionSeries,
    curve: Spectrum,
    normalization: f32,
    intense_channels: Vec<usize>,
}

impl TransitionSeriesFitting {
    pub fn new(
        series: &TransitionSeries,
        data_width: usize,
        energy_per_channel: f32,
        escape: EscapePeakType,
        resolution: &DetectorResolution,
    ) -> Self {
        let raw = render_series(series, data_width, energy_per_channel, escape, resolution);
        let normalization = ReadOnlySpectrum::max(&raw).max(0.0);
        let curve = raw.normalize();
        let intense_channels = if normalization > 0.0 {
            curve
                .iter()
                .enumerate()
                .filter(|(_, value)| **value >= INTENSE_CHANNEL_THRESHOLD)
                .map(|(channel, _)| channel)
                .collect()
        } else {
            Vec::new()
        };

        Self {
            series: series.clone(),
            curve,
            normalization,
            intense_channels,
        }
    }

    pub fn series(&self) -> &TransitionSeries {
        &self.series
    }

    /// Normalized curve (tallest channel `1.0`, or all zero when nothing lands on the data).
    pub fn curve(&self) -> &Spectrum {
        &self.curve
    }

    pub fn data_width(&self) -> usize {
        self.curve.size()
    }

    pub fn intense_channels(&self) -> &[usize] {
        &self.intense_channels
    }

    /// Height of the rendered curve before normalization.
    pub fn normalization_scale(&self) -> f32 {
        self.normalization
    }

    pub fn scale_fit_to_data(&self, scale: f32) -> Spectrum {
        self.curve.multiply_by(scale)
    }

    /// Largest non-negative scale that keeps the curve under `data` on every intense channel.
    ///
    /// Returns `0.0` when the curve has no intense channels, when the data is missing
    /// channels, or when the ratio is not a finite positive number.
    pub fn ratio_for_curve_under_data(&self, data: &dyn ReadOnlySpectrum) -> f32 {
        let mut smallest = f32::INFINITY;
        for channel in &self.intense_channels {
            let Some(value) = data.try_get(*channel) else {
                return 0.0;
            };
            let ratio = value / self.curve[*channel];
            if ratio < smallest {
                smallest = ratio;
            }
        }

        if smallest.is_finite() && smallest > 0.0 {
            smallest
        } else {
            0.0
        }
    }
}

fn render_series(
    series: &TransitionSeries,
    data_width: usize,
    energy_per_channel: f32,
    escape: EscapePeakType,
    resolution: &DetectorResolution,
) -> Spectrum {
    let mut curve = Spectrum::new(data_width);
    let energy_per_channel = f64::from(energy_per_channel);
    if data_width == 0 || !(energy_per_channel.is_finite() && energy_per_channel > 0.0) {
        return curve;
    }

    for transition in series.transitions() {
        add_peak(
            &mut curve,
            transition.energy,
            transition.relative_intensity,
            energy_per_channel,
            resolution,
        );
        let escapes = escape.escape_peaks(transition.energy, transition.relative_intensity);
        for (energy, intensity) in escapes {
            add_peak(&mut curve, energy, intensity, energy_per_channel, resolution);
        }
    }

    curve
}

fn add_peak(
    curve: &mut Spectrum,
    energy: f64,
    height: f64,
    energy_per_channel: f64,
    resolution: &DetectorResolution,
) {
    let sigma = resolution.sigma(energy) / energy_per_channel;
    if !(sigma.is_finite() && sigma > 0.0 && height > 0.0) {
        return;
    }

    let centre = energy / energy_per_channel;
    let reach = PEAK_REACH_SIGMAS * sigma;
    let last = curve.size() as f64 - 1.0;
    let first_channel = (centre - reach).ceil().max(0.0);
    let last_channel = (centre + reach).floor().min(last);
    if first_channel > last_channel {
        return;
    }

    let channels = curve.values_mut();
    for channel in first_channel as usize..=last_channel as usize {
        let distance = (channel as f64 - centre) / sigma;
        channels[channel] += (height * (-0.5 * distance * distance).exp()) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::TransitionSeriesFitting;
    use crate::fitting::detector::{DetectorResolution, EscapePeakType};
    use crate::peaktable::{
        Element, Transition, TransitionSeries, TransitionSeriesType, TransitionType,
    };
    use crate::spectrum::{ReadOnlySpectrum, Spectrum};

    fn single_line(element: Element, energy: f64) -> TransitionSeries {
        TransitionSeries::primary(
            element,
            TransitionSeriesType::K,
            vec![Transition::new(energy, 1.0, TransitionType::Ka1)],
        )
    }

    fn render(series: &TransitionSeries, escape: EscapePeakType) -> TransitionSeriesFitting {
        TransitionSeriesFitting::new(series, 2048, 0.01, escape, &DetectorResolution::default())
    }

    #[test]
    fn curve_peaks_at_the_line_energy_and_is_normalized() {
        let fitting = render(&single_line(Element::Fe, 6.4), EscapePeakType::None);
        let curve = fitting.curve();
        assert_eq!(curve.size(), 2048);
        assert_eq!(ReadOnlySpectrum::max(curve), 1.0);
        assert_eq!(curve[640], 1.0);
        assert!(curve[600] < 0.01);
        assert!(fitting.normalization_scale() > 0.99);
        assert!(fitting.intense_channels().contains(&640));
        assert!(
            fitting
                .intense_channels()
                .iter()
                .all(|channel| (630..=650).contains(channel))
        );
    }

    #[test]
    fn escape_mode_adds_a_lower_energy_peak() {
        let series = single_line(Element::Fe, 6.4);
        let plain = render(&series, EscapePeakType::None);
        let escaped = render(&series, EscapePeakType::Silicon);
        assert!(plain.curve()[466] < 1.0e-6);
        assert!(escaped.curve()[466] > 0.005);
        assert_eq!(escaped.curve()[640], 1.0);
    }

    #[test]
    fn ratio_recovers_the_scale_of_a_rendered_curve() {
        let fitting = render(&single_line(Element::Cu, 8.04), EscapePeakType::None);
        let data = fitting.scale_fit_to_data(250.0);
        let ratio = fitting.ratio_for_curve_under_data(&data);
        assert!((ratio - 250.0).abs() < 1.0e-2, "ratio {ratio}");
    }

    #[test]
    fn ratio_fails_safe_to_zero() {
        let fitting = render(&single_line(Element::Cu, 8.04), EscapePeakType::None);
        assert_eq!(fitting.ratio_for_curve_under_data(&Spectrum::new(2048)), 0.0);
        assert_eq!(fitting.ratio_for_curve_under_data(&Spectrum::filled(2048, -3.0)), 0.0);
        assert_eq!(fitting.ratio_for_curve_under_data(&Spectrum::filled(10, 5.0)), 0.0);

        let off_scale = fitting_off_scale();
        assert!(off_scale.intense_channels().is_empty());
        assert_eq!(off_scale.normalization_scale(), 0.0);
        assert_eq!(off_scale.ratio_for_curve_under_data(&Spectrum::filled(100, 5.0)), 0.0);
    }

    fn fitting_off_scale() -> TransitionSeriesFitting {
        TransitionSeriesFitting::new(
            &single_line(Element::U, 98.4),
            100,
            0.01,
            EscapePeakType::None,
            &DetectorResolution::default(),
        )
    }

    #[test]
    fn invalid_calibration_renders_an_empty_curve() {
        let series = single_line(Element::Fe, 6.4);
        let fitting = TransitionSeriesFitting::new(
            &series,
            128,
            0.0,
            EscapePeakType::None,
            &DetectorResolution::default(),
        );
        assert_eq!(fitting.curve(), &Spectrum::new(128));
        assert_eq!(fitting.series(), &series);
    }
}
