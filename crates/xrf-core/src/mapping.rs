//! Whole-scan fitting: one spectrum per pixel, fitted in parallel against a frozen
//! calibration, collected into one intensity map per fitted series.

use crate::fitting::{FittingResultSet, FittingSet};
use crate::peaktable::TransitionSeries;
use crate::spectrum::{ReadOnlySpectrum, Spectrum, SpectrumError};
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct MapFitResults {
    series: Vec<TransitionSeries>,
    /// `maps[s][p]`: fitted intensity of `series[s]` at pixel `p`.
    maps: Vec<Vec<f32>>,
    scales: Vec<Vec<f32>>,
    residual_area: Vec<f32>,
}

impl MapFitResults {
    pub fn series(&self) -> &[TransitionSeries] {
        &self.series
    }

    pub fn pixel_count(&self) -> usize {
        self.residual_area.len()
    }

    fn index_of(&self, series: &TransitionSeries) -> Option<usize> {
        self.series.iter().position(|candidate| candidate == series)
    }

    /// Per-pixel intensity (fitted curve area) of `series`, or `None` if it was not fitted.
    pub fn series_map(&self, series: &TransitionSeries) -> Option<&[f32]> {
        self.index_of(series).map(|index| self.maps[index].as_slice())
    }

    /// Per-pixel scale applied to the normalized curve of `series`.
    pub fn series_scales(&self, series: &TransitionSeries) -> Option<&[f32]> {
        self.index_of(series).map(|index| self.scales[index].as_slice())
    }

    /// Intensity of `series` summed over every pixel; `0.0` if it was not fitted.
    pub fn total_intensity(&self, series: &TransitionSeries) -> f32 {
        self.series_map(series)
            .map(|map| map.iter().map(|value| f64::from(*value)).sum::<f64>() as f32)
            .unwrap_or(0.0)
    }

    /// Per-pixel area left unexplained by the fit.
    pub fn residual_map(&self) -> &[f32] {
        &self.residual_area
    }
}

/// Fit every spectrum with the visible series of `set`.
///
/// All spectra must share one channel count; the set is regenerated for it once and then
/// left alone while the pixels are fitted in parallel.
pub fn fit_map(set: &FittingSet, spectra: &[Spectrum]) -> Result<MapFitResults, SpectrumError> {
    let data_width = spectra
        .first()
        .map_or_else(|| set.data_width(), |spectrum| spectrum.size());
    let snapshot = set.snapshot_for_width(data_width);
    let series = snapshot.visible_series();
    tracing::info!(
        spectra = spectra.len(),
        series = series.len(),
        data_width,
        "fitting map"
    );

    let pixels: Vec<FittingResultSet> = spectra
        .par_iter()
        .map(|spectrum| snapshot.calculate_fittings(spectrum))
        .collect::<Result<_, _>>()?;

    let mut maps = vec![Vec::with_capacity(pixels.len()); series.len()];
    let mut scales = vec![Vec::with_capacity(pixels.len()); series.len()];
    let mut residual_area = Vec::with_capacity(pixels.len());
    for pixel in &pixels {
        // Visible series are fitted in snapshot order, so fits line up with `series`.
        for ((map, scale), fit) in maps.iter_mut().zip(scales.iter_mut()).zip(&pixel.fits) {
            map.push(fit.area());
            scale.push(fit.scale);
        }
        residual_area.push(pixel.residual.sum());
    }

    Ok(MapFitResults {
        series,
        maps,
        scales,
        residual_area,
    })
}

#[cfg(test)]
mod tests {
    use super::fit_map;
    use crate::fitting::{
        DetectorResolution, EscapePeakType, FittingSet, TransitionSeriesFitting,
    };
    use crate::peaktable::{
        Element, Transition, TransitionSeries, TransitionSeriesType, TransitionType,
    };
    use crate::spectrum::{ReadOnlySpectrum, Spectrum, SpectrumError};

    fn single_line(element: Element, energy: f64) -> TransitionSeries {
        TransitionSeries::primary(
            element,
            TransitionSeriesType::K,
            vec![Transition::new(energy, 1.0, TransitionType::Ka1)],
        )
    }

    fn curve(series: &TransitionSeries) -> Spectrum {
        TransitionSeriesFitting::new(
            series,
            512,
            0.02,
            EscapePeakType::None,
            &DetectorResolution::default(),
        )
        .curve()
        .clone()
    }

    #[test]
    fn per_pixel_maps_follow_the_fitted_scales() {
        let ca = single_line(Element::Ca, 3.69);
        let cu = single_line(Element::Cu, 8.04);
        let hidden = single_line(Element::Zn, 8.64);
        let set = FittingSet::new(0.02, EscapePeakType::None);
        set.add_transition_series(ca.clone());
        set.add_transition_series(hidden.clone());
        set.add_transition_series(cu.clone());
        set.set_visibility(&hidden, false);

        let ca_curve = curve(&ca);
        let cu_curve = curve(&cu);
        let spectra: Vec<Spectrum> = (1..=6)
            .map(|pixel| {
                ca_curve
                    .multiply_by(pixel as f32)
                    .add(&cu_curve.multiply_by(10.0))
                    .unwrap()
            })
            .collect();

        let results = fit_map(&set, &spectra).expect("uniform widths");
        assert_eq!(results.pixel_count(), 6);
        assert_eq!(results.series(), &[ca.clone(), cu.clone()]);
        assert!(results.series_map(&hidden).is_none());
        assert_eq!(results.total_intensity(&hidden), 0.0);

        let ca_map = results.series_map(&ca).unwrap();
        let unit_area = ca_curve.sum();
        for (pixel, intensity) in ca_map.iter().enumerate() {
            let expected = unit_area * (pixel + 1) as f32;
            assert!((intensity - expected).abs() < 1.0e-2 * expected);
        }

        let ca_scales = results.series_scales(&ca).unwrap();
        assert!((ca_scales[2] - 3.0).abs() < 1.0e-2);

        let cu_map = results.series_map(&cu).unwrap();
        assert!(cu_map.windows(2).all(|pair| (pair[0] - pair[1]).abs() < 1.0e-2));
        assert!(results.residual_map().iter().all(|area| area.abs() < 0.1));
    }

    #[test]
    fn mixed_widths_are_rejected() {
        let set = FittingSet::new(0.02, EscapePeakType::None);
        set.add_transition_series(single_line(Element::Fe, 6.4));
        let spectra = vec![Spectrum::new(256), Spectrum::new(128)];
        assert_eq!(
            fit_map(&set, &spectra).unwrap_err(),
            SpectrumError::DimensionMismatch {
                expected: 256,
                actual: 128
            }
        );
    }

    #[test]
    fn empty_scan_produces_empty_maps() {
        let fe = single_line(Element::Fe, 6.4);
        let set = FittingSet::new(0.02, EscapePeakType::None);
        set.add_transition_series(fe.clone());
        let results = fit_map(&set, &[]).unwrap();
        assert_eq!(results.pixel_count(), 0);
        assert_eq!(results.series_map(&fe), Some(&[][..]));
    }
}
