//! The working set of fitted transition series and the greedy decomposition over it.
//!
//! Fitting is a single pass in insertion order: each visible series claims the largest
//! scale of its curve that fits under what is left of the spectrum, and that curve is
//! subtracted before the next series is considered. Earlier series therefore win
//! overlapping signal, and reordering the set is how callers resolve ambiguous overlaps.
//! This is not a simultaneous least-squares solve; it is cheap enough to run per pixel.

use super::curve::TransitionSeriesFitting;
use super::detector::{DetectorResolution, EscapePeakType};
use super::results::{FittingResult, FittingResultSet, ResidualPolicy};
use crate::peaktable::TransitionSeries;
use crate::spectrum::{ReadOnlySpectrum, Spectrum, SpectrumError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq)]
struct SeriesSettings {
    visible: bool,
    intensity: f32,
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            visible: true,
            intensity: 1.0,
        }
    }
}

#[derive(Debug)]
struct FittingState {
    series: Vec<TransitionSeries>,
    fittings: Vec<Arc<TransitionSeriesFitting>>,
    settings: HashMap<TransitionSeries, SeriesSettings>,
    data_width: usize,
    energy_per_channel: f32,
    escape: EscapePeakType,
    resolution: DetectorResolution,
    residual_policy: ResidualPolicy,
}

impl FittingState {
    fn render(&self, series: &TransitionSeries) -> Arc<TransitionSeriesFitting> {
        Arc::new(TransitionSeriesFitting::new(
            series,
            self.data_width,
            self.energy_per_channel,
            self.escape,
            &self.resolution,
        ))
    }

    /// Rebuild every fitting for the current calibration and swap them in at once.
    fn regenerate(&mut self) {
        let fittings: Vec<_> = self.series.iter().map(|series| self.render(series)).collect();
        self.fittings = fittings;
        tracing::debug!(
            data_width = self.data_width,
            energy_per_channel = self.energy_per_channel,
            escape = self.escape.as_str(),
            series = self.series.len(),
            "regenerated transition series fittings"
        );
    }

    fn position(&self, series: &TransitionSeries) -> Option<usize> {
        self.series.iter().position(|candidate| candidate == series)
    }

    fn settings(&self, series: &TransitionSeries) -> SeriesSettings {
        self.settings.get(series).copied().unwrap_or_default()
    }

    fn is_visible(&self, series: &TransitionSeries) -> bool {
        self.settings(series).visible
    }

    fn move_up(&mut self, series: &TransitionSeries) -> bool {
        match self.position(series) {
            Some(index) if index > 0 => {
                self.series.swap(index, index - 1);
                self.fittings.swap(index, index - 1);
                tracing::trace!(series = %series, to = index - 1, "moved series up");
                true
            }
            _ => false,
        }
    }

    fn move_down(&mut self, series: &TransitionSeries) -> bool {
        match self.position(series) {
            Some(index) if index + 1 < self.series.len() => {
                self.series.swap(index, index + 1);
                self.fittings.swap(index, index + 1);
                tracing::trace!(series = %series, to = index + 1, "moved series down");
                true
            }
            _ => false,
        }
    }

    fn entries(&self) -> Vec<(Arc<TransitionSeriesFitting>, bool)> {
        self.fittings
            .iter()
            .map(|fitting| (Arc::clone(fitting), self.is_visible(fitting.series())))
            .collect()
    }
}

/// Ordered set of transition series with their fittings for the current calibration.
///
/// All state sits behind one mutex: mutations and fitting calculations exclude each other,
/// so a calculation never sees fittings from a half-applied calibration change. Batch work
/// should take a [`FittingSnapshot`] instead and fit without the lock.
#[derive(Debug)]
pub struct FittingSet {
    state: Mutex<FittingState>,
}

impl Default for FittingSet {
    fn default() -> Self {
        Self::new(0.0, EscapePeakType::None)
    }
}

impl FittingSet {
    pub fn new(energy_per_channel: f32, escape: EscapePeakType) -> Self {
        Self {
            state: Mutex::new(FittingState {
                series: Vec::new(),
                fittings: Vec::new(),
                settings: HashMap::new(),
                data_width: 0,
                energy_per_channel,
                escape,
                resolution: DetectorResolution::default(),
                residual_policy: ResidualPolicy::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FittingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn energy_per_channel(&self) -> f32 {
        self.lock().energy_per_channel
    }

    pub fn escape_type(&self) -> EscapePeakType {
        self.lock().escape
    }

    pub fn data_width(&self) -> usize {
        self.lock().data_width
    }

    pub fn resolution(&self) -> DetectorResolution {
        self.lock().resolution
    }

    pub fn residual_policy(&self) -> ResidualPolicy {
        self.lock().residual_policy
    }

    pub fn set_energy_per_channel(&self, energy_per_channel: f32) {
        let mut state = self.lock();
        state.energy_per_channel = energy_per_channel;
        state.regenerate();
    }

    pub fn set_escape_type(&self, escape: EscapePeakType) {
        let mut state = self.lock();
        state.escape = escape;
        state.regenerate();
    }

    pub fn set_resolution(&self, resolution: DetectorResolution) {
        let mut state = self.lock();
        state.resolution = resolution;
        state.regenerate();
    }

    pub fn set_residual_policy(&self, policy: ResidualPolicy) {
        self.lock().residual_policy = policy;
    }

    /// Change the whole calibration with a single regeneration.
    pub fn set_data_parameters(
        &self,
        data_width: usize,
        energy_per_channel: f32,
        escape: EscapePeakType,
    ) {
        let mut state = self.lock();
        state.data_width = data_width;
        state.energy_per_channel = energy_per_channel;
        state.escape = escape;
        state.regenerate();
    }

    /// Adds `series` at the end of the set. Returns `false` if an equal series is already
    /// present, in which case nothing changes.
    pub fn add_transition_series(&self, series: TransitionSeries) -> bool {
        let mut state = self.lock();
        if state.position(&series).is_some() {
            return false;
        }
        let fitting = state.render(&series);
        tracing::trace!(series = %series, "added series to fitting set");
        state.fittings.push(fitting);
        state.series.push(series);
        true
    }

    /// Returns `false` when the series was not in the set.
    pub fn remove(&self, series: &TransitionSeries) -> bool {
        let mut state = self.lock();
        let Some(index) = state.position(series) else {
            return false;
        };
        state.series.remove(index);
        state.fittings.remove(index);
        state.settings.remove(series);
        tracing::trace!(series = %series, "removed series from fitting set");
        true
    }

    /// Removes every series along with its visibility and intensity settings.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.series.clear();
        state.fittings.clear();
        state.settings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lock().series.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().series.len()
    }

    pub fn contains(&self, series: &TransitionSeries) -> bool {
        self.lock().position(series).is_some()
    }

    /// Moves `series` one place earlier. Returns whether it moved.
    pub fn move_up(&self, series: &TransitionSeries) -> bool {
        self.lock().move_up(series)
    }

    /// Moves `series` one place later. Returns whether it moved.
    pub fn move_down(&self, series: &TransitionSeries) -> bool {
        self.lock().move_down(series)
    }

    /// Moves each series up in list order, stopping at the first one that cannot move.
    pub fn move_up_all(&self, series: &[TransitionSeries]) {
        let mut state = self.lock();
        for entry in series {
            if !state.move_up(entry) {
                break;
            }
        }
    }

    /// Moves each series down in reverse list order, stopping at the first one that cannot
    /// move.
    pub fn move_down_all(&self, series: &[TransitionSeries]) {
        let mut state = self.lock();
        for entry in series.iter().rev() {
            if !state.move_down(entry) {
                break;
            }
        }
    }

    /// Hidden series stay in the set but are skipped when fitting. Has no effect on series
    /// outside the set.
    pub fn set_visibility(&self, series: &TransitionSeries, visible: bool) {
        let mut state = self.lock();
        if state.position(series).is_none() {
            return;
        }
        state.settings.entry(series.clone()).or_default().visible = visible;
    }

    /// `false` for series outside the set.
    pub fn is_visible(&self, series: &TransitionSeries) -> bool {
        let state = self.lock();
        state.position(series).is_some() && state.is_visible(series)
    }

    /// Display intensity of a series in the set. Fitting arithmetic ignores it.
    pub fn set_intensity(&self, series: &TransitionSeries, intensity: f32) {
        let mut state = self.lock();
        if state.position(series).is_none() {
            return;
        }
        state.settings.entry(series.clone()).or_default().intensity = intensity;
    }

    pub fn intensity(&self, series: &TransitionSeries) -> Option<f32> {
        let state = self.lock();
        state
            .position(series)
            .map(|_| state.settings(series).intensity)
    }

    pub fn fitted_transition_series(&self) -> Vec<TransitionSeries> {
        self.lock().series.clone()
    }

    pub fn visible_transition_series(&self) -> Vec<TransitionSeries> {
        let state = self.lock();
        state
            .series
            .iter()
            .filter(|series| state.is_visible(series))
            .cloned()
            .collect()
    }

    /// Fit `data`, first regenerating the fittings if its width differs from the last one.
    pub fn calculate_fittings(&self, data: &dyn ReadOnlySpectrum) -> FittingResultSet {
        let mut state = self.lock();
        if data.size() != state.data_width {
            state.data_width = data.size();
            state.regenerate();
        }
        let entries = state.entries();
        fit_in_order(&entries, state.residual_policy, data)
    }

    /// Mean channel value of the total fit.
    pub fn calculate_area_under_fit(&self, data: &dyn ReadOnlySpectrum) -> f32 {
        self.calculate_fittings(data).total_fit.mean()
    }

    /// Freeze the set for spectra of `data_width` channels.
    pub fn snapshot_for_width(&self, data_width: usize) -> FittingSnapshot {
        let mut state = self.lock();
        if data_width != state.data_width {
            state.data_width = data_width;
            state.regenerate();
        }
        FittingSnapshot {
            entries: state.entries(),
            residual_policy: state.residual_policy,
            data_width,
        }
    }
}

/// Immutable copy of a [`FittingSet`] for one calibration. Fitting against a snapshot takes
/// no lock, so many spectra can be fitted in parallel.
#[derive(Debug, Clone)]
pub struct FittingSnapshot {
    entries: Vec<(Arc<TransitionSeriesFitting>, bool)>,
    residual_policy: ResidualPolicy,
    data_width: usize,
}

impl FittingSnapshot {
    pub fn data_width(&self) -> usize {
        self.data_width
    }

    pub fn series(&self) -> Vec<TransitionSeries> {
        self.entries
            .iter()
            .map(|(fitting, _)| fitting.series().clone())
            .collect()
    }

    pub fn visible_series(&self) -> Vec<TransitionSeries> {
        self.entries
            .iter()
            .filter(|(_, visible)| *visible)
            .map(|(fitting, _)| fitting.series().clone())
            .collect()
    }

    pub fn calculate_fittings(
        &self,
        data: &dyn ReadOnlySpectrum,
    ) -> Result<FittingResultSet, SpectrumError> {
        if data.size() != self.data_width {
            return Err(SpectrumError::DimensionMismatch {
                expected: self.data_width,
                actual: data.size(),
            });
        }
        Ok(fit_in_order(&self.entries, self.residual_policy, data))
    }
}

fn fit_in_order(
    entries: &[(Arc<TransitionSeriesFitting>, bool)],
    policy: ResidualPolicy,
    data: &dyn ReadOnlySpectrum,
) -> FittingResultSet {
    let mut results = FittingResultSet::empty(data);
    let mut remaining: Spectrum = results.residual.clone();

    for (fitting, visible) in entries {
        if !*visible {
            continue;
        }
        let scale = fitting.ratio_for_curve_under_data(&remaining);
        let curve = fitting.scale_fit_to_data(scale);
        policy.subtract(&mut remaining, &curve);
        for (total, fitted) in results
            .total_fit
            .values_mut()
            .iter_mut()
            .zip(curve.values())
        {
            *total += fitted;
        }
        results.fits.push(FittingResult {
            curve,
            series: fitting.series().clone(),
            scale,
            normalization: fitting.normalization_scale(),
        });
    }

    results.residual = remaining;
    results
}
