//! Relative element concentrations from fitted series intensities.

use crate::peaktable::{Element, TransitionSeries, TransitionSeriesType};
use std::collections::BTreeMap;

/// Concentrations in parts per million of the total fitted intensity.
#[derive(Debug, Clone, PartialEq)]
pub struct Concentrations {
    ppm: BTreeMap<Element, f32>,
    sources: BTreeMap<Element, TransitionSeries>,
}

impl Concentrations {
    /// Pick one series per element, preferring K over L over M, and convert their
    /// intensities to ppm of the summed intensity.
    ///
    /// Composite series are ignored. When every intensity is zero all concentrations are
    /// zero.
    pub fn calculate(
        series: &[TransitionSeries],
        intensity: impl Fn(&TransitionSeries) -> f32,
    ) -> Self {
        let mut sources = BTreeMap::new();
        for shell in [
            TransitionSeriesType::M,
            TransitionSeriesType::L,
            TransitionSeriesType::K,
        ] {
            for candidate in series.iter().filter(|candidate| candidate.series_type() == shell) {
                sources.insert(candidate.element(), candidate.clone());
            }
        }

        let intensities: BTreeMap<Element, f32> = sources
            .iter()
            .map(|(element, source)| (*element, intensity(source).max(0.0)))
            .collect();
        let total: f32 = intensities.values().sum();

        let ppm = intensities
            .into_iter()
            .map(|(element, value)| {
                let share = if total > 0.0 { value / total * 1.0e6 } else { 0.0 };
                (element, share)
            })
            .collect();

        Self { ppm, sources }
    }

    pub fn contains(&self, element: Element) -> bool {
        self.ppm.contains_key(&element)
    }

    /// `0.0` for elements without a fitted series.
    pub fn ppm(&self, element: Element) -> f32 {
        self.ppm.get(&element).copied().unwrap_or(0.0)
    }

    pub fn percent_formatted(&self, element: Element) -> String {
        format!("{:.6}%", self.ppm(element) / 10_000.0)
    }

    /// Concentration of `element` relative to `anchor`; `0.0` when either is missing.
    pub fn ratio(&self, element: Element, anchor: Element) -> f32 {
        let anchor_ppm = self.ppm(anchor);
        if !self.contains(element) || anchor_ppm <= 0.0 {
            return 0.0;
        }
        self.ppm(element) / anchor_ppm
    }

    pub fn source(&self, element: Element) -> Option<&TransitionSeries> {
        self.sources.get(&element)
    }

    pub fn elements_by_z(&self) -> Vec<Element> {
        self.ppm.keys().copied().collect()
    }

    /// Highest concentration first; ties keep atomic number order.
    pub fn elements_by_concentration(&self) -> Vec<Element> {
        let mut elements = self.elements_by_z();
        elements.sort_by(|lhs, rhs| self.ppm(*rhs).total_cmp(&self.ppm(*lhs)));
        elements
    }
}
