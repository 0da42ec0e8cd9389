//! Fixed-length channel spectra.
//!
//! [`Spectrum`] owns its channels and is the only way to mutate them. Code that must not
//! modify caller data (filters, fitting) accepts anything implementing [`ReadOnlySpectrum`],
//! which `Spectrum`, `&Spectrum` and the borrowed [`SpectrumView`] all provide.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpectrumError {
    #[error("spectrum dimension mismatch: expected {expected} channels, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Accessors shared by owned spectra and borrowed views.
pub trait ReadOnlySpectrum {
    fn values(&self) -> &[f32];

    fn size(&self) -> usize {
        self.values().len()
    }

    fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Channel value at `index`.
    ///
    /// Panics when `index >= size()`: an out-of-range channel is a programming error.
    fn get(&self, index: usize) -> f32 {
        let values = self.values();
        match values.get(index) {
            Some(value) => *value,
            None => panic!(
                "channel index {index} out of range for spectrum of {} channels",
                values.len()
            ),
        }
    }

    fn try_get(&self, index: usize) -> Option<f32> {
        self.values().get(index).copied()
    }

    fn sum(&self) -> f32 {
        self.values().iter().map(|value| f64::from(*value)).sum::<f64>() as f32
    }

    /// Sum of channels in `start..stop`, with `stop` clamped to the spectrum size.
    fn sum_range(&self, start: usize, stop: usize) -> f32 {
        let values = self.values();
        let stop = stop.min(values.len());
        if start >= stop {
            return 0.0;
        }
        values[start..stop]
            .iter()
            .map(|value| f64::from(*value))
            .sum::<f64>() as f32
    }

    fn mean(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        self.sum() / self.size() as f32
    }

    /// Smallest channel value; `0.0` for an empty spectrum.
    fn min(&self) -> f32 {
        self.values().iter().copied().reduce(f32::min).unwrap_or(0.0)
    }

    /// Largest channel value; `0.0` for an empty spectrum.
    fn max(&self) -> f32 {
        self.values().iter().copied().reduce(f32::max).unwrap_or(0.0)
    }

    fn to_spectrum(&self) -> Spectrum {
        Spectrum::from(self.values().to_vec())
    }
}

impl<T: ReadOnlySpectrum + ?Sized> ReadOnlySpectrum for &T {
    fn values(&self) -> &[f32] {
        (**self).values()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spectrum {
    values: Vec<f32>,
}

impl Spectrum {
    /// A spectrum of `size` zeroed channels.
    pub fn new(size: usize) -> Self {
        Self::filled(size, 0.0)
    }

    pub fn filled(size: usize, value: f32) -> Self {
        Self {
            values: vec![value; size],
        }
    }

    pub fn from_fn(size: usize, channel: impl FnMut(usize) -> f32) -> Self {
        Self {
            values: (0..size).map(channel).collect(),
        }
    }

    pub fn view(&self) -> SpectrumView<'_> {
        SpectrumView {
            values: &self.values,
        }
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f32> {
        self.values.iter()
    }

    /// Panics when `index` is out of range.
    pub fn set(&mut self, index: usize, value: f32) {
        let size = self.values.len();
        match self.values.get_mut(index) {
            Some(slot) => *slot = value,
            None => panic!("channel index {index} out of range for spectrum of {size} channels"),
        }
    }

    /// Overwrite every channel with the values of `other`.
    pub fn copy_from(&mut self, other: &impl ReadOnlySpectrum) -> Result<(), SpectrumError> {
        ensure_same_size(self.values.len(), other.size())?;
        self.values.copy_from_slice(other.values());
        Ok(())
    }

    pub fn add(&self, other: &impl ReadOnlySpectrum) -> Result<Spectrum, SpectrumError> {
        self.zip_with(other, |lhs, rhs| lhs + rhs)
    }

    pub fn subtract(&self, other: &impl ReadOnlySpectrum) -> Result<Spectrum, SpectrumError> {
        self.zip_with(other, |lhs, rhs| lhs - rhs)
    }

    /// Channelwise `max(self - other, minimum)`.
    pub fn subtract_floored(
        &self,
        other: &impl ReadOnlySpectrum,
        minimum: f32,
    ) -> Result<Spectrum, SpectrumError> {
        self.zip_with(other, |lhs, rhs| (lhs - rhs).max(minimum))
    }

    pub fn multiply(&self, other: &impl ReadOnlySpectrum) -> Result<Spectrum, SpectrumError> {
        self.zip_with(other, |lhs, rhs| lhs * rhs)
    }

    pub fn add_scalar(&self, value: f32) -> Spectrum {
        self.map(|channel| channel + value)
    }

    pub fn subtract_scalar(&self, value: f32) -> Spectrum {
        self.map(|channel| channel - value)
    }

    pub fn multiply_by(&self, factor: f32) -> Spectrum {
        self.map(|channel| channel * factor)
    }

    pub fn add_in_place(&mut self, other: &impl ReadOnlySpectrum) -> Result<(), SpectrumError> {
        ensure_same_size(self.values.len(), other.size())?;
        for (lhs, rhs) in self.values.iter_mut().zip(other.values()) {
            *lhs += *rhs;
        }
        Ok(())
    }

    pub fn subtract_in_place(
        &mut self,
        other: &impl ReadOnlySpectrum,
    ) -> Result<(), SpectrumError> {
        ensure_same_size(self.values.len(), other.size())?;
        for (lhs, rhs) in self.values.iter_mut().zip(other.values()) {
            *lhs -= *rhs;
        }
        Ok(())
    }

    pub fn multiply_in_place(&mut self, factor: f32) {
        for value in &mut self.values {
            *value *= factor;
        }
    }

    /// Channel `i` becomes `s[i] - s[i - 1]`; channel 0 is always `0.0`.
    pub fn derivative(&self) -> Spectrum {
        let mut result = Spectrum::new(self.values.len());
        for index in 1..self.values.len() {
            result.values[index] = self.values[index] - self.values[index - 1];
        }
        result
    }

    /// Scale so the largest channel becomes `1.0`.
    ///
    /// A spectrum whose maximum is not a positive finite number is returned unchanged.
    pub fn normalize(&self) -> Spectrum {
        let max = ReadOnlySpectrum::max(self);
        if !(max.is_finite() && max > 0.0) {
            return self.clone();
        }
        self.map(|channel| channel / max)
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> Spectrum {
        Spectrum {
            values: self.values.iter().map(|value| f(*value)).collect(),
        }
    }

    fn zip_with(
        &self,
        other: &impl ReadOnlySpectrum,
        f: impl Fn(f32, f32) -> f32,
    ) -> Result<Spectrum, SpectrumError> {
        ensure_same_size(self.values.len(), other.size())?;
        Ok(Spectrum {
            values: self
                .values
                .iter()
                .zip(other.values())
                .map(|(lhs, rhs)| f(*lhs, *rhs))
                .collect(),
        })
    }
}

impl ReadOnlySpectrum for Spectrum {
    fn values(&self) -> &[f32] {
        &self.values
    }
}

impl From<Vec<f32>> for Spectrum {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

impl From<&[f32]> for Spectrum {
    fn from(values: &[f32]) -> Self {
        Self {
            values: values.to_vec(),
        }
    }
}

impl FromIterator<f32> for Spectrum {
    fn from_iter<I: IntoIterator<Item = f32>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for Spectrum {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl IndexMut<usize> for Spectrum {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.values[index]
    }
}

impl<'a> IntoIterator for &'a Spectrum {
    type Item = &'a f32;
    type IntoIter = std::slice::Iter<'a, f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Borrowed, read-only window over channel data owned elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumView<'a> {
    values: &'a [f32],
}

impl<'a> SpectrumView<'a> {
    pub fn new(values: &'a [f32]) -> Self {
        Self { values }
    }
}

impl ReadOnlySpectrum for SpectrumView<'_> {
    fn values(&self) -> &[f32] {
        self.values
    }
}

fn ensure_same_size(expected: usize, actual: usize) -> Result<(), SpectrumError> {
    if expected != actual {
        return Err(SpectrumError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
