//! Background estimation for XRF spectra.
//!
//! Every function here is pure: it reads the input through [`ReadOnlySpectrum`] and returns a
//! freshly allocated background estimate of the same length. Scaling the estimate by a
//! percentage and subtracting it is left to the filters in [`crate::filter`].

use crate::spectrum::{ReadOnlySpectrum, Spectrum};
use std::f64::consts::SQRT_2;

const SNIP_SHRINK_PERIOD: usize = 8;

/// Brukner smoothing background.
///
/// The data is capped at `mean + 2 * (mean - min)`, then `repetitions` passes replace every
/// channel with the smaller of itself and the moving average over `±window` channels. The
/// average always divides by `2 * window + 1`, so channels near the edges are pulled down.
pub fn brukner(
    data: &(impl ReadOnlySpectrum + ?Sized),
    window: usize,
    repetitions: usize,
) -> Spectrum {
    if data.is_empty() {
        return Spectrum::new(0);
    }

    let mean = data.mean();
    let cutoff = mean + 2.0 * (mean - ReadOnlySpectrum::min(data));
    let mut current: Vec<f32> = data.values().iter().map(|value| value.min(cutoff)).collect();
    let mut scratch = vec![0.0; current.len()];

    for _ in 0..repetitions {
        brukner_pass(&current, &mut scratch, window);
        std::mem::swap(&mut current, &mut scratch);
    }

    Spectrum::from(current)
}

fn brukner_pass(source: &[f32], target: &mut [f32], window: usize) {
    let mut prefix = Vec::with_capacity(source.len() + 1);
    prefix.push(0.0f64);
    let mut running = 0.0f64;
    for value in source {
        running += f64::from(*value);
        prefix.push(running);
    }

    let divisor = (2 * window + 1) as f64;
    for (index, slot) in target.iter_mut().enumerate() {
        let start = index.saturating_sub(window);
        let stop = (index + window + 1).min(source.len());
        let average = ((prefix[stop] - prefix[start]) / divisor) as f32;
        *slot = average.min(source[index]);
    }
}

/// Linear trim background.
///
/// Each iteration slides a window of `line_size` channels across the spectrum. For every
/// window position a straight line joins the two end channels, and every channel inside the
/// window that lies above a non-negative line is lowered onto it.
pub fn linear_trim(
    data: &(impl ReadOnlySpectrum + ?Sized),
    line_size: usize,
    iterations: usize,
) -> Spectrum {
    let mut source = data.values().to_vec();
    let mut target = source.clone();

    for _ in 0..iterations {
        target.copy_from_slice(&source);
        linear_trim_iteration(&source, &mut target, line_size);
        std::mem::swap(&mut source, &mut target);
    }

    Spectrum::from(source)
}

/// One sweep of the linear trim window. Lines are drawn between channels of `scan` and
/// committed into `target`, which must start as a copy of `scan`.
pub fn linear_trim_iteration(scan: &[f32], target: &mut [f32], line_size: usize) {
    let len = scan.len();
    if len < 2 {
        return;
    }

    // The window starts hanging off the left edge and stops once its first channel reaches
    // the last channel.
    let span = line_size.max(1) - 1;
    for unbounded_last in 0..len - 1 + span {
        let first = unbounded_last.saturating_sub(span);
        let last = unbounded_last.min(len - 1);
        if last > first {
            commit_linear_segment(target, scan[first], scan[last], first, last);
        }
    }
}

fn commit_linear_segment(target: &mut [f32], start: f32, stop: f32, first: usize, last: usize) {
    let span = (last - first) as f32;
    let delta = stop - start;
    for (offset, value) in target[first..=last].iter_mut().enumerate() {
        let line = start + delta * (offset as f32 / span);
        if *value > line && line >= 0.0 {
            *value = line;
        }
    }
}

/// Square-root SNIP (peak stripping) background.
///
/// The data is compressed with a double square root (negative channels count as zero), then
/// each iteration replaces every channel with the mean of the channels `±window` away when
/// that mean is lower. The window starts at `half_window` and shrinks by `√2` after every
/// eighth iteration. The result is expanded back with a fourth power.
pub fn square_snip(
    data: &(impl ReadOnlySpectrum + ?Sized),
    half_window: usize,
    iterations: usize,
) -> Spectrum {
    let mut source: Vec<f32> = data
        .values()
        .iter()
        .map(|value| value.max(0.0).sqrt().sqrt())
        .collect();
    let mut target = source.clone();
    let mut window = half_window.max(1);

    for iteration in 0..iterations {
        if iteration > 0 && iteration % SNIP_SHRINK_PERIOD == 0 {
            window = ((window as f64 / SQRT_2) as usize).max(1);
        }
        snip_pass(&source, &mut target, window);
        std::mem::swap(&mut source, &mut target);
    }

    source
        .into_iter()
        .map(|value| {
            let squared = value * value;
            squared * squared
        })
        .collect()
}

fn snip_pass(source: &[f32], target: &mut [f32], window: usize) {
    let last = source.len().saturating_sub(1);
    for (index, slot) in target.iter_mut().enumerate() {
        let left = source[index.saturating_sub(window)];
        let right = source[(index + window).min(last)];
        *slot = ((left + right) / 2.0).min(source[index]);
    }
}

/// Background from the union of inverted parabolas `1 - |x|^power` (`x` in `[-1, 1)`)
/// spanning `width` channels and pushed up underneath the data.
pub fn calc_background_parabolic(
    data: &(impl ReadOnlySpectrum + ?Sized),
    width: usize,
    power: u32,
) -> Spectrum {
    remove_background_function_fit(data, &parabola(width, power))
}

fn parabola(width: usize, power: u32) -> Spectrum {
    let centre = width as f64 / 2.0;
    let raise = if power == 0 { 2.0 } else { 1.0 };
    let function = Spectrum::from_fn(width, |index| {
        let x = (index as f64 - centre) / centre;
        (raise - x.powi(power as i32).abs()) as f32
    });
    function.normalize()
}

/// Slide `function` across the data, scale it at every position to touch the data from
/// below, and keep the highest scaled value seen per channel.
///
/// Function samples that are not positive never constrain the scale.
pub fn remove_background_function_fit(
    data: &(impl ReadOnlySpectrum + ?Sized),
    function: &(impl ReadOnlySpectrum + ?Sized),
) -> Spectrum {
    let values = data.values();
    let shape = function.values();
    let mut result = Spectrum::new(values.len());
    if values.is_empty() || shape.is_empty() {
        return result;
    }

    // Position `offset` places function sample `j` over channel `offset + j - (width - 1)`.
    let width = shape.len();
    for offset in 0..values.len() + width - 1 {
        let overlap = |j: usize| {
            (offset + j)
                .checked_sub(width - 1)
                .filter(|channel| *channel < values.len())
        };

        let mut min_ratio = f32::INFINITY;
        for (j, sample) in shape.iter().enumerate() {
            if *sample <= 0.0 {
                continue;
            }
            if let Some(channel) = overlap(j) {
                let ratio = values[channel] / sample;
                if ratio < min_ratio {
                    min_ratio = ratio;
                }
            }
        }
        if !min_ratio.is_finite() {
            continue;
        }

        for (j, sample) in shape.iter().enumerate() {
            if let Some(channel) = overlap(j) {
                let value = sample * min_ratio;
                if result[channel] < value {
                    result[channel] = value;
                }
            }
        }
    }

    result
}
