use serde::{Deserialize, Serialize};

/// `2 * sqrt(2 * ln 2)`: converts a Gaussian standard deviation into its FWHM.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045;

/// Detector material whose Kα photons can escape, leaving a peak at a lower energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapePeakType {
    #[default]
    None,
    Silicon,
    Germanium,
}

impl EscapePeakType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "silicon" | "si" => Some(Self::Silicon),
            "germanium" | "ge" => Some(Self::Germanium),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Silicon => "silicon",
            Self::Germanium => "germanium",
        }
    }

    pub fn has_escape(self) -> bool {
        self != Self::None
    }

    /// Escaping detector lines as `(energy keV, share of escape intensity)`.
    pub fn escape_lines(self) -> &'static [(f64, f64)] {
        match self {
            Self::None => &[],
            Self::Silicon => &[(1.740, 1.0)],
            Self::Germanium => &[(9.886, 0.867), (10.982, 0.133)],
        }
    }

    /// Only lines above the detector's K absorption edge produce escape peaks.
    pub fn absorption_edge(self) -> Option<f64> {
        match self {
            Self::None => None,
            Self::Silicon => Some(1.839),
            Self::Germanium => Some(11.103),
        }
    }

    /// Escape peak intensity relative to the parent line.
    pub fn intensity_factor(self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Silicon => 0.01,
            Self::Germanium => 0.08,
        }
    }

    /// Escape peaks `(energy, relative intensity)` caused by a line of `energy` keV.
    pub fn escape_peaks(self, energy: f64, intensity: f64) -> Vec<(f64, f64)> {
        let Some(edge) = self.absorption_edge() else {
            return Vec::new();
        };
        if energy <= edge {
            return Vec::new();
        }
        self.escape_lines()
            .iter()
            .map(|(escape, share)| (energy - escape, intensity * self.intensity_factor() * share))
            .filter(|(escaped, _)| *escaped > 0.0)
            .collect()
    }
}

/// Energy-dependent peak width of a semiconductor detector.
///
/// `FWHM(E) = sqrt(noise^2 + FWHM_PER_SIGMA^2 * fano * pair_energy * E)`, all energies in keV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorResolution {
    pub noise: f64,
    pub fano: f64,
    pub pair_energy: f64,
}

impl Default for DetectorResolution {
    fn default() -> Self {
        Self {
            noise: 0.100,
            fano: 0.114,
            pair_energy: 0.00385,
        }
    }
}

impl DetectorResolution {
    pub fn fwhm(&self, energy: f64) -> f64 {
        let statistical = FWHM_PER_SIGMA * FWHM_PER_SIGMA * self.fano * self.pair_energy;
        (self.noise * self.noise + statistical * energy.max(0.0)).sqrt()
    }

    pub fn sigma(&self, energy: f64) -> f64 {
        self.fwhm(energy) / FWHM_PER_SIGMA
    }

    pub fn is_valid(&self) -> bool {
        [self.noise, self.fano, self.pair_energy]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0)
            && self.fwhm(0.0) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{DetectorResolution, EscapePeakType};

    #[test]
    fn escape_peaks_only_above_the_edge() {
        assert!(EscapePeakType::Silicon.escape_peaks(1.7, 1.0).is_empty());
        let peaks = EscapePeakType::Silicon.escape_peaks(6.4, 1.0);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].0 - 4.66).abs() < 1.0e-9);
        assert!((peaks[0].1 - 0.01).abs() < 1.0e-12);

        assert!(EscapePeakType::Germanium.escape_peaks(10.0, 1.0).is_empty());
        assert_eq!(EscapePeakType::Germanium.escape_peaks(17.4, 1.0).len(), 2);
        assert!(EscapePeakType::None.escape_peaks(17.4, 1.0).is_empty());
    }

    #[test]
    fn escape_type_names_round_trip() {
        for escape in [
            EscapePeakType::None,
            EscapePeakType::Silicon,
            EscapePeakType::Germanium,
        ] {
            assert_eq!(EscapePeakType::from_name(escape.as_str()), Some(escape));
            let json = serde_json::to_string(&escape).unwrap();
            assert_eq!(json, format!("\"{}\"", escape.as_str()));
        }
        assert_eq!(EscapePeakType::from_name("Ge"), Some(EscapePeakType::Germanium));
    }

    #[test]
    fn resolution_widens_with_energy() {
        let resolution = DetectorResolution::default();
        assert!((resolution.fwhm(0.0) - 0.1).abs() < 1.0e-12);
        let fe = resolution.fwhm(6.4);
        assert!(fe > 0.15 && fe < 0.17, "fwhm at Fe Ka: {fe}");
        assert!(resolution.fwhm(20.0) > fe);
        assert!(resolution.is_valid());
    }
}
