use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Siegbahn label of a characteristic line. `Composite` marks synthetic lines produced by
/// pile-up and summation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitionType {
    Ka1,
    Ka2,
    Kb1,
    Kb2,
    La1,
    La2,
    Lb1,
    Lb2,
    Lg1,
    Ma1,
    Mb,
    Mg,
    Composite,
}

const TRANSITION_LABELS: [(TransitionType, &str); 13] = [
    (TransitionType::Ka1, "Ka1"),
    (TransitionType::Ka2, "Ka2"),
    (TransitionType::Kb1, "Kb1"),
    (TransitionType::Kb2, "Kb2"),
    (TransitionType::La1, "La1"),
    (TransitionType::La2, "La2"),
    (TransitionType::Lb1, "Lb1"),
    (TransitionType::Lb2, "Lb2"),
    (TransitionType::Lg1, "Lg1"),
    (TransitionType::Ma1, "Ma1"),
    (TransitionType::Mb, "Mb"),
    (TransitionType::Mg, "Mg"),
    (TransitionType::Composite, "Composite"),
];

impl TransitionType {
    pub fn label(self) -> &'static str {
        TRANSITION_LABELS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, label)| *label)
            .unwrap_or("Composite")
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        TRANSITION_LABELS
            .iter()
            .find(|(_, candidate)| candidate.eq_ignore_ascii_case(label))
            .map(|(kind, _)| *kind)
    }
}

impl Display for TransitionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One emission line: energy in keV and intensity relative to the strongest line of its
/// series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub energy: f64,
    pub relative_intensity: f64,
    pub kind: TransitionType,
}

impl Transition {
    pub fn new(energy: f64, relative_intensity: f64, kind: TransitionType) -> Self {
        Self {
            energy,
            relative_intensity,
            kind,
        }
    }

    /// Two photons detected as one: energies add, probabilities multiply.
    pub fn summation(&self, other: &Transition) -> Transition {
        Transition {
            energy: self.energy + other.energy,
            relative_intensity: self.relative_intensity * other.relative_intensity,
            kind: TransitionType::Composite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Transition, TransitionType};

    #[test]
    fn labels_round_trip() {
        for label in ["Ka1", "kb1", "LA1", "Mb", "Composite"] {
            let kind = TransitionType::from_label(label).expect("known label");
            assert!(kind.label().eq_ignore_ascii_case(label));
        }
        assert_eq!(TransitionType::from_label("Kz9"), None);
    }

    #[test]
    fn summation_adds_energy_and_multiplies_intensity() {
        let ka = Transition::new(6.4, 1.0, TransitionType::Ka1);
        let kb = Transition::new(7.06, 0.17, TransitionType::Kb1);
        let summed = ka.summation(&kb);
        assert!((summed.energy - 13.46).abs() < 1.0e-12);
        assert!((summed.relative_intensity - 0.17).abs() < 1.0e-12);
        assert_eq!(summed.kind, TransitionType::Composite);
    }
}
