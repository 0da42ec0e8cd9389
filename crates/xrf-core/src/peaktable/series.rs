//! Transition series: the lines of one element shell, or a composite of several series
//! detected simultaneously.
//!
//! Series are immutable once built. Composite series hold shared, already-built components
//! behind `Arc`, kept sorted so that structural equality, hashing and ordering never depend
//! on the order in which the components were combined.

use super::element::Element;
use super::transition::{Transition, TransitionType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitionSeriesType {
    K,
    L,
    M,
    #[serde(rename = "COMPOSITE")]
    Composite,
}

impl TransitionSeriesType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::K => "K",
            Self::L => "L",
            Self::M => "M",
            Self::Composite => "COMPOSITE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "K" => Some(Self::K),
            "L" => Some(Self::L),
            "M" => Some(Self::M),
            "COMPOSITE" => Some(Self::Composite),
            _ => None,
        }
    }

    /// Principal quantum number of the shell; `0` for composites.
    pub const fn shell(self) -> u8 {
        match self {
            Self::K => 1,
            Self::L => 2,
            Self::M => 3,
            Self::Composite => 0,
        }
    }
}

impl Display for TransitionSeriesType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitionSeriesMode {
    Primary,
    Pileup,
    Summation,
}

/// Minimal persisted identity of a primary series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedTransitionSeries {
    pub element: Element,
    pub series_type: TransitionSeriesType,
}

#[derive(Debug, Clone)]
pub struct TransitionSeries {
    element: Element,
    series_type: TransitionSeriesType,
    mode: TransitionSeriesMode,
    transitions: Vec<Transition>,
    components: Vec<Arc<TransitionSeries>>,
}

impl TransitionSeries {
    pub fn primary(
        element: Element,
        series_type: TransitionSeriesType,
        transitions: Vec<Transition>,
    ) -> Self {
        Self {
            element,
            series_type,
            mode: TransitionSeriesMode::Primary,
            transitions,
            components: Vec::new(),
        }
    }

    pub fn element(&self) -> Element {
        self.element
    }

    pub fn series_type(&self) -> TransitionSeriesType {
        self.series_type
    }

    pub fn mode(&self) -> TransitionSeriesMode {
        self.mode
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Sorted component series; empty for primary series.
    pub fn components(&self) -> &[Arc<TransitionSeries>] {
        &self.components
    }

    pub fn is_composite(&self) -> bool {
        self.series_type == TransitionSeriesType::Composite
    }

    pub fn transition(&self, kind: TransitionType) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|transition| transition.kind == kind)
    }

    pub fn has_transitions(&self) -> bool {
        !self.transitions.is_empty()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Most intense line; the first one wins ties.
    pub fn strongest_transition(&self) -> Option<&Transition> {
        self.transitions.iter().fold(None, |best, transition| match best {
            Some(current) if current.relative_intensity >= transition.relative_intensity => {
                Some(current)
            }
            _ => Some(transition),
        })
    }

    pub fn lowest_energy(&self) -> Option<f64> {
        self.transitions
            .iter()
            .map(|transition| transition.energy)
            .reduce(f64::min)
    }

    /// Signed distance (`line - energy`) of the line closest to `energy`.
    pub fn proximity_to_energy(&self, energy: f64) -> Option<f64> {
        self.transitions
            .iter()
            .map(|transition| transition.energy - energy)
            .reduce(|nearest, current| {
                if current.abs() < nearest.abs() {
                    current
                } else {
                    nearest
                }
            })
    }

    /// Lower is closer: `1 / sum(intensity / max(|line - energy|, min_distance))`.
    ///
    /// A series without lines scores `f64::INFINITY`.
    pub fn proximity_score(&self, energy: f64, min_distance: Option<f64>) -> f64 {
        let min_distance = min_distance.unwrap_or(0.0);
        let total: f64 = self
            .transitions
            .iter()
            .map(|transition| {
                transition.relative_intensity
                    / (transition.energy - energy).abs().max(min_distance)
            })
            .sum();
        1.0 / total
    }

    /// Number of times the base series is counted.
    ///
    /// Primary series count once, pile-ups add up their components, and summations of
    /// distinct series report `0`.
    pub fn pileup_count(&self) -> usize {
        match self.mode {
            TransitionSeriesMode::Primary => 1,
            TransitionSeriesMode::Pileup => self
                .components
                .iter()
                .map(|component| component.pileup_count())
                .sum(),
            TransitionSeriesMode::Summation => 0,
        }
    }

    /// Shell type of the series being piled up; the own type otherwise.
    pub fn base_type(&self) -> TransitionSeriesType {
        match (self.mode, self.components.first()) {
            (TransitionSeriesMode::Pileup, Some(first)) => first.base_type(),
            _ => self.series_type,
        }
    }

    /// Every primary series this series is built from, with repetition.
    pub fn base_transition_series(&self) -> Vec<TransitionSeries> {
        if !self.is_composite() {
            return vec![self.clone()];
        }
        self.components
            .iter()
            .flat_map(|component| component.base_transition_series())
            .collect()
    }

    /// Persistable identity; composites have none and must be rebuilt from primaries.
    pub fn to_serializable(&self) -> Option<SerializedTransitionSeries> {
        if self.is_composite() {
            return None;
        }
        Some(SerializedTransitionSeries {
            element: self.element,
            series_type: self.series_type,
        })
    }

    pub fn description(&self) -> String {
        match self.mode {
            TransitionSeriesMode::Pileup => {
                let count = self.pileup_count();
                let suffix = if count > 2 {
                    format!(" x{count}")
                } else {
                    String::new()
                };
                let base_element = self
                    .components
                    .first()
                    .map_or(self.element, |first| first.element);
                format!("{} {} Pile-Up{}", base_element, self.base_type(), suffix)
            }
            TransitionSeriesMode::Summation => self
                .components
                .iter()
                .map(|component| component.description())
                .collect::<Vec<_>>()
                .join(" + "),
            TransitionSeriesMode::Primary => format!("{} {}", self.element, self.series_type),
        }
    }

    /// Series modelling `self` and `other` being detected at the same time.
    ///
    /// Lines are the cross product of both line lists and the element is taken from the
    /// first sorted component. The result is a pile-up when both operands are equal, or
    /// when either operand is already a pile-up of the other's element; every other
    /// combination is a summation.
    pub fn summation(&self, other: &TransitionSeries) -> TransitionSeries {
        let is_pileup = self == other
            || (self.mode == TransitionSeriesMode::Pileup && self.element == other.element)
            || (other.mode == TransitionSeriesMode::Pileup && other.element == self.element);
        let mode = if is_pileup {
            TransitionSeriesMode::Pileup
        } else {
            TransitionSeriesMode::Summation
        };

        let transitions = self
            .transitions
            .iter()
            .flat_map(|lhs| other.transitions.iter().map(move |rhs| lhs.summation(rhs)))
            .collect();

        let mut components = vec![Arc::new(self.clone()), Arc::new(other.clone())];
        components.sort();
        let element = components
            .first()
            .map_or(self.element, |first| first.element);

        TransitionSeries {
            element,
            series_type: TransitionSeriesType::Composite,
            mode,
            transitions,
            components,
        }
    }

    /// Combine a list of series into one composite.
    ///
    /// Equal series are grouped (first-occurrence order) and folded into pile-ups, then
    /// the group results are folded left to right. Returns `None` for an empty list.
    pub fn summation_of(series: &[TransitionSeries]) -> Option<TransitionSeries> {
        match series {
            [] => return None,
            [single] => return Some(single.clone()),
            _ => {}
        }

        let mut groups: Vec<Vec<&TransitionSeries>> = Vec::new();
        for candidate in series {
            match groups.iter_mut().find(|group| group[0] == candidate) {
                Some(group) => group.push(candidate),
                None => groups.push(vec![candidate]),
            }
        }

        groups
            .into_iter()
            .filter_map(|group| fold_summation(group.into_iter()))
            .reduce(|lhs, rhs| lhs.summation(&rhs))
    }
}

fn fold_summation<'a>(
    mut series: impl Iterator<Item = &'a TransitionSeries>,
) -> Option<TransitionSeries> {
    let first = series.next()?.clone();
    Some(series.fold(first, |acc, next| acc.summation(next)))
}

fn compare_components(lhs: &[Arc<TransitionSeries>], rhs: &[Arc<TransitionSeries>]) -> Ordering {
    lhs.iter()
        .zip(rhs)
        .map(|(left, right)| left.as_ref().cmp(right.as_ref()))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or_else(|| lhs.len().cmp(&rhs.len()))
}

impl Ord for TransitionSeries {
    /// Primary and pile-up series come first, heaviest element first and then the outer
    /// shell first. Summations follow, ordered by their sorted component lists.
    fn cmp(&self, other: &Self) -> Ordering {
        let self_summation = self.mode == TransitionSeriesMode::Summation;
        let other_summation = other.mode == TransitionSeriesMode::Summation;
        match (self_summation, other_summation) {
            (false, false) => other
                .element
                .cmp(&self.element)
                .then_with(|| other.series_type.cmp(&self.series_type))
                .then_with(|| self.mode.cmp(&other.mode))
                .then_with(|| compare_components(&self.components, &other.components)),
            (true, true) => compare_components(&self.components, &other.components),
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
        }
    }
}

impl PartialOrd for TransitionSeries {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TransitionSeries {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TransitionSeries {}

impl Hash for TransitionSeries {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mode.hash(state);
        if self.mode != TransitionSeriesMode::Summation {
            self.element.hash(state);
            self.series_type.hash(state);
        }
        self.components.len().hash(state);
        for component in &self.components {
            component.as_ref().hash(state);
        }
    }
}

impl Display for TransitionSeries {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}
