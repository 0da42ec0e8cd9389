//! Catalog of primary transition series keyed by element and shell.
//!
//! The reference lines ship with the crate (`data/transitions.tsv`). [`PeakTable::system`]
//! parses them once per process; callers that need a different catalog build their own
//! table with [`PeakTable::parse`] and pass it explicitly.

use super::element::Element;
use super::series::{SerializedTransitionSeries, TransitionSeries, TransitionSeriesType};
use super::transition::{Transition, TransitionType};
use std::collections::BTreeMap;
use std::sync::OnceLock;

const EMBEDDED_TRANSITIONS: &str = include_str!("../../data/transitions.tsv");

static SYSTEM_TABLE: OnceLock<PeakTable> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeakTableError {
    #[error("peak table line {line}: expected '<element> <series> <kind:energy:intensity>...'")]
    MalformedRow { line: usize },
    #[error("peak table line {line}: unknown element symbol '{symbol}'")]
    UnknownElement { line: usize, symbol: String },
    #[error("peak table line {line}: unknown series type '{name}'")]
    UnknownSeriesType { line: usize, name: String },
    #[error("peak table line {line}: unknown transition type '{label}'")]
    UnknownTransitionType { line: usize, label: String },
    #[error("peak table line {line}: malformed transition entry '{entry}'")]
    MalformedTransition { line: usize, entry: String },
}

#[derive(Debug, Clone, Default)]
pub struct PeakTable {
    series: BTreeMap<(Element, TransitionSeriesType), TransitionSeries>,
}

impl PeakTable {
    /// Process-wide catalog built from the embedded reference data on first use.
    ///
    /// The embedded data is validated by the test suite; should it ever fail to parse, the
    /// error is logged and an empty catalog is returned so lookups report absence.
    pub fn system() -> &'static PeakTable {
        SYSTEM_TABLE.get_or_init(|| match Self::parse(EMBEDDED_TRANSITIONS) {
            Ok(table) => {
                tracing::debug!(series = table.len(), "loaded embedded peak table");
                table
            }
            Err(error) => {
                tracing::error!(%error, "embedded peak table failed to parse");
                PeakTable::default()
            }
        })
    }

    /// Parse tab or space separated rows: `<element> <series> <kind:energy:intensity>...`.
    ///
    /// Blank lines and lines starting with `#` are ignored. Rows repeating an
    /// element/series pair extend the earlier row. Intensities are rescaled so the strongest
    /// line of every series is `1.0`.
    pub fn parse(source: &str) -> Result<Self, PeakTableError> {
        let mut rows: BTreeMap<(Element, TransitionSeriesType), Vec<Transition>> =
            BTreeMap::new();

        for (index, raw_line) in source.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let (Some(symbol), Some(series_name)) = (fields.next(), fields.next()) else {
                return Err(PeakTableError::MalformedRow { line });
            };
            let element =
                Element::from_symbol(symbol).ok_or_else(|| PeakTableError::UnknownElement {
                    line,
                    symbol: symbol.to_string(),
                })?;
            let series_type = TransitionSeriesType::from_name(series_name)
                .filter(|series_type| *series_type != TransitionSeriesType::Composite)
                .ok_or_else(|| PeakTableError::UnknownSeriesType {
                    line,
                    name: series_name.to_string(),
                })?;

            let transitions = fields
                .map(|entry| parse_transition(line, entry))
                .collect::<Result<Vec<_>, _>>()?;
            if transitions.is_empty() {
                return Err(PeakTableError::MalformedRow { line });
            }

            rows.entry((element, series_type))
                .or_default()
                .extend(transitions);
        }

        let series = rows
            .into_iter()
            .map(|((element, series_type), transitions)| {
                let series =
                    TransitionSeries::primary(element, series_type, normalize(transitions));
                ((element, series_type), series)
            })
            .collect();

        Ok(Self { series })
    }

    /// Merge several tables; the first table providing a series wins.
    pub fn combined(tables: &[PeakTable]) -> Self {
        let mut series = BTreeMap::new();
        for table in tables {
            for (key, value) in &table.series {
                series.entry(*key).or_insert_with(|| value.clone());
            }
        }
        Self { series }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Absent entries are `None`: callers routinely probe for shells an element lacks.
    pub fn series(
        &self,
        element: Element,
        series_type: TransitionSeriesType,
    ) -> Option<&TransitionSeries> {
        self.series.get(&(element, series_type))
    }

    pub fn lookup(&self, serialized: &SerializedTransitionSeries) -> Option<&TransitionSeries> {
        self.series(serialized.element, serialized.series_type)
    }

    pub fn series_for_element(&self, element: Element) -> Vec<&TransitionSeries> {
        self.series
            .range((element, TransitionSeriesType::K)..=(element, TransitionSeriesType::Composite))
            .map(|(_, series)| series)
            .collect()
    }

    /// All series, K shell first, then by atomic number.
    pub fn all(&self) -> Vec<&TransitionSeries> {
        let mut all: Vec<&TransitionSeries> = self.series.values().collect();
        all.sort_by_key(|series| (series.series_type().shell(), series.element()));
        all
    }
}

fn parse_transition(line: usize, entry: &str) -> Result<Transition, PeakTableError> {
    let malformed = || PeakTableError::MalformedTransition {
        line,
        entry: entry.to_string(),
    };

    let mut parts = entry.split(':');
    let (Some(label), Some(energy), Some(intensity), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    let kind = TransitionType::from_label(label)
        .filter(|kind| *kind != TransitionType::Composite)
        .ok_or_else(|| PeakTableError::UnknownTransitionType {
            line,
            label: label.to_string(),
        })?;
    let energy: f64 = energy.parse().map_err(|_| malformed())?;
    let intensity: f64 = intensity.parse().map_err(|_| malformed())?;
    if !(energy.is_finite() && energy > 0.0 && intensity.is_finite() && intensity >= 0.0) {
        return Err(malformed());
    }

    Ok(Transition::new(energy, intensity, kind))
}

fn normalize(mut transitions: Vec<Transition>) -> Vec<Transition> {
    let strongest = transitions
        .iter()
        .map(|transition| transition.relative_intensity)
        .fold(0.0, f64::max);
    if strongest > 0.0 {
        for transition in &mut transitions {
            transition.relative_intensity /= strongest;
        }
    }
    transitions
}
