//! Elements, emission lines and the catalog of transition series.

pub mod element;
pub mod series;
pub mod table;
pub mod transition;

pub use element::Element;
pub use series::{
    SerializedTransitionSeries, TransitionSeries, TransitionSeriesMode, TransitionSeriesType,
};
pub use table::{PeakTable, PeakTableError};
pub use transition::{Transition, TransitionType};
