use proptest::prelude::*;
use xrf_core::peaktable::{
    Element, PeakTable, SerializedTransitionSeries, TransitionSeries, TransitionSeriesMode,
    TransitionSeriesType,
};

fn catalog_series() -> Vec<TransitionSeries> {
    PeakTable::system().all().into_iter().cloned().collect()
}

#[test]
fn bundled_catalog_resolves_its_own_serialized_identities() {
    let table = PeakTable::system();
    assert!(!table.is_empty());

    for series in table.all() {
        let serialized = series
            .to_serializable()
            .expect("catalog entries are primary series");
        let json = serde_json::to_string(&serialized).expect("identity should serialize");
        let parsed: SerializedTransitionSeries =
            serde_json::from_str(&json).expect("identity should parse");
        assert_eq!(table.lookup(&parsed), Some(series));
        assert!(series.has_transitions(), "{series} has no lines");
    }
}

#[test]
fn catalog_listing_is_grouped_by_shell_then_atomic_number() {
    let listing = PeakTable::system().all();
    let keys: Vec<(u8, Element)> = listing
        .iter()
        .map(|series| (series.series_type().shell(), series.element()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let iron = PeakTable::system().series_for_element(Element::Fe);
    assert!(
        iron.iter()
            .any(|series| series.series_type() == TransitionSeriesType::K)
    );
}

#[test]
fn custom_catalog_overrides_bundled_lines_when_listed_first() {
    let custom = PeakTable::parse("Fe K Ka1:6.5:1.0\n").expect("valid catalog row");
    let merged = PeakTable::combined(&[custom, PeakTable::system().clone()]);
    let iron = merged
        .series(Element::Fe, TransitionSeriesType::K)
        .expect("iron K present");
    assert_eq!(iron.transition_count(), 1);
    assert!(merged.series(Element::Ca, TransitionSeriesType::K).is_some());
}

proptest! {
    #[test]
    fn summation_is_commutative_for_catalog_pairs(
        first in 0usize..64,
        second in 0usize..64,
    ) {
        let series = catalog_series();
        let lhs = &series[first % series.len()];
        let rhs = &series[second % series.len()];

        let forward = lhs.summation(rhs);
        let backward = rhs.summation(lhs);
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.transition_count(), lhs.transition_count() * rhs.transition_count());

        let expected_mode = if lhs == rhs {
            TransitionSeriesMode::Pileup
        } else {
            TransitionSeriesMode::Summation
        };
        prop_assert_eq!(forward.mode(), expected_mode);
    }

    #[test]
    fn repeated_series_sum_to_an_n_fold_pileup(
        pick in 0usize..64,
        count in 2usize..5,
    ) {
        let series = catalog_series();
        let base = &series[pick % series.len()];
        let repeated = vec![base.clone(); count];

        let pileup = TransitionSeries::summation_of(&repeated).expect("non-empty list");
        prop_assert_eq!(pileup.mode(), TransitionSeriesMode::Pileup);
        prop_assert_eq!(pileup.pileup_count(), count);
        prop_assert_eq!(pileup.element(), base.element());
        prop_assert_eq!(pileup.base_type(), base.series_type());
    }
}
