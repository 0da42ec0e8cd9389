use xrf_core::concentration::Concentrations;
use xrf_core::filter::{FilterConfig, FilterSet};
use xrf_core::fitting::{
    DetectorResolution, EscapePeakType, FittingSet, ResidualPolicy, TransitionSeriesFitting,
};
use xrf_core::mapping::fit_map;
use xrf_core::peaktable::{
    Element, PeakTable, Transition, TransitionSeries, TransitionSeriesType, TransitionType,
};
use xrf_core::spectrum::{ReadOnlySpectrum, Spectrum};

const WIDTH: usize = 1024;
const ENERGY_PER_CHANNEL: f32 = 0.01;

fn catalog(element: Element) -> TransitionSeries {
    PeakTable::system()
        .series(element, TransitionSeriesType::K)
        .cloned()
        .expect("K series should be in the bundled catalog")
}

fn rendered(series: &TransitionSeries, scale: f32) -> Spectrum {
    TransitionSeriesFitting::new(
        series,
        WIDTH,
        ENERGY_PER_CHANNEL,
        EscapePeakType::None,
        &DetectorResolution::default(),
    )
    .scale_fit_to_data(scale)
}

fn iron_calcium_spectrum(iron: f32, calcium: f32, baseline: f32) -> Spectrum {
    rendered(&catalog(Element::Fe), iron)
        .add(&rendered(&catalog(Element::Ca), calcium))
        .expect("curves share the width")
        .add_scalar(baseline)
}

#[test]
fn greedy_fit_recovers_catalog_series_scales() {
    let fe = catalog(Element::Fe);
    let ca = catalog(Element::Ca);
    let set = FittingSet::new(ENERGY_PER_CHANNEL, EscapePeakType::None);
    assert!(set.add_transition_series(fe.clone()));
    assert!(set.add_transition_series(ca.clone()));

    let data = iron_calcium_spectrum(500.0, 200.0, 0.0);
    let results = set.calculate_fittings(&data);

    let fe_fit = results.fit_for(&fe).expect("iron fitted");
    let ca_fit = results.fit_for(&ca).expect("calcium fitted");
    assert!((fe_fit.scale - 500.0).abs() < 1.0, "iron scale {}", fe_fit.scale);
    assert!((ca_fit.scale - 200.0).abs() < 1.0, "calcium scale {}", ca_fit.scale);
    assert!(results.residual().max() < 2.0);
    assert!((results.total_fit().sum() - data.sum()).abs() < 1.0e-2 * data.sum());

    let concentrations = Concentrations::calculate(&set.fitted_transition_series(), |series| {
        results.fit_for(series).map_or(0.0, |fit| fit.area())
    });
    assert_eq!(
        concentrations.elements_by_concentration(),
        vec![Element::Fe, Element::Ca]
    );
    let total = concentrations.ppm(Element::Fe) + concentrations.ppm(Element::Ca);
    assert!((total - 1.0e6).abs() < 10.0);
}

#[test]
fn background_filter_then_fit_keeps_scales_under_the_data() {
    let fe = catalog(Element::Fe);
    let ca = catalog(Element::Ca);
    let set = FittingSet::new(ENERGY_PER_CHANNEL, EscapePeakType::None);
    set.add_transition_series(fe.clone());
    set.add_transition_series(ca.clone());

    let filters = FilterSet::from_configs(&[FilterConfig::Brukner {
        width: 30,
        iterations: 4,
        percent: 100,
    }])
    .expect("valid brukner parameters");

    let data = iron_calcium_spectrum(500.0, 200.0, 20.0);
    let filtered = filters.apply(&data);
    assert_eq!(filtered.size(), WIDTH);
    assert!(filtered.values().iter().all(|value| *value >= 0.0));
    assert!(filtered.get(250) < 1.0, "flat baseline should be removed");

    let results = set.calculate_fittings(&filtered);
    let fe_scale = results.fit_for(&fe).map(|fit| fit.scale).unwrap_or_default();
    let ca_scale = results.fit_for(&ca).map(|fit| fit.scale).unwrap_or_default();
    assert!((375.0..=500.5).contains(&fe_scale), "iron scale {fe_scale}");
    assert!((120.0..=200.5).contains(&ca_scale), "calcium scale {ca_scale}");
}

#[test]
fn reordering_decides_who_claims_overlapping_signal() {
    let fe = catalog(Element::Fe);
    let overlapping = TransitionSeries::primary(
        Element::Mn,
        TransitionSeriesType::K,
        vec![Transition::new(6.4038, 1.0, TransitionType::Ka1)],
    );
    let set = FittingSet::new(ENERGY_PER_CHANNEL, EscapePeakType::None);
    set.set_residual_policy(ResidualPolicy::Unclamped);
    set.add_transition_series(fe.clone());
    set.add_transition_series(overlapping.clone());

    let data = rendered(&fe, 300.0);
    let first = set.calculate_fittings(&data);
    assert!(first.fit_for(&fe).is_some_and(|fit| fit.scale > 299.0));
    assert!(first.fit_for(&overlapping).is_some_and(|fit| fit.scale < 1.0));

    assert!(set.move_up(&overlapping));
    assert_eq!(
        set.fitted_transition_series(),
        vec![overlapping.clone(), fe.clone()]
    );
    let second = set.calculate_fittings(&data);
    assert_eq!(second.fits()[0].series, overlapping);
    assert!(second.fits()[0].scale > 100.0);
    assert!(second.fit_for(&fe).is_some_and(|fit| fit.scale < 299.0));
}

#[test]
fn batch_map_matches_single_spectrum_fits() {
    let fe = catalog(Element::Fe);
    let ca = catalog(Element::Ca);
    let set = FittingSet::new(ENERGY_PER_CHANNEL, EscapePeakType::None);
    set.add_transition_series(fe.clone());
    set.add_transition_series(ca.clone());

    let spectra: Vec<Spectrum> = (0..8)
        .map(|pixel| iron_calcium_spectrum(100.0 + 50.0 * pixel as f32, 80.0, 0.0))
        .collect();
    let maps = fit_map(&set, &spectra).expect("uniform widths");

    let fe_map = maps.series_map(&fe).expect("iron map");
    for (spectrum, area) in spectra.iter().zip(fe_map) {
        let single = set.calculate_fittings(spectrum);
        let expected = single.fit_for(&fe).map_or(0.0, |fit| fit.area());
        assert!((area - expected).abs() <= 1.0e-3 * expected.max(1.0));
    }
    assert!(fe_map.windows(2).all(|pair| pair[1] > pair[0]));
}
