use super::CliError;
use super::helpers::{emit_json, read_spectra, write_spectra};
use serde::Serialize;
use std::path::PathBuf;
use xrf_core::concentration::Concentrations;
use xrf_core::config::{FittingConfig, load_fitting_config};
use xrf_core::domain::XrfError;
use xrf_core::fitting::EscapePeakType;
use xrf_core::mapping::{MapFitResults, fit_map};
use xrf_core::peaktable::{
    Element, PeakTable, TransitionSeries, TransitionSeriesMode, TransitionSeriesType,
};

#[derive(clap::Args)]
pub(super) struct FitArgs {
    /// Fitting session config (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Spectra file, one spectrum per line
    #[arg(long)]
    spectra: PathBuf,

    /// JSON report output path; the report goes to stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fit the spectra as read, skipping the configured filters
    #[arg(long)]
    raw: bool,
}

#[derive(clap::Args)]
pub(super) struct FilterArgs {
    /// Fitting session config (JSON); only its filters are used
    #[arg(long)]
    config: PathBuf,

    /// Spectra file, one spectrum per line
    #[arg(long)]
    spectra: PathBuf,

    /// Filtered spectra output path
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct CatalogArgs {
    /// Only list series of this element symbol
    #[arg(long)]
    element: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FitReport {
    energy_per_channel: f32,
    escape: EscapePeakType,
    channels: usize,
    spectra: usize,
    series: Vec<SeriesReport>,
    residual_areas: Vec<f32>,
    concentrations: Vec<ConcentrationReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesReport {
    description: String,
    element: Element,
    series_type: TransitionSeriesType,
    mode: TransitionSeriesMode,
    scales: Vec<f32>,
    areas: Vec<f32>,
    total_area: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConcentrationReport {
    element: Element,
    series: String,
    ppm: f32,
    percent: String,
}

pub(super) fn run_fit_command(args: FitArgs) -> Result<i32, CliError> {
    let config = load_fitting_config(&args.config)?;
    let set = config.build_fitting_set(PeakTable::system())?;
    let filters = config.filter_set()?;
    let spectra = read_spectra(&args.spectra)?;

    tracing::debug!(
        spectra = spectra.len(),
        filters = ?filters.names(),
        raw = args.raw,
        "loaded fitting inputs"
    );
    let prepared = if args.raw {
        spectra
    } else {
        filters.apply_all(&spectra)
    };
    let maps = fit_map(&set, &prepared)?;
    let report = fit_report(&config, &maps, set.data_width());
    emit_json(args.output.as_deref(), &report)?;

    if let Some(output) = &args.output {
        println!(
            "Fitted {} spectra with {} series; report written to {}",
            report.spectra,
            report.series.len(),
            output.display()
        );
    }
    Ok(0)
}

pub(super) fn run_filter_command(args: FilterArgs) -> Result<i32, CliError> {
    let config = load_fitting_config(&args.config)?;
    let filters = config.filter_set()?;
    let spectra = read_spectra(&args.spectra)?;

    let filtered = filters.apply_all(&spectra);
    write_spectra(&args.output, &filtered)?;
    println!(
        "Filtered {} spectra through [{}]; written to {}",
        filtered.len(),
        filters.names().join(", "),
        args.output.display()
    );
    Ok(0)
}

pub(super) fn run_catalog_command(args: CatalogArgs) -> Result<i32, CliError> {
    let table = PeakTable::system();
    let listing = match args.element.as_deref() {
        Some(symbol) => {
            let element = Element::from_symbol(symbol).ok_or_else(|| {
                XrfError::input_validation(
                    "INPUT.ELEMENT",
                    format!("unknown element symbol '{symbol}'"),
                )
            })?;
            table.series_for_element(element)
        }
        None => table.all(),
    };

    for series in listing {
        println!("{}", catalog_line(series));
    }
    Ok(0)
}

fn catalog_line(series: &TransitionSeries) -> String {
    let lines = series
        .transitions()
        .iter()
        .map(|transition| {
            format!(
                "{} {:.4} keV ({:.2})",
                transition.kind, transition.energy, transition.relative_intensity
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}: {}", series.description(), lines)
}

fn fit_report(config: &FittingConfig, maps: &MapFitResults, channels: usize) -> FitReport {
    let series = maps
        .series()
        .iter()
        .map(|series| SeriesReport {
            description: series.description(),
            element: series.element(),
            series_type: series.series_type(),
            mode: series.mode(),
            scales: maps.series_scales(series).unwrap_or_default().to_vec(),
            areas: maps.series_map(series).unwrap_or_default().to_vec(),
            total_area: maps.total_intensity(series),
        })
        .collect();

    let shares = Concentrations::calculate(maps.series(), |series| maps.total_intensity(series));
    let concentrations = shares
        .elements_by_concentration()
        .into_iter()
        .map(|element| ConcentrationReport {
            element,
            series: shares
                .source(element)
                .map(TransitionSeries::description)
                .unwrap_or_default(),
            ppm: shares.ppm(element),
            percent: shares.percent_formatted(element),
        })
        .collect();

    FitReport {
        energy_per_channel: config.energy_per_channel,
        escape: config.escape,
        channels,
        spectra: maps.pixel_count(),
        series,
        residual_areas: maps.residual_map().to_vec(),
        concentrations,
    }
}
