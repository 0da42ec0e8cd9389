use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use xrf_core::fitting::{DetectorResolution, EscapePeakType, TransitionSeriesFitting};
use xrf_core::peaktable::{Element, PeakTable, TransitionSeriesType};
use xrf_core::spectrum::ReadOnlySpectrum;

const FIT_CONFIG: &str = r#"
{
  "energyPerChannel": 0.01,
  "series": [
    { "element": "Fe", "seriesType": "K" },
    { "element": "Ca", "seriesType": "K" }
  ],
  "filters": []
}
"#;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xrf-fit"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("xrf-fit should launch")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn iron_spectra(scales: &[f32]) -> String {
    let iron = PeakTable::system()
        .series(Element::Fe, TransitionSeriesType::K)
        .expect("iron K in catalog");
    let fitting = TransitionSeriesFitting::new(
        iron,
        1024,
        0.01,
        EscapePeakType::None,
        &DetectorResolution::default(),
    );
    scales
        .iter()
        .map(|scale| {
            fitting
                .scale_fit_to_data(*scale)
                .values()
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn fit_command_reports_per_pixel_scales_and_concentrations() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("session.json");
    let spectra_path = temp.path().join("scan.csv");
    write_file(&config_path, FIT_CONFIG);
    write_file(&spectra_path, &iron_spectra(&[100.0, 200.0, 300.0]));

    let output = run(&[
        "fit",
        "--config",
        config_path.to_str().unwrap(),
        "--spectra",
        spectra_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["spectra"], 3);
    assert_eq!(report["channels"], 1024);
    assert_eq!(report["escape"], "none");

    let series = report["series"].as_array().expect("series list");
    assert_eq!(series.len(), 2);
    assert_eq!(series[0]["description"], "Fe K");
    assert_eq!(series[1]["description"], "Ca K");

    let scales: Vec<f64> = series[0]["scales"]
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value.as_f64().unwrap())
        .collect();
    for (scale, expected) in scales.iter().zip([100.0, 200.0, 300.0]) {
        assert!((scale - expected).abs() < 0.5, "scale {scale} vs {expected}");
    }
    assert!(series[1]["scales"][0].as_f64().unwrap() < 0.5);

    let concentrations = report["concentrations"].as_array().unwrap();
    assert_eq!(concentrations[0]["element"], "Fe");
    assert!(concentrations[0]["ppm"].as_f64().unwrap() > 990_000.0);
}

#[test]
fn fit_command_writes_report_file_when_requested() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("session.json");
    let spectra_path = temp.path().join("scan.txt");
    let report_path = temp.path().join("out/report.json");
    write_file(&config_path, FIT_CONFIG);
    write_file(&spectra_path, &iron_spectra(&[50.0]));

    let output = run(&[
        "fit",
        "--config",
        config_path.to_str().unwrap(),
        "--spectra",
        spectra_path.to_str().unwrap(),
        "--output",
        report_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("report written to"));

    let report: Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("report exists"))
            .expect("report should be JSON");
    assert_eq!(report["spectra"], 1);
}

#[test]
fn filter_command_applies_configured_chain() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("session.json");
    let spectra_path = temp.path().join("scan.txt");
    let output_path = temp.path().join("filtered.txt");
    write_file(
        &config_path,
        r#"{ "energyPerChannel": 0.01, "filters": [ { "type": "subtraction", "amount": 1.0 } ] }"#,
    );
    write_file(&spectra_path, "0.5 2 3\n4, 5, 6\n");

    let output = run(&[
        "filter",
        "--config",
        config_path.to_str().unwrap(),
        "--spectra",
        spectra_path.to_str().unwrap(),
        "--output",
        output_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let filtered: Vec<Vec<f32>> = fs::read_to_string(&output_path)
        .expect("filtered output exists")
        .lines()
        .map(|line| {
            line.split_whitespace()
                .map(|value| value.parse().unwrap())
                .collect()
        })
        .collect();
    assert_eq!(filtered, vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);
}

#[test]
fn catalog_command_lists_element_lines() {
    let output = run(&["catalog", "--element", "Fe"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|line| line.starts_with("Fe K: Ka1 6.4038 keV")));
}

#[test]
fn unknown_element_maps_to_input_validation_exit() {
    let output = run(&["catalog", "--element", "Xx"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = stderr(&output);
    assert!(stderr.contains("ERROR: [INPUT.ELEMENT]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 2"), "stderr: {stderr}");
}

#[test]
fn config_errors_map_to_their_categories() {
    let temp = TempDir::new().expect("tempdir should be created");
    let spectra_path = temp.path().join("scan.txt");
    write_file(&spectra_path, "1 2 3\n");

    let missing = run(&[
        "fit",
        "--config",
        temp.path().join("absent.json").to_str().unwrap(),
        "--spectra",
        spectra_path.to_str().unwrap(),
    ]);
    assert_eq!(missing.status.code(), Some(3));
    assert!(stderr(&missing).contains("[IO.CONFIG_READ]"));

    let invalid_path = temp.path().join("invalid.json");
    write_file(
        &invalid_path,
        r#"{ "energyPerChannel": 0.01, "filters": [ { "type": "brukner", "width": 5, "iterations": 2 } ] }"#,
    );
    let invalid = run(&[
        "fit",
        "--config",
        invalid_path.to_str().unwrap(),
        "--spectra",
        spectra_path.to_str().unwrap(),
    ]);
    assert_eq!(invalid.status.code(), Some(2));
    assert!(stderr(&invalid).contains("[INPUT.CONFIG]"));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("[INPUT.CLI_USAGE]"));
}
