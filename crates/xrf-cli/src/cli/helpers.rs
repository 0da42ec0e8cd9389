use super::CliError;
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;
use xrf_core::domain::XrfError;
use xrf_core::spectrum::{ReadOnlySpectrum, Spectrum};

/// Read one spectrum per line, channels separated by whitespace and/or commas.
///
/// Blank lines and `#` comments are skipped. Every spectrum must have the same width.
pub(super) fn read_spectra(path: &Path) -> Result<Vec<Spectrum>, CliError> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read spectra '{}'", path.display()))?;
    parse_spectra(&source).map_err(CliError::Compute)
}

pub(super) fn parse_spectra(source: &str) -> Result<Vec<Spectrum>, XrfError> {
    let mut spectra: Vec<Spectrum> = Vec::new();

    for (index, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let channels = line
            .split(|character: char| character == ',' || character.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f32>().map_err(|_| {
                    XrfError::input_validation(
                        "INPUT.SPECTRA",
                        format!("line {}: '{}' is not a channel value", index + 1, token),
                    )
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;

        let expected = spectra.first().map_or(channels.len(), |first| first.size());
        if channels.len() != expected {
            return Err(XrfError::input_validation(
                "INPUT.SPECTRA",
                format!(
                    "line {} has {} channels; expected {}",
                    index + 1,
                    channels.len(),
                    expected
                ),
            ));
        }
        spectra.push(Spectrum::from(channels));
    }

    if spectra.is_empty() {
        return Err(XrfError::input_validation(
            "INPUT.SPECTRA",
            "no spectra found in input",
        ));
    }
    Ok(spectra)
}

pub(super) fn write_spectra(path: &Path, spectra: &[Spectrum]) -> Result<(), CliError> {
    let mut text = String::new();
    for spectrum in spectra {
        let line = spectrum
            .values()
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        text.push_str(&line);
        text.push('\n');
    }
    write_output(path, &text)
}

/// Write `value` as pretty JSON to `path`, or to stdout when no path is given.
pub(super) fn emit_json(path: Option<&Path>, value: &impl Serialize) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to serialize JSON report")?;
    match path {
        Some(path) => write_output(path, &format!("{rendered}\n")),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write output '{}'", path.display()))?;
    Ok(())
}
