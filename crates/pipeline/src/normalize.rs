//! Standard identifier and date columns stamped on sampled points.

use crate::error::{PipelineError, Result};
use crate::sample::SampleSet;
use crate::table::{FeatureTable, Value};
use crate::window::AnalysisWindow;

/// Date placeholder for static pipelines
pub const NA: &str = "NA";

/// Columns every exported table starts with
pub const BASE_COLUMNS: [&str; 5] = ["id_punto", "longitud", "latitud", "fecha_inicio", "fecha_fin"];

/// Fixed 6-decimal rendering used for coordinates and ids
pub fn format_coordinate(value: f64) -> String {
    format!("{value:.6}")
}

/// `<lon>_<lat>` with both parts at 6 decimals. Nearby points may collide.
pub fn point_id(lon: f64, lat: f64) -> String {
    format!("{}_{}", format_coordinate(lon), format_coordinate(lat))
}

/// Build the feature table for `samples`.
///
/// Columns are the base columns, then one per band, then one per
/// `(band, column)` alias carrying that band's value under a second name.
pub fn normalize(
    samples: &SampleSet,
    window: Option<&AnalysisWindow>,
    aliases: &[(String, String)],
) -> Result<FeatureTable> {
    let alias_sources = aliases
        .iter()
        .map(|(band, _)| {
            samples
                .bands
                .iter()
                .position(|b| b == band)
                .ok_or_else(|| PipelineError::UnknownColumn(band.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    let columns = BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(samples.bands.iter().cloned())
        .chain(aliases.iter().map(|(_, column)| column.clone()))
        .collect();
    let mut table = FeatureTable::new(columns);

    let (start, end) = match window {
        Some(w) => (w.start_str(), w.end_str()),
        None => (NA.to_string(), NA.to_string()),
    };

    for point in &samples.points {
        let mut row = vec![
            Value::Text(point_id(point.lon, point.lat)),
            Value::Text(format_coordinate(point.lon)),
            Value::Text(format_coordinate(point.lat)),
            Value::Text(start.clone()),
            Value::Text(end.clone()),
        ];
        row.extend(point.values.iter().map(|&v| Value::from(v)));
        row.extend(alias_sources.iter().map(|&i| Value::from(point.values[i])));
        table.push_row(row)?;
    }

    Ok(table)
}
