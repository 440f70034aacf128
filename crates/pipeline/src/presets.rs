//! The five Mexico point-grid datasets.
//!
//! All share the Mexico bounding box, the June to October 2023 window (where
//! temporal), 5000 sample points and the `Inundaciones_Mexico` export folder.

use terramex_algorithms::statistics::Reducer;
use terramex_colormap::{Palette, VisParams};
use terramex_core::Region;

use crate::config::{
    BandSpec, Derive, ExportSpec, LayerSpec, LinearTransform, PipelineConfig, SourceKind, SourceSpec,
    TerrainKind, DEFAULT_NUM_PIXELS,
};
use crate::error::{PipelineError, Result};
use crate::export::ExportFormat;
use crate::normalize::BASE_COLUMNS;
use crate::window::AnalysisWindow;

pub const EXPORT_FOLDER: &str = "Inundaciones_Mexico";

pub const SRTM: &str = "USGS/SRTMGL1_003";
pub const ERA5_LAND: &str = "ECMWF/ERA5_LAND/HOURLY";
pub const SMAP: &str = "NASA_USDA/HSL/SMAP_soil_moisture";
pub const CHIRPS: &str = "UCSB-CHG/CHIRPS/DAILY";
pub const MODIS_LST: &str = "MODIS/061/MOD11A1";
pub const MODIS_VI: &str = "MODIS/061/MOD13Q1";

/// Preset names in presentation order
pub const NAMES: [&str; 5] = ["srtm", "era5", "smap", "chirps", "modis"];

const ELEVATION: [&str; 5] = ["#008435", "#1CAC78", "#EDE6D6", "#736F6E", "#FFFFFF"];
const MOISTURE: [&str; 3] = ["#ffffd9", "#41b6c4", "#081d58"];
const PRECIPITATION: [&str; 5] = ["#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6"];

fn vis(min: f64, max: f64, palette: &[&str]) -> Result<VisParams> {
    Ok(VisParams::new(min, max).with_palette(Palette::parse(palette)?))
}

fn layer(label: &str, band: &str, vis: VisParams, primary: bool) -> LayerSpec {
    LayerSpec {
        label: label.into(),
        band: band.into(),
        vis,
        primary,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn source(key: &str, id: &str, kind: SourceKind, bands: &[&str], gap_fill: bool) -> SourceSpec {
    SourceSpec {
        key: key.into(),
        id: id.into(),
        kind,
        bands: strings(bands),
        gap_fill,
        transform: None,
    }
}

/// Gap-filled collection
fn collection(key: &str, id: &str, bands: &[&str]) -> SourceSpec {
    source(key, id, SourceKind::Collection, bands, true)
}

fn band(name: &str, source: &str, band: &str, derive: Derive) -> BandSpec {
    BandSpec {
        name: name.into(),
        source: source.into(),
        band: band.into(),
        derive,
        column: None,
    }
}

fn reduce(name: &str, source: &str, band_name: &str, reducer: Reducer) -> BandSpec {
    band(name, source, band_name, Derive::Reduce(reducer))
}

fn terrain(name: &str, kind: TerrainKind) -> BandSpec {
    band(name, "srtm", "elevation", Derive::Terrain(kind))
}

/// Base columns followed by each band's export column
fn selectors(bands: &[BandSpec]) -> Vec<String> {
    BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(bands.iter().map(|b| b.column.clone().unwrap_or_else(|| b.name.clone())))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    name: &str,
    title: &str,
    description: &str,
    window: Option<AnalysisWindow>,
    scale: f64,
    sources: Vec<SourceSpec>,
    bands: Vec<BandSpec>,
    layers: Vec<LayerSpec>,
) -> PipelineConfig {
    PipelineConfig {
        name: name.into(),
        title: title.into(),
        export: ExportSpec {
            description: description.into(),
            folder: EXPORT_FOLDER.into(),
            format: ExportFormat::Csv,
            selectors: selectors(&bands),
        },
        region: Region::mexico(),
        window,
        scale,
        num_pixels: DEFAULT_NUM_PIXELS,
        seed: 0,
        sources,
        bands,
        layers,
    }
}

/// SRTM elevation and six terrain derivatives at 30 m. Static, no window.
pub fn srtm() -> Result<PipelineConfig> {
    let sources = vec![source("srtm", SRTM, SourceKind::Static, &["elevation"], false)];
    let bands = vec![
        band("srtm_elevacion", "srtm", "elevation", Derive::Identity),
        terrain("srtm_pendiente", TerrainKind::Slope),
        terrain("srtm_orientacion", TerrainKind::Aspect),
        terrain("srtm_sombreado", TerrainKind::Hillshade),
        terrain("srtm_rugosidad", TerrainKind::Roughness),
        terrain("srtm_flujo_acumulacion", TerrainKind::FlowAccumulation),
        terrain("srtm_direccion_flujo", TerrainKind::FlowDirection),
    ];
    let layers = vec![
        layer("Elevación", "srtm_elevacion", vis(0.0, 4000.0, &ELEVATION)?, true),
        layer(
            "Pendiente",
            "srtm_pendiente",
            vis(0.0, 60.0, &["#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#2171b5"])?,
            false,
        ),
        layer(
            "Orientación",
            "srtm_orientacion",
            vis(0.0, 360.0, &["#fc8d59", "#ffffbf", "#91cf60", "#ffffbf", "#fc8d59"])?,
            false,
        ),
        layer("Sombreado", "srtm_sombreado", VisParams::new(0.0, 255.0), false),
        layer(
            "Rugosidad",
            "srtm_rugosidad",
            vis(0.0, 100.0, &["#ffffd4", "#fed98e", "#fe9929", "#d95f0e", "#993404"])?,
            false,
        ),
        layer(
            "Acumulación de Flujo",
            "srtm_flujo_acumulacion",
            vis(0.0, 500.0, &["#f7fbff", "#6baed6", "#2171b5"])?,
            false,
        ),
    ];
    Ok(assemble(
        "srtm",
        "Variables Topográficas (SRTM)",
        "srtm_mexico_data",
        None,
        30.0,
        sources,
        bands,
        layers,
    ))
}

/// ERA5-Land hourly temperature, precipitation and soil water at 10 km.
pub fn era5() -> Result<PipelineConfig> {
    let sources = vec![collection(
        "era5",
        ERA5_LAND,
        &["skin_temperature", "total_precipitation", "volumetric_soil_water_layer_1"],
    )];
    let water = "volumetric_soil_water_layer_1";
    let bands = vec![
        reduce("temperatura_media", "era5", "skin_temperature", Reducer::Mean),
        reduce("precipitacion_media", "era5", "total_precipitation", Reducer::Mean),
        reduce("humedad_volumetrica_media", "era5", water, Reducer::Mean),
        reduce("humedad_volumetrica_max", "era5", water, Reducer::Max),
        reduce("humedad_volumetrica_min", "era5", water, Reducer::Min),
        reduce("humedad_volumetrica_std", "era5", water, Reducer::StdDev),
    ];
    let layers = vec![
        layer(
            "Temperatura Superficial Media",
            "temperatura_media",
            vis(290.0, 310.0, &["blue", "green", "yellow", "red"])?,
            true,
        ),
        layer(
            "Precipitación Total Media",
            "precipitacion_media",
            vis(0.0, 0.1, &["lightblue", "blue", "darkblue"])?,
            false,
        ),
        layer(
            "Humedad Volumétrica de la Capa 1 Media",
            "humedad_volumetrica_media",
            vis(0.0, 0.5, &MOISTURE)?,
            false,
        ),
    ];
    Ok(assemble(
        "era5",
        "Variables ERA5-Land",
        "era5_mexico_data",
        Some(AnalysisWindow::flood_season_2023()),
        10_000.0,
        sources,
        bands,
        layers,
    ))
}

/// SMAP soil moisture, moisture profile, probability and anomaly at 1 km.
pub fn smap() -> Result<PipelineConfig> {
    let sources = vec![collection("smap", SMAP, &["ssm", "susm", "smp", "ssma"])];
    let bands = vec![
        reduce("smap_humedad_superficial", "smap", "ssm", Reducer::Mean),
        reduce("smap_humedad_no_saturada", "smap", "susm", Reducer::Mean),
        reduce("smap_probabilidad", "smap", "smp", Reducer::Mean),
        reduce("smap_anomalia", "smap", "ssma", Reducer::Mean),
        reduce("smap_humedad_max", "smap", "ssm", Reducer::Max),
        reduce("smap_humedad_min", "smap", "ssm", Reducer::Min),
        reduce("smap_humedad_std", "smap", "ssm", Reducer::StdDev),
    ];
    let moisture = vis(0.0, 1.0, &MOISTURE)?;
    let layers = vec![
        layer("Humedad Superficial Media", "smap_humedad_superficial", moisture.clone(), true),
        layer("Humedad No Saturada Media", "smap_humedad_no_saturada", moisture, false),
        layer(
            "Probabilidad de Humedad",
            "smap_probabilidad",
            vis(0.0, 100.0, &["red", "yellow", "green"])?,
            false,
        ),
        layer(
            "Anomalía de Humedad",
            "smap_anomalia",
            vis(-1.0, 1.0, &["#d73027", "#fee090", "#4575b4"])?,
            false,
        ),
    ];
    Ok(assemble(
        "smap",
        "Variables SMAP",
        "smap_mexico_data",
        Some(AnalysisWindow::flood_season_2023()),
        1000.0,
        sources,
        bands,
        layers,
    ))
}

/// CHIRPS precipitation combined with MODIS, SMAP and SRTM at 1 km.
pub fn chirps() -> Result<PipelineConfig> {
    let sources = vec![
        collection("chirps", CHIRPS, &["precipitation"]),
        collection("lst", MODIS_LST, &["LST_Day_1km"]),
        collection("smap", SMAP, &["ssm"]),
        collection("ndvi", MODIS_VI, &["NDVI"]),
        source("srtm", SRTM, SourceKind::Static, &["elevation"], false),
    ];
    let bands = vec![
        reduce("chirps_precip_media", "chirps", "precipitation", Reducer::Mean),
        reduce("chirps_precip_maxima", "chirps", "precipitation", Reducer::Max),
        reduce("chirps_precip_acumulada", "chirps", "precipitation", Reducer::Sum),
        reduce("modis_temp_media", "lst", "LST_Day_1km", Reducer::Mean),
        reduce("modis_temp_maxima", "lst", "LST_Day_1km", Reducer::Max),
        reduce("smap_humedad_suelo", "smap", "ssm", Reducer::Mean),
        reduce("modis_ndvi", "ndvi", "NDVI", Reducer::Mean),
        band("dem_elevacion", "srtm", "elevation", Derive::Identity),
        terrain("dem_pendiente", TerrainKind::Slope),
    ];
    let temperature = vis(290.0, 310.0, &["blue", "yellow", "red"])?;
    let layers = vec![
        layer("Precipitación Media", "chirps_precip_media", vis(0.0, 50.0, &PRECIPITATION)?, true),
        layer(
            "Precipitación Máxima",
            "chirps_precip_maxima",
            vis(0.0, 100.0, &["#ffffcc", "#a1dab4", "#41b6c4", "#2c7fb8", "#253494"])?,
            false,
        ),
        layer(
            "Precipitación Acumulada",
            "chirps_precip_acumulada",
            vis(0.0, 1000.0, &PRECIPITATION)?,
            false,
        ),
        layer("Temperatura Media", "modis_temp_media", temperature.clone(), false),
        layer("Temperatura Máxima", "modis_temp_maxima", temperature, false),
        layer("Humedad del Suelo", "smap_humedad_suelo", vis(0.0, 1.0, &MOISTURE)?, false),
        layer("NDVI", "modis_ndvi", vis(0.0, 9000.0, &["brown", "yellow", "green"])?, false),
        layer("Elevación", "dem_elevacion", vis(0.0, 4000.0, &ELEVATION)?, false),
        layer("Pendiente", "dem_pendiente", vis(0.0, 60.0, &["green", "yellow", "red"])?, false),
    ];
    Ok(assemble(
        "chirps",
        "Variables de Análisis",
        "variables_mexico_completo",
        Some(AnalysisWindow::flood_season_2023()),
        1000.0,
        sources,
        bands,
        layers,
    ))
}

/// MODIS land surface temperature (Celsius) and vegetation indices at 250 m.
pub fn modis() -> Result<PipelineConfig> {
    let mut lst = collection("lst", MODIS_LST, &["LST_Day_1km", "LST_Night_1km"]);
    lst.transform = Some(LinearTransform {
        scale: 0.02,
        offset: -273.15,
    });
    let mut vi = collection("vi", MODIS_VI, &["NDVI", "EVI"]);
    vi.transform = Some(LinearTransform {
        scale: 0.0001,
        offset: 0.0,
    });

    let aliased = |name: &str, source: &str, band_name: &str, reducer: Reducer, column: &str| BandSpec {
        column: Some(column.into()),
        ..reduce(name, source, band_name, reducer)
    };
    let bands = vec![
        aliased("temp_diurna", "lst", "LST_Day_1km", Reducer::Mean, "modis_temp_dia"),
        aliased("temp_nocturna", "lst", "LST_Night_1km", Reducer::Mean, "modis_temp_noche"),
        aliased("temp_diurna_max", "lst", "LST_Day_1km", Reducer::Max, "modis_temp_max"),
        aliased("temp_diurna_min", "lst", "LST_Day_1km", Reducer::Min, "modis_temp_min"),
        aliased("ndvi_medio", "vi", "NDVI", Reducer::Mean, "modis_ndvi"),
        aliased("evi_medio", "vi", "EVI", Reducer::Mean, "modis_evi"),
        aliased("ndvi_max", "vi", "NDVI", Reducer::Max, "modis_ndvi_max"),
        aliased("ndvi_min", "vi", "NDVI", Reducer::Min, "modis_ndvi_min"),
    ];
    let temperature = vis(0.0, 40.0, &["blue", "yellow", "red"])?;
    let greenness = vis(0.0, 1.0, &["brown", "yellow", "green"])?;
    let layers = vec![
        layer("Temperatura Diurna Media", "temp_diurna", temperature.clone(), true),
        layer("Temperatura Nocturna Media", "temp_nocturna", temperature, false),
        layer("NDVI Medio", "ndvi_medio", greenness.clone(), true),
        layer("EVI Medio", "evi_medio", greenness, false),
    ];
    Ok(assemble(
        "modis",
        "Variables MODIS",
        "modis_mexico_data",
        Some(AnalysisWindow::flood_season_2023()),
        250.0,
        vec![lst, vi],
        bands,
        layers,
    ))
}

/// Every preset, in [`NAMES`] order.
pub fn all() -> Result<Vec<PipelineConfig>> {
    NAMES.iter().map(|n| by_name(n)).collect()
}

pub fn by_name(name: &str) -> Result<PipelineConfig> {
    match name {
        "srtm" => srtm(),
        "era5" => era5(),
        "smap" => smap(),
        "chirps" => chirps(),
        "modis" => modis(),
        other => Err(PipelineError::UnknownPipeline(other.to_string())),
    }
}
