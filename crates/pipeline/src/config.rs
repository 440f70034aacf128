//! Declarative pipeline definitions.
//!
//! A [`PipelineConfig`] lists the sources to load, the bands to derive from
//! them, the map layers to offer and the export job to submit. Configs are
//! plain serde data and round-trip through YAML.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use terramex_algorithms::statistics::Reducer;
use terramex_colormap::VisParams;
use terramex_core::Region;

use crate::error::{PipelineError, Result};
use crate::export::ExportFormat;
use crate::window::AnalysisWindow;

/// Points requested from the sampler unless a config says otherwise
pub const DEFAULT_NUM_PIXELS: usize = 5000;

fn default_num_pixels() -> usize {
    DEFAULT_NUM_PIXELS
}

fn default_region() -> Region {
    Region::mexico()
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Single image, no time dimension
    Static,
    /// Time-indexed collection, filtered by the analysis window
    Collection,
}

/// `value * scale + offset`, applied after gap filling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearTransform {
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

impl LinearTransform {
    pub fn apply(&self, v: f64) -> f64 {
        v * self.scale + self.offset
    }
}

/// One external raster source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Name bands refer to
    pub key: String,
    /// Catalog id, e.g. `MODIS/061/MOD11A1`
    pub id: String,
    pub kind: SourceKind,
    pub bands: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub gap_fill: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<LinearTransform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    Slope,
    Aspect,
    Hillshade,
    Roughness,
    FlowAccumulation,
    FlowDirection,
}

/// How a composite band is produced from its source band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derive {
    /// Static band as loaded
    #[default]
    Identity,
    /// Temporal reduction of a collection band
    Reduce(Reducer),
    /// Terrain derivative of a static elevation band
    Terrain(TerrainKind),
}

/// One band of the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    /// Unique output band name
    pub name: String,
    /// Key of the source to read
    pub source: String,
    /// Band of that source
    pub band: String,
    #[serde(default)]
    pub derive: Derive,
    /// Extra export column carrying this band's value under another name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// A toggleable map layer bound to a composite band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub label: String,
    pub band: String,
    pub vis: VisParams,
    /// Shown when the session starts
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary: bool,
}

/// Export request parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSpec {
    pub description: String,
    pub folder: String,
    #[serde(default)]
    pub format: ExportFormat,
    /// Output columns, in order
    pub selectors: Vec<String>,
}

/// Complete description of one point-grid dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    /// Control panel title
    pub title: String,
    pub export: ExportSpec,
    #[serde(default = "default_region")]
    pub region: Region,
    /// `None` for purely static pipelines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<AnalysisWindow>,
    /// Sampling resolution in metres
    pub scale: f64,
    #[serde(default = "default_num_pixels")]
    pub num_pixels: usize,
    #[serde(default)]
    pub seed: u64,
    pub sources: Vec<SourceSpec>,
    pub bands: Vec<BandSpec>,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl PipelineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn source(&self, key: &str) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| s.key == key)
    }

    pub fn is_temporal(&self) -> bool {
        self.window.is_some()
    }

    /// Composite band names in output order
    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// `(band, column)` pairs for bands exported under a second name
    pub fn column_aliases(&self) -> Vec<(String, String)> {
        self.bands
            .iter()
            .filter_map(|b| b.column.as_ref().map(|c| (b.name.clone(), c.clone())))
            .collect()
    }

    /// Check cross references between sources, bands and layers.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(format!("{}: {msg}", self.name)));

        if !(self.scale > 0.0) {
            return invalid(format!("scale must be positive, got {}", self.scale));
        }
        if self.num_pixels == 0 {
            return invalid("num_pixels must be at least 1".into());
        }
        if self.export.selectors.is_empty() {
            return invalid("export has no selectors".into());
        }

        let mut keys = HashSet::new();
        for source in &self.sources {
            if !keys.insert(source.key.as_str()) {
                return invalid(format!("duplicate source key {}", source.key));
            }
            if source.kind == SourceKind::Collection && self.window.is_none() {
                return invalid(format!("collection {} needs an analysis window", source.id));
            }
        }

        let mut names = HashSet::new();
        for band in &self.bands {
            if !names.insert(band.name.as_str()) {
                return invalid(format!("duplicate band name {}", band.name));
            }
            let Some(source) = self.source(&band.source) else {
                return invalid(format!("band {} uses unknown source {}", band.name, band.source));
            };
            if !source.bands.contains(&band.band) {
                return invalid(format!("source {} has no band {}", source.key, band.band));
            }
            let fits = match band.derive {
                Derive::Reduce(_) => source.kind == SourceKind::Collection,
                Derive::Identity | Derive::Terrain(_) => source.kind == SourceKind::Static,
            };
            if !fits {
                return invalid(format!("band {} cannot derive {:?} from a {:?} source", band.name, band.derive, source.kind));
            }
        }

        for layer in &self.layers {
            if !names.contains(layer.band.as_str()) {
                return invalid(format!("layer {} shows unknown band {}", layer.label, layer.band));
            }
        }
        Ok(())
    }
}
