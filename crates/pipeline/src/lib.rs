//! # terramex pipeline
//!
//! Builds tidy point-grid datasets from heterogeneous raster sources. Every
//! pipeline follows the same path:
//!
//! 1. load sources from a [`Catalog`], filtered to the region and window
//! 2. gap-fill each slice and apply unit transforms
//! 3. reduce collections or derive terrain rasters
//! 4. compose the bands, sample a seeded point grid, normalize the schema
//! 5. hand the table to an [`Exporter`]
//!
//! Pipelines are plain data ([`PipelineConfig`]); [`presets`] holds the five
//! Mexico datasets.

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod normalize;
pub mod presets;
pub mod runner;
pub mod sample;
pub mod table;
pub mod visualization;
pub mod window;

#[cfg(test)]
pub(crate) mod test_log;

pub use catalog::{Catalog, Image, ImageCollection, LocalCatalog, MemoryCatalog};
pub use config::{BandSpec, Derive, ExportSpec, LayerSpec, LinearTransform, PipelineConfig, SourceKind, SourceSpec, TerrainKind};
pub use error::{PipelineError, Result};
pub use export::{ExportFormat, ExportHandle, ExportJob, ExportStatus, ExportTarget, Exporter, LocalDriveTarget, RetryPolicy};
pub use normalize::{format_coordinate, normalize, point_id, NA};
pub use runner::{run_all, Pipeline, PipelineOutput};
pub use sample::{sample, PointSample, SampleParams, SampleSet};
pub use table::{FeatureTable, Value};
pub use visualization::{LayerId, MapView, VisualizationContext};
pub use window::AnalysisWindow;
