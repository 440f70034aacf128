//! Runs one pipeline config end to end.
//!
//! Sources are loaded from a [`Catalog`], gap filled and rescaled per slice,
//! clipped to the region, then reduced over time or turned into terrain
//! derivatives. The resulting bands are composed in config order, sampled and
//! normalized into the export table.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use terramex_algorithms::hydrology::{flow_accumulation, flow_direction};
use terramex_algorithms::statistics::{fill_gaps, GapFillParams, Reducer};
use terramex_algorithms::terrain::{aspect, hillshade, roughness, slope, AspectParams, HillshadeParams, SlopeParams};
use terramex_core::{BandStack, Raster, Region};
use tracing::{debug, info};

use crate::catalog::{Catalog, ImageCollection};
use crate::config::{BandSpec, Derive, LinearTransform, PipelineConfig, SourceKind, SourceSpec, TerrainKind};
use crate::error::{PipelineError, Result};
use crate::export::ExportJob;
use crate::normalize::normalize;
use crate::presets;
use crate::sample::{sample, SampleParams};
use crate::table::FeatureTable;
use crate::visualization::{MapView, VisualizationContext};

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Derived bands in config order
    pub composite: BandStack,
    /// Sampled points projected onto the export selectors
    pub table: FeatureTable,
    pub job: ExportJob,
}

/// A validated pipeline config ready to run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

enum Loaded {
    Static(BandStack),
    Collection(ImageCollection),
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Pipeline for one of the built-in presets
    pub fn preset(name: &str) -> Result<Self> {
        Self::new(presets::by_name(name)?)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn sample_params(&self) -> SampleParams {
        SampleParams::new(self.config.region, self.config.scale, self.config.num_pixels)
            .with_seed(self.config.seed)
    }

    /// Load every source and derive the composite.
    pub fn compose(&self, catalog: &dyn Catalog) -> Result<BandStack> {
        let config = &self.config;
        let mut loaded = HashMap::new();
        for source in &config.sources {
            loaded.insert(source.key.as_str(), self.load(catalog, source)?);
        }

        let mut reduced: HashMap<(&str, Reducer), BandStack> = HashMap::new();
        let mut terrain = TerrainDeriver::default();
        let mut composite = BandStack::new();
        for band in &config.bands {
            let raster = match (band.derive, loaded.get(band.source.as_str())) {
                (Derive::Identity, Some(Loaded::Static(stack))) => static_band(stack, band)?.clone(),
                (Derive::Terrain(kind), Some(Loaded::Static(stack))) => {
                    debug!("{}: deriving {kind:?} for {}", config.name, band.name);
                    let dem = static_band(stack, band)?;
                    terrain.derive((band.source.as_str(), band.band.as_str()), dem, kind)?
                }
                (Derive::Reduce(reducer), Some(Loaded::Collection(collection))) => {
                    let stack = match reduced.entry((band.source.as_str(), reducer)) {
                        Entry::Occupied(e) => e.into_mut(),
                        Entry::Vacant(e) => {
                            debug!("{}: reducing {} with {reducer:?}", config.name, collection.id());
                            e.insert(collection.reduce(reducer)?)
                        }
                    };
                    let name = match reducer {
                        Reducer::StdDev => reducer.band_name(&band.band),
                        _ => band.band.clone(),
                    };
                    stack
                        .band(&name)
                        .cloned()
                        .ok_or_else(|| PipelineError::unavailable(collection.id(), format!("no band {name}")))?
                }
                _ => {
                    return Err(PipelineError::InvalidConfig(format!(
                        "band {} cannot be derived from source {}",
                        band.name, band.source
                    )))
                }
            };
            composite.push(band.name.clone(), raster)?;
        }

        info!("{}: composed {} bands", config.name, composite.len());
        Ok(composite)
    }

    /// Compose, sample and normalize. The export job is returned, not submitted.
    pub fn run(&self, catalog: &dyn Catalog) -> Result<PipelineOutput> {
        let config = &self.config;
        info!("{}: starting run", config.name);

        let composite = self.compose(catalog)?;
        let samples = sample(&composite, &self.sample_params())?;
        info!("{}: sampled {} points", config.name, samples.len());

        let table = normalize(&samples, config.window.as_ref(), &config.column_aliases())?;
        let job = ExportJob::from_spec(&config.export);
        let table = job.validate(&table)?;

        Ok(PipelineOutput { composite, table, job })
    }

    /// Session with one checkbox per configured layer; primary layers start shown.
    pub fn visualization(&self, composite: &BandStack) -> Result<VisualizationContext> {
        let config = &self.config;
        let mut ctx = VisualizationContext::new(config.title.clone(), MapView::centered_on(&config.region));
        let mut shared: HashMap<&str, Arc<Raster<f64>>> = HashMap::new();
        for layer in &config.layers {
            let raster = match shared.get(layer.band.as_str()) {
                Some(r) => Arc::clone(r),
                None => {
                    let r = composite.band(&layer.band).cloned().ok_or_else(|| {
                        PipelineError::InvalidConfig(format!("layer {} needs band {}", layer.label, layer.band))
                    })?;
                    let r = Arc::new(r);
                    shared.insert(layer.band.as_str(), Arc::clone(&r));
                    r
                }
            };
            ctx.add_checkbox(layer.label.clone(), raster, layer.vis.clone(), layer.primary);
        }
        Ok(ctx)
    }

    fn load(&self, catalog: &dyn Catalog, source: &SourceSpec) -> Result<Loaded> {
        let region = self.config.region;
        let prepare = Preparation {
            gap_fill: source.gap_fill,
            transform: source.transform,
            region,
        };

        match source.kind {
            SourceKind::Static => {
                let stack = catalog.image(&source.id, &source.bands)?;
                debug!("{}: loaded static {}", self.config.name, source.id);
                Ok(Loaded::Static(stack.map_bands(|r| prepare.apply(r))?))
            }
            SourceKind::Collection => {
                let window = self.config.window.ok_or_else(|| {
                    PipelineError::InvalidConfig(format!("collection {} needs an analysis window", source.id))
                })?;
                let collection = catalog
                    .collection(&source.id, &source.bands, &window)?
                    .filter_bounds(&region);
                info!(
                    "{}: {} has {} images in {window}",
                    self.config.name,
                    source.id,
                    collection.size()
                );
                let collection = collection.map(|stack| stack.map_bands(|r| prepare.apply(r)))?;
                Ok(Loaded::Collection(collection))
            }
        }
    }
}

/// Per-slice processing applied before reduction.
#[derive(Clone, Copy)]
struct Preparation {
    gap_fill: bool,
    transform: Option<LinearTransform>,
    region: Region,
}

impl Preparation {
    fn apply(&self, raster: &Raster<f64>) -> terramex_core::Result<Raster<f64>> {
        let mut out = if self.gap_fill {
            fill_gaps(raster, GapFillParams::default())?
        } else {
            raster.clone()
        };
        if let Some(t) = self.transform {
            out = out.map_valid(|v| t.apply(v));
        }
        out.clip(&self.region);
        Ok(out)
    }
}

fn static_band<'a>(stack: &'a BandStack, band: &BandSpec) -> Result<&'a Raster<f64>> {
    stack
        .band(&band.band)
        .ok_or_else(|| PipelineError::unavailable(&band.source, format!("no band {}", band.band)))
}

/// Terrain derivatives of static bands, keyed by `(source, band)`.
///
/// Flow direction and flow accumulation of the same DEM share one D8 grid.
#[derive(Default)]
struct TerrainDeriver<'a> {
    flow_dirs: HashMap<(&'a str, &'a str), Raster<u8>>,
}

impl<'a> TerrainDeriver<'a> {
    fn derive(&mut self, key: (&'a str, &'a str), dem: &Raster<f64>, kind: TerrainKind) -> Result<Raster<f64>> {
        let out = match kind {
            TerrainKind::Slope => slope(dem, SlopeParams::default())?,
            TerrainKind::Aspect => aspect(dem, AspectParams::default())?,
            TerrainKind::Hillshade => hillshade(dem, HillshadeParams::default())?,
            TerrainKind::Roughness => roughness(dem)?,
            TerrainKind::FlowDirection | TerrainKind::FlowAccumulation => {
                let dirs = match self.flow_dirs.entry(key) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => e.insert(flow_direction(dem)?),
                };
                if kind == TerrainKind::FlowDirection {
                    dirs.to_f64()
                } else {
                    flow_accumulation(dirs)?
                }
            }
        };
        Ok(out)
    }
}

/// Run independent pipelines concurrently. Results keep input order.
pub fn run_all(pipelines: &[Pipeline], catalog: &dyn Catalog) -> Vec<Result<PipelineOutput>> {
    pipelines.par_iter().map(|p| p.run(catalog)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::{ExportSpec, LayerSpec};
    use crate::export::ExportFormat;
    use crate::window::AnalysisWindow;
    use chrono::NaiveDate;
    use terramex_colormap::VisParams;
    use terramex_core::GeoTransform;

    fn region() -> Region {
        Region::from_coords([-100.0, 20.0, -99.0, 21.0]).unwrap()
    }

    fn grid(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(20, 20, value);
        r.set_transform(GeoTransform::for_region(&region(), 0.05));
        r.set_nodata(Some(f64::NAN));
        r
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            name: "lst".into(),
            title: "LST".into(),
            export: ExportSpec {
                description: "lst_data".into(),
                folder: "out".into(),
                format: ExportFormat::Csv,
                selectors: ["id_punto", "fecha_inicio", "lst_media", "lst_std", "lst_c"]
                    .map(String::from)
                    .to_vec(),
            },
            region: region(),
            window: Some(AnalysisWindow::parse("2023-06-01", "2023-07-01").unwrap()),
            scale: 5566.0,
            num_pixels: 50,
            seed: 0,
            sources: vec![SourceSpec {
                key: "lst".into(),
                id: "LST".into(),
                kind: SourceKind::Collection,
                bands: vec!["LST".into()],
                gap_fill: true,
                transform: Some(LinearTransform {
                    scale: 0.02,
                    offset: -273.15,
                }),
            }],
            bands: vec![
                BandSpec {
                    name: "lst_media".into(),
                    source: "lst".into(),
                    band: "LST".into(),
                    derive: Derive::Reduce(Reducer::Mean),
                    column: Some("lst_c".into()),
                },
                BandSpec {
                    name: "lst_std".into(),
                    source: "lst".into(),
                    band: "LST".into(),
                    derive: Derive::Reduce(Reducer::StdDev),
                    column: None,
                },
            ],
            layers: vec![LayerSpec {
                label: "LST".into(),
                band: "lst_media".into(),
                vis: VisParams::new(0.0, 40.0),
                primary: true,
            }],
        }
    }

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        let day = |m, d| NaiveDate::from_ymd_opt(2023, m, d).unwrap();
        // 15000 * 0.02 - 273.15 = 26.85, 16000 -> 46.85
        for (date, raw) in [(day(6, 1), 15000.0), (day(6, 15), 16000.0), (day(7, 1), 99999.0)] {
            let mut slice = grid(raw);
            slice.set(3, 3, f64::NAN).unwrap();
            catalog.insert_slice("LST", date, BandStack::compose([("LST", slice)]).unwrap());
        }
        catalog
    }

    #[test]
    fn collection_pipeline_reduces_transformed_slices() {
        let pipeline = Pipeline::new(config()).unwrap();
        let out = pipeline.run(&catalog()).unwrap();

        assert_eq!(out.composite.names(), ["lst_media", "lst_std"]);
        let mean = out.composite.band("lst_media").unwrap();
        // end date is exclusive, gap at (3, 3) filled from neighbours
        approx::assert_relative_eq!(mean.get(3, 3).unwrap(), 36.85, epsilon = 1e-9);
        approx::assert_relative_eq!(mean.get(10, 10).unwrap(), 36.85, epsilon = 1e-9);
        approx::assert_relative_eq!(
            out.composite.band("lst_std").unwrap().get(10, 10).unwrap(),
            10.0,
            epsilon = 1e-9
        );

        assert_eq!(out.table.columns(), ["id_punto", "fecha_inicio", "lst_media", "lst_std", "lst_c"]);
        assert!(!out.table.is_empty() && out.table.len() <= 50);
        assert_eq!(out.table.get(0, "lst_media"), out.table.get(0, "lst_c"));
        assert_eq!(out.job.description, "lst_data");
    }

    #[test]
    fn empty_window_yields_no_points() {
        let mut config = config();
        config.window = Some(AnalysisWindow::parse("2024-01-01", "2024-02-01").unwrap());
        let out = Pipeline::new(config).unwrap().run(&catalog()).unwrap();
        assert!(out.composite.band("lst_media").unwrap().is_all_missing());
        assert!(out.table.is_empty());
    }

    #[test]
    fn missing_source_aborts() {
        let err = Pipeline::new(config()).unwrap().run(&MemoryCatalog::new()).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }

    #[test]
    fn visualization_shares_band_rasters() {
        let pipeline = Pipeline::new(config()).unwrap();
        let composite = pipeline.compose(&catalog()).unwrap();
        let ctx = pipeline.visualization(&composite).unwrap();
        assert_eq!(ctx.title(), "LST");
        assert_eq!(ctx.layers().len(), 1);
        assert_eq!(ctx.visible_layers().count(), 1);
        let layer = &ctx.layers()[0];
        let band = composite.band("lst_media").unwrap();
        assert_eq!(layer.raster.shape(), band.shape());
        assert_eq!(layer.raster.get(10, 10).unwrap(), band.get(10, 10).unwrap());
        assert_eq!(ctx.view().center, region().center());
    }

    #[test]
    fn flow_bands_share_one_direction_grid() {
        // Drains east along every row
        let mut dem = Raster::new(5, 5);
        for row in 0..5 {
            for col in 0..5 {
                dem.set(row, col, (10 - col) as f64).unwrap();
            }
        }
        let expected_dirs = flow_direction(&dem).unwrap();

        let mut terrain = TerrainDeriver::default();
        let dirs = terrain.derive(("srtm", "elevation"), &dem, TerrainKind::FlowDirection).unwrap();
        assert_eq!(dirs.data(), expected_dirs.to_f64().data());

        // A second DEM under the same key reuses the cached grid
        let flat = Raster::filled(5, 5, 1.0);
        let acc = terrain.derive(("srtm", "elevation"), &flat, TerrainKind::FlowAccumulation).unwrap();
        assert_eq!(terrain.flow_dirs.len(), 1);
        assert_eq!(acc.data(), flow_accumulation(&expected_dirs).unwrap().data());
    }
}
