//! Raster sources: static images and time-indexed collections.
//!
//! A [`Catalog`] resolves a source id to rasters. [`LocalCatalog`] reads
//! GeoTIFFs from a directory tree laid out as
//!
//! ```text
//! <root>/<id>/<band>.tif                  static image
//! <root>/<id>/<YYYY-MM-DD>/<band>.tif     one collection slice per date
//! <root>/<id>/<YYYY-MM-DDTHH>/<band>.tif   one slice per hour
//! ```
//!
//! Ids may contain `/` (`USGS/SRTMGL1_003`) and map to nested directories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rayon::prelude::*;
use terramex_algorithms::statistics::{reduce_collection, Reducer};
use terramex_core::io::read_geotiff;
use terramex_core::{BandStack, GeoTransform, Raster, Region, CRS};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::window::AnalysisWindow;

/// Lookup of external raster sources by id.
pub trait Catalog: Send + Sync {
    /// Static image restricted to `bands`, in the order given.
    fn image(&self, id: &str, bands: &[String]) -> Result<BandStack>;

    /// Slices of a time-indexed collection acquired inside `window`,
    /// restricted to `bands`. Slices outside the window are never read.
    fn collection(&self, id: &str, bands: &[String], window: &AnalysisWindow) -> Result<ImageCollection>;
}

/// One timestamped slice of a collection
#[derive(Debug, Clone)]
pub struct Image {
    /// Acquisition time; daily products use midnight
    pub acquired: NaiveDateTime,
    pub bands: BandStack,
}

impl Image {
    pub fn date(&self) -> NaiveDate {
        self.acquired.date()
    }
}

/// Time-ordered slices sharing a band list.
#[derive(Debug, Clone)]
pub struct ImageCollection {
    id: String,
    bands: Vec<String>,
    images: Vec<Image>,
    bounds: Option<Region>,
}

impl ImageCollection {
    /// Slices are sorted by acquisition time.
    pub fn new(id: impl Into<String>, bands: Vec<String>, mut images: Vec<Image>) -> Self {
        images.sort_by_key(|img| img.acquired);
        Self {
            id: id.into(),
            bands,
            images,
            bounds: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn band_names(&self) -> &[String] {
        &self.bands
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn size(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Keep slices dated inside `[start, end)`.
    pub fn filter_date(mut self, window: &AnalysisWindow) -> Self {
        self.images.retain(|img| window.contains(img.date()));
        self
    }

    /// Keep slices with at least one band overlapping `region`.
    pub fn filter_bounds(mut self, region: &Region) -> Self {
        self.images
            .retain(|img| img.bands.iter().any(|(_, r)| region.intersects(r.bounds())));
        self.bounds = Some(*region);
        self
    }

    /// Restrict every slice to `bands`.
    pub fn select<S: AsRef<str>>(mut self, bands: &[S]) -> Result<Self> {
        for img in &mut self.images {
            img.bands = img
                .bands
                .select(bands)
                .map_err(|e| PipelineError::unavailable(&self.id, e.to_string()))?;
        }
        self.bands = bands.iter().map(|b| b.as_ref().to_string()).collect();
        Ok(self)
    }

    /// Apply `f` to every slice, in parallel.
    pub fn map<F>(mut self, f: F) -> Result<Self>
    where
        F: Fn(&BandStack) -> terramex_core::Result<BandStack> + Sync + Send,
    {
        self.images = self
            .images
            .into_par_iter()
            .map(|img| {
                f(&img.bands).map(|bands| Image {
                    acquired: img.acquired,
                    bands,
                })
            })
            .collect::<terramex_core::Result<Vec<_>>>()?;
        Ok(self)
    }

    /// Reduce every band over time.
    ///
    /// Output bands keep their names except for `StdDev`, which appends
    /// `_stdDev`. An empty collection yields all-missing bands.
    pub fn reduce(&self, reducer: Reducer) -> Result<BandStack> {
        let name_for = |band: &str| match reducer {
            Reducer::StdDev => reducer.band_name(band),
            _ => band.to_string(),
        };

        if self.images.is_empty() {
            warn!(
                collection = %self.id,
                reducer = reducer.suffix(),
                "no images matched the filters; reduced bands will be empty"
            );
            let pairs = self.bands.iter().map(|b| (name_for(b), self.missing_band()));
            return Ok(BandStack::compose(pairs)?);
        }

        let mut out = BandStack::new();
        for band in &self.bands {
            let slices = self
                .images
                .iter()
                .map(|img| {
                    img.bands.band(band).ok_or_else(|| {
                        PipelineError::unavailable(&self.id, format!("slice {} lacks band {band}", img.acquired))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            out.push(name_for(band), reduce_collection(&slices, reducer)?)?;
        }
        Ok(out)
    }

    /// Single missing cell spanning the filtered bounds
    fn missing_band(&self) -> Raster<f64> {
        let mut raster = Raster::filled(1, 1, f64::NAN);
        raster.set_nodata(Some(f64::NAN));
        if let Some(region) = self.bounds {
            raster.set_transform(GeoTransform::new(
                region.min_x,
                region.max_y,
                region.width(),
                -region.height(),
            ));
            raster.set_crs(Some(CRS::wgs84()));
        }
        raster
    }
}

/// GeoTIFF catalog on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    root: PathBuf,
    crs: CRS,
}

impl LocalCatalog {
    /// Rasters without their own CRS are assumed to be WGS84.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            crs: CRS::wgs84(),
        }
    }

    pub fn with_crs(mut self, crs: CRS) -> Self {
        self.crs = crs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn source_dir(&self, id: &str) -> Result<PathBuf> {
        let dir = self.root.join(id);
        if !dir.is_dir() {
            return Err(PipelineError::unavailable(
                id,
                format!("no such directory {}", dir.display()),
            ));
        }
        Ok(dir)
    }

    fn read_bands(&self, id: &str, dir: &Path, bands: &[String]) -> Result<BandStack> {
        let mut stack = BandStack::new();
        for band in bands {
            let path = dir.join(format!("{band}.tif"));
            debug!(source = id, path = %path.display(), "reading band");
            let raster: Raster<f64> = read_geotiff(&path)
                .map_err(|e| PipelineError::unavailable(id, format!("{}: {e}", path.display())))?;
            let mut raster = raster.to_f64();
            if raster.crs().is_none() {
                raster.set_crs(Some(self.crs.clone()));
            }
            stack.push(band.as_str(), raster)?;
        }
        Ok(stack)
    }
}

/// Slice directories are named by day (`YYYY-MM-DD`, `YYYYMMDD`) or by
/// hour (`YYYY-MM-DDTHH`, `YYYY-MM-DDTHH:MM`).
fn parse_slice_time(name: &str) -> Option<NaiveDateTime> {
    let (day, time) = match name.split_once('T') {
        Some((day, time)) => (day, Some(time)),
        None => (name, None),
    };
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y%m%d"))
        .ok()?;
    let time = match time {
        None => NaiveTime::MIN,
        Some(hour) if hour.len() == 2 => NaiveTime::from_hms_opt(hour.parse().ok()?, 0, 0)?,
        Some(time) => NaiveTime::parse_from_str(time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H%M"))
            .ok()?,
    };
    Some(date.and_time(time))
}

impl Catalog for LocalCatalog {
    fn image(&self, id: &str, bands: &[String]) -> Result<BandStack> {
        let dir = self.source_dir(id)?;
        self.read_bands(id, &dir, bands)
    }

    fn collection(&self, id: &str, bands: &[String], window: &AnalysisWindow) -> Result<ImageCollection> {
        let dir = self.source_dir(id)?;
        let mut slices = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(parse_slice_time) {
                Some(acquired) => slices.push((acquired, entry.path())),
                None => warn!(source = id, entry = ?name, "skipping slice directory without a parsable date"),
            }
        }

        let listed = slices.len();
        slices.retain(|(acquired, _)| window.contains(acquired.date()));
        debug!(source = id, listed, in_window = slices.len(), "listed collection slices");

        let images = slices
            .into_par_iter()
            .map(|(acquired, path)| -> Result<Image> {
                Ok(Image {
                    acquired,
                    bands: self.read_bands(id, &path, bands)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ImageCollection::new(id, bands.to_vec(), images))
    }
}

/// In-memory catalog for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    images: HashMap<String, BandStack>,
    collections: HashMap<String, Vec<Image>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&mut self, id: impl Into<String>, bands: BandStack) {
        self.images.insert(id.into(), bands);
    }

    /// Add one daily slice to a collection, creating it if needed.
    pub fn insert_slice(&mut self, id: impl Into<String>, date: NaiveDate, bands: BandStack) {
        self.insert_slice_at(id, date.and_time(NaiveTime::MIN), bands);
    }

    /// Add one slice acquired at `acquired`.
    pub fn insert_slice_at(&mut self, id: impl Into<String>, acquired: NaiveDateTime, bands: BandStack) {
        self.collections
            .entry(id.into())
            .or_default()
            .push(Image { acquired, bands });
    }
}

impl Catalog for MemoryCatalog {
    fn image(&self, id: &str, bands: &[String]) -> Result<BandStack> {
        let stack = self
            .images
            .get(id)
            .ok_or_else(|| PipelineError::unavailable(id, "unknown image id"))?;
        stack
            .select(bands)
            .map_err(|e| PipelineError::unavailable(id, e.to_string()))
    }

    fn collection(&self, id: &str, bands: &[String], window: &AnalysisWindow) -> Result<ImageCollection> {
        let images = self
            .collections
            .get(id)
            .ok_or_else(|| PipelineError::unavailable(id, "unknown collection id"))?;
        ImageCollection::new(id, bands.to_vec(), images.clone())
            .filter_date(window)
            .select(bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_log;
    use terramex_core::io::write_geotiff;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    fn year() -> AnalysisWindow {
        AnalysisWindow::parse("2023-01-01", "2024-01-01").unwrap()
    }

    fn slice(value: f64) -> BandStack {
        let mut r = Raster::filled(4, 4, value);
        r.set_transform(GeoTransform::new(-100.0, 20.0, 0.5, -0.5));
        BandStack::compose([("ssm", r.clone()), ("susm", r)]).unwrap()
    }

    fn memory() -> MemoryCatalog {
        let mut cat = MemoryCatalog::new();
        for (m, d, v) in [(5, 31, 100.0), (6, 1, 1.0), (7, 15, 3.0), (10, 31, 100.0)] {
            cat.insert_slice("SMAP", date(m, d), slice(v));
        }
        cat
    }

    fn names(bands: &[&str]) -> Vec<String> {
        bands.iter().map(|b| b.to_string()).collect()
    }

    fn write_slice(root: &Path, id: &str, name: &str, raster: &Raster<f64>) {
        let d = root.join(id).join(name);
        std::fs::create_dir_all(&d).unwrap();
        write_geotiff(raster, d.join("t.tif")).unwrap();
    }

    #[test]
    fn window_is_half_open() {
        let col = memory()
            .collection("SMAP", &names(&["ssm"]), &AnalysisWindow::flood_season_2023())
            .unwrap();
        assert_eq!(col.size(), 2);
        let mean = col.reduce(Reducer::Mean).unwrap();
        assert_eq!(mean.names(), ["ssm"]);
        assert_eq!(mean.band("ssm").unwrap().get(0, 0).unwrap(), 2.0);

        let narrowed = col.filter_date(&AnalysisWindow::parse("2023-07-01", "2023-08-01").unwrap());
        assert_eq!(narrowed.images()[0].date(), date(7, 15));
        assert_eq!(narrowed.size(), 1);
    }

    #[test]
    fn std_dev_bands_get_suffix() {
        let col = memory()
            .collection("SMAP", &names(&["ssm", "susm"]), &AnalysisWindow::flood_season_2023())
            .unwrap();
        let std = col.reduce(Reducer::StdDev).unwrap();
        assert_eq!(std.names(), ["ssm_stdDev", "susm_stdDev"]);
        assert_eq!(std.band("ssm_stdDev").unwrap().get(1, 1).unwrap(), 1.0);
    }

    #[test]
    fn empty_collection_reduces_to_missing_bands() {
        let region = Region::mexico();
        let window = AnalysisWindow::parse("2022-01-01", "2022-02-01").unwrap();
        let col = memory()
            .collection("SMAP", &names(&["ssm", "susm"]), &window)
            .unwrap()
            .filter_bounds(&region);
        assert!(col.is_empty());

        let (out, logged) = test_log::warnings(|| col.reduce(Reducer::StdDev).unwrap());
        assert!(logged.contains("no images matched the filters"));
        assert!(logged.contains("SMAP"));

        assert_eq!(out.names(), ["ssm_stdDev", "susm_stdDev"]);
        let band = out.band("ssm_stdDev").unwrap();
        assert!(band.is_all_missing());
        assert!(band.crs().unwrap().is_geographic());
        assert_eq!(band.bounds().0, region.min_x);
        assert!(band.value_at_geo(-100.0, 20.0).is_none());
    }

    #[test]
    fn filter_bounds_drops_disjoint_slices() {
        let far = Region::from_coords([10.0, 10.0, 11.0, 11.0]).unwrap();
        let col = memory()
            .collection("SMAP", &names(&["ssm"]), &year())
            .unwrap()
            .filter_bounds(&far);
        assert!(col.is_empty());
    }

    #[test]
    fn unknown_sources_and_bands_are_unavailable() {
        let cat = memory();
        assert!(matches!(
            cat.collection("NOPE", &names(&["ssm"]), &year()),
            Err(PipelineError::SourceUnavailable { .. })
        ));
        assert!(matches!(
            cat.collection("SMAP", &names(&["smp"]), &year()),
            Err(PipelineError::SourceUnavailable { .. })
        ));
        assert!(cat.image("SMAP", &names(&["ssm"])).is_err());
    }

    #[test]
    fn map_runs_on_every_slice() {
        let col = memory()
            .collection("SMAP", &names(&["ssm"]), &year())
            .unwrap()
            .map(|b| b.map_bands(|r| Ok(r.map_valid(|v| v * 2.0))))
            .unwrap();
        let sum = col.reduce(Reducer::Sum).unwrap();
        assert_eq!(sum.band("ssm").unwrap().get(0, 0).unwrap(), 408.0);
    }

    #[test]
    fn local_catalog_reads_images_and_dated_slices() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let dem_dir = root.join("USGS/SRTMGL1_003");
        std::fs::create_dir_all(&dem_dir).unwrap();
        let mut dem = Raster::filled(3, 3, 250.0);
        dem.set_transform(GeoTransform::new(-100.0, 20.0, 0.1, -0.1));
        write_geotiff(&dem, dem_dir.join("elevation.tif")).unwrap();

        for name in ["2023-06-02", "20230703"] {
            let d = root.join("UCSB-CHG/CHIRPS/DAILY").join(name);
            std::fs::create_dir_all(&d).unwrap();
            write_geotiff(&dem, d.join("precipitation.tif")).unwrap();
        }

        let cat = LocalCatalog::new(root);
        let img = cat.image("USGS/SRTMGL1_003", &names(&["elevation"])).unwrap();
        let elev = img.band("elevation").unwrap();
        assert_eq!(elev.get(1, 1).unwrap(), 250.0);
        assert!(elev.crs().unwrap().is_geographic());

        let col = cat
            .collection("UCSB-CHG/CHIRPS/DAILY", &names(&["precipitation"]), &year())
            .unwrap();
        assert_eq!(col.size(), 2);
        assert_eq!(col.images()[0].date(), date(6, 2));
        assert_eq!(col.images()[1].date(), date(7, 3));

        assert!(matches!(
            cat.image("USGS/SRTMGL1_003", &names(&["slope"])),
            Err(PipelineError::SourceUnavailable { .. })
        ));
        assert!(cat.image("MISSING/ID", &names(&["b"])).is_err());
    }

    #[test]
    fn slices_outside_the_window_are_never_read() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let raster = Raster::filled(2, 2, 1.0);
        write_slice(root, "ERA5", "2023-06-02", &raster);

        let stale = root.join("ERA5/2019-01-01");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("t.tif"), b"not a tiff").unwrap();

        let cat = LocalCatalog::new(root);
        let window = AnalysisWindow::flood_season_2023();
        let col = cat.collection("ERA5", &names(&["t"]), &window).unwrap();
        assert_eq!(col.size(), 1);

        let everything = AnalysisWindow::parse("2019-01-01", "2024-01-01").unwrap();
        assert!(matches!(
            cat.collection("ERA5", &names(&["t"]), &everything),
            Err(PipelineError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn hourly_slices_load_in_time_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for (name, value) in [("2023-06-02T01", 1.0), ("2023-06-02T00", 0.0), ("2023-06-02T13:30", 2.0)] {
            write_slice(root, "ERA5_HOURLY", name, &Raster::filled(2, 2, value));
        }

        let cat = LocalCatalog::new(root);
        let col = cat
            .collection("ERA5_HOURLY", &names(&["t"]), &AnalysisWindow::flood_season_2023())
            .unwrap();
        assert_eq!(col.size(), 3);
        let hours: Vec<String> = col.images().iter().map(|img| img.acquired.format("%H:%M").to_string()).collect();
        assert_eq!(hours, ["00:00", "01:00", "13:30"]);
        assert_eq!(col.images()[2].bands.band("t").unwrap().get(0, 0).unwrap(), 2.0);
    }

    #[test]
    fn unparsable_slice_names_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_slice(root, "CHIRPS", "2023-06-02", &Raster::filled(2, 2, 1.0));
        write_slice(root, "CHIRPS", "notes", &Raster::filled(2, 2, 1.0));
        write_slice(root, "CHIRPS", "2023-06-02T99", &Raster::filled(2, 2, 1.0));

        let cat = LocalCatalog::new(root);
        let (col, logged) = test_log::warnings(|| {
            cat.collection("CHIRPS", &names(&["t"]), &AnalysisWindow::flood_season_2023())
                .unwrap()
        });
        assert_eq!(col.size(), 1);
        assert!(logged.contains("notes"));
        assert!(logged.contains("2023-06-02T99"));
    }

    #[test]
    fn slice_names_parse_days_and_hours() {
        let at = |h, m| date(6, 2).and_hms_opt(h, m, 0).unwrap();
        assert_eq!(parse_slice_time("2023-06-02"), Some(at(0, 0)));
        assert_eq!(parse_slice_time("20230602"), Some(at(0, 0)));
        assert_eq!(parse_slice_time("2023-06-02T07"), Some(at(7, 0)));
        assert_eq!(parse_slice_time("2023-06-02T07:45"), Some(at(7, 45)));
        assert_eq!(parse_slice_time("2023-06-02T0745"), Some(at(7, 45)));
        assert_eq!(parse_slice_time("2023-06-02T24"), None);
        assert_eq!(parse_slice_time("June"), None);
    }
}
