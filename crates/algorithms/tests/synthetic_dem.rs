//! Terrain and hydrology derivatives on a synthetic hill that has been
//! through a GeoTIFF round trip.

use approx::assert_relative_eq;
use terramex_algorithms::hydrology::{flow_accumulation, flow_direction, FLOW_NODATA};
use terramex_algorithms::statistics::{fill_gaps, GapFillParams};
use terramex_algorithms::terrain::{
    aspect, hillshade, roughness, slope, AspectParams, HillshadeParams, SlopeParams,
};
use terramex_core::io::{read_geotiff, write_geotiff};
use terramex_core::{GeoTransform, Raster, CRS};

const SIZE: usize = 41;

/// Gaussian hill centred in a 41x41 grid of 30 m cells
fn hill() -> Raster<f64> {
    let mut dem = Raster::new(SIZE, SIZE);
    dem.set_transform(GeoTransform::new(500_000.0, 2_000_000.0, 30.0, -30.0));
    dem.set_crs(Some(CRS::from_epsg(32614)));
    let c = (SIZE / 2) as f64;
    for row in 0..SIZE {
        for col in 0..SIZE {
            let d2 = (row as f64 - c).powi(2) + (col as f64 - c).powi(2);
            dem.set(row, col, 1000.0 + 400.0 * (-d2 / 120.0).exp()).unwrap();
        }
    }
    dem
}

fn roundtrip(dem: &Raster<f64>) -> Raster<f64> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hill.tif");
    write_geotiff(dem, &path).unwrap();
    read_geotiff::<f64, _>(&path).unwrap()
}

#[test]
fn geotiff_roundtrip_preserves_grid() {
    let dem = hill();
    let back = roundtrip(&dem);
    assert_eq!(back.shape(), dem.shape());
    assert_relative_eq!(back.cell_size(), 30.0);
    assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32614));
    assert_relative_eq!(back.get(20, 20).unwrap(), 1400.0, epsilon = 1e-3);
}

#[test]
fn slope_and_aspect_follow_the_hill() {
    let dem = roundtrip(&hill());
    let s = slope(&dem, SlopeParams::default()).unwrap();
    let a = aspect(&dem, AspectParams::default()).unwrap();

    // Summit is flat, flanks are not
    assert!(s.get(20, 20).unwrap() < 0.5);
    assert!(s.get(20, 28).unwrap() > 5.0);
    for &v in s.data().iter().filter(|v| v.is_finite()) {
        assert!((0.0..=90.0).contains(&v));
    }

    // East flank faces east, north flank faces north
    assert_relative_eq!(a.get(20, 28).unwrap(), 90.0, epsilon = 1.0);
    assert!(a.get(12, 20).unwrap() < 1.0 || a.get(12, 20).unwrap() > 359.0);
}

#[test]
fn hillshade_and_roughness_ranges() {
    let dem = hill();
    let h = hillshade(&dem, HillshadeParams::default()).unwrap();
    let r = roughness(&dem).unwrap();

    // Default sun in the west lights the west flank
    assert!(h.get(20, 12).unwrap() > h.get(20, 28).unwrap());
    assert!(h.get(0, 0).unwrap().is_nan());
    assert!(r.data().iter().filter(|v| v.is_finite()).all(|&v| v >= 0.0));
}

#[test]
fn everything_drains_off_the_hill() {
    let dem = hill();
    let fd = flow_direction(&dem).unwrap();
    assert!(fd.data().iter().all(|&c| c <= 8 || c == FLOW_NODATA));
    // The summit is the highest cell, so it drains somewhere
    assert_ne!(fd.get(20, 20).unwrap(), 0);

    let acc = flow_accumulation(&fd).unwrap();
    // The summit receives nothing
    assert_eq!(acc.get(20, 20).unwrap(), 0.0);
    let total_max = acc.data().iter().copied().fold(0.0, f64::max);
    assert!(total_max > 0.0);
}

#[test]
fn gaps_in_the_dem_are_filled_before_derivatives() {
    let mut dem = hill();
    dem.set(10, 10, f64::NAN).unwrap();
    assert!(slope(&dem, SlopeParams::default()).unwrap().get(10, 11).unwrap().is_nan());

    let filled = fill_gaps(&dem, GapFillParams::default()).unwrap();
    assert!(filled.get(10, 10).unwrap().is_finite());
    assert!(slope(&filled, SlopeParams::default()).unwrap().get(10, 11).unwrap().is_finite());
}
