//! Construction of global lat/lon grids from a resolution string.

use lazy_static::lazy_static;
use ndarray::Array1;
use regex::Regex;

use crate::error::Error;

/// A global latitude/longitude mesh: cell centers plus cell edges.
#[derive(Debug, Clone)]
pub struct LLGrid {
    pub lat: Array1<f64>,
    pub lon: Array1<f64>,
    pub lat_b: Array1<f64>,
    pub lon_b: Array1<f64>,
}

/// Build the global grid for a "DLATxDLON" resolution string, e.g. "4x5" or
/// "0.25x0.3125". Polar cells are half-size, so the latitude edges are
/// clamped to +/-90.
pub fn make_grid_ll(llres: &str) -> Result<LLGrid, Error> {
    lazy_static! {
        static ref RE: Regex =
            Regex::new(r"^(\d+(?:\.\d+)?)x(\d+(?:\.\d+)?)$").unwrap();
    }
    let caps = RE
        .captures(llres)
        .ok_or_else(|| Error::InvalidResolution(llres.to_string()))?;
    // The regex only admits plain decimal numbers, so parsing cannot fail.
    let dlat: f64 = caps.get(1).unwrap().as_str().parse().unwrap();
    let dlon: f64 = caps.get(2).unwrap().as_str().parse().unwrap();
    if dlat <= 0.0 || dlon <= 0.0 {
        return Err(Error::InvalidResolution(llres.to_string()));
    }

    let n_lon = (360.0 / dlon) as usize;
    let n_lat = (180.0 / dlat) as usize;

    let lon_b = Array1::linspace(-180.0 - dlon / 2.0, 180.0 - dlon / 2.0, n_lon + 1);
    let lat_b = Array1::linspace(-90.0 - dlat / 2.0, 90.0 + dlat / 2.0, n_lat + 2)
        .mapv(|v| v.max(-90.0).min(90.0));

    let lon = centers(&lon_b);
    let lat = centers(&lat_b);

    Ok(LLGrid { lat, lon, lat_b, lon_b })
}

fn centers(edges: &Array1<f64>) -> Array1<f64> {
    let inner: Vec<f64> = edges
        .as_slice()
        .expect("linspace output is contiguous")
        .windows(2)
        .map(|w| (w[0] + w[1]) / 2.0)
        .collect();
    Array1::from(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_by_five_grid_has_standard_sizes() {
        let grid = make_grid_ll("4x5").unwrap();
        assert_eq!(grid.lon.len(), 72);
        assert_eq!(grid.lat.len(), 46);
        assert_eq!(grid.lon_b.len(), 73);
        assert_eq!(grid.lat_b.len(), 47);
        // Edges clamped at the poles, so the polar centers sit inside.
        assert_eq!(grid.lat_b[0], -90.0);
        assert_eq!(grid.lat_b[46], 90.0);
        assert_eq!(grid.lat[0], -89.0);
        assert_eq!(grid.lat[45], 89.0);
        assert_eq!(grid.lon_b[0], -182.5);
        assert_eq!(grid.lon[0], -180.0);
    }

    #[test]
    fn fractional_resolutions_parse() {
        let grid = make_grid_ll("2x2.5").unwrap();
        assert_eq!(grid.lon.len(), 144);
        assert_eq!(grid.lat.len(), 91);
    }

    #[test]
    fn bad_resolution_strings_are_rejected() {
        assert!(make_grid_ll("4by5").is_err());
        assert!(make_grid_ll("x5").is_err());
        assert!(make_grid_ll("").is_err());
        assert!(make_grid_ll("0x5").is_err());
    }
}
