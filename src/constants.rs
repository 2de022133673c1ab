//! Physical and chemical constants, plus other needed global values.

/// Acceleration due to gravity [m s-2]
pub const G: f64 = 9.80665;

/// "Equal area" radius of the Earth [km].
/// Gives the correct total surface area when modeled as a sphere.
pub const R_EARTH: f64 = 6371.0072;

/// Avogadro's number [mol-1]
pub const AVOGADRO: f64 = 6.022140857e+23;

/// Typical molar mass of air [kg mol-1]
pub const MW_AIR: f64 = 28.9644e-3;

/// Molar mass of air [g mol-1]
pub const MW_AIR_G: f64 = 28.9644;

/// Molar mass of water [kg mol-1]
pub const MW_H2O: f64 = 18.016e-3;

/// netCDF variables that we should skip reading (cubed-sphere grid
/// specification, not science data).
pub const SKIP_THESE_VARS: [&str; 5] = [
    "anchor",
    "ncontact",
    "orientation",
    "contacts",
    "cubed_sphere",
];
