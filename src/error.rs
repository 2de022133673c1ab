use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading, renaming, or comparing GEOS-Chem output.
#[derive(Debug, Error)]
pub enum Error {
    /// File extension not recognized by the format dispatcher.
    #[error("found unknown file extension ({0}); please pass a BPCH or netCDF file with extension 'bpch', 'nc', or 'nc4'")]
    UnsupportedFormat(String),

    /// A referenced input path does not exist.
    #[error("path does not exist: {}", .0.display())]
    MissingPath(PathBuf),

    /// Two legacy variables would be renamed onto the same target name.
    #[error("variables '{first}' and '{second}' would both become '{target}'")]
    DuplicateTarget {
        target: String,
        first: String,
        second: String,
    },

    /// A log line mentioned the data directory but no path could be parsed from it.
    #[error("{file}:{line}: cannot parse a path reference from log line: {text}")]
    MalformedLog {
        file: String,
        line: usize,
        text: String,
    },

    /// A name table (embedded or user-supplied) failed to parse.
    #[error("malformed name table at line {line}: {reason}")]
    Table { line: usize, reason: String },

    /// A lat/lon resolution string such as "4x5" failed to parse.
    #[error("invalid lat/lon resolution '{0}'; expected e.g. '4x5' or '0.25x0.3125'")]
    InvalidResolution(String),

    /// A variable expected in a dataset was not found.
    #[error("variable '{name}' not found in {dataset}")]
    MissingVariable { name: String, dataset: String },

    /// The legacy binary punch file could not be decoded.
    #[error("bad bpch file: {0}")]
    Bpch(String),

    #[error("{0}")]
    InvalidData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("netCDF error: {0}")]
    NetCdf(#[from] netcdf::error::Error),
}
