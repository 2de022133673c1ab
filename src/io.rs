//! Loading GEOS-Chem output files and locating them on disk.

use std::path::{Path, PathBuf};

use ndarray::Axis;

use crate::bpch;
use crate::constants::SKIP_THESE_VARS;
use crate::dataset::{Collection, Variable};
use crate::error::Error;

/// The two on-disk formats GEOS-Chem output comes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Bpch,
    NetCdf,
}

/// Decide how to read a file from its extension. No content sniffing: an
/// unrecognized extension is an immediate error.
pub fn format_for(filename: &Path) -> Result<Format, Error> {
    let ext = filename
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match ext {
        "bpch" => Ok(Format::Bpch),
        "nc" | "nc4" => Ok(Format::NetCdf),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

/// Options for opening a dataset. The bpch reader needs the tracerinfo and
/// diaginfo metadata files; by default they are looked up next to the data
/// file under their conventional names.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub tracerinfo_file: Option<PathBuf>,
    pub diaginfo_file: Option<PathBuf>,
}

/// Load and decode a dataset from an output file generated by GEOS-Chem,
/// choosing the reader from the file extension (.bpch, .nc or .nc4).
pub fn open_dataset<P: AsRef<Path>>(filename: P) -> Result<Collection, Error> {
    open_dataset_opts(filename.as_ref(), &OpenOptions::default())
}

pub fn open_dataset_opts(filename: &Path, opts: &OpenOptions) -> Result<Collection, Error> {
    match format_for(filename)? {
        Format::NetCdf => read_netcdf(filename),
        Format::Bpch => {
            let tracerinfo = metadata_path(filename, &opts.tracerinfo_file, "tracerinfo.dat")?;
            let diaginfo = metadata_path(filename, &opts.diaginfo_file, "diaginfo.dat")?;
            bpch::open_bpch(filename, &tracerinfo, &diaginfo)
        }
    }
}

fn metadata_path(
    datafile: &Path,
    explicit: &Option<PathBuf>,
    default_name: &str,
) -> Result<PathBuf, Error> {
    let path = match explicit {
        Some(p) => p.clone(),
        None => datafile
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(default_name),
    };
    if !path.exists() {
        return Err(Error::MissingPath(path));
    }
    Ok(path)
}

/// Load multiple GEOS-Chem output files as a single dataset, concatenating
/// each variable along its first axis (the time axis in GEOS-Chem output).
/// All files must share one extension and one variable set.
pub fn open_mfdataset<P: AsRef<Path>>(filenames: &[P]) -> Result<Collection, Error> {
    let first = filenames
        .first()
        .ok_or_else(|| Error::InvalidData("must pass a list with at least one filename".to_string()))?;
    // The first file decides the reader for the whole list.
    let format = format_for(first.as_ref())?;
    for f in filenames {
        if format_for(f.as_ref())? != format {
            return Err(Error::InvalidData(format!(
                "all files must share one extension; '{}' differs from '{}'",
                f.as_ref().display(),
                first.as_ref().display()
            )));
        }
    }

    let mut parts = Vec::with_capacity(filenames.len());
    for f in filenames {
        parts.push(open_dataset(f.as_ref())?);
    }
    let head = parts.remove(0);
    if parts.is_empty() {
        return Ok(head);
    }

    let mut out = Collection::new();
    for var in head.variables() {
        let mut arrays = vec![var.data.view()];
        for part in &parts {
            let other = part.variable(&var.name).ok_or_else(|| Error::MissingVariable {
                name: var.name.clone(),
                dataset: "a concatenation member".to_string(),
            })?;
            arrays.push(other.data.view());
        }
        let data = ndarray::concatenate(Axis(0), &arrays).map_err(|e| {
            Error::InvalidData(format!(
                "cannot concatenate '{}' along the record axis: {}",
                var.name, e
            ))
        })?;
        out.push(Variable::new(&var.name, &var.units, data))?;
    }
    // Variables that only appear in later files cannot be concatenated.
    for part in &parts {
        for var in part.variables() {
            if out.variable(&var.name).is_none() {
                return Err(Error::MissingVariable {
                    name: var.name.clone(),
                    dataset: format!("'{}'", filenames[0].as_ref().display()),
                });
            }
        }
    }
    Ok(out)
}

fn read_netcdf(filename: &Path) -> Result<Collection, Error> {
    let nch = netcdf::open(filename)?;
    let mut ds = Collection::new();
    for var in nch.variables() {
        let name = var.name();
        if SKIP_THESE_VARS.contains(&name.as_str()) {
            continue;
        }
        let units = match var.attribute("units") {
            Some(attr) => match attr.value() {
                Ok(netcdf::attribute::AttrValue::Str(s)) => s,
                _ => String::new(),
            },
            None => String::new(),
        };
        let data = var.values::<f64>(None, None)?;
        ds.push(Variable::new(&name, &units, data))?;
    }
    Ok(ds)
}

/// Path of a GEOS-Chem Classic output file for one collection and time.
/// The Emissions collection is written by HEMCO under its own name scheme.
pub fn gcc_filepath(outputdir: &Path, collection: &str, day: &str, time: &str) -> PathBuf {
    if collection == "Emissions" {
        outputdir.join(format!("HEMCO_diagnostics.{}{}.nc", day, time))
    } else {
        outputdir.join(format!("GEOSChem.{}.{}_{}z.nc4", collection, day, time))
    }
}

/// Report whether the Ref and Dev paths exist. Both paths are always
/// checked and reported; a missing first path never hides the second.
pub fn check_paths(refpath: &Path, devpath: &Path, verbosity: i8) -> (bool, bool) {
    let ref_ok = refpath.exists();
    let dev_ok = devpath.exists();
    if verbosity >= 0 {
        if ref_ok {
            println!("Path 1 exists: {}", refpath.display());
        } else {
            println!("ERROR! Path 1 does not exist: {}", refpath.display());
        }
        if dev_ok {
            println!("Path 2 exists: {}", devpath.display());
        } else {
            println!("ERROR! Path 2 does not exist: {}", devpath.display());
        }
    }
    (ref_ok, dev_ok)
}

/// Open the output file of one collection at one time, with an existence
/// check up front so a wrong day/time string gives a clear error.
pub fn collection_data(
    datadir: &Path,
    collection: &str,
    day: &str,
    time: &str,
) -> Result<Collection, Error> {
    let datafile = gcc_filepath(datadir, collection, day, time);
    if !datafile.exists() {
        return Err(Error::MissingPath(datafile));
    }
    open_dataset(&datafile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extensions_are_rejected_before_any_io() {
        match format_for(Path::new("/no/such/file.txt")) {
            Err(Error::UnsupportedFormat(ext)) => assert_eq!(ext, "txt"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(format_for(Path::new("no_extension")).is_err());
        assert_eq!(format_for(Path::new("a.bpch")).unwrap(), Format::Bpch);
        assert_eq!(format_for(Path::new("a.nc")).unwrap(), Format::NetCdf);
        assert_eq!(format_for(Path::new("a.nc4")).unwrap(), Format::NetCdf);
    }

    #[test]
    fn mfdataset_needs_at_least_one_file() {
        let none: [&Path; 0] = [];
        assert!(matches!(
            open_mfdataset(&none),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn mfdataset_rejects_mixed_extensions() {
        let files = [Path::new("a.nc"), Path::new("b.bpch")];
        assert!(matches!(
            open_mfdataset(&files),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn gcc_filepaths_follow_the_output_layout() {
        let dir = Path::new("/data/run");
        assert_eq!(
            gcc_filepath(dir, "SpeciesConc", "20190701", "0000"),
            PathBuf::from("/data/run/GEOSChem.SpeciesConc.20190701_0000z.nc4")
        );
        assert_eq!(
            gcc_filepath(dir, "Emissions", "20190701", "0000"),
            PathBuf::from("/data/run/HEMCO_diagnostics.201907010000.nc")
        );
    }

    #[test]
    fn both_paths_are_always_checked() {
        let (a, b) = check_paths(
            Path::new("/definitely/not/here"),
            Path::new("/"),
            -1,
        );
        assert!(!a);
        assert!(b);
        let (a, b) = check_paths(
            Path::new("/"),
            Path::new("/also/not/here"),
            -1,
        );
        assert!(a);
        assert!(!b);
    }

    #[test]
    fn missing_collection_file_is_reported() {
        match collection_data(Path::new("/nope"), "SpeciesConc", "20190701", "0000") {
            Err(Error::MissingPath(p)) => {
                assert!(p.to_string_lossy().contains("GEOSChem.SpeciesConc"))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
