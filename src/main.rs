use std::path::{Path, PathBuf};

use clap;

use gcpost::error::Error;
use gcpost::io::{self, Format, OpenOptions};
use gcpost::naming::{build_rename_plan, NameTables};
use gcpost::stats;
use gcpost::{aws, Collection};

/* Verbosity levels:

   -1 = no messages, just indicate by exit code
    0 = normal reports
    1 = add per-name rename diagnostics
    2 = everything
 */

// ******* //
// DRIVERS //
// ******* //

fn run_rename(
    file: &Path,
    tracerinfo: Option<&str>,
    diaginfo: Option<&str>,
    verbosity: i8,
) -> Result<bool, Error> {
    let opts = OpenOptions {
        tracerinfo_file: tracerinfo.map(PathBuf::from),
        diaginfo_file: diaginfo.map(PathBuf::from),
    };
    let ds = io::open_dataset_opts(file, &opts)?;
    let plan = build_rename_plan(ds.variable_names(), NameTables::bpch_to_netcdf());
    plan.print_report(verbosity);
    Ok(true)
}

/// Open a run's output for comparison; bpch variables are brought onto the
/// netCDF names first so both runs speak the same naming convention.
fn open_for_compare(file: &Path) -> Result<Collection, Error> {
    let ds = io::open_dataset(file)?;
    if io::format_for(file)? == Format::Bpch {
        let plan = build_rename_plan(ds.variable_names(), NameTables::bpch_to_netcdf());
        return ds.renamed(&plan);
    }
    Ok(ds)
}

fn run_compare(
    refpath: &Path,
    devpath: &Path,
    refstr: &str,
    devstr: &str,
    varname: &str,
    verbosity: i8,
) -> Result<bool, Error> {
    let (ref_ok, dev_ok) = io::check_paths(refpath, devpath, verbosity);
    if !ref_ok {
        return Err(Error::MissingPath(refpath.to_path_buf()));
    }
    if !dev_ok {
        return Err(Error::MissingPath(devpath.to_path_buf()));
    }

    let refdata = open_for_compare(refpath)?;
    let devdata = open_for_compare(devpath)?;

    stats::compare_varnames(&refdata, &devdata, verbosity);
    if verbosity >= 0 {
        println!();
    }
    let same = stats::compare_stats(&refdata, refstr, &devdata, devstr, varname)?;
    Ok(same)
}

fn run_s3_script(logs: &[&str], output: &str, verbosity: i8) -> Result<bool, Error> {
    let log_paths: Vec<&Path> = logs.iter().map(Path::new).collect();
    let mapping = aws::S3Mapping::default();
    let cmds = aws::s3_download_cmds_from_logs(&log_paths, &mapping)?;
    aws::write_s3_script(&cmds, output)?;
    if verbosity >= 0 {
        println!("Wrote {} download commands to {}", cmds.len(), output);
    }
    Ok(true)
}

// *********** //
// ENTRY POINT //
// *********** //

fn dispatch(clargs: &clap::ArgMatches, verbosity: i8) -> Result<bool, Error> {
    match clargs.subcommand() {
        ("rename", Some(sub)) => run_rename(
            Path::new(sub.value_of("file").unwrap()),
            sub.value_of("tracerinfo"),
            sub.value_of("diaginfo"),
            verbosity,
        ),
        ("compare", Some(sub)) => run_compare(
            Path::new(sub.value_of("ref").unwrap()),
            Path::new(sub.value_of("dev").unwrap()),
            sub.value_of("refstr").unwrap(),
            sub.value_of("devstr").unwrap(),
            sub.value_of("varname").unwrap(),
            verbosity,
        ),
        ("s3-script", Some(sub)) => {
            let logs: Vec<&str> = sub.values_of("logs").unwrap().collect();
            run_s3_script(&logs, sub.value_of("output").unwrap(), verbosity)
        }
        _ => unreachable!("clap enforces a subcommand"),
    }
}

fn main() {
    let yml = clap::load_yaml!("clargs.yml");
    let clargs = clap::App::from_yaml(yml)
        .version(clap::crate_version!())
        .get_matches();

    let nverb = clargs.occurrences_of("verbose");
    let nquiet = clargs.occurrences_of("quiet");
    let verbosity: i8 = if nquiet > 0 { -1 } else { nverb as i8 };

    match dispatch(&clargs, verbosity) {
        Ok(ok) => {
            if ok {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            std::process::exit(2);
        }
    }
}
