//! Comparison reports between a "Ref" and a "Dev" model run.

use std::collections::BTreeMap;

use float_cmp::{ApproxEq, F64Margin};

use crate::dataset::Collection;
use crate::error::Error;

/// Decimal places printed for global statistics.
const STAT_DECIMALS: usize = 20;

/// Shape and global statistics of one variable's values.
#[derive(Debug, Clone, PartialEq)]
pub struct StatSummary {
    pub shape: Vec<usize>,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl StatSummary {
    /// Whether the statistics (not the shapes) of two summaries agree to
    /// within floating-point tolerance.
    pub fn matches(&self, other: &StatSummary) -> bool {
        let margin = F64Margin {
            ulps: 2,
            epsilon: 1e-30,
        };
        self.mean.approx_eq(other.mean, margin)
            && self.min.approx_eq(other.min, margin)
            && self.max.approx_eq(other.max, margin)
            && self.sum.approx_eq(other.sum, margin)
    }
}

/// Compute the global statistics of one variable in a dataset.
pub fn summarize(data: &Collection, label: &str, varname: &str) -> Result<StatSummary, Error> {
    let var = data.variable(varname).ok_or_else(|| Error::MissingVariable {
        name: varname.to_string(),
        dataset: label.to_string(),
    })?;

    let mut sum = 0.0_f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut count = 0_usize;
    for &v in var.data.iter() {
        sum += v;
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
        count += 1;
    }

    Ok(StatSummary {
        shape: var.shape().to_vec(),
        mean: sum / count as f64,
        min,
        max,
        sum,
    })
}

/// Print units, array sizes and global statistics of `varname` in the Ref
/// and Dev datasets, then a verdict on whether the statistics agree.
/// Read-only; neither dataset is modified.
pub fn compare_stats(
    refdata: &Collection,
    refstr: &str,
    devdata: &Collection,
    devstr: &str,
    varname: &str,
) -> Result<bool, Error> {
    let refsum = summarize(refdata, refstr, varname)?;
    let devsum = summarize(devdata, devstr, varname)?;
    let refunits = &refdata.variable(varname).unwrap().units;
    let devunits = &devdata.variable(varname).unwrap().units;

    println!("Data units:");
    println!("    {}:  {}", refstr, refunits);
    println!("    {}:  {}", devstr, devunits);
    println!("Array sizes:");
    println!("    {}:  {:?}", refstr, refsum.shape);
    println!("    {}:  {:?}", devstr, devsum.shape);
    println!("Global stats:");
    println!("  Mean:");
    println!("    {}:  {:.*}", refstr, STAT_DECIMALS, refsum.mean);
    println!("    {}:  {:.*}", devstr, STAT_DECIMALS, devsum.mean);
    println!("  Min:");
    println!("    {}:  {:.*}", refstr, STAT_DECIMALS, refsum.min);
    println!("    {}:  {:.*}", devstr, STAT_DECIMALS, devsum.min);
    println!("  Max:");
    println!("    {}:  {:.*}", refstr, STAT_DECIMALS, refsum.max);
    println!("    {}:  {:.*}", devstr, STAT_DECIMALS, devsum.max);
    println!("  Sum:");
    println!("    {}:  {:.*}", refstr, STAT_DECIMALS, refsum.sum);
    println!("    {}:  {:.*}", devstr, STAT_DECIMALS, devsum.sum);

    let same = refsum.matches(&devsum);
    if same {
        println!("{} and {} statistics for {} agree", refstr, devstr, varname);
    } else {
        println!("{} and {} statistics for {} differ", refstr, devstr, varname);
    }
    Ok(same)
}

/// Overlap between the variable sets of two collections.
#[derive(Debug, Clone, Default)]
pub struct VarOverlap {
    /// Variables present in both, sorted alphanumerically.
    pub common: Vec<String>,
    /// Variables only in the Ref dataset, in dataset order.
    pub ref_only: Vec<String>,
    /// Variables only in the Dev dataset, in dataset order.
    pub dev_only: Vec<String>,
    /// Common variables whose array rank differs between the two.
    pub dim_mismatch: Vec<String>,
    /// Common variables bucketed by their actual array rank (Ref side).
    pub by_rank: BTreeMap<usize, Vec<String>>,
}

/// Work out which variables the two collections share, which are one-sided,
/// and where the dimensionality disagrees.
pub fn compare_varnames(refdata: &Collection, devdata: &Collection, verbosity: i8) -> VarOverlap {
    let mut overlap = VarOverlap::default();

    for name in refdata.variable_names() {
        if devdata.variable(name).is_some() {
            overlap.common.push(name.to_string());
        } else {
            overlap.ref_only.push(name.to_string());
        }
    }
    for name in devdata.variable_names() {
        if refdata.variable(name).is_none() {
            overlap.dev_only.push(name.to_string());
        }
    }
    overlap.common.sort_unstable();

    for name in &overlap.common {
        let refvar = refdata.variable(name).unwrap();
        let devvar = devdata.variable(name).unwrap();
        if refvar.ndim() != devvar.ndim() {
            overlap.dim_mismatch.push(name.clone());
        }
        overlap
            .by_rank
            .entry(refvar.ndim())
            .or_insert_with(Vec::new)
            .push(name.clone());
    }

    if verbosity >= 0 {
        overlap.print_report();
    }
    overlap
}

impl VarOverlap {
    fn print_report(&self) {
        println!("{} common variables", self.common.len());
        if !self.ref_only.is_empty() {
            println!("{} variables in ref only (skip)", self.ref_only.len());
            println!("   Variable names: {:?}", self.ref_only);
        } else {
            println!("0 variables in ref only");
        }
        if !self.dev_only.is_empty() {
            println!("{} variables in dev only (skip)", self.dev_only.len());
            println!("   Variable names: {:?}", self.dev_only);
        } else {
            println!("0 variables in dev only");
        }
        if !self.dim_mismatch.is_empty() {
            println!(
                "{} common variables have different dimensions",
                self.dim_mismatch.len()
            );
            println!("   Variable names: {:?}", self.dim_mismatch);
        } else {
            println!("All variables have same dimensions in ref and dev");
        }
    }
}
