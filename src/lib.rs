//! Utilities for post-processing GEOS-Chem model output.
//!
//! The centerpiece is the [`naming`] module, which harmonizes the variable
//! names of the legacy binary punch ("bpch") diagnostics with the netCDF
//! naming convention of current GEOS-Chem output, so that benchmark runs in
//! either format can be compared side by side. Around it sit loaders for
//! both formats ([`io`], [`bpch`]), comparison reports ([`stats`]), lat/lon
//! grid construction ([`grid`]) and a builder for S3 data-download scripts
//! ([`aws`]).

pub mod aws;
pub mod bpch;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod io;
pub mod naming;
pub mod stats;

pub use crate::dataset::{Collection, Variable};
pub use crate::error::Error;
pub use crate::naming::{build_rename_plan, NameTables, RenamePlan, Rewrite};
