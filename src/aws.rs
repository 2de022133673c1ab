//! Builds bash scripts that download the input data referenced by a
//! GEOS-Chem or HEMCO log file from the s3://gcgrid archive, for use when
//! provisioning a fresh AWS instance.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::Error;

/// Fixed mapping from the local data-directory prefix to the remote object
/// storage prefix.
#[derive(Debug, Clone)]
pub struct S3Mapping {
    pub local_prefix: String,
    pub remote_prefix: String,
}

impl Default for S3Mapping {
    fn default() -> S3Mapping {
        S3Mapping {
            local_prefix: "/home/ubuntu/ExtData".to_string(),
            remote_prefix: "s3://gcgrid".to_string(),
        }
    }
}

impl S3Mapping {
    fn command_for(&self, local_path: &str) -> String {
        let rel = &local_path[self.local_prefix.len()..];
        format!(
            "aws s3 cp --request-payer=requester {}{} {}",
            self.remote_prefix, rel, local_path
        )
    }
}

/// Scan one or more log files for references to files under the local data
/// directory and return one download command per distinct file, in
/// first-seen order across all logs.
///
/// A line that mentions the data directory but does not contain a
/// well-formed path token fails the whole scan with
/// [`Error::MalformedLog`]; no lines are silently dropped.
pub fn s3_download_cmds_from_logs<P: AsRef<Path>>(
    log_files: &[P],
    mapping: &S3Mapping,
) -> Result<Vec<String>, Error> {
    let mut seen = HashSet::new();
    let mut cmds = Vec::new();
    for log_file in log_files {
        let log_file = log_file.as_ref();
        if !log_file.exists() {
            return Err(Error::MissingPath(log_file.to_path_buf()));
        }
        let reader = BufReader::new(File::open(log_file)?);
        let label = log_file.display().to_string();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            scan_line(&line, &label, lineno + 1, mapping, &mut seen, &mut cmds)?;
        }
    }
    Ok(cmds)
}

fn scan_line(
    line: &str,
    file_label: &str,
    lineno: usize,
    mapping: &S3Mapping,
    seen: &mut HashSet<String>,
    cmds: &mut Vec<String>,
) -> Result<(), Error> {
    if !line.contains(&mapping.local_prefix[..]) {
        return Ok(());
    }

    let mut found = false;
    for token in line.split_whitespace() {
        if let Some(rel) = token.strip_prefix(&mapping.local_prefix[..]) {
            // A bare directory reference carries no file to fetch.
            if rel.trim_matches('/').is_empty() {
                continue;
            }
            found = true;
            if seen.insert(token.to_string()) {
                cmds.push(mapping.command_for(token));
            }
        }
    }

    if !found {
        // The prefix appeared mid-token (or as a bare directory): the line
        // cannot be parsed into a usable path reference.
        return Err(Error::MalformedLog {
            file: file_label.to_string(),
            line: lineno,
            text: line.to_string(),
        });
    }
    Ok(())
}

/// Serialize the download commands as a bash script.
pub fn render_s3_script(cmds: &[String]) -> String {
    let mut script = String::from("#!/bin/bash\n\n");
    for cmd in cmds {
        script.push_str(cmd);
        script.push('\n');
    }
    script
}

/// Write the download script and mark it executable.
pub fn write_s3_script<P: AsRef<Path>>(cmds: &[String], script_name: P) -> Result<(), Error> {
    let script_name = script_name.as_ref();
    let mut fh = File::create(script_name)?;
    fh.write_all(render_s3_script(cmds).as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fh.metadata()?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(script_name, perms)?;
    }

    Ok(())
}
