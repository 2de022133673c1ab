//! Reader for the legacy GEOS-Chem binary punch ("bpch") diagnostic format.
//!
//! bpch files are big-endian Fortran sequential-access files: every record
//! is framed by a 4-byte length before and after. Variable names are not
//! stored in the file; each data block carries a diagnostic category and a
//! tracer number, which are resolved through the `diaginfo.dat` and
//! `tracerinfo.dat` metadata files written alongside the simulation output.

use std::collections::HashMap;
use std::convert::TryInto;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use ndarray::{ArrayD, Axis};

use crate::dataset::{Collection, Variable};
use crate::error::Error;

const FTYPE_MAGIC: &str = "CTM bin 02";

/// One tracer definition from tracerinfo.dat.
#[derive(Debug, Clone)]
pub struct TracerDef {
    pub name: String,
    pub scale: f64,
    pub unit: String,
}

/// Tracer definitions keyed by tracer number (diagnostic offset included).
#[derive(Debug, Clone, Default)]
pub struct TracerInfo {
    defs: HashMap<i64, TracerDef>,
}

impl TracerInfo {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<TracerInfo, Error> {
        let mut text = String::new();
        File::open(path.as_ref())?.read_to_string(&mut text)?;
        TracerInfo::parse(&text)
    }

    /// Parse the fixed-width tracerinfo.dat format:
    /// NAME (A8), 1X, FULLNAME (A30), MOLWT (ES10), C (I3), TRACER (I9),
    /// SCALE (ES10), 1X, UNIT (A40). Lines starting with '#' are comments.
    pub fn parse(text: &str) -> Result<TracerInfo, Error> {
        let mut defs = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let name = fixed_field(line, 0, 8, lineno)?.to_string();
            let tracer: i64 = fixed_field(line, 52, 61, lineno)?
                .parse()
                .map_err(|_| table_err(lineno, line, "tracer number"))?;
            let scale: f64 = fixed_field(line, 61, 71, lineno)?
                .parse()
                .map_err(|_| table_err(lineno, line, "scale factor"))?;
            let unit = line.get(72..).unwrap_or("").trim().to_string();
            defs.insert(tracer, TracerDef { name, scale, unit });
        }
        Ok(TracerInfo { defs })
    }

    pub fn get(&self, tracer: i64) -> Option<&TracerDef> {
        self.defs.get(&tracer)
    }
}

/// Per-category tracer-number offsets from diaginfo.dat.
#[derive(Debug, Clone, Default)]
pub struct DiagInfo {
    offsets: HashMap<String, i64>,
}

impl DiagInfo {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DiagInfo, Error> {
        let mut text = String::new();
        File::open(path.as_ref())?.read_to_string(&mut text)?;
        DiagInfo::parse(&text)
    }

    /// Parse the fixed-width diaginfo.dat format:
    /// OFFSET (I8), 1X, CATEGORY (A40), 1X, COMMENT.
    pub fn parse(text: &str) -> Result<DiagInfo, Error> {
        let mut offsets = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let offset: i64 = fixed_field(line, 0, 8, lineno)?
                .parse()
                .map_err(|_| table_err(lineno, line, "offset"))?;
            let category = line
                .get(9..49)
                .unwrap_or_else(|| line.get(9..).unwrap_or(""))
                .trim()
                .to_string();
            if category.is_empty() {
                return Err(table_err(lineno, line, "category"));
            }
            offsets.insert(category, offset);
        }
        Ok(DiagInfo { offsets })
    }

    pub fn offset(&self, category: &str) -> Option<i64> {
        self.offsets.get(category).copied()
    }
}

fn fixed_field(line: &str, start: usize, end: usize, lineno: usize) -> Result<&str, Error> {
    let end = end.min(line.len());
    line.get(start..end)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| table_err(lineno, line, "truncated line"))
}

fn table_err(lineno: usize, line: &str, what: &str) -> Error {
    Error::Table {
        line: lineno + 1,
        reason: format!("cannot parse {} from '{}'", what, line),
    }
}

/// Open a bpch file and load every data block into a [`Collection`].
///
/// Variable names are formed as `CATEGORY_TRACERNAME` with the category
/// sanitized for netCDF ('-' becomes '_', '$' becomes 'S'). Blocks repeated
/// for the same variable (multiple output times) are stacked along a new
/// leading axis. Tracer scale factors are applied to the values.
pub fn open_bpch(
    filename: &Path,
    tracerinfo_file: &Path,
    diaginfo_file: &Path,
) -> Result<Collection, Error> {
    let tracerinfo = TracerInfo::from_file(tracerinfo_file)?;
    let diaginfo = DiagInfo::from_file(diaginfo_file)?;
    let mut reader = BufReader::new(File::open(filename)?);
    read_bpch_stream(&mut reader, &tracerinfo, &diaginfo)
}

fn read_bpch_stream<R: Read>(
    reader: &mut R,
    tracerinfo: &TracerInfo,
    diaginfo: &DiagInfo,
) -> Result<Collection, Error> {
    let ftype = read_record(reader)?
        .ok_or_else(|| Error::Bpch("file is empty".to_string()))?;
    let ftype_str = latin1(&ftype);
    if !ftype_str.trim_start().starts_with(FTYPE_MAGIC) {
        return Err(Error::Bpch(format!(
            "unsupported file type '{}' (expected '{}')",
            ftype_str.trim(),
            FTYPE_MAGIC
        )));
    }
    // Top title record, unused.
    read_record(reader)?
        .ok_or_else(|| Error::Bpch("missing title record".to_string()))?;

    // Blocks in file order; each holds the per-time arrays for one variable.
    let mut order: Vec<String> = Vec::new();
    let mut blocks: HashMap<String, (String, Vec<ArrayD<f64>>)> = HashMap::new();

    loop {
        // Model description record (modelname, resolution, grid flags).
        let model_rec = match read_record(reader)? {
            Some(rec) => rec,
            None => break,
        };
        if model_rec.len() != 36 {
            return Err(Error::Bpch(format!(
                "model header record has {} bytes, expected 36",
                model_rec.len()
            )));
        }

        let desc = read_record(reader)?
            .ok_or_else(|| Error::Bpch("truncated file: missing data block descriptor".to_string()))?;
        if desc.len() != 168 {
            return Err(Error::Bpch(format!(
                "data block descriptor has {} bytes, expected 168",
                desc.len()
            )));
        }

        let category = latin1(&desc[0..40]).trim().to_string();
        let tracer = i64::from(get_i32(&desc, 40));
        let unit = latin1(&desc[44..84]).trim().to_string();
        // tau0/tau1 (f64 at 84/92) and the reserved field are not needed.
        let ni = get_i32(&desc, 140) as usize;
        let nj = get_i32(&desc, 144) as usize;
        let nl = get_i32(&desc, 148) as usize;

        let offset = diaginfo.offset(&category).ok_or_else(|| {
            Error::Bpch(format!("category '{}' not found in diaginfo", category))
        })?;
        let tracerdef = tracerinfo.get(tracer + offset).ok_or_else(|| {
            Error::Bpch(format!(
                "tracer {} (category '{}') not found in tracerinfo",
                tracer + offset,
                category
            ))
        })?;

        let data_rec = read_record(reader)?
            .ok_or_else(|| Error::Bpch("truncated file: missing data record".to_string()))?;
        let n_values = ni * nj * nl;
        if data_rec.len() != n_values * 4 {
            return Err(Error::Bpch(format!(
                "data record has {} bytes, expected {} ({}x{}x{} values)",
                data_rec.len(),
                n_values * 4,
                ni,
                nj,
                nl
            )));
        }

        let values: Vec<f64> = data_rec
            .chunks_exact(4)
            .map(|c| f64::from(f32::from_be_bytes(c.try_into().unwrap())) * tracerdef.scale)
            .collect();
        // Fortran order with i fastest; [nl, nj, ni] keeps that layout,
        // surface-only blocks drop the level axis.
        let shape = if nl > 1 { vec![nl, nj, ni] } else { vec![nj, ni] };
        let array = ArrayD::from_shape_vec(shape, values)
            .map_err(|e| Error::Bpch(format!("bad data block shape: {}", e)))?;

        let varname = format!("{}_{}", sanitize_category(&category), tracerdef.name);
        let units = if unit.is_empty() {
            tracerdef.unit.clone()
        } else {
            unit
        };

        let entry = blocks.entry(varname.clone()).or_insert_with(|| {
            order.push(varname.clone());
            (units, Vec::new())
        });
        entry.1.push(array);
    }

    let mut ds = Collection::new();
    for name in order {
        // Present in blocks by construction.
        let (units, arrays) = blocks.remove(&name).unwrap();
        let data = if arrays.len() == 1 {
            arrays.into_iter().next().unwrap()
        } else {
            let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
            ndarray::stack(Axis(0), &views).map_err(|e| {
                Error::Bpch(format!("time slices of '{}' have mixed shapes: {}", name, e))
            })?
        };
        ds.push(Variable::new(&name, &units, data))?;
    }
    Ok(ds)
}

/// Map a bpch diagnostic category to its netCDF-safe spelling.
fn sanitize_category(category: &str) -> String {
    category.replace('-', "_").replace('$', "S")
}

/// Read one Fortran sequential record. Returns None on a clean end of file;
/// anything else that cuts a record short is an error.
fn read_record<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, Error> {
    let mut lenbuf = [0u8; 4];
    match reader.read_exact(&mut lenbuf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(lenbuf) as usize;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;
    let mut tailbuf = [0u8; 4];
    reader.read_exact(&mut tailbuf)?;
    let tail = u32::from_be_bytes(tailbuf) as usize;
    if tail != len {
        return Err(Error::Bpch(format!(
            "record framing mismatch ({} vs {} bytes); not a Fortran sequential file?",
            len, tail
        )));
    }
    Ok(Some(data))
}

fn get_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

/// bpch text fields are fixed-width byte arrays; treat them as latin-1 so
/// stray bytes cannot fail the read.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ti_line(name: &str, fullname: &str, tracer: i64, scale: &str, unit: &str) -> String {
        // NAME (A8), 1X, FULLNAME (A30), MOLWT (ES10), C (I3), TRACER (I9),
        // SCALE (ES10), 1X, UNIT (A40)
        format!(
            "{:<8} {:<30}{:>10}{:>3}{:>9}{:>10} {:<40}",
            name, fullname, "2.800E-02", 1, tracer, scale, unit
        )
    }

    fn tracerinfo_text() -> String {
        format!(
            "#NAME   FULLNAME MOLWT C TRACER SCALE UNIT\n{}\n{}\n",
            ti_line("NO", "Nitric oxide", 1, "1.000E+00", "ppbv"),
            ti_line("O3", "Ozone", 2, "2.000E+00", "ppbv"),
        )
    }

    fn diaginfo_text() -> String {
        // OFFSET (I8), 1X, CATEGORY (A40), 1X, COMMENT
        format!(
            "#OFFSET CATEGORY COMMENT\n{:>8} {:<40} {}\n{:>8} {:<40} {}\n",
            0, "IJ-AVG-$", "Tracer concentration",
            100, "DRYD-VEL", "Dry deposition velocity",
        )
    }

    fn push_record(out: &mut Vec<u8>, data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    }

    fn padded(text: &str, width: usize) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(width, b' ');
        bytes
    }

    fn descriptor(category: &str, tracer: i32, unit: &str, dims: [i32; 3]) -> Vec<u8> {
        let mut desc = Vec::new();
        desc.extend_from_slice(&padded(category, 40));
        desc.extend_from_slice(&tracer.to_be_bytes());
        desc.extend_from_slice(&padded(unit, 40));
        desc.extend_from_slice(&0.0_f64.to_be_bytes()); // tau0
        desc.extend_from_slice(&0.0_f64.to_be_bytes()); // tau1
        desc.extend_from_slice(&padded("", 40)); // reserved
        for d in &dims {
            desc.extend_from_slice(&d.to_be_bytes());
        }
        for first in &[1_i32, 1, 1] {
            desc.extend_from_slice(&first.to_be_bytes());
        }
        let nskip = dims.iter().product::<i32>() * 4 + 8;
        desc.extend_from_slice(&nskip.to_be_bytes());
        desc
    }

    fn data_record(values: &[f32]) -> Vec<u8> {
        let mut rec = Vec::new();
        for v in values {
            rec.extend_from_slice(&v.to_be_bytes());
        }
        rec
    }

    fn model_record() -> Vec<u8> {
        let mut rec = padded("GEOS5_47L", 20);
        rec.extend_from_slice(&5.0_f32.to_be_bytes());
        rec.extend_from_slice(&4.0_f32.to_be_bytes());
        rec.extend_from_slice(&1_i32.to_be_bytes());
        rec.extend_from_slice(&1_i32.to_be_bytes());
        rec
    }

    fn sample_file(blocks: &[(&str, i32, &str, [i32; 3], Vec<f32>)]) -> Vec<u8> {
        let mut file = Vec::new();
        push_record(&mut file, &padded(FTYPE_MAGIC, 40));
        push_record(&mut file, &padded("GEOS-Chem test output", 80));
        for (category, tracer, unit, dims, values) in blocks {
            push_record(&mut file, &model_record());
            push_record(&mut file, &descriptor(category, *tracer, unit, *dims));
            push_record(&mut file, &data_record(values));
        }
        file
    }

    #[test]
    fn metadata_files_parse() {
        let ti = TracerInfo::parse(&tracerinfo_text()).unwrap();
        let o3 = ti.get(2).unwrap();
        assert_eq!(o3.name, "O3");
        assert_eq!(o3.scale, 2.0);
        assert_eq!(o3.unit, "ppbv");
        assert!(ti.get(3).is_none());

        let di = DiagInfo::parse(&diaginfo_text()).unwrap();
        assert_eq!(di.offset("IJ-AVG-$"), Some(0));
        assert_eq!(di.offset("DRYD-VEL"), Some(100));
        assert_eq!(di.offset("NOPE"), None);
    }

    #[test]
    fn reads_a_block_with_scaling_and_sanitized_name() {
        let bytes = sample_file(&[(
            "IJ-AVG-$",
            2,
            "ppbv",
            [2, 1, 1],
            vec![1.5, 2.5],
        )]);
        let ti = TracerInfo::parse(&tracerinfo_text()).unwrap();
        let di = DiagInfo::parse(&diaginfo_text()).unwrap();
        let ds = read_bpch_stream(&mut &bytes[..], &ti, &di).unwrap();

        assert_eq!(ds.variable_names(), vec!["IJ_AVG_S_O3"]);
        let var = ds.variable("IJ_AVG_S_O3").unwrap();
        assert_eq!(var.units, "ppbv");
        assert_eq!(var.shape(), &[1, 2]);
        // Values carry the tracerinfo scale factor of 2.
        assert_eq!(var.data.as_slice().unwrap(), &[3.0, 5.0]);
    }

    #[test]
    fn repeated_blocks_stack_along_a_time_axis() {
        let bytes = sample_file(&[
            ("IJ-AVG-$", 1, "ppbv", [2, 1, 1], vec![1.0, 2.0]),
            ("IJ-AVG-$", 1, "ppbv", [2, 1, 1], vec![3.0, 4.0]),
        ]);
        let ti = TracerInfo::parse(&tracerinfo_text()).unwrap();
        let di = DiagInfo::parse(&diaginfo_text()).unwrap();
        let ds = read_bpch_stream(&mut &bytes[..], &ti, &di).unwrap();

        let var = ds.variable("IJ_AVG_S_NO").unwrap();
        assert_eq!(var.shape(), &[2, 1, 2]);
        assert_eq!(var.data.as_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn category_offset_is_applied() {
        // DRYD-VEL has offset 100; a block with tracer 1 must miss (tracer
        // 101 undefined) while the IJ-AVG-$ block resolves.
        let bytes = sample_file(&[("DRYD-VEL", 1, "cm/s", [1, 1, 1], vec![1.0])]);
        let ti = TracerInfo::parse(&tracerinfo_text()).unwrap();
        let di = DiagInfo::parse(&diaginfo_text()).unwrap();
        match read_bpch_stream(&mut &bytes[..], &ti, &di) {
            Err(Error::Bpch(msg)) => assert!(msg.contains("101")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = Vec::new();
        push_record(&mut bytes, &padded("CTM bin 4D", 40));
        let ti = TracerInfo::default();
        let di = DiagInfo::default();
        assert!(matches!(
            read_bpch_stream(&mut &bytes[..], &ti, &di),
            Err(Error::Bpch(_))
        ));
    }

    #[test]
    fn framing_mismatch_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4_u32.to_be_bytes());
        bytes.extend_from_slice(b"abcd");
        bytes.extend_from_slice(&5_u32.to_be_bytes());
        assert!(matches!(
            read_record(&mut &bytes[..]),
            Err(Error::Bpch(_))
        ));
    }
}
