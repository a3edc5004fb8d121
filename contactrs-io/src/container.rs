//! Serialized interaction tables.
//!
//! One row per interaction: identity columns, observed count, covariate
//! columns by name, then the model annotations. Floats are written with
//! Rust's shortest round-trip formatting and `NA` encodes an absent
//! annotation, so a written table reads back into a container equal to
//! the in-memory one.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

use contactrs_core::errors::DataError;
use contactrs_core::models::bin::BinTable;
use contactrs_core::models::container::InteractionContainer;
use contactrs_core::models::record::InteractionRecord;
use contactrs_core::utils::get_dynamic_reader;

use crate::error::{Result, TableError};

const FIXED_HEAD: [&str; 4] = ["chrom", "start_i", "start_j", "count"];
const FIXED_TAIL: [&str; 5] = ["mu", "sdev", "p_value", "q_value", "z_score"];

///
/// Write the container as a tab-separated table. Paths ending in `.gz`
/// are gzip-compressed.
///
pub fn write_container<T: AsRef<Path>>(container: &InteractionContainer, path: T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    if path.extension().is_some_and(|e| e == "gz") {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::best());
        write_rows(container, &mut encoder)?;
        encoder.finish()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_rows(container, &mut writer)?;
    }
    Ok(())
}

fn write_rows<W: Write>(container: &InteractionContainer, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "# chrom={}\tmax_distance={}",
        container.chrom(),
        container.max_distance()
    )?;

    let covariate_names: Vec<&str> = container.covariate_names().collect();
    let mut header: Vec<&str> = FIXED_HEAD.to_vec();
    header.extend(&covariate_names);
    header.extend(FIXED_TAIL);
    writeln!(out, "{}", header.join("\t"))?;

    for (pos, record) in container.records().iter().enumerate() {
        let mut fields: Vec<String> = vec![
            container.chrom().to_string(),
            record.start_i.to_string(),
            record.start_j.to_string(),
            record.count.to_string(),
        ];
        for name in &covariate_names {
            fields.push(container.covariate(name).expect("listed name")[pos].to_string());
        }
        for value in [
            record.mu,
            record.sdev,
            record.p_value,
            record.q_value,
            record.z_score,
        ] {
            fields.push(format_opt(value));
        }
        writeln!(out, "{}", fields.join("\t"))?;
    }
    Ok(())
}

///
/// Read a table written by [`write_container`] back into a container.
///
/// The bin table is supplied by the caller -- bin covariate tables are
/// cached per assembly and resolution, and the row table only stores
/// interaction-level state. Reading back a written container reproduces
/// it exactly.
///
pub fn read_container<T: AsRef<Path>>(path: T, bins: BinTable) -> Result<InteractionContainer> {
    let path = path.as_ref();
    let reader =
        get_dynamic_reader(path).map_err(|e| TableError::FileRead(e.to_string()))?;

    let mut lines = reader.lines().enumerate();

    // metadata line
    let (line_no, meta) = lines
        .next()
        .ok_or_else(|| malformed(0, "empty file"))?;
    let meta = meta?;
    let max_distance = parse_metadata(&meta, line_no)?;

    // header line
    let (line_no, header) = lines
        .next()
        .ok_or_else(|| malformed(1, "missing header"))?;
    let header = header?;
    let columns: Vec<&str> = header.split('\t').collect();
    let covariate_names = parse_header(&columns, line_no)?;

    let n_columns = columns.len();
    let mut records: Vec<InteractionRecord> = Vec::new();
    let mut covariates: BTreeMap<String, Vec<f64>> = covariate_names
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    for (line_no, line) in lines {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != n_columns {
            return Err(malformed(
                line_no,
                &format!("expected {} columns, found {}", n_columns, fields.len()),
            ));
        }
        if fields[0] != bins.chrom() {
            return Err(malformed(
                line_no,
                &format!("chromosome '{}' does not match bin table '{}'", fields[0], bins.chrom()),
            ));
        }

        let start_i = parse_u32(fields[1], line_no)?;
        let start_j = parse_u32(fields[2], line_no)?;
        let mut record = InteractionRecord::new(start_i, start_j);
        record.count = parse_u32(fields[3], line_no)?;

        for (k, name) in covariate_names.iter().enumerate() {
            let value = parse_f64(fields[4 + k], line_no)?;
            covariates.get_mut(name).expect("pre-inserted").push(value);
        }

        let tail = 4 + covariate_names.len();
        record.mu = parse_opt(fields[tail], line_no)?;
        record.sdev = parse_opt(fields[tail + 1], line_no)?;
        record.p_value = parse_opt(fields[tail + 2], line_no)?;
        record.q_value = parse_opt(fields[tail + 3], line_no)?;
        record.z_score = parse_opt(fields[tail + 4], line_no)?;
        records.push(record);
    }

    Ok(InteractionContainer::from_parts(
        bins,
        max_distance,
        records,
        covariates,
    )?)
}

fn parse_metadata(line: &str, line_no: usize) -> Result<u32> {
    if !line.starts_with('#') {
        return Err(malformed(line_no, "missing metadata line"));
    }
    for token in line.trim_start_matches('#').split_whitespace() {
        if let Some(value) = token.strip_prefix("max_distance=") {
            return parse_u32(value, line_no);
        }
    }
    Err(malformed(line_no, "metadata line carries no max_distance"))
}

fn parse_header(columns: &[&str], line_no: usize) -> Result<Vec<String>> {
    if columns.len() < FIXED_HEAD.len() + FIXED_TAIL.len()
        || columns[..FIXED_HEAD.len()] != FIXED_HEAD
        || columns[columns.len() - FIXED_TAIL.len()..] != FIXED_TAIL
    {
        return Err(malformed(line_no, "unexpected header layout"));
    }
    Ok(columns[FIXED_HEAD.len()..columns.len() - FIXED_TAIL.len()]
        .iter()
        .map(|s| s.to_string())
        .collect())
}

fn format_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "NA".to_string(),
    }
}

fn parse_opt(field: &str, line_no: usize) -> Result<Option<f64>> {
    if field == "NA" {
        Ok(None)
    } else {
        parse_f64(field, line_no).map(Some)
    }
}

fn parse_f64(field: &str, line_no: usize) -> Result<f64> {
    field
        .parse::<f64>()
        .map_err(|_| malformed(line_no, &format!("not a number: '{}'", field)))
}

fn parse_u32(field: &str, line_no: usize) -> Result<u32> {
    field
        .parse::<u32>()
        .map_err(|_| malformed(line_no, &format!("not a non-negative integer: '{}'", field)))
}

fn malformed(line: usize, reason: &str) -> TableError {
    TableError::Data(DataError::MalformedRow {
        line,
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contactrs_core::models::bin::GenomicBin;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn scored_container() -> InteractionContainer {
        let bins: Vec<GenomicBin> = [1u32, 300, 7867, 103_938]
            .iter()
            .zip([300u32, 7867, 103_938, 110_000])
            .map(|(&start, end)| GenomicBin {
                start,
                end,
                gc: 0.37,
                mappability: Some(0.9),
                effective_length: (end - start) as f64,
                index: 0,
            })
            .collect();
        let table = BinTable::new("chr9", "fragments:1:500", bins).unwrap();
        let mut container = InteractionContainer::build(table, 500_000).unwrap();

        let n = container.len();
        container
            .set_covariate("gc", (0..n).map(|i| 0.31 + i as f64 / 97.0).collect())
            .unwrap();
        container
            .set_covariate(
                "log_distance",
                container
                    .records()
                    .iter()
                    .map(|r| (1.0 + r.distance() as f64).ln())
                    .collect(),
            )
            .unwrap();

        for (i, record) in container.records_mut().iter_mut().enumerate() {
            record.count = (i * i) as u32;
            record.mu = Some(1.0 / (i as f64 + 3.0));
            record.sdev = Some((i as f64).sqrt() + 0.21);
            record.p_value = if i % 2 == 0 { Some(1e-30 * (i + 1) as f64) } else { None };
            record.q_value = None;
            record.z_score = Some(-1.5 + i as f64);
        }
        container
    }

    #[rstest]
    fn test_round_trip_plain() {
        let container = scored_container();
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("chr9.contacts.tsv");

        write_container(&container, &path).unwrap();
        let back = read_container(&path, container.bins().clone()).unwrap();
        assert_eq!(container, back);
    }

    #[rstest]
    fn test_round_trip_gz() {
        let container = scored_container();
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("chr9.contacts.tsv.gz");

        write_container(&container, &path).unwrap();
        let back = read_container(&path, container.bins().clone()).unwrap();
        assert_eq!(container, back);
    }

    #[rstest]
    fn test_wrong_chromosome_rejected() {
        let container = scored_container();
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("chr9.contacts.tsv");
        write_container(&container, &path).unwrap();

        let other_bins = BinTable::new(
            "chr8",
            "fragments:1:500",
            vec![GenomicBin {
                start: 1,
                end: 300,
                gc: 0.4,
                mappability: None,
                effective_length: 299.0,
                index: 0,
            }],
        )
        .unwrap();
        assert!(matches!(
            read_container(&path, other_bins),
            Err(TableError::Data(DataError::MalformedRow { .. }))
        ));
    }

    #[rstest]
    fn test_malformed_rows_rejected() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("bad.tsv");
        std::fs::write(
            &path,
            "# chrom=chr9\tmax_distance=500000\n\
             chrom\tstart_i\tstart_j\tcount\tmu\tsdev\tp_value\tq_value\tz_score\n\
             chr9\t1\tnot_a_number\t5\tNA\tNA\tNA\tNA\tNA\n",
        )
        .unwrap();

        let bins = scored_container().bins().clone();
        assert!(matches!(
            read_container(&path, bins),
            Err(TableError::Data(DataError::MalformedRow { .. }))
        ));
    }
}
