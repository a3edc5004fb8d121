//! Differential result tables.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

use contactrs_differential::DifferentialResult;

use crate::error::Result;

///
/// Write differential results as a tab-separated table, one row per
/// tested interaction per contrast. `NA` marks interactions whose fit did
/// not converge. Paths ending in `.gz` are gzip-compressed.
///
pub fn write_differential<T: AsRef<Path>>(results: &[DifferentialResult], path: T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    if path.extension().is_some_and(|e| e == "gz") {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::best());
        write_rows(results, &mut encoder)?;
        encoder.finish()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_rows(results, &mut writer)?;
    }
    Ok(())
}

fn write_rows<W: Write>(results: &[DifferentialResult], out: &mut W) -> Result<()> {
    writeln!(
        out,
        "chrom\tstart_i\tstart_j\tcontrast\tlog2fc\tp_value\tq_value"
    )?;
    for r in results {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.chrom,
            r.start_i,
            r.start_j,
            r.contrast,
            format_opt(r.log2_fold_change),
            format_opt(r.p_value),
            format_opt(r.q_value),
        )?;
    }
    Ok(())
}

fn format_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "NA".to_string(),
    }
}
