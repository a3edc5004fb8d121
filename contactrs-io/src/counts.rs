//! Raw count triplet reader.
//!
//! The upstream matrix dump yields `(chrom, start_i, start_j, count)` rows
//! in no particular order, possibly with duplicate keys;
//! `InteractionContainer::add_counts` resolves duplicates last-write-wins.

use std::io::BufRead;
use std::path::Path;

use contactrs_core::errors::DataError;
use contactrs_core::models::record::CountRecord;
use contactrs_core::utils::get_dynamic_reader;

use crate::error::{Result, TableError};

///
/// Read whitespace-separated `(chrom, start_i, start_j, count)` rows.
/// Lines starting with `#` are skipped.
///
pub fn read_counts<T: AsRef<Path>>(path: T) -> Result<Vec<CountRecord>> {
    let reader =
        get_dynamic_reader(path.as_ref()).map_err(|e| TableError::FileRead(e.to_string()))?;

    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(TableError::Data(DataError::MalformedRow {
                line: line_no,
                reason: format!("expected 4 fields, found {}", fields.len()),
            }));
        }

        let parse = |field: &str| -> Result<u32> {
            field.parse::<u32>().map_err(|_| {
                TableError::Data(DataError::MalformedRow {
                    line: line_no,
                    reason: format!("not a non-negative integer: '{}'", field),
                })
            })
        };

        rows.push(CountRecord {
            chrom: fields[0].to_string(),
            start_i: parse(fields[1])?,
            start_j: parse(fields[2])?,
            count: parse(fields[3])?,
        });
    }
    Ok(rows)
}
