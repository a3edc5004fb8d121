//! Filter files for differential testing.

use std::io::BufRead;
use std::path::Path;

use contactrs_core::errors::DataError;
use contactrs_core::models::filter::FilterSet;
use contactrs_core::utils::get_dynamic_reader;

use crate::error::{Result, TableError};

///
/// Read a `(chrom, start_i, start_j)` table into a [`FilterSet`].
///
/// Rows must carry sorted anchors (`start_i <= start_j`); violating rows
/// are malformed input, not silently reordered.
///
pub fn read_filter<T: AsRef<Path>>(path: T) -> Result<FilterSet> {
    let reader =
        get_dynamic_reader(path.as_ref()).map_err(|e| TableError::FileRead(e.to_string()))?;

    let mut set = FilterSet::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(TableError::Data(DataError::MalformedRow {
                line: line_no,
                reason: format!("expected 3 fields, found {}", fields.len()),
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
        let start_i = parse(fields[1])?;
        let start_j = parse(fields[2])?;
        if start_i > start_j {
            return Err(TableError::Data(DataError::MalformedRow {
                line: line_no,
                reason: format!("anchors out of order: {} > {}", start_i, start_j),
            }));
        }
        set.insert(fields[0], start_i, start_j);
    }
    Ok(set)
}
