use csv::{ReaderBuilder, StringRecord, Trim};
use log::warn;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::FormatError;
use crate::record::{EcgRecord, Label, COLUMN_COUNT, SAMPLE_COUNT};

/// Load a single-heartbeat CSV (187 samples followed by the label column).
pub fn read_record_csv(path: &Path) -> Result<EcgRecord, FormatError> {
    let file = File::open(path).map_err(|e| FormatError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_record_csv(file, &path.display().to_string())
}

/// Parse the first row of a headerless CSV stream. `source` only labels errors and logs.
pub fn parse_record_csv<R: Read>(reader: R, source: &str) -> Result<EcgRecord, FormatError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let mut rows = reader.records();
    let first = rows
        .next()
        .ok_or(FormatError::Empty)?
        .map_err(|e| FormatError::Read {
            path: source.to_string(),
            message: e.to_string(),
        })?;
    let extra = rows.count();
    if extra > 0 {
        warn!("{}: ignoring {} row(s) after the first", source, extra);
    }
    record_from_row(&first)
}

fn record_from_row(row: &StringRecord) -> Result<EcgRecord, FormatError> {
    if row.len() != COLUMN_COUNT {
        return Err(FormatError::WrongColumnCount {
            expected: COLUMN_COUNT,
            found: row.len(),
        });
    }
    let mut values = Vec::with_capacity(COLUMN_COUNT);
    for (column, field) in row.iter().enumerate() {
        let value = field
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FormatError::NotNumeric {
                column,
                value: field.to_string(),
            })?;
        values.push(value);
    }
    let raw_label = values[SAMPLE_COUNT];
    values.truncate(SAMPLE_COUNT);
    Ok(EcgRecord {
        samples: values,
        label: Label::from_value(raw_label),
        raw_label,
    })
}
