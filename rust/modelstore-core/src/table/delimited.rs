// rust/modelstore-core/src/table/delimited.rs

//! Delimited text encoding for tables, backed by the `csv` crate.

use std::io::{Read, Write};

use super::{Table, TableFormat};
use crate::error::{Result, StoreError};

/// Parses delimited text with a header row into a table.
///
/// # Errors
///
/// Returns an error if the text is malformed or rows have differing widths.
pub fn read_csv<R: Read>(reader: R, format: &TableFormat) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| StoreError::table_with_source("failed to read header row", e))?
        .iter()
        .map(String::from)
        .collect();

    let mut table = Table::new(columns);
    for (idx, record) in rdr.records().enumerate() {
        let record = record
            .map_err(|e| StoreError::table_with_source(format!("failed to read row {}", idx + 1), e))?;
        table.push_row(record.iter().map(|field| format.parse_cell(field)).collect())?;
    }

    Ok(table)
}

/// Writes a table as delimited text: header row first, no index column.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_csv<W: Write>(table: &Table, writer: W, format: &TableFormat) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(format.delimiter)
        .from_writer(writer);

    wtr.write_record(table.columns())
        .map_err(|e| StoreError::table_with_source("failed to write header row", e))?;

    for (idx, row) in table.rows().iter().enumerate() {
        wtr.write_record(row.iter().map(|cell| format.format_cell(cell)))
            .map_err(|e| StoreError::table_with_source(format!("failed to write row {}", idx + 1), e))?;
    }

    wtr.flush()
        .map_err(|e| StoreError::table_with_source("failed to flush table", e.into()))?;
    Ok(())
}
