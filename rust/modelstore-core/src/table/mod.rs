// rust/modelstore-core/src/table/mod.rs

//! In-memory tables with named columns.
//!
//! Tables cross the storage boundary as delimited text with a header row.
//! Cells are kept as text; a missing cell is `None`. On read, empty fields
//! and the configured missing-value token become `None`; on write, `None`
//! is emitted as that token so the two directions agree.

mod delimited;

pub use delimited::{read_csv, write_csv};

use crate::config::TableConfig;
use crate::error::{Result, StoreError};

/// A row of optional text cells.
pub type Row = Vec<Option<String>>;

/// Rectangular table: every row has one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Creates a table and fills it with `rows`.
    ///
    /// # Errors
    ///
    /// Returns an error if any row has the wrong number of cells.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Row>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Appends a row. Empty strings are stored as missing cells, which is
    /// how they read back from delimited text.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width differs from the column count.
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(StoreError::table(format!(
                "row {} has {} cells, expected {}",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        let row = row
            .into_iter()
            .map(|cell| cell.filter(|value| !value.is_empty()))
            .collect();
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of the column called `name`, top to bottom.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = Option<&'a str>> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_deref()))
    }

    /// The cell at `row`, `column`; `None` when missing or out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}

/// How tables are laid out as delimited text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFormat {
    pub delimiter: u8,
    pub missing_value: String,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            missing_value: "na".to_string(),
        }
    }
}

impl From<&TableConfig> for TableFormat {
    fn from(config: &TableConfig) -> Self {
        let mut buf = [0u8; 4];
        // Config validation guarantees an ASCII delimiter
        let delimiter = config.delimiter.encode_utf8(&mut buf).as_bytes()[0];
        Self {
            delimiter,
            missing_value: config.missing_value.clone(),
        }
    }
}

impl TableFormat {
    /// Interprets one text field.
    pub fn parse_cell(&self, field: &str) -> Option<String> {
        if field.is_empty() || field == self.missing_value {
            None
        } else {
            Some(field.to_string())
        }
    }

    /// Renders one cell as a text field.
    pub fn format_cell<'a>(&'a self, cell: &'a Option<String>) -> &'a str {
        cell.as_deref().unwrap_or(&self.missing_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Row {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new(["a", "b"]);
        table.push_row(cells(&["1", "2"])).unwrap();

        let err = table.push_row(cells(&["1"])).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn test_push_row_stores_empty_string_as_missing() {
        let mut table = Table::new(["a", "b"]);
        table
            .push_row(vec![Some(String::new()), Some("x".to_string())])
            .unwrap();

        assert_eq!(table.rows()[0], vec![None, Some("x".to_string())]);
    }

    #[test]
    fn test_column_access() {
        let table = Table::from_rows(
            ["id", "age"],
            vec![cells(&["1", "34"]), cells(&["2", ""])],
        )
        .unwrap();

        assert_eq!(table.column_index("age"), Some(1));
        assert_eq!(table.column_index("missing"), None);

        let ages: Vec<_> = table.column("age").unwrap().collect();
        assert_eq!(ages, vec![Some("34"), None]);
        assert!(table.column("height").is_none());

        assert_eq!(table.cell(0, 0), Some("1"));
        assert_eq!(table.cell(1, 1), None);
        assert_eq!(table.cell(5, 0), None);
    }

    #[test]
    fn test_format_cells() {
        let format = TableFormat::default();
        assert_eq!(format.parse_cell("na"), None);
        assert_eq!(format.parse_cell(""), None);
        assert_eq!(format.parse_cell("NA"), Some("NA".to_string()));
        assert_eq!(format.format_cell(&None), "na");
        assert_eq!(format.format_cell(&Some("x".to_string())), "x");
    }

    #[test]
    fn test_format_from_config() {
        let config = TableConfig {
            delimiter: ';',
            missing_value: "?".to_string(),
        };
        let format = TableFormat::from(&config);
        assert_eq!(format.delimiter, b';');
        assert_eq!(format.missing_value, "?");
    }
}
