//! Capability interface over a tabular data store.
//!
//! The mapping pipeline only ever talks to sheets through [`TabularStore`]:
//! it reads rectangular blocks once per sheet and issues cell-level writes.
//! Rows and columns are 1-based throughout, matching A1 references.
use crate::spreadsheet::value::CellValue;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub(crate) enum StoreError {
    #[error("Sheet not found: '{0}'")]
    SheetNotFound(String),

    #[error("Cell {1} is outside sheet '{0}'")]
    OutOfBounds(String, String),
}

pub(crate) trait TabularStore {
    /// Identifier used by cross-reference links to address the sheet.
    fn sheet_id(&self, sheet: &str) -> Result<String, StoreError>;

    /// Last used (row, column) of the sheet; `(0, 0)` for an empty sheet.
    fn dimensions(&self, sheet: &str) -> Result<(usize, usize), StoreError>;

    /// Reads `rows` x `cols` values starting at (`row`, `col`). Positions past
    /// the used area read as empty.
    fn block(&self, sheet: &str, row: usize, col: usize, rows: usize, cols: usize) -> Result<Vec<Vec<CellValue>>, StoreError>;

    fn cell_value(&self, sheet: &str, row: usize, col: usize) -> Result<CellValue, StoreError>;

    /// Formula currently written into a cell, if any.
    fn formula(&self, sheet: &str, row: usize, col: usize) -> Result<Option<String>, StoreError>;

    fn write_formula(&mut self, sheet: &str, row: usize, col: usize, formula: &str) -> Result<(), StoreError>;

    /// Sets or clears the background highlight of a cell.
    fn set_highlight(&mut self, sheet: &str, row: usize, col: usize, color: Option<&str>) -> Result<(), StoreError>;

    /// Header labels of row 1, rendered as text.
    fn header_row(&self, sheet: &str) -> Result<Vec<String>, StoreError> {
        let (_, cols) = self.dimensions(sheet)?;
        let mut rows = self.block(sheet, 1, 1, 1, cols)?;
        Ok(rows
            .pop()
            .unwrap_or_default()
            .iter()
            .map(|value| value.to_string())
            .collect())
    }

    /// Reads the whole used area of the sheet in one request.
    fn used_block(&self, sheet: &str) -> Result<Vec<Vec<CellValue>>, StoreError> {
        let (rows, cols) = self.dimensions(sheet)?;
        self.block(sheet, 1, 1, rows, cols)
    }
}

/// Rejects row or column 0, which no A1 reference can address.
pub(crate) fn check_position(sheet: &str, row: usize, col: usize) -> Result<(), StoreError> {
    if row == 0 || col == 0 {
        Err(StoreError::OutOfBounds(sheet.to_owned(), format!("R{}C{}", row, col)))
    } else {
        Ok(())
    }
}
