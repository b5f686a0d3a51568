#[cfg(test)]
use crate::spreadsheet::reference::to_reference;
use crate::spreadsheet::store::check_position;
use crate::spreadsheet::store::StoreError;
use crate::spreadsheet::store::TabularStore;
use crate::spreadsheet::value::CellValue;
use std::collections::BTreeMap;

/// A single sheet held in memory: a dense grid of values plus the formulas and
/// highlights written during a run. Writes replace earlier writes to the same
/// cell, so repeating a run leaves the sheet unchanged.
#[derive(Clone, Debug, Default)]
pub(crate) struct Worksheet {
    /// Sheet name as shown on the tab
    pub(crate) name: String,
    /// Identifier used in `#gid=` style links
    pub(crate) id: String,
    /// Row-major values, row 1 at index 0
    rows: Vec<Vec<CellValue>>,
    /// Formulas keyed by 1-based (row, column)
    formulas: BTreeMap<(usize, usize), String>,
    /// Highlight colors keyed by 1-based (row, column)
    highlights: BTreeMap<(usize, usize), String>,
}

/// One annotated cell after a run.
#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Annotation {
    pub(crate) sheet: String,
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) formula: Option<String>,
    pub(crate) color: Option<String>,
}

#[cfg(test)]
impl Annotation {
    /// Returns the A1 reference of the annotated cell.
    pub(crate) fn reference(&self) -> String {
        to_reference(self.row, self.col)
    }
}

impl Worksheet {
    pub(crate) fn new(name: &str, id: &str) -> Self {
        Worksheet {
            name: name.to_owned(),
            id: id.to_owned(),
            ..Default::default()
        }
    }

    /// Stores a value at a 1-based position, growing the grid as needed.
    pub(crate) fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        if row == 0 || col == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let record = &mut self.rows[row - 1];
        if record.len() < col {
            record.resize_with(col, CellValue::default);
        }
        record[col - 1] = value;
    }

    pub(crate) fn value(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        row.checked_sub(1)
            .zip(col.checked_sub(1))
            .and_then(|(row, col)| self.rows.get(row).and_then(|record| record.get(col)))
            .unwrap_or(&EMPTY)
    }

    pub(crate) fn formula(&self, row: usize, col: usize) -> Option<&str> {
        self.formulas.get(&(row, col)).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn highlight(&self, row: usize, col: usize) -> Option<&str> {
        self.highlights.get(&(row, col)).map(String::as_str)
    }

    /// Last used (row, column), ignoring trailing empty cells.
    pub(crate) fn dimensions(&self) -> (usize, usize) {
        let mut last_row = 0;
        let mut last_col = 0;
        for (index, record) in self.rows.iter().enumerate() {
            if let Some(col) = record.iter().rposition(|value| !value.is_empty()) {
                last_row = index + 1;
                last_col = last_col.max(col + 1);
            }
        }
        (last_row, last_col)
    }

    /// Every cell that received a formula or highlight, in row then column order.
    #[cfg(test)]
    pub(crate) fn annotations(&self) -> Vec<Annotation> {
        let mut positions: Vec<(usize, usize)> = self.formulas.keys().chain(self.highlights.keys()).copied().collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .map(|(row, col)| Annotation {
                sheet: self.name.to_owned(),
                row,
                col,
                formula: self.formulas.get(&(row, col)).cloned(),
                color: self.highlights.get(&(row, col)).cloned(),
            })
            .collect()
    }
}

/// An in-memory workbook loaded from a spreadsheet file or built by hand.
#[derive(Clone, Debug, Default)]
pub(crate) struct Workbook {
    /// Source file name, empty for workbooks built in memory
    pub(crate) name: String,
    pub(crate) sheets: Vec<Worksheet>,
}

impl Workbook {
    pub(crate) fn new(name: &str) -> Self {
        Workbook {
            name: name.to_owned(),
            sheets: Vec::new(),
        }
    }

    /// Appends a sheet and returns it for population.
    pub(crate) fn add_sheet(&mut self, name: &str, id: &str) -> &mut Worksheet {
        self.sheets.push(Worksheet::new(name, id));
        let index = self.sheets.len() - 1;
        &mut self.sheets[index]
    }

    pub(crate) fn sheet(&self, name: &str) -> Result<&Worksheet, StoreError> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name == name)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_owned()))
    }

    pub(crate) fn sheet_mut(&mut self, name: &str) -> Result<&mut Worksheet, StoreError> {
        self.sheets
            .iter_mut()
            .find(|sheet| sheet.name == name)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_owned()))
    }

    pub(crate) fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.to_owned()).collect()
    }

    /// Annotations of every sheet, in sheet order.
    #[cfg(test)]
    pub(crate) fn annotations(&self) -> Vec<Annotation> {
        self.sheets.iter().flat_map(Worksheet::annotations).collect()
    }
}

impl TabularStore for Workbook {
    fn sheet_id(&self, sheet: &str) -> Result<String, StoreError> {
        Ok(self.sheet(sheet)?.id.to_owned())
    }

    fn dimensions(&self, sheet: &str) -> Result<(usize, usize), StoreError> {
        Ok(self.sheet(sheet)?.dimensions())
    }

    fn block(&self, sheet: &str, row: usize, col: usize, rows: usize, cols: usize) -> Result<Vec<Vec<CellValue>>, StoreError> {
        check_position(sheet, row, col)?;
        let worksheet = self.sheet(sheet)?;
        Ok((row..row + rows)
            .map(|row| (col..col + cols).map(|col| worksheet.value(row, col).to_owned()).collect())
            .collect())
    }

    fn cell_value(&self, sheet: &str, row: usize, col: usize) -> Result<CellValue, StoreError> {
        check_position(sheet, row, col)?;
        Ok(self.sheet(sheet)?.value(row, col).to_owned())
    }

    fn formula(&self, sheet: &str, row: usize, col: usize) -> Result<Option<String>, StoreError> {
        check_position(sheet, row, col)?;
        Ok(self.sheet(sheet)?.formula(row, col).map(str::to_owned))
    }

    fn write_formula(&mut self, sheet: &str, row: usize, col: usize, formula: &str) -> Result<(), StoreError> {
        check_position(sheet, row, col)?;
        self.sheet_mut(sheet)?.formulas.insert((row, col), formula.to_owned());
        Ok(())
    }

    fn set_highlight(&mut self, sheet: &str, row: usize, col: usize, color: Option<&str>) -> Result<(), StoreError> {
        check_position(sheet, row, col)?;
        let worksheet = self.sheet_mut(sheet)?;
        match color {
            Some(color) => worksheet.highlights.insert((row, col), color.to_owned()),
            None => worksheet.highlights.remove(&(row, col)),
        };
        Ok(())
    }
}
