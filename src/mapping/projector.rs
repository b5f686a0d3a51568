//! Grid projection: places collected slots inside the tank layout and writes a
//! cross-reference formula plus highlight into each slot cell.
use crate::mapping::collector::CoordinateIndex;
use crate::mapping::FormulaStyle;
use crate::mapping::Notice;
use crate::spreadsheet::reference::to_reference;
use crate::spreadsheet::store::StoreError;
use crate::spreadsheet::store::TabularStore;
use crate::spreadsheet::value::CellValue;

/// Slots per row inside a box.
const SLOTS_PER_ROW: u64 = 10;

/// Cell of a slot, given the row of its `"Box <id>"` label and the column of
/// its `"Rack <id>"` label. Slots fill rows of ten, left to right, starting
/// on the row below the box label and at the rack column.
pub(crate) fn slot_cell(box_row: usize, rack_col: usize, slot: u64) -> (usize, usize) {
    let row_within_box = slot.div_ceil(SLOTS_PER_ROW) as usize;
    let col_within_box = match slot % SLOTS_PER_ROW {
        0 => SLOTS_PER_ROW,
        col => col,
    };
    (box_row + row_within_box, rack_col - 1 + col_within_box as usize)
}

/// Index (0-based) of the first cell in `cells` satisfying `predicate`.
pub(crate) fn find_first<'a, I, P>(cells: I, predicate: P) -> Option<usize>
where
    I: IntoIterator<Item = &'a CellValue>,
    P: Fn(&CellValue) -> bool,
{
    cells.into_iter().position(|value| predicate(value))
}

fn is_label(value: &CellValue, label: &str) -> bool {
    value.as_text() == Some(label)
}

/// Renders the back-reference written into a slot cell.
pub(crate) fn render_formula(style: FormulaStyle, sheet_id: &str, token: &str, slot: &str) -> String {
    match style {
        FormulaStyle::Hyperlink => format!("=HYPERLINK(\"#gid={sheet_id}&range={token}\",\"{slot}\")"),
        FormulaStyle::Navigate => format!("NAVIGATE(\"#sheet={sheet_id}&range={token}\", \"{slot}\")"),
    }
}

/// Where and how the projection writes.
pub(crate) struct Projection<'a> {
    pub(crate) grid: &'a str,
    /// Sheet id of the dataset the tokens point into
    pub(crate) source_id: &'a str,
    pub(crate) color: &'a str,
    pub(crate) style: FormulaStyle,
}

/// A slot cell as it was written.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WrittenCell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) formula: String,
    pub(crate) color: String,
}

impl WrittenCell {
    pub(crate) fn reference(&self) -> String {
        to_reference(self.row, self.col)
    }
}

/// Outcome of one projection.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Projected {
    /// Cells written, in rack, box, slot order
    pub(crate) cells: Vec<WrittenCell>,
    pub(crate) notices: Vec<Notice>,
}

/// Projects every slot of `index` onto the grid sheet.
///
/// The grid is read once. A rack or box whose label cannot be found is
/// skipped with a notice and the remaining racks and boxes are still written.
/// Writes overwrite, so projecting the same index twice gives the same sheet.
/// Replacing a different formula already in a slot cell is reported.
pub(crate) fn project<S>(store: &mut S, index: &CoordinateIndex, projection: &Projection) -> Result<Projected, StoreError>
where
    S: TabularStore + ?Sized,
{
    static EMPTY: CellValue = CellValue::Empty;
    let grid = store.used_block(projection.grid)?;
    let mut projected = Projected::default();

    for (rack, boxes) in index.racks() {
        let rack_label = format!("Rack {rack}");
        let header = grid.first().map(Vec::as_slice).unwrap_or_default();
        let rack_col = match find_first(header, |value| is_label(value, &rack_label)) {
            Some(col) => col + 1,
            None => {
                projected.notices.push(Notice::UnresolvedRack { rack: rack.to_string() });
                continue;
            }
        };
        tracing::debug!(rack = %rack, col = rack_col, "found rack");

        for (box_id, slots) in boxes {
            let box_label = format!("Box {box_id}");
            let column = grid.iter().map(|record| record.get(rack_col - 1).unwrap_or(&EMPTY));
            let box_row = match find_first(column, |value| is_label(value, &box_label)) {
                Some(row) => row + 1,
                None => {
                    projected.notices.push(Notice::UnresolvedBox {
                        rack: rack.to_string(),
                        box_id: box_id.to_string(),
                    });
                    continue;
                }
            };
            tracing::debug!(rack = %rack, box_id = %box_id, row = box_row, "found box");

            for (slot, token) in slots {
                let Some(number) = slot.as_slot() else {
                    projected.notices.push(Notice::InvalidSlot {
                        rack: rack.to_string(),
                        box_id: box_id.to_string(),
                        slot: slot.to_string(),
                    });
                    continue;
                };
                let (row, col) = slot_cell(box_row, rack_col, number);
                let formula = render_formula(projection.style, projection.source_id, token, &slot.to_string());
                if let Some(previous) = store.formula(projection.grid, row, col)? {
                    if previous != formula {
                        projected.notices.push(Notice::OverwrittenCell {
                            cell: to_reference(row, col),
                            previous,
                        });
                    }
                }
                store.write_formula(projection.grid, row, col, &formula)?;
                store.set_highlight(projection.grid, row, col, Some(projection.color))?;
                tracing::debug!(slot = %slot, row, col, token = token.as_str(), "wrote slot");
                projected.cells.push(WrittenCell {
                    row,
                    col,
                    formula,
                    color: projection.color.to_owned(),
                });
            }
        }
    }
    Ok(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::collector::Coordinate;
    use crate::spreadsheet::workbook::Workbook;

    fn coordinate(value: f64) -> Coordinate {
        Coordinate::new(value).unwrap()
    }

    fn index(entries: &[(f64, f64, f64, &str)]) -> CoordinateIndex {
        let mut index = CoordinateIndex::default();
        for (rack, box_id, slot, token) in entries {
            index.insert(coordinate(*rack), coordinate(*box_id), coordinate(*slot), token.to_string());
        }
        index
    }

    /// Rack 1 at column B and Rack 2 at column L, each with Box 1 at row 2.
    fn grid() -> Workbook {
        let mut workbook = Workbook::new("");
        let sheet = workbook.add_sheet("TANK 1", "0");
        sheet.set_value(1, 2, "Rack 1".into());
        sheet.set_value(1, 12, "Rack 2".into());
        sheet.set_value(2, 2, "Box 1".into());
        sheet.set_value(2, 12, "Box 1".into());
        workbook
    }

    fn positions(projected: &Projected) -> Vec<(usize, usize)> {
        projected.cells.iter().map(|cell| (cell.row, cell.col)).collect()
    }

    fn projection(style: FormulaStyle) -> Projection<'static> {
        Projection {
            grid: "TANK 1",
            source_id: "42",
            color: "#EAC7C7",
            style,
        }
    }

    #[test]
    fn slots_fill_rows_of_ten() {
        assert_eq!(slot_cell(0, 1, 1), (1, 1));
        assert_eq!(slot_cell(0, 1, 10), (1, 10));
        assert_eq!(slot_cell(0, 1, 11), (2, 1));
        assert_eq!(slot_cell(0, 1, 20), (2, 10));
        assert_eq!(slot_cell(5, 4, 11), (7, 4));
    }

    #[test]
    fn finds_first_matching_cell() {
        let cells = vec![CellValue::Empty, "Rack 1".into(), "Rack 1".into()];
        assert_eq!(find_first(&cells, |value| is_label(value, "Rack 1")), Some(1));
        assert_eq!(find_first(&cells, |value| is_label(value, "Rack 10")), None);
    }

    #[test]
    fn renders_both_formula_styles() {
        assert_eq!(
            render_formula(FormulaStyle::Hyperlink, "42", "D5", "3"),
            "=HYPERLINK(\"#gid=42&range=D5\",\"3\")"
        );
        assert_eq!(
            render_formula(FormulaStyle::Navigate, "42", "D5", "3"),
            "NAVIGATE(\"#sheet=42&range=D5\", \"3\")"
        );
    }

    #[test]
    fn writes_formula_and_highlight() {
        let mut workbook = grid();
        let projected = project(&mut workbook, &index(&[(1.0, 1.0, 11.0, "D7")]), &projection(FormulaStyle::Hyperlink)).unwrap();

        assert_eq!(
            projected.cells,
            vec![WrittenCell {
                row: 4,
                col: 2,
                formula: "=HYPERLINK(\"#gid=42&range=D7\",\"11\")".to_owned(),
                color: "#EAC7C7".to_owned(),
            }]
        );
        assert_eq!(projected.cells[0].reference(), "B4");
        let sheet = workbook.sheet("TANK 1").unwrap();
        assert_eq!(sheet.formula(4, 2), Some("=HYPERLINK(\"#gid=42&range=D7\",\"11\")"));
        assert_eq!(sheet.highlight(4, 2), Some("#EAC7C7"));
    }

    #[test]
    fn projection_is_idempotent() {
        let samples = index(&[(1.0, 1.0, 1.0, "D2"), (2.0, 1.0, 20.0, "D3")]);
        let mut workbook = grid();
        project(&mut workbook, &samples, &projection(FormulaStyle::Navigate)).unwrap();
        let once = workbook.annotations();
        let again = project(&mut workbook, &samples, &projection(FormulaStyle::Navigate)).unwrap();
        assert_eq!(workbook.annotations(), once);
        assert!(again.notices.is_empty());
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn unresolved_labels_do_not_stop_siblings() {
        let samples = index(&[
            (1.0, 1.0, 1.0, "D2"),
            (1.0, 9.0, 1.0, "D3"),
            (2.0, 1.0, 2.0, "D4"),
            (7.0, 1.0, 1.0, "D5"),
        ]);
        let mut workbook = grid();
        let projected = project(&mut workbook, &samples, &projection(FormulaStyle::Hyperlink)).unwrap();

        assert_eq!(positions(&projected), vec![(3, 2), (3, 13)]);
        assert_eq!(
            projected.notices,
            vec![
                Notice::UnresolvedBox {
                    rack: "1".to_owned(),
                    box_id: "9".to_owned()
                },
                Notice::UnresolvedRack { rack: "7".to_owned() },
            ]
        );
    }

    #[test]
    fn racks_are_visited_in_numeric_order() {
        let mut workbook = grid();
        let sheet = workbook.sheet_mut("TANK 1").unwrap();
        sheet.set_value(1, 22, "Rack 10".into());
        sheet.set_value(2, 22, "Box 1".into());
        let samples = index(&[(10.0, 1.0, 1.0, "D2"), (2.0, 1.0, 1.0, "D3"), (1.0, 1.0, 1.0, "D4")]);

        let projected = project(&mut workbook, &samples, &projection(FormulaStyle::Hyperlink)).unwrap();
        assert_eq!(positions(&projected), vec![(3, 2), (3, 12), (3, 22)]);
    }

    #[test]
    fn invalid_slots_are_reported() {
        let mut workbook = grid();
        let projected = project(&mut workbook, &index(&[(1.0, 1.0, 2.5, "D2")]), &projection(FormulaStyle::Hyperlink)).unwrap();
        assert!(projected.cells.is_empty());
        assert_eq!(projected.notices.len(), 1);
    }

    #[test]
    fn replacing_another_link_is_reported() {
        let mut workbook = grid();
        let samples = index(&[(1.0, 1.0, 5.0, "D2")]);
        project(&mut workbook, &samples, &projection(FormulaStyle::Hyperlink)).unwrap();

        let other = Projection {
            source_id: "43",
            color: "#BBBBBB",
            ..projection(FormulaStyle::Hyperlink)
        };
        let projected = project(&mut workbook, &samples, &other).unwrap();
        assert_eq!(projected.cells[0].formula, "=HYPERLINK(\"#gid=43&range=D2\",\"5\")");
        assert_eq!(projected.cells[0].color, "#BBBBBB");
        assert_eq!(
            projected.notices,
            vec![Notice::OverwrittenCell {
                cell: "F3".to_owned(),
                previous: "=HYPERLINK(\"#gid=42&range=D2\",\"5\")".to_owned(),
            }]
        );
    }

    #[test]
    fn missing_grid_is_an_error() {
        let mut workbook = Workbook::new("");
        let error = project(&mut workbook, &index(&[(1.0, 1.0, 1.0, "D2")]), &projection(FormulaStyle::Hyperlink)).unwrap_err();
        assert_eq!(error, StoreError::SheetNotFound("TANK 1".to_owned()));
    }
}
