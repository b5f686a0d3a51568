//! # Sample Mapping
//!
//! Locates sample positions recorded in a dataset sheet inside a tank layout
//! sheet. The pipeline runs in one direction:
//!
//! 1. [`schema::resolve`] finds the required columns in the header row,
//! 2. [`collector::collect`] gathers eligible (rack, box, slot) triples,
//! 3. [`projector::project`] writes a back-reference formula and highlight
//!    into each slot cell of the grid.
//!
//! Missing columns or sheets abort a single dataset. Labels that cannot be
//! found in the grid, duplicate coordinates and malformed rows are reported
//! as [`Notice`]s and never stop the rest of the run.
pub(crate) mod collector;
pub(crate) mod config;
pub(crate) mod projector;
pub(crate) mod schema;

use crate::mapping::collector::collect;
use crate::mapping::collector::SampleColumns;
use crate::mapping::config::container_of;
use crate::mapping::config::ConfigError;
use crate::mapping::config::MappingConfig;
use crate::mapping::projector::project;
use crate::mapping::projector::Projection;
use crate::mapping::projector::WrittenCell;
use crate::mapping::schema::resolve;
use crate::mapping::schema::ColumnNames;
use crate::spreadsheet::store::StoreError;
use crate::spreadsheet::store::TabularStore;
use crate::spreadsheet::value::CellValue;
use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub(crate) enum MappingError {
    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("{0}")]
    StoreError(#[from] StoreError),

    #[error("{0}")]
    ConfigError(#[from] ConfigError),
}

/// Recoverable conditions met during a run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Notice {
    /// No `"Rack <id>"` label in the grid's first row
    UnresolvedRack { rack: String },
    /// No `"Box <id>"` label in the rack's column
    UnresolvedBox { rack: String, box_id: String },
    /// Two rows share a coordinate; the later row was kept
    DuplicateCoordinate {
        rack: String,
        box_id: String,
        slot: String,
        previous: String,
        current: String,
    },
    /// An eligible row with a non-numeric rack, box or slot
    MalformedRecord { row: usize },
    /// A slot that is not a positive integer
    InvalidSlot { rack: String, box_id: String, slot: String },
    /// A slot cell already held a different link, usually from another dataset
    OverwrittenCell { cell: String, previous: String },
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::UnresolvedRack { rack } => write!(f, "label 'Rack {rack}' not found"),
            Notice::UnresolvedBox { rack, box_id } => write!(f, "label 'Box {box_id}' not found under 'Rack {rack}'"),
            Notice::DuplicateCoordinate { rack, box_id, slot, previous, current } => write!(
                f,
                "rack {rack} box {box_id} slot {slot} is recorded at {previous} and {current}, keeping {current}"
            ),
            Notice::MalformedRecord { row } => write!(f, "row {row} has a non-numeric rack, box or slot"),
            Notice::InvalidSlot { rack, box_id, slot } => {
                write!(f, "rack {rack} box {box_id} slot {slot} is not a positive integer")
            }
            Notice::OverwrittenCell { cell, previous } => write!(f, "cell {cell} replaced {previous}"),
        }
    }
}

/// How slot cells link back to the dataset.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum FormulaStyle {
    /// `=HYPERLINK("#gid=<id>&range=<A1>","<slot>")`
    #[default]
    Hyperlink,
    /// `NAVIGATE("#sheet=<id>&range=<A1>", "<slot>")`
    Navigate,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MappingOptions {
    /// Value of the availability column that marks a sample as in the tank
    pub(crate) available: String,
    pub(crate) style: FormulaStyle,
    pub(crate) columns: ColumnNames,
}

impl Default for MappingOptions {
    fn default() -> Self {
        MappingOptions {
            available: "No".to_owned(),
            style: FormulaStyle::default(),
            columns: ColumnNames::default(),
        }
    }
}

/// A single dataset to grid run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MappingRequest {
    /// Dataset sheet holding the sample rows
    pub(crate) source: String,
    /// Tank layout sheet receiving the links
    pub(crate) grid: String,
    /// Value of the container column selecting the samples
    pub(crate) container: CellValue,
    pub(crate) color: String,
}

impl Default for MappingRequest {
    fn default() -> Self {
        MappingRequest {
            source: "Cancer".to_owned(),
            grid: "TANK 1".to_owned(),
            container: CellValue::Number(1.0),
            color: "green".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct MappingReport {
    pub(crate) source: String,
    pub(crate) grid: String,
    /// Distinct coordinates collected from the dataset
    pub(crate) samples: usize,
    /// Grid cells as this run wrote them, in rack, box, slot order
    pub(crate) cells: Vec<WrittenCell>,
    pub(crate) notices: Vec<Notice>,
}

/// Outcome of one dataset and grid pair of a batch.
#[derive(Debug)]
pub(crate) struct BatchOutcome {
    pub(crate) dataset: String,
    pub(crate) grid: String,
    pub(crate) result: Result<MappingReport, MappingError>,
}

/// Runs the pipeline for one dataset and grid.
pub(crate) fn map_samples<S>(store: &mut S, request: &MappingRequest, options: &MappingOptions) -> Result<MappingReport, MappingError>
where
    S: TabularStore + ?Sized,
{
    let source = request.source.as_str();
    let header = store.header_row(source)?;
    let index = resolve(&header, &options.columns.required())?;
    let columns = SampleColumns::new(&index, &options.columns)?;

    let (rows, cols) = store.dimensions(source)?;
    let data = match rows {
        0 | 1 => Vec::new(),
        _ => store.block(source, 2, 1, rows - 1, cols)?,
    };
    let collection = collect(&data, 2, &columns, &request.container, &options.available);
    if collection.index.is_empty() {
        tracing::debug!(source, container = %request.container, "no eligible samples");
    }

    let source_id = store.sheet_id(source)?;
    let mut projected = project(
        store,
        &collection.index,
        &Projection {
            grid: &request.grid,
            source_id: &source_id,
            color: &request.color,
            style: options.style,
        },
    )?;

    let mut notices = collection.notices;
    notices.append(&mut projected.notices);
    for notice in &notices {
        tracing::warn!(source, grid = request.grid.as_str(), %notice, "mapping notice");
    }
    tracing::info!(
        source,
        grid = request.grid.as_str(),
        samples = collection.index.len(),
        written = projected.cells.len(),
        notices = notices.len(),
        "mapped samples"
    );
    Ok(MappingReport {
        source: request.source.to_owned(),
        grid: request.grid.to_owned(),
        samples: collection.index.len(),
        cells: projected.cells,
        notices,
    })
}

/// Runs every dataset of `config` against each of its grids. A failing pair
/// is recorded and the batch moves on.
pub(crate) fn run_all<S>(store: &mut S, config: &MappingConfig, options: &MappingOptions) -> Vec<BatchOutcome>
where
    S: TabularStore + ?Sized,
{
    let mut outcomes = Vec::new();
    for mapping in config.mappings() {
        for grid in &mapping.grids {
            let result = container_of(grid).map_err(MappingError::from).and_then(|container| {
                let request = MappingRequest {
                    source: mapping.dataset.to_owned(),
                    grid: grid.to_owned(),
                    container,
                    color: mapping.color.to_owned(),
                };
                map_samples(store, &request, options)
            });
            if let Err(error) = &result {
                tracing::warn!(dataset = mapping.dataset.as_str(), grid = grid.as_str(), %error, "mapping failed");
            }
            outcomes.push(BatchOutcome {
                dataset: mapping.dataset.to_owned(),
                grid: grid.to_owned(),
                result,
            });
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::config::DatasetMapping;
    use crate::spreadsheet::workbook::Workbook;
    use crate::spreadsheet::xlsx;
    use std::io::Cursor;
    use zip::ZipArchive;

    /// Dataset "Cancer" (id 7) with columns in a shuffled order, and a grid
    /// "TANK 1" with Rack 1 at B1 / Box 2 at B3 and Rack 2 at L1 / Box 1 at L2.
    fn workbook() -> Workbook {
        let mut workbook = Workbook::new("");
        let samples = workbook.add_sheet("Cancer", "7");
        for (col, label) in ["ID", "Used?", "Position", "Box", "Rack", "Tank"].iter().enumerate() {
            samples.set_value(1, col + 1, (*label).into());
        }
        let rows: [(&str, &str, f64, f64, f64, f64); 5] = [
            ("S1", "No", 11.0, 2.0, 1.0, 1.0),
            ("S2", "No", 20.0, 2.0, 1.0, 1.0),
            ("S3", "Yes", 1.0, 2.0, 1.0, 1.0),
            ("S4", "No", 3.0, 1.0, 2.0, 1.0),
            ("S5", "No", 4.0, 1.0, 2.0, 2.0),
        ];
        for (index, (id, used, slot, box_id, rack, tank)) in rows.iter().enumerate() {
            let row = index + 2;
            samples.set_value(row, 1, (*id).into());
            samples.set_value(row, 2, (*used).into());
            samples.set_value(row, 3, (*slot).into());
            samples.set_value(row, 4, (*box_id).into());
            samples.set_value(row, 5, (*rack).into());
            samples.set_value(row, 6, (*tank).into());
        }

        let grid = workbook.add_sheet("TANK 1", "0");
        grid.set_value(1, 2, "Rack 1".into());
        grid.set_value(3, 2, "Box 2".into());
        grid.set_value(1, 12, "Rack 2".into());
        grid.set_value(2, 12, "Box 1".into());
        workbook
    }

    fn request() -> MappingRequest {
        MappingRequest {
            color: "#EAC7C7".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn maps_eligible_samples_into_the_grid() {
        let mut workbook = workbook();
        let report = map_samples(&mut workbook, &request(), &MappingOptions::default()).unwrap();

        assert_eq!(report.samples, 3);
        let positions: Vec<(usize, usize)> = report.cells.iter().map(|cell| (cell.row, cell.col)).collect();
        assert_eq!(positions, vec![(5, 2), (5, 11), (3, 14)]);
        assert!(report.notices.is_empty());

        let grid = workbook.sheet("TANK 1").unwrap();
        assert_eq!(grid.formula(5, 2), Some("=HYPERLINK(\"#gid=7&range=C2\",\"11\")"));
        assert_eq!(grid.formula(5, 11), Some("=HYPERLINK(\"#gid=7&range=C3\",\"20\")"));
        assert_eq!(grid.formula(3, 14), Some("=HYPERLINK(\"#gid=7&range=C5\",\"3\")"));
        assert_eq!(grid.highlight(3, 14), Some("#EAC7C7"));
    }

    #[test]
    fn rerunning_changes_nothing() {
        let mut workbook = workbook();
        map_samples(&mut workbook, &request(), &MappingOptions::default()).unwrap();
        let first = workbook.annotations();
        map_samples(&mut workbook, &request(), &MappingOptions::default()).unwrap();
        assert_eq!(workbook.annotations(), first);
    }

    #[test]
    fn missing_column_aborts_the_dataset() {
        let mut workbook = workbook();
        let options = MappingOptions {
            columns: ColumnNames {
                availability: "Available".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        };
        let error = map_samples(&mut workbook, &request(), &options).unwrap_err();
        assert_eq!(error, MappingError::MissingColumn("Available".to_owned()));
        assert!(workbook.annotations().is_empty());
    }

    #[test]
    fn custom_sentinel_and_style() {
        let mut workbook = workbook();
        let options = MappingOptions {
            available: "Yes".to_owned(),
            style: FormulaStyle::Navigate,
            ..Default::default()
        };
        let report = map_samples(&mut workbook, &request(), &options).unwrap();
        assert_eq!(report.cells.len(), 1);
        assert_eq!(report.cells[0].reference(), "B4");
        assert_eq!(
            workbook.sheet("TANK 1").unwrap().formula(4, 2),
            Some("NAVIGATE(\"#sheet=7&range=C4\", \"1\")")
        );
    }

    #[test]
    fn batch_continues_past_failures() {
        let mut workbook = workbook();
        let config = MappingConfig::new(vec![
            DatasetMapping::new("Asthma", &["TANK 1"], "#D5E3E8"),
            DatasetMapping::new("Cancer", &["Overflow", "TANK 1"], "#EAC7C7"),
        ]);
        let outcomes = run_all(&mut workbook, &config, &MappingOptions::default());

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0].result,
            Err(MappingError::StoreError(StoreError::SheetNotFound("Asthma".to_owned())))
        );
        assert!(matches!(outcomes[1].result, Err(MappingError::ConfigError(_))));
        assert_eq!((outcomes[2].dataset.as_str(), outcomes[2].grid.as_str()), ("Cancer", "TANK 1"));
        assert_eq!(outcomes[2].result.as_ref().map(|report| report.cells.len()), Ok(3));
    }

    #[test]
    fn each_dataset_keeps_its_own_link_to_a_shared_slot() {
        let mut workbook = Workbook::new("");
        for (name, id) in [("Cancer", "1"), ("Asthma", "2")] {
            let sheet = workbook.add_sheet(name, id);
            for (col, label) in ["Tank", "Rack", "Box", "Position", "Used?"].iter().enumerate() {
                sheet.set_value(1, col + 1, (*label).into());
            }
            for (col, value) in [1.0, 1.0, 1.0, 5.0].iter().enumerate() {
                sheet.set_value(2, col + 1, (*value).into());
            }
            sheet.set_value(2, 5, "No".into());
        }
        let grid = workbook.add_sheet("TANK 1", "0");
        grid.set_value(1, 1, "Rack 1".into());
        grid.set_value(2, 1, "Box 1".into());

        let config = MappingConfig::new(vec![
            DatasetMapping::new("Cancer", &["TANK 1"], "#AAAAAA"),
            DatasetMapping::new("Asthma", &["TANK 1"], "#BBBBBB"),
        ]);
        let outcomes = run_all(&mut workbook, &config, &MappingOptions::default());

        let cancer = outcomes[0].result.as_ref().unwrap();
        assert_eq!(cancer.cells[0].reference(), "E3");
        assert_eq!(cancer.cells[0].formula, "=HYPERLINK(\"#gid=1&range=D2\",\"5\")");
        assert_eq!(cancer.cells[0].color, "#AAAAAA");
        assert!(cancer.notices.is_empty());

        let asthma = outcomes[1].result.as_ref().unwrap();
        assert_eq!(asthma.cells[0].formula, "=HYPERLINK(\"#gid=2&range=D2\",\"5\")");
        assert_eq!(asthma.cells[0].color, "#BBBBBB");
        assert_eq!(
            asthma.notices,
            vec![Notice::OverwrittenCell {
                cell: "E3".to_owned(),
                previous: "=HYPERLINK(\"#gid=1&range=D2\",\"5\")".to_owned(),
            }]
        );
    }

    #[test]
    fn maps_samples_of_a_loaded_workbook() {
        let dataset = concat!(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c>"#,
            r#"<c r="D1" t="s"><v>3</v></c><c r="E1" t="s"><v>4</v></c></row>"#,
            r#"<row r="2"><c r="A2"><v>2</v></c><c r="B2"><v>1</v></c><c r="C2"><v>1</v></c>"#,
            r#"<c r="D2"><v>10</v></c><c r="E2" t="s"><v>5</v></c></row>"#,
        );
        let grid = r#"<row r="1"><c r="C1" t="s"><v>6</v></c></row><row r="2"><c r="C2" t="s"><v>7</v></c></row>"#;
        let bytes = xlsx::tests::xlsx_bytes(
            &[("LJI PBMC", "3", dataset), ("TANK 2", "5", grid)],
            &["<t>Tank</t>", "<t>Rack</t>", "<t>Box</t>", "<t>Position</t>", "<t>Used?</t>", "<t>No</t>", "<t>Rack 1</t>", "<t>Box 1</t>"],
        );
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut workbook = xlsx::load_archive("samples.xlsx", &mut zip).unwrap();

        let config = MappingConfig::new(vec![DatasetMapping::new("LJI PBMC", &["TANK 2"], "#A0C3D2")]);
        let outcomes = run_all(&mut workbook, &config, &MappingOptions::default());
        assert!(outcomes[0].result.is_ok());

        let annotations = workbook.annotations();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].reference(), "L3");
        assert_eq!(annotations[0].formula.as_deref(), Some("=HYPERLINK(\"#gid=3&range=D2\",\"10\")"));
        assert_eq!(annotations[0].color.as_deref(), Some("#A0C3D2"));
    }
}
