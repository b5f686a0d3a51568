//! # Extension Core Module
//!
//! Parameter handling, error types and the row model shared by the
//! `map_samples` and `map_all_samples` table functions.
use crate::error::RustyTankError;
use crate::mapping::config::parse_container;
use crate::mapping::config::MappingConfig;
use crate::mapping::FormulaStyle;
use crate::mapping::MappingError;
use crate::mapping::MappingReport;
use crate::spreadsheet::value::CellValue;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use thiserror::Error;

pub(crate) mod map_all_samples;
pub(crate) mod map_samples;
pub(crate) mod writer;

#[derive(Error, Debug)]
pub(crate) enum ExtensionError {
    #[error("Parameter '{0}' must not be empty")]
    EmptyParameterError(String),
}

/// Positional parameter of a table function
pub(crate) trait Param<T> {
    /// Returns the DuckDB logical type for this parameter
    fn kind() -> LogicalTypeHandle;

    /// Extracts the parameter at `index` from bind information
    fn read(bind: &BindInfo, index: u64) -> Result<T, RustyTankError>;
}

/// Named parameter of a table function
pub(crate) trait NamedParam<T> {
    /// Returns the parameter name as used in SQL
    fn name() -> &'static str;

    /// Returns the DuckDB logical type for this parameter
    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    /// Returns the complete parameter definition (name and type)
    fn definition() -> (String, LogicalTypeHandle) {
        (Self::name().to_string(), Self::kind())
    }

    /// Extracts the parameter value, `None` when the caller did not pass it
    fn read(bind: &BindInfo) -> Result<Option<T>, RustyTankError>;
}

/// Reads a named VARCHAR parameter, rejecting blank values.
fn read_varchar(bind: &BindInfo, name: &str) -> Result<Option<String>, RustyTankError> {
    match bind.get_named_parameter(name) {
        Some(value) => {
            let text = value.to_string();
            if text.trim().is_empty() {
                Err(ExtensionError::EmptyParameterError(name.to_owned()))?
            }
            Ok(Some(text))
        }
        None => Ok(None),
    }
}

/// Spreadsheet file path or URL
pub(crate) struct FileParam;

/// Dataset sheet name
pub(crate) struct SourceParam;

/// Tank layout sheet name
pub(crate) struct GridParam;

/// Container id selecting the samples
pub(crate) struct TankParam;

/// Highlight color of written cells
pub(crate) struct ColorParam;

/// Availability sentinel
pub(crate) struct AvailableParam;

/// Formula style: `hyperlink` or `navigate`
pub(crate) struct FormulaStyleParam;

/// Dataset table in `<dataset>=<grid>[,<grid>...]:<color>; ...` form
pub(crate) struct MappingParam;

impl Param<String> for FileParam {
    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo, index: u64) -> Result<String, RustyTankError> {
        let file_name = bind.get_parameter(index).to_string();
        if file_name.trim().is_empty() {
            Err(ExtensionError::EmptyParameterError("file".to_owned()))?
        }
        Ok(file_name)
    }
}

impl NamedParam<String> for SourceParam {
    fn name() -> &'static str {
        "source"
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, RustyTankError> {
        read_varchar(bind, Self::name())
    }
}

impl NamedParam<String> for GridParam {
    fn name() -> &'static str {
        "grid"
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, RustyTankError> {
        read_varchar(bind, Self::name())
    }
}

impl NamedParam<CellValue> for TankParam {
    fn name() -> &'static str {
        "tank"
    }

    fn read(bind: &BindInfo) -> Result<Option<CellValue>, RustyTankError> {
        Ok(read_varchar(bind, Self::name())?.map(|text| parse_container(&text)))
    }
}

impl NamedParam<String> for ColorParam {
    fn name() -> &'static str {
        "color"
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, RustyTankError> {
        read_varchar(bind, Self::name())
    }
}

impl NamedParam<String> for AvailableParam {
    fn name() -> &'static str {
        "available"
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, RustyTankError> {
        read_varchar(bind, Self::name())
    }
}

impl NamedParam<FormulaStyle> for FormulaStyleParam {
    fn name() -> &'static str {
        "formula_style"
    }

    fn read(bind: &BindInfo) -> Result<Option<FormulaStyle>, RustyTankError> {
        match read_varchar(bind, Self::name())? {
            Some(text) => Ok(Some(text.parse()?)),
            None => Ok(None),
        }
    }
}

impl NamedParam<MappingConfig> for MappingParam {
    fn name() -> &'static str {
        "mapping"
    }

    fn read(bind: &BindInfo) -> Result<Option<MappingConfig>, RustyTankError> {
        match read_varchar(bind, Self::name())? {
            Some(text) => Ok(Some(text.parse()?)),
            None => Ok(None),
        }
    }
}

/// One result row: a written grid cell, or a notice about the run.
///
/// Cell rows leave `notice` empty. Notice rows leave the cell columns empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct AnnotationRow {
    pub(crate) source: String,
    pub(crate) grid: String,
    pub(crate) cell: Option<String>,
    pub(crate) row: Option<i64>,
    pub(crate) col: Option<i64>,
    pub(crate) formula: Option<String>,
    pub(crate) color: Option<String>,
    pub(crate) notice: Option<String>,
}

impl AnnotationRow {
    /// Rows for every cell a run wrote, followed by one row per notice.
    pub(crate) fn from_report(report: &MappingReport) -> Vec<AnnotationRow> {
        let cells = report.cells.iter().map(|cell| AnnotationRow {
            source: report.source.to_owned(),
            grid: report.grid.to_owned(),
            cell: Some(cell.reference()),
            row: Some(cell.row as i64),
            col: Some(cell.col as i64),
            formula: Some(cell.formula.to_owned()),
            color: Some(cell.color.to_owned()),
            notice: None,
        });
        let notices = report.notices.iter().map(|notice| AnnotationRow {
            source: report.source.to_owned(),
            grid: report.grid.to_owned(),
            notice: Some(notice.to_string()),
            ..Default::default()
        });
        cells.chain(notices).collect()
    }

    /// Notice row for a dataset and grid pair that could not be mapped.
    pub(crate) fn failure(source: &str, grid: &str, error: &MappingError) -> AnnotationRow {
        AnnotationRow {
            source: source.to_owned(),
            grid: grid.to_owned(),
            notice: Some(error.to_string()),
            ..Default::default()
        }
    }
}
