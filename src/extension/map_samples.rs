use crate::error::ResultMessage;
use crate::error::RustyTankError;
use crate::extension::writer::add_result_columns;
use crate::extension::writer::write_chunk;
use crate::extension::AnnotationRow;
use crate::extension::AvailableParam;
use crate::extension::ColorParam;
use crate::extension::FileParam;
use crate::extension::FormulaStyleParam;
use crate::extension::GridParam;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::extension::SourceParam;
use crate::extension::TankParam;
use crate::mapping::map_samples;
use crate::mapping::FormulaStyle;
use crate::mapping::MappingOptions;
use crate::mapping::MappingRequest;
use crate::spreadsheet::open_workbook;
use crate::spreadsheet::value::CellValue;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::atomic::AtomicUsize;

/// Parameters for the map_samples table function
struct MapSamplesParameters {
    /// Path or URL of the workbook
    file_name: String,
    /// Dataset sheet (default: Cancer)
    source: Option<String>,
    /// Tank layout sheet (default: TANK 1)
    grid: Option<String>,
    /// Container id of the samples to place (default: 1)
    tank: Option<CellValue>,
    /// Highlight color (default: green)
    color: Option<String>,
    /// Availability sentinel (default: No)
    available: Option<String>,
    formula_style: Option<FormulaStyle>,
}

impl TryFrom<&BindInfo> for MapSamplesParameters {
    type Error = RustyTankError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        Ok(MapSamplesParameters {
            file_name: FileParam::read(bind, 0)?,
            source: SourceParam::read(bind)?,
            grid: GridParam::read(bind)?,
            tank: TankParam::read(bind)?,
            color: ColorParam::read(bind)?,
            available: AvailableParam::read(bind)?,
            formula_style: FormulaStyleParam::read(bind)?,
        })
    }
}

#[repr(C)]
/// Bind data holding the cells written and notices raised by the run
pub(crate) struct MapSamplesBindData {
    rows: Vec<AnnotationRow>,
}

impl TryFrom<&MapSamplesParameters> for MapSamplesBindData {
    type Error = RustyTankError;

    /// Loads the workbook and runs the mapping once
    fn try_from(parameters: &MapSamplesParameters) -> Result<Self, Self::Error> {
        let defaults = MappingRequest::default();
        let request = MappingRequest {
            source: parameters.source.to_owned().unwrap_or(defaults.source),
            grid: parameters.grid.to_owned().unwrap_or(defaults.grid),
            container: parameters.tank.to_owned().unwrap_or(defaults.container),
            color: parameters.color.to_owned().unwrap_or(defaults.color),
        };
        let mut options = MappingOptions::default();
        if let Some(available) = &parameters.available {
            options.available = available.to_owned();
        }
        options.style = parameters.formula_style.unwrap_or_default();

        let mut workbook = open_workbook(&parameters.file_name)?;
        let report = map_samples(&mut workbook, &request, &options)?;
        tracing::debug!(samples = report.samples, notices = report.notices.len(), "map_samples bound");
        let rows = AnnotationRow::from_report(&report);
        Ok(MapSamplesBindData { rows })
    }
}

#[repr(C)]
/// Init data tracking the next row to emit
pub(crate) struct MapSamplesInitData {
    index: AtomicUsize,
}

/// Table function placing one dataset's samples on one tank grid
pub(crate) struct MapSamplesTableFunction;

impl VTab for MapSamplesTableFunction {
    type InitData = MapSamplesInitData;
    type BindData = MapSamplesBindData;

    /// Bind phase: parse parameters, run the mapping and define result columns
    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = MapSamplesParameters::try_from(bind)?;
        let data = MapSamplesBindData::try_from(&parameters).with_prefix(parameters.file_name.as_str())?;
        add_result_columns(bind);
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(MapSamplesInitData {
            index: AtomicUsize::new(0),
        })
    }

    /// Function phase: stream written cells to DuckDB
    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let bind = func.get_bind_data();
        let init = func.get_init_data();
        write_chunk(&bind.rows, &init.index, output);
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![FileParam::kind()])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
            SourceParam::definition(),
            GridParam::definition(),
            TankParam::definition(),
            ColorParam::definition(),
            AvailableParam::definition(),
            FormulaStyleParam::definition(),
        ])
    }
}
