use crate::error::ResultMessage;
use crate::error::RustyTankError;
use crate::extension::writer::add_result_columns;
use crate::extension::writer::write_chunk;
use crate::extension::AnnotationRow;
use crate::extension::AvailableParam;
use crate::extension::FileParam;
use crate::extension::FormulaStyleParam;
use crate::extension::MappingParam;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::mapping::config::MappingConfig;
use crate::mapping::run_all;
use crate::mapping::FormulaStyle;
use crate::mapping::MappingOptions;
use crate::spreadsheet::open_workbook;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::atomic::AtomicUsize;

/// Parameters for the map_all_samples table function
struct MapAllSamplesParameters {
    /// Path or URL of the workbook
    file_name: String,
    /// Dataset table (default: the laboratory table)
    mapping: Option<MappingConfig>,
    /// Availability sentinel (default: No)
    available: Option<String>,
    formula_style: Option<FormulaStyle>,
}

impl TryFrom<&BindInfo> for MapAllSamplesParameters {
    type Error = RustyTankError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        Ok(MapAllSamplesParameters {
            file_name: FileParam::read(bind, 0)?,
            mapping: MappingParam::read(bind)?,
            available: AvailableParam::read(bind)?,
            formula_style: FormulaStyleParam::read(bind)?,
        })
    }
}

#[repr(C)]
/// Bind data holding the rows of every dataset and grid pair
pub(crate) struct MapAllSamplesBindData {
    rows: Vec<AnnotationRow>,
}

impl TryFrom<&MapAllSamplesParameters> for MapAllSamplesBindData {
    type Error = RustyTankError;

    /// Runs every dataset of the table against its grids. A pair whose dataset
    /// or grid is missing from the workbook yields a single notice row.
    fn try_from(parameters: &MapAllSamplesParameters) -> Result<Self, Self::Error> {
        let config = parameters.mapping.to_owned().unwrap_or_default();
        let mut options = MappingOptions::default();
        if let Some(available) = &parameters.available {
            options.available = available.to_owned();
        }
        options.style = parameters.formula_style.unwrap_or_default();

        let mut workbook = open_workbook(&parameters.file_name)?;
        let outcomes = run_all(&mut workbook, &config, &options);

        let mut rows = Vec::new();
        let mut failures = 0usize;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(report) => rows.extend(AnnotationRow::from_report(report)),
                Err(error) => {
                    rows.push(AnnotationRow::failure(&outcome.dataset, &outcome.grid, error));
                    failures += 1;
                }
            }
        }
        tracing::info!(
            file = parameters.file_name.as_str(),
            pairs = outcomes.len(),
            failures,
            rows = rows.len(),
            "mapped all samples"
        );
        Ok(MapAllSamplesBindData { rows })
    }
}

#[repr(C)]
/// Init data tracking the next row to emit
pub(crate) struct MapAllSamplesInitData {
    index: AtomicUsize,
}

/// Table function running the whole dataset table over one workbook
pub(crate) struct MapAllSamplesTableFunction;

impl VTab for MapAllSamplesTableFunction {
    type InitData = MapAllSamplesInitData;
    type BindData = MapAllSamplesBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = MapAllSamplesParameters::try_from(bind)?;
        let data = MapAllSamplesBindData::try_from(&parameters).with_prefix(parameters.file_name.as_str())?;
        add_result_columns(bind);
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(MapAllSamplesInitData {
            index: AtomicUsize::new(0),
        })
    }

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
            MappingParam::definition(),
            AvailableParam::definition(),
            FormulaStyleParam::definition(),
        ])
    }
}
