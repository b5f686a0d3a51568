//! Which datasets map onto which tank grids, and in what color.
use crate::mapping::FormulaStyle;
use crate::spreadsheet::value::CellValue;
use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub(crate) enum ConfigError {
    #[error("Invalid mapping entry '{0}', expected '<dataset>=<grid>[,<grid>...]:<color>'")]
    InvalidEntry(String),

    #[error("Invalid formula style '{0}', expected 'hyperlink' or 'navigate'")]
    InvalidFormulaStyle(String),

    #[error("Cannot derive a container id from grid name '{0}'")]
    InvalidGridName(String),
}

/// One dataset and the grids its samples are projected onto.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DatasetMapping {
    pub(crate) dataset: String,
    pub(crate) grids: Vec<String>,
    pub(crate) color: String,
}

impl DatasetMapping {
    pub(crate) fn new(dataset: &str, grids: &[&str], color: &str) -> Self {
        DatasetMapping {
            dataset: dataset.to_owned(),
            grids: grids.iter().map(|grid| grid.to_string()).collect(),
            color: color.to_owned(),
        }
    }
}

/// Immutable, ordered dataset table used by the batch driver.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MappingConfig {
    mappings: Vec<DatasetMapping>,
}

impl MappingConfig {
    pub(crate) fn new(mappings: Vec<DatasetMapping>) -> Self {
        MappingConfig { mappings }
    }

    pub(crate) fn mappings(&self) -> &[DatasetMapping] {
        &self.mappings
    }
}

impl Default for MappingConfig {
    /// The laboratory's standard dataset table.
    fn default() -> Self {
        MappingConfig::new(vec![
            DatasetMapping::new("Cancer", &["TANK 1"], "#EAC7C7"),
            DatasetMapping::new("Asthma", &["TANK 1"], "#D5E3E8"),
            DatasetMapping::new("CCHI", &["TANK 1"], "#E8A2A2"),
            DatasetMapping::new("HIPC", &["TANK 1", "TANK 2"], "#F7F5EB"),
            DatasetMapping::new("LJI PBMC", &["TANK 2"], "#A0C3D2"),
            DatasetMapping::new("DICE LCL", &["TANK 1"], "#FAEDCB"),
            DatasetMapping::new("DICE PBMC STOCK", &["TANK 1", "TANK 2"], "#C9E4DE"),
            DatasetMapping::new("DICE PBMC BACKUP", &["TANK 2"], "#C6DEF1"),
            DatasetMapping::new("DICE patients", &["TANK 2"], "#DBCDF0"),
            DatasetMapping::new("IM-TCR", &["TANK 1"], "#F2C6DE"),
            DatasetMapping::new("Personal", &["TANK 1"], "#F7D9C4"),
        ])
    }
}

impl FromStr for MappingConfig {
    type Err = ConfigError;

    /// Parses `Cancer=TANK 1:#EAC7C7; HIPC=TANK 1,TANK 2:#F7F5EB`.
    /// Entries are separated by `;` or new lines; blank entries are ignored.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let pattern = Regex::new(r"^\s*([^=]*[^=\s])\s*=\s*([^:]*[^:\s])\s*:\s*(\S+)\s*$").expect("Hardcode regex pattern");
        let mut mappings = Vec::new();
        for entry in text.split([';', '\n']).filter(|entry| !entry.trim().is_empty()) {
            let captures = pattern
                .captures(entry)
                .ok_or_else(|| ConfigError::InvalidEntry(entry.trim().to_owned()))?;
            let grids: Vec<String> = captures[2]
                .split(',')
                .map(|grid| grid.trim().to_owned())
                .filter(|grid| !grid.is_empty())
                .collect();
            if grids.is_empty() {
                Err(ConfigError::InvalidEntry(entry.trim().to_owned()))?
            }
            mappings.push(DatasetMapping {
                dataset: captures[1].to_owned(),
                grids,
                color: captures[3].to_owned(),
            });
        }
        Ok(MappingConfig::new(mappings))
    }
}

impl FromStr for FormulaStyle {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "hyperlink" => Ok(FormulaStyle::Hyperlink),
            "navigate" => Ok(FormulaStyle::Navigate),
            _ => Err(ConfigError::InvalidFormulaStyle(text.to_owned())),
        }
    }
}

/// Container id recorded in the dataset for samples stored in `grid`: the
/// trailing number of the grid name (`"TANK 2"` is container `2`).
pub(crate) fn container_of(grid: &str) -> Result<CellValue, ConfigError> {
    let pattern = Regex::new(r"(\d+(?:\.\d+)?)\s*$").expect("Hardcode regex pattern");
    pattern
        .captures(grid)
        .and_then(|captures| captures[1].parse::<f64>().ok())
        .map(CellValue::Number)
        .ok_or_else(|| ConfigError::InvalidGridName(grid.to_owned()))
}

/// Reads a container id given as text: numbers become numeric ids, anything
/// else is matched as text.
pub(crate) fn parse_container(text: &str) -> CellValue {
    match text.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => CellValue::Number(number),
        _ => CellValue::Text(text.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(config: &'a MappingConfig, dataset: &str) -> Option<&'a DatasetMapping> {
        config.mappings().iter().find(|mapping| mapping.dataset == dataset)
    }

    #[test]
    fn parses_mapping_text() {
        let config: MappingConfig = "Cancer=TANK 1:#EAC7C7; HIPC = TANK 1, TANK 2 : #F7F5EB\n\n".parse().unwrap();
        assert_eq!(
            config.mappings(),
            &[
                DatasetMapping::new("Cancer", &["TANK 1"], "#EAC7C7"),
                DatasetMapping::new("HIPC", &["TANK 1", "TANK 2"], "#F7F5EB"),
            ]
        );
        assert_eq!(get(&config, "HIPC").map(|mapping| mapping.grids.len()), Some(2));
        assert_eq!(get(&config, "Asthma"), None);
    }

    #[test]
    fn rejects_malformed_entries() {
        for text in ["Cancer", "Cancer=TANK 1", "=TANK 1:green", "Cancer=:green", "Cancer= , :green"] {
            assert!(text.parse::<MappingConfig>().is_err(), "{text}");
        }
        assert_eq!("".parse::<MappingConfig>().unwrap().mappings().len(), 0);
    }

    #[test]
    fn default_table_covers_laboratory_datasets() {
        let config = MappingConfig::default();
        assert_eq!(config.mappings().len(), 11);
        assert_eq!(get(&config, "DICE PBMC STOCK").unwrap().grids, vec!["TANK 1", "TANK 2"]);
        assert_eq!(get(&config, "LJI PBMC").unwrap().color, "#A0C3D2");
    }

    #[test]
    fn containers_come_from_grid_names() {
        assert_eq!(container_of("TANK 2"), Ok(CellValue::Number(2.0)));
        assert_eq!(container_of("Freezer 12 "), Ok(CellValue::Number(12.0)));
        assert!(container_of("Overflow").is_err());
        assert_eq!(parse_container("1"), CellValue::Number(1.0));
        assert_eq!(parse_container("A"), CellValue::from("A"));
    }

    #[test]
    fn parses_formula_styles() {
        assert_eq!("Hyperlink".parse::<FormulaStyle>(), Ok(FormulaStyle::Hyperlink));
        assert_eq!("navigate".parse::<FormulaStyle>(), Ok(FormulaStyle::Navigate));
        assert!("link".parse::<FormulaStyle>().is_err());
    }
}
