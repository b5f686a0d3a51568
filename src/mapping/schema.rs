//! Header resolution: logical column names to 1-based header positions.
use crate::mapping::MappingError;
use std::collections::HashMap;

/// Header names of the columns the collector reads.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ColumnNames {
    pub(crate) container: String,
    pub(crate) rack: String,
    pub(crate) box_id: String,
    pub(crate) slot: String,
    pub(crate) availability: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            container: "Tank".to_owned(),
            rack: "Rack".to_owned(),
            box_id: "Box".to_owned(),
            slot: "Position".to_owned(),
            availability: "Used?".to_owned(),
        }
    }
}

impl ColumnNames {
    pub(crate) fn required(&self) -> [&str; 5] {
        [
            self.container.as_str(),
            self.rack.as_str(),
            self.box_id.as_str(),
            self.slot.as_str(),
            self.availability.as_str(),
        ]
    }
}

/// Resolved header positions, keyed by logical name.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Looks up a name that was part of the resolved set.
    pub(crate) fn require(&self, name: &str) -> Result<usize, MappingError> {
        self.position(name)
            .ok_or_else(|| MappingError::MissingColumn(name.to_owned()))
    }
}

/// Finds every required name in the header row.
///
/// Header labels are compared after trimming surrounding whitespace; the first
/// matching column wins. Fails with the first name, in `required` order, that
/// has no match.
pub(crate) fn resolve(header: &[String], required: &[&str]) -> Result<ColumnIndex, MappingError> {
    let mut positions = HashMap::with_capacity(required.len());
    for name in required {
        let position = header
            .iter()
            .position(|label| label.trim() == *name)
            .ok_or_else(|| MappingError::MissingColumn((*name).to_owned()))?;
        positions.insert((*name).to_owned(), position + 1);
    }
    Ok(ColumnIndex { positions })
}
