//! Coordinate collection: gathers the (rack, box, slot) triples of eligible
//! sample rows into a sorted three-level index.
use crate::mapping::schema::ColumnIndex;
use crate::mapping::schema::ColumnNames;
use crate::mapping::MappingError;
use crate::mapping::Notice;
use crate::spreadsheet::reference::to_reference;
use crate::spreadsheet::value::format_number;
use crate::spreadsheet::value::CellValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;

/// A finite rack, box or slot number, ordered numerically.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Coordinate(f64);

impl Coordinate {
    pub(crate) fn new(value: f64) -> Option<Coordinate> {
        value.is_finite().then_some(Coordinate(value))
    }

    /// Slot numbers are positive integers; anything else has no cell.
    pub(crate) fn as_slot(&self) -> Option<u64> {
        (self.0 >= 1.0 && self.0.fract() == 0.0).then_some(self.0 as u64)
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Coordinate {}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        // -0.0 and 0.0 are the same label
        (self.0 + 0.0).total_cmp(&(other.0 + 0.0))
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_number(self.0 + 0.0))
    }
}

/// rack -> box -> slot -> back-reference token
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct CoordinateIndex {
    racks: BTreeMap<Coordinate, BTreeMap<Coordinate, BTreeMap<Coordinate, String>>>,
}

impl CoordinateIndex {
    /// Inserts a token, creating intermediate levels on demand. Returns the
    /// token it replaced, if any.
    pub(crate) fn insert(&mut self, rack: Coordinate, box_id: Coordinate, slot: Coordinate, token: String) -> Option<String> {
        self.racks
            .entry(rack)
            .or_default()
            .entry(box_id)
            .or_default()
            .insert(slot, token)
    }

    pub(crate) fn racks(&self) -> impl Iterator<Item = (&Coordinate, &BTreeMap<Coordinate, BTreeMap<Coordinate, String>>)> {
        self.racks.iter()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, rack: f64, box_id: f64, slot: f64) -> Option<&str> {
        self.racks
            .get(&Coordinate::new(rack)?)?
            .get(&Coordinate::new(box_id)?)?
            .get(&Coordinate::new(slot)?)
            .map(String::as_str)
    }

    /// Number of slots held across all racks and boxes.
    pub(crate) fn len(&self) -> usize {
        self.racks
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.racks.is_empty()
    }
}

/// 1-based positions of the sample columns.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct SampleColumns {
    pub(crate) container: usize,
    pub(crate) rack: usize,
    pub(crate) box_id: usize,
    pub(crate) slot: usize,
    pub(crate) availability: usize,
}

impl SampleColumns {
    pub(crate) fn new(index: &ColumnIndex, names: &ColumnNames) -> Result<SampleColumns, MappingError> {
        Ok(SampleColumns {
            container: index.require(&names.container)?,
            rack: index.require(&names.rack)?,
            box_id: index.require(&names.box_id)?,
            slot: index.require(&names.slot)?,
            availability: index.require(&names.availability)?,
        })
    }
}

/// Result of scanning a dataset.
#[derive(Clone, Debug, Default)]
pub(crate) struct Collection {
    pub(crate) index: CoordinateIndex,
    pub(crate) notices: Vec<Notice>,
}

/// Container ids match by kind: numbers against numbers, text against text.
fn same_container(value: &CellValue, target: &CellValue) -> bool {
    match (value, target) {
        (CellValue::Number(value), CellValue::Number(target)) => value == target,
        (CellValue::Text(value), CellValue::Text(target)) => value == target,
        _ => false,
    }
}

/// Builds the coordinate index of every eligible row.
///
/// `rows` are the data rows of the dataset, the first of them sitting at sheet
/// row `first_row`. Rows for other containers or with a different availability
/// are skipped silently; a row that matches both but has a non-numeric rack,
/// box or slot is skipped with a notice.
pub(crate) fn collect(
    rows: &[Vec<CellValue>],
    first_row: usize,
    columns: &SampleColumns,
    target: &CellValue,
    available: &str,
) -> Collection {
    static EMPTY: CellValue = CellValue::Empty;
    let mut collection = Collection::default();

    for (offset, record) in rows.iter().enumerate() {
        let row = first_row + offset;
        let cell = |col: usize| record.get(col - 1).unwrap_or(&EMPTY);

        if !same_container(cell(columns.container), target) || cell(columns.availability).to_string() != available {
            continue;
        }

        let coordinates = (
            cell(columns.rack).as_finite_number().and_then(Coordinate::new),
            cell(columns.box_id).as_finite_number().and_then(Coordinate::new),
            cell(columns.slot).as_finite_number().and_then(Coordinate::new),
        );
        let (rack, box_id, slot) = match coordinates {
            (Some(rack), Some(box_id), Some(slot)) => (rack, box_id, slot),
            _ => {
                collection.notices.push(Notice::MalformedRecord { row });
                continue;
            }
        };

        let token = to_reference(row, columns.slot);
        tracing::debug!(%rack, box_id = %box_id, %slot, token = token.as_str(), "collected sample");
        if let Some(previous) = collection.index.insert(rack, box_id, slot, token.to_owned()) {
            collection.notices.push(Notice::DuplicateCoordinate {
                rack: rack.to_string(),
                box_id: box_id.to_string(),
                slot: slot.to_string(),
                previous,
                current: token,
            });
        }
    }
    collection
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: SampleColumns = SampleColumns {
        container: 1,
        rack: 2,
        box_id: 3,
        slot: 4,
        availability: 5,
    };

    fn row(values: [CellValue; 5]) -> Vec<CellValue> {
        values.to_vec()
    }

    #[test]
    fn coordinates_order_numerically() {
        let mut keys: Vec<Coordinate> = [10.0, 2.0, 1.0, 2.5].iter().filter_map(|value| Coordinate::new(*value)).collect();
        keys.sort();
        let labels: Vec<String> = keys.iter().map(Coordinate::to_string).collect();
        assert_eq!(labels, vec!["1", "2", "2.5", "10"]);
        assert_eq!(Coordinate::new(-0.0), Coordinate::new(0.0));
        assert!(Coordinate::new(f64::NAN).is_none());
        assert_eq!(Coordinate::new(11.0).and_then(|slot| slot.as_slot()), Some(11));
        assert_eq!(Coordinate::new(1.5).and_then(|slot| slot.as_slot()), None);
        assert_eq!(Coordinate::new(0.0).and_then(|slot| slot.as_slot()), None);
    }

    #[test]
    fn only_eligible_rows_are_collected() {
        let rows = vec![
            row([1.into(), 2.into(), 3.into(), 11.into(), "No".into()]),
            row([2.into(), 2.into(), 3.into(), 12.into(), "No".into()]),
            row([1.into(), 2.into(), 3.into(), 13.into(), "Yes".into()]),
            row(["1".into(), 2.into(), 3.into(), 14.into(), "No".into()]),
            row([1.into(), "2".into(), 3.into(), 15.into(), "No".into()]),
            row([1.into(), 2.into(), 3.into(), CellValue::Empty, "No".into()]),
        ];
        let collection = collect(&rows, 2, &COLUMNS, &CellValue::Number(1.0), "No");

        assert_eq!(collection.index.len(), 1);
        assert_eq!(collection.index.get(2.0, 3.0, 11.0), Some("D2"));
        assert_eq!(
            collection.notices,
            vec![Notice::MalformedRecord { row: 6 }, Notice::MalformedRecord { row: 7 }]
        );
    }

    #[test]
    fn text_containers_match_exactly() {
        let rows = vec![
            row(["A".into(), 1.into(), 1.into(), 1.into(), "No".into()]),
            row(["a".into(), 1.into(), 1.into(), 2.into(), "No".into()]),
        ];
        let collection = collect(&rows, 2, &COLUMNS, &CellValue::from("A"), "No");
        assert_eq!(collection.index.len(), 1);
        assert_eq!(collection.index.get(1.0, 1.0, 1.0), Some("D2"));
    }

    #[test]
    fn duplicates_keep_the_last_row() {
        let rows = vec![
            row([1.into(), 1.into(), 1.into(), 5.into(), "No".into()]),
            row([1.into(), 1.into(), 1.into(), 5.into(), "No".into()]),
        ];
        let collection = collect(&rows, 2, &COLUMNS, &CellValue::Number(1.0), "No");
        assert_eq!(collection.index.get(1.0, 1.0, 5.0), Some("D3"));
        assert_eq!(
            collection.notices,
            vec![Notice::DuplicateCoordinate {
                rack: "1".to_owned(),
                box_id: "1".to_owned(),
                slot: "5".to_owned(),
                previous: "D2".to_owned(),
                current: "D3".to_owned(),
            }]
        );
    }

    #[test]
    fn short_rows_read_as_empty() {
        let rows = vec![vec![CellValue::Number(1.0), CellValue::Number(1.0)]];
        let collection = collect(&rows, 2, &COLUMNS, &CellValue::Number(1.0), "No");
        assert!(collection.index.is_empty());
        assert!(collection.notices.is_empty());
    }
}
