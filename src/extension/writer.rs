//! Result schema and chunk writing shared by the table functions.

use crate::extension::AnnotationRow;
use duckdb::core::DataChunkHandle;
use duckdb::core::FlatVector;
use duckdb::core::Inserter;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Rows emitted per call of the table function
const CHUNK_SIZE: usize = 2048;

/// Result columns, in output order.
const COLUMNS: [(&str, LogicalTypeId); 8] = [
    ("source", LogicalTypeId::Varchar),
    ("grid", LogicalTypeId::Varchar),
    ("cell", LogicalTypeId::Varchar),
    ("row", LogicalTypeId::Bigint),
    ("col", LogicalTypeId::Bigint),
    ("formula", LogicalTypeId::Varchar),
    ("color", LogicalTypeId::Varchar),
    ("notice", LogicalTypeId::Varchar),
];

pub(super) fn add_result_columns(bind: &BindInfo) {
    for (name, kind) in COLUMNS {
        bind.add_result_column(name, LogicalTypeHandle::from(kind));
    }
}

/// Writes the next chunk of `rows` into `output`, claiming it through `index`.
/// An empty chunk tells DuckDB the scan is over.
pub(super) fn write_chunk(rows: &[AnnotationRow], index: &AtomicUsize, output: &mut DataChunkHandle) {
    let lower = index.fetch_add(CHUNK_SIZE, Ordering::Relaxed);
    let upper = rows.len().min(lower + CHUNK_SIZE);
    if lower >= upper {
        output.set_len(0);
        return;
    }

    let mut vectors: Vec<FlatVector> = (0..COLUMNS.len()).map(|column| output.flat_vector(column)).collect();
    for (offset, record) in rows[lower..upper].iter().enumerate() {
        vectors[0].insert(offset, record.source.as_str());
        vectors[1].insert(offset, record.grid.as_str());
        write_optional(&mut vectors[2], offset, record.cell.as_deref());
        match record.row.zip(record.col) {
            Some((row, col)) => {
                write_primitive(&mut vectors[3], offset, row);
                write_primitive(&mut vectors[4], offset, col);
            }
            None => {
                vectors[3].set_null(offset);
                vectors[4].set_null(offset);
            }
        }
        write_optional(&mut vectors[5], offset, record.formula.as_deref());
        write_optional(&mut vectors[6], offset, record.color.as_deref());
        write_optional(&mut vectors[7], offset, record.notice.as_deref());
    }
    output.set_len(upper - lower);
}

fn write_optional(vector: &mut FlatVector, index: usize, value: Option<&str>) {
    match value {
        Some(value) => vector.insert(index, value),
        None => vector.set_null(index),
    }
}

/// Writes a primitive value directly to a vector using pointer arithmetic.
fn write_primitive<T>(vector: &mut FlatVector, index: usize, value: T) {
    unsafe {
        let pointer: *mut T = vector.as_mut_ptr();
        std::ptr::write(pointer.add(index), value);
    }
}
