//! # DuckDB Sample Tank Extension
//!
//! A DuckDB extension that places laboratory samples recorded in a dataset
//! sheet onto the rack/box layout of a storage tank sheet. Each slot cell of
//! the layout receives a hyperlink back to the sample's row and a highlight
//! color. The table functions return one row per cell they wrote, plus one
//! row per notice (unresolved labels, duplicates, malformed rows, replaced
//! links, datasets that could not be mapped) with the cell columns left NULL.
//!
//! ## Features
//!
//! - **Formats**: Office Open XML (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument (`.ods`)
//! - **Remote files**: any URL DuckDB's `read_blob` can fetch (http, s3, gs, ...)
//! - **Header lookup**: columns are found by name, in any order
//! - **Soft failures**: unknown racks, boxes or malformed rows are skipped and reported
//! - **Link formats**: `formula_style := 'hyperlink'` (default) writes
//!   `=HYPERLINK("#gid=<id>&range=<A1>","<slot>")`; `formula_style := 'navigate'`
//!   writes `NAVIGATE("#sheet=<id>&range=<A1>", "<slot>")`
//! - **Logging**: diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`)
//!
//! ## Table Functions
//!
//! - `map_samples`: map one dataset onto one tank layout
//! - `map_all_samples`: run a whole dataset table over a workbook
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

mod error;
mod extension;
mod helpers;
mod mapping;
mod spreadsheet;

use crate::extension::map_all_samples::MapAllSamplesTableFunction;
use crate::extension::map_samples::MapSamplesTableFunction;
use anyhow::{Context, Result};
use duckdb::Connection;
use duckdb_loadable_macros::duckdb_entrypoint_c_api;
use libduckdb_sys as ffi;
use tracing_subscriber::EnvFilter;

/// Extension entry point for DuckDB.
///
/// Registers `map_samples` and `map_all_samples` on the connection.
#[duckdb_entrypoint_c_api()]
pub unsafe fn extension_entrypoint(connection: Connection) -> Result<()> {
    init_logging();
    connection
        .register_table_function::<MapSamplesTableFunction>("map_samples")
        .context("Failed to register map_samples table function")?;
    connection
        .register_table_function::<MapAllSamplesTableFunction>("map_all_samples")
        .context("Failed to register map_all_samples table function")?;
    Ok(())
}

/// Installs a stderr subscriber unless the host process already has one.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
