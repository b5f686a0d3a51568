//! # Spreadsheet Module
//!
//! Loads Office Open XML (.xlsx, .xlsm, .xlam) and OpenDocument (.ods) files,
//! local or remote, into an in-memory [`workbook::Workbook`] that implements the
//! [`store::TabularStore`] capability used by the mapping pipeline.
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod store;
pub(crate) mod value;
pub(crate) mod workbook;
pub(crate) mod xlsx;

use crate::error::RustyTankError;
use crate::spreadsheet::workbook::Workbook;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;

/// Signature of a compound file; encrypted OOXML packages are wrapped in one.
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Errors raised while opening or decoding a spreadsheet file
#[derive(Error, Debug)]
pub(crate) enum SpreadsheetError {
    /// Unsupported or unrecognized file format
    #[error("Cannot detect file format for '{0}'")]
    FileFormatError(String),

    /// A part required by the format is missing from the package
    #[error("Missing file '{0}' in spreadsheet package")]
    FileError(String),

    /// The workbook declares no sheets
    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),
}

/// Opens a local path or remote URL and loads all of its sheets.
///
/// The format is chosen by file extension; query strings and fragments of URLs
/// are ignored for that purpose.
pub(crate) fn open_workbook(file_name: &str) -> Result<Workbook, RustyTankError> {
    let workbook = match extension(file_name).as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xlam") => xlsx::load(file_name)?,
        Some("ods") => ods::load(file_name)?,
        _ => Err(SpreadsheetError::FileFormatError(file_name.to_owned()))?,
    };
    tracing::info!(file = workbook.name.as_str(), sheets = ?workbook.sheet_names(), "opened workbook");
    Ok(workbook)
}

/// Lower-cased extension of the last path segment.
fn extension(file_name: &str) -> Option<String> {
    let path = file_name.split(['?', '#']).next().unwrap_or(file_name);
    let segment = path.rsplit(['/', '\\']).next().unwrap_or(path);
    segment
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
}

/// Detects a compound-file header, restoring the stream position afterwards.
pub(crate) fn is_password_protected<R: Read + Seek>(reader: &mut R) -> bool {
    let mut signature = [0u8; 8];
    let matched = reader.read_exact(&mut signature).is_ok() && signature == CFB_SIGNATURE;
    let _ = reader.seek(SeekFrom::Start(0));
    matched
}
