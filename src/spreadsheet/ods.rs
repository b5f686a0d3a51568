use crate::error::RustyTankError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::value::CellValue;
use crate::spreadsheet::workbook::Workbook;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use std::io::Seek;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
/// XML element name for table (sheet)
const TABLE: QName = QName(b"table:table");
/// XML element name for table row
const TABLE_ROW: QName = QName(b"table:table-row");
/// XML element name for table cell
const TABLE_CELL: QName = QName(b"table:table-cell");
/// XML element name for covered table cell (merged cells)
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// XML element name for annotations (comments)
const ANNOTATION: QName = QName(b"office:annotation");
/// XML element name for paragraph text
const PARAGRAPH: QName = QName(b"text:p");
/// XML element name for string (space) text
const STRING: QName = QName(b"text:s");

/// Error types specific to ODS spreadsheet processing
#[derive(Error, Debug)]
pub(crate) enum OdsError {
    /// Invalid ODS MIME type detected in file
    #[error("Invalid ODS MIME type")]
    MimeTypeError,
}

/// Loads every table of an OpenDocument spreadsheet (.ods).
///
/// ODS has no stable sheet identifier, so sheets are numbered from 1 in
/// document order.
pub(crate) fn load(file_name: &str) -> Result<Workbook, RustyTankError> {
    let reader = UnifiedReader::new(file_name)?;
    let mut zip = ZipArchive::new(reader)?;
    load_archive(file_name, &mut zip)
}

pub(crate) fn load_archive<RS: Read + Seek>(file_name: &str, zip: &mut ZipArchive<RS>) -> Result<Workbook, RustyTankError> {
    check_mime(zip)?;
    if is_password_protected(zip)? {
        Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
    }

    let mut workbook = Workbook::new(file_name);
    let mut reader = zip
        .xml_reader("content.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_string()))?;

    let mut row = 0usize;
    let mut col = 0usize;
    let mut row_count = 1usize;
    let mut col_count = 1usize;
    let mut value = None::<CellValue>;
    let mut text = String::new();
    // Inside a string cell whose paragraphs hold the value
    let mut element_context = false;
    // Inside a comment attached to the cell
    let mut comment_context = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TABLE => {
            let name = event.get_attribute_value("table:name")?.unwrap_or_default().to_string();
            let id = (workbook.sheets.len() + 1).to_string();
            workbook.add_sheet(&name, &id);
            row = 0;
        }
        Event::Start(event) if event.name() == TABLE_ROW => {
            row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
            col = 0;
        }
        Event::End(event) if event.name() == TABLE_ROW => row += row_count,
        Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
            col_count = event.parse_attribute_value("table:number-columns-repeated")?.unwrap_or(1);
            text.clear();
            element_context = false;
            value = match event.get_attribute_value("office:value-type")?.as_deref() {
                Some("string") => {
                    element_context = true;
                    Some(CellValue::Empty)
                }
                Some("boolean") => event
                    .get_attribute_value("office:boolean-value")?
                    .map(|flag| CellValue::Boolean(flag != "false" && flag != "0")),
                Some("date") => event.get_attribute_value("office:date-value")?.map(|date| CellValue::Text(date.to_string())),
                Some("time") => event.get_attribute_value("office:time-value")?.map(|time| CellValue::Text(time.to_string())),
                Some(_) => event
                    .parse_attribute_value::<f64>("office:value")?
                    .map(CellValue::Number),
                None => None,
            };
        }
        Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
            let value = match value.take() {
                Some(CellValue::Empty) if !text.is_empty() => Some(CellValue::Text(text.to_owned())),
                Some(CellValue::Empty) | None => None,
                other => other,
            };
            if let (Some(value), Some(sheet)) = (value, workbook.sheets.last_mut()) {
                for row_offset in 0..row_count {
                    for col_offset in 0..col_count {
                        sheet.set_value(row + row_offset + 1, col + col_offset + 1, value.to_owned());
                    }
                }
            }
            col += col_count;
            element_context = false;
            comment_context = false;
        }
        Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
        Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
        Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
            if !text.is_empty() {
                text.push('\n');
            }
        }
        Event::Start(event) if element_context && !comment_context && event.name() == STRING => {
            let count = event.parse_attribute_value("text:c")?.unwrap_or(1usize);
            text.extend(std::iter::repeat(' ').take(count));
        }
        Event::Text(event) if element_context && !comment_context => text.push_bytes_text(&event)?,
        Event::GeneralRef(event) if element_context && !comment_context => text.push_bytes_ref(&event)?,
    });

    if workbook.sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
    }
    Ok(workbook)
}

/// Validates the `mimetype` entry when the package has one
fn check_mime<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(), RustyTankError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Checks the manifest for encrypted entries
fn is_password_protected<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<bool, RustyTankError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:encryption-data") => return Ok(true),
    });
    Ok(false)
}
