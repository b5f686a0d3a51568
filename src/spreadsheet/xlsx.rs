use crate::error::RustyTankError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::reference::parse_reference;
use crate::spreadsheet::value::CellValue;
use crate::spreadsheet::workbook::Workbook;
use crate::spreadsheet::is_password_protected;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: &[u8] = b"Relationship";   // Package relationship
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");     // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                // Text content within strings
const TAG_SHEET: QName = QName(b"sheet");           // Worksheet definition
const TAG_ROW: QName = QName(b"row");               // Row in worksheet
const TAG_CELL: QName = QName(b"c");                // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");      // Inline string value
const TAG_VALUE: QName = QName(b"v");               // Cell value content

/// How the `<v>` content of a cell is interpreted, from its `t` attribute
#[derive(Copy, Clone, Debug, PartialEq)]
enum ValueKind {
    Number,
    Boolean,
    SharedString,
    Text,
}

/// A worksheet entry of `xl/workbook.xml`
struct SheetEntry {
    name: String,
    id: String,
    path: String,
}

/// Loads every worksheet of an Office Open XML workbook (.xlsx, .xlsm).
///
/// Values only are loaded; styles and formulas already in the file are ignored.
/// The `sheetId` attribute becomes the sheet id used by cross-reference links.
pub(crate) fn load(file_name: &str) -> Result<Workbook, RustyTankError> {
    let mut reader = UnifiedReader::new(file_name)?;
    if is_password_protected(&mut reader) {
        Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
    }
    let mut zip = ZipArchive::new(reader)?;
    load_archive(file_name, &mut zip)
}

pub(crate) fn load_archive<RS: Read + Seek>(file_name: &str, zip: &mut ZipArchive<RS>) -> Result<Workbook, RustyTankError> {
    let entries = load_sheet_entries(zip)?;
    if entries.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
    }
    let shared_strings = load_shared_strings(zip)?;

    let mut workbook = Workbook::new(file_name);
    for entry in entries {
        let mut reader = zip
            .xml_reader(&entry.path)?
            .ok_or_else(|| SpreadsheetError::FileError(entry.path.to_owned()))?;
        let sheet = workbook.add_sheet(&entry.name, &entry.id);

        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = None::<ValueKind>;
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                row = event.parse_attribute_value("r")?.unwrap_or(row + 1);
                col = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| parse_reference(&reference))
                    .unwrap_or((row, col + 1));
                kind = Some(match event.get_attribute_value("t")?.as_deref() {
                    Some("s") => ValueKind::SharedString,
                    Some("b") => ValueKind::Boolean,
                    Some("inlineStr") | Some("str") | Some("e") | Some("d") => ValueKind::Text,
                    _ => ValueKind::Number,
                });
                value.clear();
            }
            Event::Start(event) if kind.is_some() && event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if kind.is_some() && event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if let Some(kind) = kind.take().filter(|_| !value.is_empty()) {
                    sheet.set_value(row, col, to_cell_value(kind, &value, &shared_strings)?);
                }
            }
        });
        tracing::debug!(file = file_name, sheet = entry.name.as_str(), "loaded worksheet");
    }
    Ok(workbook)
}

/// Converts the raw `<v>` text of a cell into a value.
fn to_cell_value(kind: ValueKind, value: &str, shared_strings: &[String]) -> Result<CellValue, RustyTankError> {
    Ok(match kind {
        ValueKind::SharedString => {
            let index = value.trim().parse::<usize>()?;
            CellValue::Text(shared_strings.get(index).cloned().unwrap_or_default())
        }
        ValueKind::Boolean => CellValue::Boolean(value == "1" || value == "true"),
        ValueKind::Text => CellValue::Text(value.to_owned()),
        ValueKind::Number => match value.trim().parse::<f64>() {
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(value.to_owned()),
        },
    })
}

/// Reads worksheet names, ids and part paths from `xl/workbook.xml`.
fn load_sheet_entries<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<SheetEntry>, RustyTankError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut entries = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            let mut relationship = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.unescape_value()?),
                    b"sheetId" => id = Some(attribute.unescape_value()?),
                    b"id" => relationship = Some(attribute.unescape_value()?),
                    _ => (),
                }
            }
            if let Some((name, relationship)) = name.zip(relationship) {
                if let Some(path) = relationships.get(relationship.as_ref()) {
                    entries.push(SheetEntry {
                        id: id.map(|id| id.to_string()).unwrap_or_else(|| (entries.len() + 1).to_string()),
                        name: name.to_string(),
                        path: path.to_owned(),
                    });
                }
            }
        }
    });
    Ok(entries)
}

/// Maps relationship ids of worksheet parts to their paths inside the archive.
fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, RustyTankError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Loads the shared string table; workbooks without one have no shared strings.
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, RustyTankError> {
    let mut shared_strings = Vec::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Normalizes a relationship target to a path inside the archive.
fn to_zip_path(path: &str) -> String {
    if let Some(path) = path.strip_prefix('/') {
        path.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Reads string content up to `end_tag`, skipping phonetic runs.
/// `is_text_content` is set for `<v>`, whose text is the value itself.
fn read_string_value<R: BufRead>(reader: &mut XmlReader<R>, end_tag: QName, is_text_content: bool) -> Result<String, RustyTankError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
