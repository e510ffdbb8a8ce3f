use enfill_domain::errors::PipelineError;
use enfill_domain::repositories::table_source::{RawTable, TableSource};
use quick_xml::events::Event;
use std::io::Read;
use std::path::PathBuf;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Maximum cells parsed from the sheet (avoids unbounded memory).
const MAX_CELLS: usize = 2_000_000;

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

/// XLSX adapter: reads the first worksheet of the workbook. The first sheet
/// row is the header and sets the table width; shorter data rows are padded
/// with empty cells. Date cells arrive as Excel day serials in numeric form;
/// the normalization stage converts them.
#[derive(Debug)]
pub struct XlsxTable {
    path: PathBuf,
}

impl XlsxTable {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TableSource for XlsxTable {
    fn read_rows(&self) -> Result<RawTable, PipelineError> {
        let bytes = std::fs::read(&self.path).map_err(|err| {
            PipelineError::Io(format!("failed to read {}: {}", self.path.display(), err))
        })?;
        let mut rows = parse_workbook(&bytes)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let width = rows[0].len();
        let data = rows.split_off(1);
        Ok(data
            .into_iter()
            .map(|mut row| {
                while row.len() < width {
                    row.push(String::new());
                }
                row
            })
            .collect())
    }
}

/// Parses the full sheet (header included) out of workbook bytes.
pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>, PipelineError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|err| PipelineError::Io(format!("failed to open xlsx archive: {err}")))?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_name = first_worksheet_name(&archive)?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &sheet_name, MAX_XML_ENTRY_BYTES)?;
    parse_sheet_rows(&sheet_xml, &shared_strings)
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, PipelineError> {
    let entry = archive
        .by_name(name)
        .map_err(|err| PipelineError::Io(format!("xlsx entry {name}: {err}")))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|err| PipelineError::Io(format!("xlsx entry {name}: {err}")))?;
    if out.len() as u64 >= max_bytes {
        return Err(PipelineError::Io(format!(
            "xlsx entry {name} exceeds size limit ({max_bytes} bytes)"
        )));
    }
    Ok(out)
}

fn first_worksheet_name(archive: &Archive<'_>) -> Result<String, PipelineError> {
    archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/sheet") && name.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches("xl/worksheets/sheet")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(|name| name.to_string())
        .ok_or_else(|| PipelineError::Io("xlsx contains no worksheet".to_string()))
}

fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, PipelineError> {
    // Workbooks without string cells have no sharedStrings part at all.
    if !archive.file_names().any(|n| n == "xl/sharedStrings.xml") {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::Text(text)) if in_t => {
                current.push_str(&text.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(PipelineError::Io(format!("xlsx shared strings: {err}")));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn parse_sheet_rows(
    xml: &[u8],
    shared_strings: &[String],
) -> Result<Vec<Vec<String>>, PipelineError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut row: Vec<String> = Vec::new();
    let mut cell_column = 0usize;
    let mut cell_is_shared = false;
    let mut cell_value = String::new();
    let mut in_value = false;
    let mut in_inline_text = false;
    let mut cell_count = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = Vec::new();
                    cell_column = 0;
                }
                b"c" => {
                    cell_count += 1;
                    if cell_count > MAX_CELLS {
                        return Err(PipelineError::Io(format!(
                            "xlsx sheet exceeds {MAX_CELLS} cells"
                        )));
                    }
                    cell_is_shared = false;
                    cell_value.clear();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => {
                                if let Some(col) = column_index(&attr.value) {
                                    cell_column = col;
                                }
                            }
                            b"t" => cell_is_shared = attr.value.as_ref() == b"s",
                            _ => {}
                        }
                    }
                }
                b"v" => in_value = true,
                b"t" => in_inline_text = true,
                _ => {}
            },
            // Self-closing elements: an empty cell still occupies its column.
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"r" {
                            if let Some(col) = column_index(&attr.value) {
                                cell_column = col;
                            }
                        }
                    }
                    while row.len() < cell_column {
                        row.push(String::new());
                    }
                    row.push(String::new());
                    cell_column += 1;
                }
                _ => {}
            },
            Ok(Event::Text(text)) if in_value || in_inline_text => {
                cell_value.push_str(&text.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    let resolved = if cell_is_shared {
                        cell_value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|index| shared_strings.get(index).cloned())
                            .unwrap_or_default()
                    } else {
                        std::mem::take(&mut cell_value)
                    };
                    while row.len() < cell_column {
                        row.push(String::new());
                    }
                    row.push(resolved);
                    cell_value.clear();
                    cell_column += 1;
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(PipelineError::Io(format!("xlsx sheet: {err}"))),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

/// Column index from a cell reference like `C5` (-> 2).
fn column_index(reference: &[u8]) -> Option<usize> {
    let mut index = 0usize;
    let mut seen_letter = false;
    for &byte in reference {
        if byte.is_ascii_uppercase() {
            seen_letter = true;
            index = index * 26 + (byte - b'A') as usize + 1;
        } else {
            break;
        }
    }
    seen_letter.then(|| index - 1)
}

#[cfg(test)]
mod tests {
    use super::{column_index, parse_workbook};
    use std::io::Write;

    /// Builds a minimal xlsx in memory: one sheet, shared strings for the
    /// header, inline numbers for the data.
    fn build_workbook(shared: &[&str], sheet_xml: &str) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();

            let mut shared_xml = String::from(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><sst>",
            );
            for s in shared {
                shared_xml.push_str(&format!("<si><t>{s}</t></si>"));
            }
            shared_xml.push_str("</sst>");

            writer
                .start_file("xl/sharedStrings.xml", options)
                .unwrap();
            writer.write_all(shared_xml.as_bytes()).unwrap();
            writer
                .start_file("xl/worksheets/sheet1.xml", options)
                .unwrap();
            writer.write_all(sheet_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn parses_shared_and_numeric_cells_by_position() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1">
                <c r="A1" t="s"><v>0</v></c>
                <c r="B1" t="s"><v>1</v></c>
            </row>
            <row r="2">
                <c r="A2"><v>45292.5</v></c>
                <c r="B2"><v>12.75</v></c>
            </row>
        </sheetData></worksheet>"#;
        let bytes = build_workbook(&["timestamp", "energy"], sheet);
        let rows = parse_workbook(&bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["timestamp", "energy"]);
        assert_eq!(rows[1], vec!["45292.5", "12.75"]);
    }

    #[test]
    fn skipped_cells_leave_empty_slots() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1"><v>1</v></c><c r="C1"><v>3</v></c></row>
        </sheetData></worksheet>"#;
        let bytes = build_workbook(&[], sheet);
        let rows = parse_workbook(&bytes).unwrap();
        assert_eq!(rows[0], vec!["1", "", "3"]);
    }

    #[test]
    fn inline_strings_are_read() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>energy</t></is></c></row>
        </sheetData></worksheet>"#;
        let bytes = build_workbook(&[], sheet);
        let rows = parse_workbook(&bytes).unwrap();
        assert_eq!(rows[0], vec!["energy"]);
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        assert!(parse_workbook(b"not a zip archive").is_err());
    }

    #[test]
    fn column_references_decode() {
        assert_eq!(column_index(b"A1"), Some(0));
        assert_eq!(column_index(b"C5"), Some(2));
        assert_eq!(column_index(b"AA10"), Some(26));
        assert_eq!(column_index(b"7"), None);
    }
}
