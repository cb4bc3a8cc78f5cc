use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;

use super::{ExtractError, ExtractStrategy};

/// Renders the first worksheet of an XLSX workbook as tab-separated lines.
/// Shared and inline strings are resolved; for formula cells only the cached
/// result is captured. Gaps between addressed cells are padded with empty
/// fields so columns keep their alignment.
pub struct XlsxExtractor;

impl ExtractStrategy for XlsxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError(format!("not an XLSX archive: {}", e)))?;

        let shared = match read_entry(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let sheet_name = first_worksheet_name(&archive)
            .ok_or_else(|| ExtractError("workbook contains no worksheets".into()))?;
        let sheet_xml = read_entry(&mut archive, &sheet_name)?
            .ok_or_else(|| ExtractError(format!("missing {}", sheet_name)))?;

        parse_worksheet(&sheet_xml, &shared)
    }

    fn failure_placeholder(&self) -> &'static str {
        "[Error reading XLSX file.]"
    }
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ExtractError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut xml = String::new();
            entry
                .read_to_string(&mut xml)
                .map_err(|e| ExtractError(format!("unreadable {}: {}", name, e)))?;
            Ok(Some(xml))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(ExtractError(format!("cannot open {}: {}", name, e))),
    }
}

/// Picks `xl/worksheets/sheet1.xml` when present, otherwise the
/// lexicographically first worksheet entry.
fn first_worksheet_name(archive: &ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    let mut sheets: Vec<&str> = archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/") && name.ends_with(".xml"))
        .collect();
    if sheets.contains(&"xl/worksheets/sheet1.xml") {
        return Some("xl/worksheets/sheet1.xml".to_string());
    }
    sheets.sort_unstable();
    sheets.first().map(|name| name.to_string())
}

/// Collects the `<si>` entries of the shared-string table, concatenating
/// the `<t>` runs of rich-text entries.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_t = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"t" => in_t = true,
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_t {
                    let value = e
                        .unescape()
                        .map_err(|err| ExtractError(format!("bad shared string: {}", err)))?;
                    current.push_str(&value);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ExtractError(format!("malformed shared strings: {}", err)));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Converts a cell reference like `B3` to a zero-based column index.
fn column_index(cell_ref: &str) -> Option<usize> {
    let mut index = 0usize;
    let mut seen = false;
    for ch in cell_ref.chars() {
        if !ch.is_ascii_alphabetic() {
            break;
        }
        seen = true;
        index = index * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    if seen { Some(index - 1) } else { None }
}

fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>, ExtractError> {
    match e.try_get_attribute(name) {
        Ok(Some(attr)) => {
            let value = attr
                .unescape_value()
                .map_err(|err| ExtractError(format!("bad attribute: {}", err)))?;
            Ok(Some(value.into_owned()))
        }
        Ok(None) => Ok(None),
        Err(err) => Err(ExtractError(format!("bad attribute: {}", err))),
    }
}

fn parse_worksheet(xml: &str, shared: &[String]) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut lines: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_column: Option<usize> = None;
    let mut cell_type: Option<String> = None;
    let mut cell_value = String::new();
    let mut capturing = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    cell_column = attribute(e, b"r")?.as_deref().and_then(column_index);
                    cell_type = attribute(e, b"t")?;
                    cell_value.clear();
                }
                b"v" | b"t" => capturing = true,
                _ => {}
            },
            // Self-closing cells hold no value but still occupy a column.
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"c" => {
                    let column = attribute(e, b"r")?
                        .as_deref()
                        .and_then(column_index)
                        .unwrap_or(row.len());
                    while row.len() < column {
                        row.push(String::new());
                    }
                    row.push(String::new());
                }
                b"row" => lines.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if capturing {
                    let value = e
                        .unescape()
                        .map_err(|err| ExtractError(format!("bad cell text: {}", err)))?;
                    cell_value.push_str(&value);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"v" | b"t" => capturing = false,
                b"c" => {
                    let resolved = match cell_type.as_deref() {
                        Some("s") => cell_value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i))
                            .cloned()
                            .unwrap_or_default(),
                        _ => std::mem::take(&mut cell_value),
                    };
                    let column = cell_column.take().unwrap_or(row.len());
                    while row.len() < column {
                        row.push(String::new());
                    }
                    row.push(resolved);
                    cell_type = None;
                    cell_value.clear();
                }
                b"row" => lines.push(row.join("\t")),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(ExtractError(format!("malformed worksheet: {}", err))),
            _ => {}
        }
        buf.clear();
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn workbook(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn shared_strings_and_numbers_become_tab_separated_rows() {
        let shared = r#"<sst><si><t>Name</t></si><si><t>Score</t></si><si><t>Alice</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>10</v></c></row>
        </sheetData></worksheet>"#;

        let bytes = workbook(&[
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);

        let text = XlsxExtractor.extract(&bytes).unwrap();
        assert_eq!(text, "Name\tScore\nAlice\t10");
    }

    #[test]
    fn gaps_between_addressed_cells_are_padded() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1"><v>1</v></c><c r="C1"><v>3</v></c></row>
        </sheetData></worksheet>"#;

        let bytes = workbook(&[("xl/worksheets/sheet1.xml", sheet)]);
        let text = XlsxExtractor.extract(&bytes).unwrap();
        assert_eq!(text, "1\t\t3");
    }

    #[test]
    fn inline_strings_are_captured() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>hello</t></is></c></row>
        </sheetData></worksheet>"#;

        let bytes = workbook(&[("xl/worksheets/sheet1.xml", sheet)]);
        let text = XlsxExtractor.extract(&bytes).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn column_references_map_to_indexes() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("3"), None);
    }

    #[test]
    fn workbook_without_worksheets_is_an_error() {
        let bytes = workbook(&[("xl/other.xml", "<x/>")]);
        assert!(XlsxExtractor.extract(&bytes).is_err());
    }
}
