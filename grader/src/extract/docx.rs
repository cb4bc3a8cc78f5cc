use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use super::{ExtractError, ExtractStrategy};

/// Pulls paragraph text out of a DOCX archive by streaming
/// `word/document.xml`. Runs inside a paragraph are concatenated; tabs and
/// explicit breaks become `\t` and `\n`; paragraphs are separated by `\n`.
pub struct DocxExtractor;

impl ExtractStrategy for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError(format!("not a DOCX archive: {}", e)))?;

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError(format!("missing word/document.xml: {}", e)))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractError(format!("unreadable document XML: {}", e)))?;

        let mut reader = Reader::from_str(&xml);
        let mut buf = Vec::new();
        let mut output = String::new();
        let mut in_text_node = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"w:t" => in_text_node = true,
                    b"w:tab" => output.push('\t'),
                    b"w:br" => output.push('\n'),
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                    b"w:tab" => output.push('\t'),
                    b"w:br" => output.push('\n'),
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if in_text_node {
                        let value = e
                            .unescape()
                            .map_err(|err| ExtractError(format!("bad XML text: {}", err)))?;
                        output.push_str(&value);
                    }
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"w:t" => in_text_node = false,
                    b"w:p" => output.push('\n'),
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(err) => return Err(ExtractError(format!("malformed document XML: {}", err))),
                _ => {}
            }
            buf.clear();
        }

        Ok(output.trim_end().to_string())
    }

    fn failure_placeholder(&self) -> &'static str {
        "[Error reading DOCX file.]"
    }
}
