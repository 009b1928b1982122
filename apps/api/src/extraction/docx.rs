use std::io::{Cursor, Read};

use quick_xml::events::Event;
use zip::ZipArchive;

use crate::extraction::{ExtractOptions, ExtractionError, FormatExtractor};

const DOCUMENT_PART: &str = "word/document.xml";

/// DOCX text extraction: unzips the package and walks `word/document.xml`.
pub struct DocxExtractor;

impl FormatExtractor for DocxExtractor {
    fn extract_raw(
        &self,
        content: &[u8],
        _options: &ExtractOptions,
    ) -> Result<String, ExtractionError> {
        let mut archive = ZipArchive::new(Cursor::new(content))
            .map_err(|e| ExtractionError::Unreadable(format!("not a DOCX package: {e}")))?;

        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| ExtractionError::Unreadable(format!("missing {DOCUMENT_PART}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractionError::Unreadable(format!("cannot read {DOCUMENT_PART}: {e}")))?;

        document_xml_to_text(&xml)
    }
}

/// Collects `<w:t>` runs; paragraphs and `<w:br/>` become newlines, `<w:tab/>` a tab.
fn document_xml_to_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::Text(e)) if in_text_run => {
                let run = e
                    .unescape()
                    .map_err(|e| ExtractionError::Unreadable(format!("bad DOCX text run: {e}")))?;
                text.push_str(&run);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::Unreadable(format!("malformed DOCX XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    use super::*;
    use crate::extraction::{DocumentExtractor, ExtractOptions};

    fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, FileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_become_single_spaced_text() {
        let docx = build_docx(&["Jane Doe", "Skills: Rust, Go", "Experience: Engineer"]);
        let extractor = DocumentExtractor::with_default_formats(ExtractOptions::default());
        let text = extractor.extract(&docx, "docx").unwrap();
        assert_eq!(text.as_str(), "Jane Doe Skills: Rust, Go Experience: Engineer");
    }

    #[test]
    fn test_entities_are_unescaped() {
        let raw = document_xml_to_text(
            "<w:document><w:body><w:p><w:r><w:t>R&amp;D Lead</w:t></w:r></w:p></w:body></w:document>",
        )
        .unwrap();
        assert_eq!(raw.trim(), "R&D Lead");
    }

    #[test]
    fn test_tabs_and_breaks_are_whitespace() {
        let raw = document_xml_to_text(
            "<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>",
        )
        .unwrap();
        assert_eq!(raw, "a\tb\nc\n");
    }

    #[test]
    fn test_non_zip_payload_is_unreadable() {
        let err = DocxExtractor
            .extract_raw(b"PK but not really", &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(_)));
    }

    #[test]
    fn test_zip_without_document_part_is_unreadable() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", FileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = DocxExtractor
            .extract_raw(&bytes, &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(msg) if msg.contains(DOCUMENT_PART)));
    }
}
