use lopdf::Document;
use tracing::debug;

use crate::extraction::{ExtractOptions, ExtractionError, FormatExtractor};

/// PDF text extraction via lopdf, honouring the configured page limit.
pub struct PdfExtractor;

impl FormatExtractor for PdfExtractor {
    fn extract_raw(
        &self,
        content: &[u8],
        options: &ExtractOptions,
    ) -> Result<String, ExtractionError> {
        let document = Document::load_mem(content)
            .map_err(|e| ExtractionError::Unreadable(format!("invalid PDF: {e}")))?;

        if document.is_encrypted() {
            return Err(ExtractionError::Encrypted);
        }

        // get_pages() is keyed by 1-based page number, already in page order.
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Err(ExtractionError::NoPages);
        }

        let selected = match options.page_limit {
            Some(limit) if limit > 0 => &pages[..limit.min(pages.len())],
            _ => &pages[..],
        };
        debug!(
            total_pages = pages.len(),
            extracted_pages = selected.len(),
            "extracting PDF text"
        );

        document
            .extract_text(selected)
            .map_err(|e| ExtractionError::Unreadable(format!("PDF text extraction failed: {e}")))
    }
}

/// Builds small text-only PDFs for tests: one inner slice per page, one line per entry.
#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    pub(crate) fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
        save(build_document(pages))
    }

    /// Same layout with a standard-handler `Encrypt` entry in the trailer.
    pub(crate) fn build_encrypted_pdf(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = build_document(pages);
        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 1,
            "R" => 2,
            "Length" => 40,
            "P" => -4,
            "O" => Object::string_literal(vec![0u8; 32]),
            "U" => Object::string_literal(vec![0u8; 32]),
        });
        doc.trailer.set("Encrypt", encrypt_id);
        save(doc)
    }

    fn save(mut doc: Document) -> Vec<u8> {
        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("serialize PDF");
        buf
    }

    fn build_document(pages: &[&[&str]]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                // One text object per line so extraction ends each line with a break.
                let y = 720 - 16 * i as i64;
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
                operations.push(Operation::new("Td", vec![72.into(), y.into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content stream"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }
}
