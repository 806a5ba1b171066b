//! PDF page text extraction.

use lopdf::Document;
use tracing::warn;

/// Extract text page by page, joining pages with line breaks.
///
/// A page whose text cannot be decoded contributes an empty line instead
/// of failing the whole document.
pub fn extract_text(bytes: &[u8]) -> Result<String, String> {
    let doc = Document::load_mem(bytes).map_err(|e| e.to_string())?;

    let pages: Vec<String> = doc
        .get_pages()
        .keys()
        .map(|&page| match doc.extract_text(&[page]) {
            Ok(text) => text.trim_end().to_string(),
            Err(e) => {
                warn!(page, error = %e, "Skipping undecodable PDF page");
                String::new()
            }
        })
        .collect();

    Ok(pages.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids = Vec::new();
        for text in texts {
            let resources_id = doc.add_object(dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            });
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
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
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn pages_extracted_in_order() {
        let bytes = pdf_with_pages(&["First page", "Second page"]);
        let text = extract_text(&bytes).unwrap();
        let first = text.find("First").unwrap();
        let second = text.find("Second").unwrap();
        assert!(first < second);
        assert!(text.contains('\n'));
    }

    #[test]
    fn garbage_is_error() {
        assert!(extract_text(b"%PDF-1.5 truncated").is_err());
    }
}
