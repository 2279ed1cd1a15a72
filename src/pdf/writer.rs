use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::normalize::RegionLayout;
use crate::render::layout::Font;
use crate::render::{Page, PageSetup};

const PRODUCER: &str = concat!("nbgrade ", env!("CARGO_PKG_VERSION"));

/// Build a PDF with one page per rendered page and a bookmark per question.
pub fn build_document(pages: &[Page], setup: &PageSetup, layout: &RegionLayout) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(font.base_font().as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]));
        fonts.set(font.resource_name(), Object::Reference(font_id));
    }
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(fonts),
    )]));

    let media_box = Object::Array(vec![
        0.into(),
        0.into(),
        Object::Real(setup.width),
        Object::Real(setup.height),
    ]);

    let mut page_ids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = page_content(page);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", media_box.clone()),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
        ]));
        page_ids.push(page_id);
    }

    let page_tree = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
        ("Count", Object::Integer(page_ids.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let mut catalog = Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    if let Some(outlines_id) = add_outlines(&mut doc, layout, &page_ids) {
        catalog.set("Outlines", Object::Reference(outlines_id));
        catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let info_id = doc.add_object(Dictionary::from_iter([
        ("Producer", Object::string_literal(PRODUCER)),
    ]));
    doc.trailer.set("Info", Object::Reference(info_id));

    Ok(doc)
}

pub fn write_pdf<P: AsRef<Path>>(
    pages: &[Page],
    setup: &PageSetup,
    layout: &RegionLayout,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let mut doc = build_document(pages, setup, layout)?;
    doc.save(path).map_err(|source| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("wrote {} pages to {}", pages.len(), path.display());
    Ok(())
}

fn page_content(page: &Page) -> Content {
    let mut operations = Vec::with_capacity(page.lines.len() * 5);
    for line in &page.lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(line.font.resource_name().as_bytes().to_vec()),
                Object::Real(line.size),
            ],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(line.x), Object::Real(line.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(&line.text), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Flat outline: one top-level entry per question pointing at its first page.
fn add_outlines(doc: &mut Document, layout: &RegionLayout, page_ids: &[ObjectId]) -> Option<ObjectId> {
    if layout.questions.is_empty() {
        return None;
    }

    let outlines_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = layout
        .questions
        .iter()
        .map(|_| doc.new_object_id())
        .collect();

    for (i, question) in layout.questions.iter().enumerate() {
        let mut item = Dictionary::from_iter([
            ("Title", Object::String(text_string(&question.id), StringFormat::Literal)),
            ("Parent", Object::Reference(outlines_id)),
        ]);
        if let Some(page_id) = page_ids.get(question.pages.start) {
            item.set(
                "Dest",
                Object::Array(vec![
                    Object::Reference(*page_id),
                    Object::Name(b"Fit".to_vec()),
                ]),
            );
        }
        if i > 0 {
            item.set("Prev", Object::Reference(item_ids[i - 1]));
        }
        if let Some(next) = item_ids.get(i + 1) {
            item.set("Next", Object::Reference(*next));
        }
        doc.objects.insert(item_ids[i], Object::Dictionary(item));
    }

    let mut outlines = Dictionary::from_iter([
        ("Type", Object::Name(b"Outlines".to_vec())),
        ("Count", Object::Integer(item_ids.len() as i64)),
    ]);
    if let (Some(first), Some(last)) = (item_ids.first(), item_ids.last()) {
        outlines.set("First", Object::Reference(*first));
        outlines.set("Last", Object::Reference(*last));
    }
    doc.objects.insert(outlines_id, Object::Dictionary(outlines));

    Some(outlines_id)
}

/// Map text onto WinAnsiEncoding, the encoding of our standard fonts.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => b'?',
        })
        .collect()
}

/// PDF text string: plain bytes for ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::QuestionRegion;
    use crate::render::TextLine;

    fn text_page(text: &str) -> Page {
        Page {
            lines: vec![TextLine {
                font: Font::Regular,
                size: 10.0,
                x: 18.0,
                y: 764.0,
                text: text.to_string(),
            }],
        }
    }

    #[test]
    fn test_build_document_page_count() {
        let pages = vec![text_page("hello"), Page::blank(), text_page("(parens)")];
        let mut doc = build_document(&pages, &PageSetup::default(), &RegionLayout::default()).unwrap();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 3);
        assert!(loaded.catalog().unwrap().get(b"Outlines").is_err());
    }

    #[test]
    fn test_write_pdf_saves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        write_pdf(&[text_page("saved")], &PageSetup::default(), &RegionLayout::default(), &path)
            .unwrap();
        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded.get_pages().len(), 1);
    }

    #[test]
    fn test_write_pdf_into_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.pdf");
        let err = write_pdf(&[Page::blank()], &PageSetup::default(), &RegionLayout::default(), &path)
            .unwrap_err();
        match err {
            ConvertError::Write { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[test]
    fn test_page_content_draws_text() {
        let content = page_content(&text_page("hi"));
        let ops: Vec<&str> = content.operations.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(ops, vec!["BT", "Tf", "Td", "Tj", "ET"]);
        assert!(page_content(&Page::blank()).operations.is_empty());
    }

    #[test]
    fn test_outline_per_question() {
        let pages = vec![Page::blank(); 5];
        let layout = RegionLayout {
            preamble: 0..1,
            questions: vec![
                QuestionRegion {
                    id: "q1".into(),
                    pages: 1..3,
                },
                QuestionRegion {
                    id: "q2".into(),
                    pages: 3..5,
                },
            ],
        };
        let doc = build_document(&pages, &PageSetup::default(), &layout).unwrap();
        let catalog = doc.catalog().unwrap();
        let outlines_id = catalog.get(b"Outlines").unwrap().as_reference().unwrap();
        let outlines = doc.get_dictionary(outlines_id).unwrap();
        assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 2);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("a\u{e9}\u{2022}\u{4e2d}"), vec![b'a', 0xE9, 0x95, b'?']);
    }

    #[test]
    fn test_text_string() {
        assert_eq!(text_string("q1"), b"q1".to_vec());
        assert_eq!(text_string("\u{e9}"), vec![0xFE, 0xFF, 0x00, 0xE9]);
    }
}
