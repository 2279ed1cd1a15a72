use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

use super::document::{decode_pdf_string, PdfDocument};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    /// 1-based page the bookmark points at
    pub page: Option<u32>,
}

/// Pages attributed to one bookmarked question, 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPages {
    pub title: String,
    pub first: u32,
    pub last: u32,
}

impl QuestionPages {
    pub fn page_count(&self) -> u32 {
        self.last + 1 - self.first
    }
}

/// Top-level bookmarks of a PDF, in outline order
pub fn extract_bookmarks(pdf: &PdfDocument) -> Result<Vec<Bookmark>> {
    let doc = &pdf.doc;
    let catalog = doc.catalog()?;

    let outlines_ref = match catalog.get(b"Outlines") {
        Ok(Object::Reference(r)) => *r,
        _ => return Ok(Vec::new()),
    };
    let outlines = match doc.get_dictionary(outlines_ref) {
        Ok(d) => d,
        _ => return Ok(Vec::new()),
    };

    let page_map: Vec<(ObjectId, u32)> = pdf.page_ids().into_iter().map(|(n, id)| (id, n)).collect();

    let mut bookmarks = Vec::new();
    let mut visited = HashSet::new();
    let mut current = match outlines.get(b"First") {
        Ok(Object::Reference(r)) => Some(*r),
        _ => None,
    };

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let dict = match doc.get_dictionary(id) {
            Ok(d) => d,
            Err(_) => break,
        };

        let title = match dict.get(b"Title") {
            Ok(Object::String(bytes, _)) => decode_pdf_string(bytes),
            _ => "Untitled".to_string(),
        };
        bookmarks.push(Bookmark {
            title,
            page: destination_page(doc, dict, &page_map),
        });

        current = match dict.get(b"Next") {
            Ok(Object::Reference(r)) => Some(*r),
            _ => None,
        };
    }

    Ok(bookmarks)
}

/// Each bookmark owns the pages up to the next bookmark (or the end).
pub fn question_pages(bookmarks: &[Bookmark], total_pages: u32) -> Vec<QuestionPages> {
    let anchored: Vec<(&str, u32)> = bookmarks
        .iter()
        .filter_map(|b| b.page.map(|p| (b.title.as_str(), p)))
        .collect();

    anchored
        .iter()
        .enumerate()
        .map(|(i, (title, first))| {
            let last = anchored
                .get(i + 1)
                .map_or(total_pages, |(_, next)| next.saturating_sub(1).max(*first));
            QuestionPages {
                title: title.to_string(),
                first: *first,
                last,
            }
        })
        .collect()
}

fn destination_page(doc: &Document, dict: &Dictionary, page_map: &[(ObjectId, u32)]) -> Option<u32> {
    if let Ok(dest) = dict.get(b"Dest") {
        return resolve_destination(doc, dest, page_map);
    }

    // GoTo action, inline or referenced
    let action = match dict.get(b"A") {
        Ok(Object::Dictionary(d)) => d,
        Ok(Object::Reference(r)) => doc.get_dictionary(*r).ok()?,
        _ => return None,
    };
    match action.get(b"S") {
        Ok(Object::Name(kind)) if kind == b"GoTo" => {
            resolve_destination(doc, action.get(b"D").ok()?, page_map)
        }
        _ => None,
    }
}

fn resolve_destination(doc: &Document, dest: &Object, page_map: &[(ObjectId, u32)]) -> Option<u32> {
    match dest {
        Object::Array(arr) => match arr.first() {
            Some(Object::Reference(page_ref)) => page_map
                .iter()
                .find(|(id, _)| id == page_ref)
                .map(|(_, num)| *num),
            _ => None,
        },
        Object::Reference(r) => match doc.get_object(*r).ok()? {
            array @ Object::Array(_) => resolve_destination(doc, array, page_map),
            _ => None,
        },
        _ => None,
    }
}
