use anyhow::Result;
use nbgrade::pdf::outline::{extract_bookmarks, question_pages};
use nbgrade::pdf::PdfDocument;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let doc = PdfDocument::open(&path)?;
    let info = doc.get_info();

    println!("File: {}", path.as_ref().display());
    println!("Pages: {}", info.page_count);
    if let Some(producer) = &info.producer {
        println!("Producer: {}", producer);
    }

    let bookmarks = extract_bookmarks(&doc)?;
    let ranges = question_pages(&bookmarks, info.page_count);
    if ranges.is_empty() {
        println!("No question bookmarks found.");
        return Ok(());
    }

    if let Some(first) = ranges.first() {
        if first.first > 1 {
            println!("preamble: pages 1-{}", first.first - 1);
        }
    }
    for range in &ranges {
        println!(
            "{}: pages {}-{} ({} page(s))",
            range.title,
            range.first,
            range.last,
            range.page_count()
        );
    }

    let first_count = ranges[0].page_count();
    if ranges.iter().all(|r| r.page_count() == first_count) {
        println!(
            "\n{} question(s), {} page(s) each.",
            ranges.len(),
            first_count
        );
    } else {
        println!("\nQuestions do not all have the same page count.");
    }

    Ok(())
}
