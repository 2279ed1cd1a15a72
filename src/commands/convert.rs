use anyhow::{Context, Result};
use nbgrade::normalize::PageBudget;
use nbgrade::{convert_with, ConvertOptions};
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P, options: &ConvertOptions) -> Result<()> {
    let path = path.as_ref();
    let conversion = convert_with(path, options)
        .with_context(|| format!("Failed to convert {}", path.display()))?;

    if conversion.preamble_pages > 0 {
        println!("preamble: {} page(s)", conversion.preamble_pages);
    }
    for question in &conversion.questions {
        println!(
            "{}: pages {}-{}",
            question.id,
            question.pages.start + 1,
            question.pages.end
        );
    }
    for overflow in &conversion.overflows {
        println!("warning: {}", overflow);
    }
    if let Some((expected, found)) = conversion.question_count_mismatch {
        println!(
            "warning: expected {} questions but the PDF contains {}",
            expected, found
        );
    }
    for file in &conversion.split_files {
        println!("Created {}", file.display());
    }

    println!(
        "Wrote {} pages to {}. Upload that PDF for grading.",
        conversion.total_pages,
        conversion.output.display()
    );
    println!(
        "If the text is too small or too large, rerun with --zoom (e.g. --zoom 1.5)."
    );

    Ok(())
}

pub fn budget(pages_per_question: usize) -> Result<PageBudget> {
    PageBudget::new(pages_per_question).context("--pages-per-question must be at least 1")
}
