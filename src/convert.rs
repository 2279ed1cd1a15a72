//! Notebook → graded PDF, end to end.

use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ConvertError, Result};
use crate::marker::MarkerSpec;
use crate::normalize::{normalize, Overflow, OverflowPolicy, PageBudget, RegionLayout};
use crate::notebook::{Cell, Notebook};
use crate::pdf::writer::write_pdf;
use crate::regions::{partition, select_cells, SOLUTION_TAGS, STUDENT_TAGS};
use crate::render::{Page, PageSetup, RenderBlock, Renderer, TextRenderer};

/// Appended to the notebook's file stem to name the output PDF
pub const OUTPUT_SUFFIX: &str = "_graded";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Expected question count; a mismatch is reported
    pub num_questions: Option<usize>,
    pub budget: PageBudget,
    /// Defaults to `<stem>_graded.pdf` next to the notebook
    pub output: Option<PathBuf>,
    /// Export solution cells instead of student cells
    pub solution: bool,
    /// Export every cell regardless of tags
    pub all_cells: bool,
    pub hide_code_input: bool,
    /// Prepend the student's login e-mail when found
    pub preamble: bool,
    pub marker: MarkerSpec,
    pub zoom: f32,
    pub on_overflow: OverflowPolicy,
    /// Also write one PDF per question into this directory
    pub split_dir: Option<PathBuf>,
    /// Treat a question count mismatch as an error
    pub strict: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            num_questions: None,
            budget: PageBudget::default(),
            output: None,
            solution: false,
            all_cells: false,
            hide_code_input: true,
            preamble: true,
            marker: MarkerSpec::default(),
            zoom: 1.0,
            on_overflow: OverflowPolicy::default(),
            split_dir: None,
            strict: false,
        }
    }
}

impl ConvertOptions {
    fn required_tags(&self) -> &'static [&'static str] {
        if self.all_cells {
            &[]
        } else if self.solution {
            SOLUTION_TAGS
        } else {
            STUDENT_TAGS
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSummary {
    pub id: String,
    /// 0-based page range in the output PDF
    pub pages: Range<usize>,
}

/// What a conversion produced
#[derive(Debug, Clone)]
pub struct Conversion {
    pub output: PathBuf,
    pub total_pages: usize,
    pub preamble_pages: usize,
    pub questions: Vec<QuestionSummary>,
    /// Overflows kept or truncated under a non-failing policy
    pub overflows: Vec<Overflow>,
    /// `(expected, found)` when `num_questions` did not match
    pub question_count_mismatch: Option<(usize, usize)>,
    pub split_files: Vec<PathBuf>,
}

/// Convert with default options and an optional expected question count.
pub fn convert<P: AsRef<Path>>(path: P, num_questions: Option<usize>) -> Result<PathBuf> {
    let options = ConvertOptions {
        num_questions,
        ..Default::default()
    };
    Ok(convert_with(path, &options)?.output)
}

pub fn convert_with<P: AsRef<Path>>(path: P, options: &ConvertOptions) -> Result<Conversion> {
    let path = path.as_ref();
    let notebook = Notebook::open(path)?;
    info!(
        "loaded {} cells from {} (nbformat {}.{})",
        notebook.cells.len(),
        path.display(),
        notebook.nbformat,
        notebook.nbformat_minor
    );

    let blocks = build_blocks(&notebook, options);
    let found = blocks.iter().filter(|b| b.question.is_some()).count();

    let question_count_mismatch = match options.num_questions {
        Some(expected) if expected != found => {
            if options.strict {
                return Err(ConvertError::QuestionCountMismatch { expected, found });
            }
            warn!(
                "expected {} questions but found {}; the grading platform will likely reject \
                 this submission, check that answers are in the provided cells",
                expected, found
            );
            Some((expected, found))
        }
        _ => None,
    };

    let setup = PageSetup {
        zoom: options.zoom,
        ..Default::default()
    };
    let renderer = TextRenderer::new(setup, options.hide_code_input)?;
    let rendered = renderer.render(&blocks)?;
    let layout = rendered.region_layout();

    let normalized = normalize(
        &rendered.pages,
        &layout,
        options.budget,
        options.on_overflow,
        Page::blank,
    )?;
    if normalized.layout.questions.is_empty() {
        warn!("no questions found, writing the document unchanged");
    }

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(path));
    write_pdf(&normalized.pages, &setup, &normalized.layout, &output)?;
    info!(
        "wrote {} pages ({} blank) to {}",
        normalized.pages.len(),
        normalized.blank_pages_added,
        output.display()
    );

    let split_files = match &options.split_dir {
        Some(dir) => split_questions(&normalized.pages, &setup, &normalized.layout, dir)?,
        None => Vec::new(),
    };

    Ok(Conversion {
        output,
        total_pages: normalized.pages.len(),
        preamble_pages: normalized.layout.preamble.len(),
        questions: normalized
            .layout
            .questions
            .iter()
            .map(|q| QuestionSummary {
                id: q.id.clone(),
                pages: q.pages.clone(),
            })
            .collect(),
        overflows: normalized.overflows,
        question_count_mismatch,
        split_files,
    })
}

/// `<dir>/<stem>_graded.pdf`
pub fn default_output_path(notebook: &Path) -> PathBuf {
    let stem = notebook
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("notebook");
    notebook.with_file_name(format!("{}{}.pdf", stem, OUTPUT_SUFFIX))
}

fn build_blocks(notebook: &Notebook, options: &ConvertOptions) -> Vec<RenderBlock> {
    let selected = select_cells(&notebook.cells, options.required_tags());
    let parts = partition(selected, &options.marker);

    let mut preamble = Vec::new();
    if options.preamble {
        match notebook.find_student_email() {
            Some(email) => preamble.push(Cell::markdown(format!("# {}", email), &["q_email"])),
            None => warn!("no login e-mail found in the notebook outputs, skipping the preamble"),
        }
    }
    preamble.extend(parts.preamble);

    std::iter::once(RenderBlock::preamble(preamble))
        .chain(
            parts
                .questions
                .into_iter()
                .map(|q| RenderBlock::question(q.id, q.cells)),
        )
        .collect()
}

/// One PDF per question (and the preamble, if any). Question files carry their
/// 1-based position so repeated or clashing ids never share a file name.
fn split_questions(
    pages: &[Page],
    setup: &PageSetup,
    layout: &RegionLayout,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|source| ConvertError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut parts: Vec<(String, Range<usize>)> = Vec::new();
    if !layout.preamble.is_empty() {
        parts.push(("preamble".to_string(), layout.preamble.clone()));
    }
    let width = layout.questions.len().to_string().len().max(2);
    parts.extend(layout.questions.iter().enumerate().map(|(i, q)| {
        (
            format!("{:0width$}_{}", i + 1, file_safe(&q.id), width = width),
            q.pages.clone(),
        )
    }));

    let mut written = Vec::with_capacity(parts.len());
    for (name, range) in parts {
        let path = dir.join(format!("{}.pdf", name));
        write_pdf(&pages[range], setup, &RegionLayout::default(), &path)?;
        info!("created {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
