//! Page-count normalization over question regions.
//!
//! The normalizer never looks inside a page. It only moves whole pages around,
//! so it is generic over the page type and takes a constructor for blank
//! pages.

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_PAGES_PER_QUESTION: usize = 2;

/// Required page count for every question region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBudget(NonZeroUsize);

impl PageBudget {
    pub fn new(pages: usize) -> Option<Self> {
        NonZeroUsize::new(pages).map(PageBudget)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

const DEFAULT_BUDGET: PageBudget = match NonZeroUsize::new(DEFAULT_PAGES_PER_QUESTION) {
    Some(pages) => PageBudget(pages),
    None => panic!("default page budget must be positive"),
};

impl Default for PageBudget {
    fn default() -> Self {
        DEFAULT_BUDGET
    }
}

/// What to do with a question whose pages exceed the budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Abort with the list of overflowing questions
    #[default]
    Fail,
    /// Keep every page and report the overflow
    Keep,
    /// Cut the question down to the budget
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRegion {
    pub id: String,
    pub pages: Range<usize>,
}

impl QuestionRegion {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Partition of a page sequence: preamble pages, then question regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionLayout {
    pub preamble: Range<usize>,
    pub questions: Vec<QuestionRegion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overflow {
    /// 0-based position of the question in document order
    pub index: usize,
    pub question: String,
    pub pages: usize,
    pub budget: usize,
}

impl Overflow {
    pub fn amount(&self) -> usize {
        self.pages - self.budget
    }
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "question #{} ({}) has {} pages, {} over the {}-page budget",
            self.index + 1,
            self.question,
            self.pages,
            self.amount(),
            self.budget
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{} question(s) exceed the page budget", .0.len())]
    Overflow(Vec<Overflow>),

    #[error("{0}")]
    MalformedRegions(String),
}

#[derive(Debug, Clone)]
pub struct Normalized<P> {
    pub pages: Vec<P>,
    /// Region layout of `pages`
    pub layout: RegionLayout,
    /// Overflows that were kept or truncated rather than failing
    pub overflows: Vec<Overflow>,
    pub blank_pages_added: usize,
}

/// Pad every question region in `pages` to exactly `budget` pages.
///
/// With no question regions the pages pass through unchanged.
pub fn normalize<P: Clone>(
    pages: &[P],
    layout: &RegionLayout,
    budget: PageBudget,
    policy: OverflowPolicy,
    blank: impl Fn() -> P,
) -> Result<Normalized<P>, NormalizeError> {
    validate(layout, pages.len())?;

    if layout.questions.is_empty() {
        debug!("no question regions, passing {} pages through", pages.len());
        return Ok(Normalized {
            pages: pages.to_vec(),
            layout: layout.clone(),
            overflows: Vec::new(),
            blank_pages_added: 0,
        });
    }

    let budget = budget.get();
    let overflows: Vec<Overflow> = layout
        .questions
        .iter()
        .enumerate()
        .filter(|(_, q)| q.page_count() > budget)
        .map(|(index, q)| Overflow {
            index,
            question: q.id.clone(),
            pages: q.page_count(),
            budget,
        })
        .collect();

    if !overflows.is_empty() && policy == OverflowPolicy::Fail {
        return Err(NormalizeError::Overflow(overflows));
    }

    let mut out = Vec::with_capacity(layout.preamble.len() + layout.questions.len() * budget);
    out.extend_from_slice(&pages[layout.preamble.clone()]);

    let mut questions = Vec::with_capacity(layout.questions.len());
    let mut blank_pages_added = 0;
    for question in &layout.questions {
        let start = out.len();
        let count = question.page_count();
        if count > budget {
            if policy == OverflowPolicy::Truncate {
                warn!(
                    "{} has {} pages, only the first {} will be output",
                    question.id, count, budget
                );
                out.extend_from_slice(&pages[question.pages.start..question.pages.start + budget]);
            } else {
                warn!(
                    "{} has {} pages, keeping {} pages over the budget",
                    question.id,
                    count,
                    count - budget
                );
                out.extend_from_slice(&pages[question.pages.clone()]);
            }
        } else {
            out.extend_from_slice(&pages[question.pages.clone()]);
            let missing = budget - count;
            out.extend(std::iter::repeat_with(&blank).take(missing));
            blank_pages_added += missing;
        }
        questions.push(QuestionRegion {
            id: question.id.clone(),
            pages: start..out.len(),
        });
    }

    Ok(Normalized {
        pages: out,
        layout: RegionLayout {
            preamble: 0..layout.preamble.len(),
            questions,
        },
        overflows,
        blank_pages_added,
    })
}

fn validate(layout: &RegionLayout, total: usize) -> Result<(), NormalizeError> {
    let malformed = |msg: String| Err(NormalizeError::MalformedRegions(msg));

    if layout.preamble.start != 0 {
        return malformed(format!(
            "preamble must start at page 0, not {}",
            layout.preamble.start
        ));
    }
    if layout.preamble.end > total {
        return malformed(format!(
            "preamble ends at page {} but there are only {} pages",
            layout.preamble.end, total
        ));
    }
    if layout.questions.is_empty() {
        return Ok(());
    }

    let mut cursor = layout.preamble.end;
    for question in &layout.questions {
        if question.pages.is_empty() {
            return malformed(format!("question {} has no pages", question.id));
        }
        if question.pages.start != cursor {
            return malformed(format!(
                "question {} starts at page {}, expected {}",
                question.id, question.pages.start, cursor
            ));
        }
        if question.pages.end > total {
            return malformed(format!(
                "question {} ends at page {} but there are only {} pages",
                question.id, question.pages.end, total
            ));
        }
        cursor = question.pages.end;
    }
    if cursor != total {
        return malformed(format!(
            "{} trailing page(s) after the last question",
            total - cursor
        ));
    }

    Ok(())
}
