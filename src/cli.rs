use clap::{Parser, Subcommand};
use nbgrade::marker::DEFAULT_MARKER;
use nbgrade::normalize::{OverflowPolicy, DEFAULT_PAGES_PER_QUESTION};
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nbgrade")]
#[command(about = "Convert a notebook of written answers into a fixed-page PDF for grading")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export a notebook to a PDF with a constant page count per question
    Convert {
        /// Notebook (.ipynb) to convert
        path: PathBuf,

        /// Number of questions the PDF should contain
        #[arg(short, long)]
        num_questions: Option<NonZeroUsize>,

        /// Pages every question occupies
        #[arg(short, long, default_value_t = DEFAULT_PAGES_PER_QUESTION)]
        pages_per_question: usize,

        /// Output file (defaults to <notebook>_graded.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export solution cells instead of student answers
        #[arg(long)]
        solution: bool,

        /// Export every cell, ignoring tags
        #[arg(long)]
        all_cells: bool,

        /// Show code cell input instead of only its output
        #[arg(long)]
        show_input: bool,

        /// Do not prepend the student's login e-mail
        #[arg(long)]
        no_preamble: bool,

        /// Question marker: tag:<regex> or heading:<regex>
        #[arg(short, long, default_value = DEFAULT_MARKER)]
        marker: String,

        /// Scale factor for all text
        #[arg(short, long, default_value_t = 1.0)]
        zoom: f32,

        /// What to do when a question needs more pages than allowed
        #[arg(long, value_enum, default_value_t = OverflowPolicy::Fail)]
        on_overflow: OverflowPolicy,

        /// Also write one PDF per question into this directory
        #[arg(long)]
        split_dir: Option<PathBuf>,

        /// Fail when the question count differs from --num-questions
        #[arg(long)]
        strict: bool,
    },

    /// Show the question page ranges of a generated PDF
    Inspect {
        /// PDF file to inspect
        path: PathBuf,
    },
}
