pub mod layout;
pub mod markdown;

use std::ops::Range;
use tracing::debug;

use crate::error::Result;
use crate::notebook::{Cell, Output};
use crate::normalize::{QuestionRegion, RegionLayout};
use layout::{wrap_chars, wrap_words, Font, PageWriter};
use markdown::Style;

pub use layout::{Page, PageSetup, TextLine};

/// Label drawn in place of hidden code input
const HIDDEN_INPUT_LABEL: &str = "output:";

/// A run of cells laid out together. Question blocks start on a fresh page.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBlock {
    pub question: Option<String>,
    pub cells: Vec<Cell>,
}

impl RenderBlock {
    pub fn preamble(cells: Vec<Cell>) -> Self {
        RenderBlock {
            question: None,
            cells,
        }
    }

    pub fn question(id: impl Into<String>, cells: Vec<Cell>) -> Self {
        RenderBlock {
            question: Some(id.into()),
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSpan {
    pub block: usize,
    pub cell: usize,
    pub pages: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub pages: Vec<Page>,
    pub cell_spans: Vec<CellSpan>,
    /// Pages owned by each block, parallel to the input blocks
    pub block_spans: Vec<Range<usize>>,
    pub questions: Vec<Option<String>>,
}

impl RenderedDocument {
    /// Preamble pages followed by one region per question block.
    pub fn region_layout(&self) -> RegionLayout {
        let questions: Vec<QuestionRegion> = self
            .questions
            .iter()
            .zip(&self.block_spans)
            .filter_map(|(id, span)| {
                id.as_ref().map(|id| QuestionRegion {
                    id: id.clone(),
                    pages: span.clone(),
                })
            })
            .collect();

        let preamble_end = questions
            .first()
            .map_or(self.pages.len(), |q| q.pages.start);

        RegionLayout {
            preamble: 0..preamble_end,
            questions,
        }
    }
}

/// Turns blocks of cells into fixed-size pages.
pub trait Renderer {
    fn render(&self, blocks: &[RenderBlock]) -> Result<RenderedDocument>;
}

#[derive(Debug, Clone)]
pub struct TextRenderer {
    setup: PageSetup,
    hide_code_input: bool,
}

impl TextRenderer {
    pub fn new(setup: PageSetup, hide_code_input: bool) -> Result<Self> {
        setup.validate()?;
        Ok(TextRenderer {
            setup,
            hide_code_input,
        })
    }

    fn render_cell(&self, writer: &mut PageWriter, cell: &Cell) {
        match cell {
            Cell::Markdown { source, .. } => self.render_markdown(writer, source),
            Cell::Code {
                source, outputs, ..
            } => self.render_code(writer, source, outputs),
            Cell::Raw { source, .. } => self.render_raw(writer, source),
        }
        writer.skip(1.0);
    }

    fn render_markdown(&self, writer: &mut PageWriter, source: &str) {
        let size = self.setup.font_size();
        let width = self.setup.content_width();

        for block in markdown::parse(source) {
            match block {
                markdown::Block::Gap => writer.skip(0.5),
                markdown::Block::Text { style, text } => {
                    let (font, size, indent, hard_wrap) = match style {
                        Style::Body => (Font::Regular, size, 0.0, false),
                        Style::Heading(level) => (Font::Bold, size * heading_scale(level), 0.0, false),
                        Style::Bullet => (Font::Regular, size, size, false),
                        Style::Code => (Font::Mono, size, size, true),
                    };
                    let lines = if hard_wrap {
                        wrap_chars(&text, font, size, width - indent)
                    } else {
                        wrap_words(&text, font, size, width - indent)
                    };
                    for line in lines {
                        writer.write_line(font, size, indent, &line);
                    }
                }
            }
        }
    }

    fn render_code(&self, writer: &mut PageWriter, source: &str, outputs: &[Output]) {
        let size = self.setup.font_size();
        if self.hide_code_input {
            writer.write_line(Font::Bold, size, 0.0, HIDDEN_INPUT_LABEL);
        } else {
            self.write_mono(writer, source, 0.0);
        }

        for output in outputs {
            let text = output.text().unwrap_or_else(|| match output {
                Output::ExecuteResult { data } | Output::DisplayData { data } => format!(
                    "[{} output not shown]",
                    data.primary_mime().unwrap_or("rich")
                ),
                _ => String::new(),
            });
            self.write_mono(writer, &text, size);
        }
    }

    fn render_raw(&self, writer: &mut PageWriter, source: &str) {
        self.write_mono(writer, source, 0.0);
    }

    fn write_mono(&self, writer: &mut PageWriter, text: &str, indent: f32) {
        let size = self.setup.font_size();
        let width = self.setup.content_width() - indent;
        for raw_line in text.trim_end_matches('\n').lines() {
            for line in wrap_chars(&raw_line.replace('\t', "    "), Font::Mono, size, width) {
                writer.write_line(Font::Mono, size, indent, &line);
            }
        }
    }
}

impl Renderer for TextRenderer {
    fn render(&self, blocks: &[RenderBlock]) -> Result<RenderedDocument> {
        let mut writer = PageWriter::new(self.setup);
        let mut cell_spans = Vec::new();
        let mut block_spans = Vec::with_capacity(blocks.len());

        for (block_index, block) in blocks.iter().enumerate() {
            let starts_page = block.question.is_some();
            if starts_page {
                writer.break_page();
            }
            let first_page = writer.current();

            for (cell_index, cell) in block.cells.iter().enumerate() {
                writer.begin_span();
                self.render_cell(&mut writer, cell);
                cell_spans.push(CellSpan {
                    block: block_index,
                    cell: cell_index,
                    pages: writer.span_start()..writer.current() + 1,
                });
            }

            let span = if starts_page {
                writer.claim();
                first_page..writer.current() + 1
            } else if writer.is_dirty() {
                first_page..writer.current() + 1
            } else {
                first_page..first_page
            };
            debug!(
                "block {} ({}) spans pages {:?}",
                block_index,
                block.question.as_deref().unwrap_or("preamble"),
                span
            );
            block_spans.push(span);
        }

        Ok(RenderedDocument {
            pages: writer.finish(),
            cell_spans,
            block_spans,
            questions: blocks.iter().map(|b| b.question.clone()).collect(),
        })
    }
}

fn heading_scale(level: u8) -> f32 {
    match level {
        1 => 1.6,
        2 => 1.4,
        3 => 1.2,
        _ => 1.0,
    }
}
