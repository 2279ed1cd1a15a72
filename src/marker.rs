//! Question boundary detection.

use regex::Regex;
use std::str::FromStr;

use crate::error::ConvertError;
use crate::notebook::Cell;

/// Tags that look like question ids but are not
const RESERVED_TAGS: &[&str] = &["q_email"];

pub const DEFAULT_MARKER: &str = "tag:^q";

/// Decides whether a cell opens (or belongs to) a question.
pub trait QuestionMarker {
    /// The question id this cell is marked with, if any
    fn question_id(&self, cell: &Cell) -> Option<String>;
}

/// Marks a cell by its first tag matching `pattern`.
#[derive(Debug, Clone)]
pub struct TagMarker {
    pattern: Regex,
}

impl TagMarker {
    pub fn new(pattern: Regex) -> Self {
        TagMarker { pattern }
    }
}

impl QuestionMarker for TagMarker {
    fn question_id(&self, cell: &Cell) -> Option<String> {
        cell.tags()
            .iter()
            .filter(|t| !RESERVED_TAGS.contains(&t.as_str()))
            .find(|t| self.pattern.is_match(t))
            .cloned()
    }
}

/// Marks a markdown cell whose heading text matches `pattern`.
///
/// The first capture group is the question id; without one, the whole match.
#[derive(Debug, Clone)]
pub struct HeadingMarker {
    pattern: Regex,
}

impl HeadingMarker {
    pub fn new(pattern: Regex) -> Self {
        HeadingMarker { pattern }
    }
}

impl QuestionMarker for HeadingMarker {
    fn question_id(&self, cell: &Cell) -> Option<String> {
        if !matches!(cell, Cell::Markdown { .. }) {
            return None;
        }
        cell.source()
            .lines()
            .filter_map(|line| {
                let trimmed = line.trim_start();
                trimmed
                    .starts_with('#')
                    .then(|| trimmed.trim_start_matches('#').trim())
            })
            .find_map(|heading| {
                let caps = self.pattern.captures(heading)?;
                let id = caps.get(1).or_else(|| caps.get(0))?;
                Some(id.as_str().to_string())
            })
    }
}

/// Textual marker configuration: `tag:<regex>` or `heading:<regex>`.
#[derive(Debug, Clone)]
pub enum MarkerSpec {
    Tag(TagMarker),
    Heading(HeadingMarker),
}

impl FromStr for MarkerSpec {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, pattern) = s.split_once(':').ok_or_else(|| {
            ConvertError::Marker(format!(
                "'{}' should look like tag:<regex> or heading:<regex>",
                s
            ))
        })?;
        let regex = Regex::new(pattern)
            .map_err(|e| ConvertError::Marker(format!("bad pattern '{}': {}", pattern, e)))?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "tag" => Ok(MarkerSpec::Tag(TagMarker::new(regex))),
            "heading" => Ok(MarkerSpec::Heading(HeadingMarker::new(regex))),
            other => Err(ConvertError::Marker(format!(
                "unknown marker kind '{}', expected 'tag' or 'heading'",
                other
            ))),
        }
    }
}

impl Default for MarkerSpec {
    fn default() -> Self {
        MarkerSpec::Tag(TagMarker::new(
            Regex::new("^q").expect("valid default marker regex"),
        ))
    }
}

impl QuestionMarker for MarkerSpec {
    fn question_id(&self, cell: &Cell) -> Option<String> {
        match self {
            MarkerSpec::Tag(m) => m.question_id(cell),
            MarkerSpec::Heading(m) => m.question_id(cell),
        }
    }
}
