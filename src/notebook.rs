//! nbformat 4 notebook model.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{ConvertError, Result};

const LOGIN_BANNER: &str = "Successfully logged in as ";

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ANSI regex"));

#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    pub nbformat: u32,
    #[serde(default)]
    pub nbformat_minor: u32,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CellMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Markdown {
        #[serde(default)]
        metadata: CellMetadata,
        #[serde(deserialize_with = "multiline")]
        source: String,
    },
    Code {
        #[serde(default)]
        metadata: CellMetadata,
        #[serde(deserialize_with = "multiline")]
        source: String,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    Raw {
        #[serde(default)]
        metadata: CellMetadata,
        #[serde(deserialize_with = "multiline")]
        source: String,
    },
}

impl Cell {
    pub fn markdown(source: impl Into<String>, tags: &[&str]) -> Self {
        Cell::Markdown {
            metadata: CellMetadata {
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Cell::Markdown { source, .. } | Cell::Code { source, .. } | Cell::Raw { source, .. } => {
                source
            }
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            Cell::Markdown { metadata, .. }
            | Cell::Code { metadata, .. }
            | Cell::Raw { metadata, .. } => &metadata.tags,
        }
    }

    pub fn has_tags<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .all(|r| self.tags().iter().any(|t| t == r.as_ref()))
    }

    pub fn outputs(&self) -> &[Output] {
        match self {
            Cell::Code { outputs, .. } => outputs,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        #[serde(default)]
        name: String,
        #[serde(deserialize_with = "multiline")]
        text: String,
    },
    ExecuteResult {
        #[serde(default)]
        data: MimeBundle,
    },
    DisplayData {
        #[serde(default)]
        data: MimeBundle,
    },
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

impl Output {
    /// Plain-text view of the output, if it has one
    pub fn text(&self) -> Option<String> {
        match self {
            Output::Stream { text, .. } => Some(text.clone()),
            Output::ExecuteResult { data } | Output::DisplayData { data } => data.text_plain(),
            Output::Error {
                ename,
                evalue,
                traceback,
            } => {
                if traceback.is_empty() {
                    Some(format!("{}: {}", ename, evalue))
                } else {
                    Some(strip_ansi(&traceback.join("\n")))
                }
            }
        }
    }
}

/// MIME type → payload, as stored in `data` of rich outputs
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct MimeBundle(pub BTreeMap<String, serde_json::Value>);

impl MimeBundle {
    pub fn text_plain(&self) -> Option<String> {
        self.0.get("text/plain").and_then(value_text)
    }

    /// First non-text MIME type, used to label outputs we cannot draw
    pub fn primary_mime(&self) -> Option<&str> {
        self.0
            .keys()
            .find(|k| !k.starts_with("text/"))
            .or_else(|| self.0.keys().next())
            .map(String::as_str)
    }
}

impl Notebook {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConvertError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value.get("nbformat").and_then(serde_json::Value::as_u64) {
            Some(v) if v >= 4 => {}
            Some(v) => {
                return Err(ConvertError::Unsupported(format!(
                    "nbformat {} is not supported, save the notebook as nbformat 4",
                    v
                )))
            }
            None => {
                return Err(ConvertError::Unsupported(
                    "missing nbformat version".to_string(),
                ))
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Look for the login banner printed by the course's auth cell.
    pub fn find_student_email(&self) -> Option<String> {
        self.cells
            .iter()
            .flat_map(Cell::outputs)
            .filter_map(Output::text)
            .find_map(|text| {
                text.split_once(LOGIN_BANNER)
                    .and_then(|(_, rest)| rest.split_whitespace().next())
                    .map(str::to_string)
            })
    }
}

fn value_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<String>(),
        ),
        _ => None,
    }
}

fn strip_ansi(s: &str) -> String {
    ANSI_ESCAPE.replace_all(s, "").into_owned()
}

/// nbformat stores multi-line strings either whole or as a list of lines.
fn multiline<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Multiline {
        Whole(String),
        Lines(Vec<String>),
    }

    Ok(match Multiline::deserialize(deserializer)? {
        Multiline::Whole(s) => s,
        Multiline::Lines(lines) => lines.concat(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "nbformat": 4,
        "nbformat_minor": 2,
        "metadata": {},
        "cells": [
            {
                "cell_type": "code",
                "execution_count": 1,
                "metadata": {},
                "source": "ok.auth()",
                "outputs": [
                    {"output_type": "stream", "name": "stdout",
                     "text": ["Assignment: hw1\n", "Successfully logged in as student@example.edu\n"]}
                ]
            },
            {
                "cell_type": "markdown",
                "metadata": {"tags": ["written", "student", "q1"]},
                "source": ["# Answer\n", "It is 42."]
            },
            {
                "cell_type": "code",
                "execution_count": 2,
                "metadata": {"tags": ["written", "student", "q2"]},
                "source": ["1 + 1"],
                "outputs": [
                    {"output_type": "execute_result", "execution_count": 2, "metadata": {},
                     "data": {"text/plain": ["2"]}},
                    {"output_type": "display_data", "metadata": {},
                     "data": {"image/png": "iVBOR", "text/plain": ["<Figure>"]}},
                    {"output_type": "error", "ename": "ValueError", "evalue": "bad",
                     "traceback": ["\u001b[0;31mValueError\u001b[0m: bad"]}
                ]
            },
            {"cell_type": "raw", "metadata": {}, "source": "raw text"}
        ]
    }"##;

    #[test]
    fn test_parse_cells() {
        let nb = Notebook::from_json(SAMPLE).unwrap();
        assert_eq!(nb.nbformat, 4);
        assert_eq!(nb.cells.len(), 4);
        assert_eq!(nb.cells[1].source(), "# Answer\nIt is 42.");
        assert!(nb.cells[1].has_tags(&["written", "student"]));
        assert!(!nb.cells[0].has_tags(&["written"]));
        assert!(matches!(nb.cells[3], Cell::Raw { .. }));
    }

    #[test]
    fn test_output_text() {
        let nb = Notebook::from_json(SAMPLE).unwrap();
        let outputs = nb.cells[2].outputs();
        assert_eq!(outputs[0].text().as_deref(), Some("2"));
        assert_eq!(outputs[1].text().as_deref(), Some("<Figure>"));
        assert_eq!(outputs[2].text().as_deref(), Some("ValueError: bad"));
    }

    #[test]
    fn test_primary_mime_prefers_non_text() {
        let nb = Notebook::from_json(SAMPLE).unwrap();
        match &nb.cells[2].outputs()[1] {
            Output::DisplayData { data } => assert_eq!(data.primary_mime(), Some("image/png")),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn test_find_student_email() {
        let nb = Notebook::from_json(SAMPLE).unwrap();
        assert_eq!(
            nb.find_student_email().as_deref(),
            Some("student@example.edu")
        );
    }

    #[test]
    fn test_missing_email() {
        let nb = Notebook::from_json(r#"{"nbformat": 4, "cells": []}"#).unwrap();
        assert_eq!(nb.find_student_email(), None);
    }

    #[test]
    fn test_old_nbformat_unsupported() {
        let err = Notebook::from_json(r#"{"nbformat": 3, "worksheets": []}"#).unwrap_err();
        assert!(matches!(err, ConvertError::Unsupported(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = Notebook::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConvertError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Notebook::open("/definitely/not/here.ipynb").unwrap_err();
        assert!(matches!(err, ConvertError::Read { .. }));
    }
}
