use nbgrade::normalize::{OverflowPolicy, PageBudget};
use nbgrade::pdf::outline::{extract_bookmarks, question_pages};
use nbgrade::pdf::PdfDocument;
use nbgrade::{convert, convert_with, ConvertError, ConvertOptions};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

const ANSWER_TAGS: [&str; 2] = ["written", "student"];

fn login_cell() -> Value {
    json!({
        "cell_type": "code",
        "execution_count": 1,
        "metadata": {},
        "source": ["import ok\n", "ok.auth()"],
        "outputs": [{
            "output_type": "stream",
            "name": "stdout",
            "text": ["Successfully logged in as student@example.edu\n"]
        }]
    })
}

fn answer(question: &str, text: &str) -> Value {
    let mut tags: Vec<&str> = ANSWER_TAGS.to_vec();
    tags.push(question);
    json!({
        "cell_type": "markdown",
        "metadata": {"tags": tags},
        "source": text
    })
}

/// A raw answer cell with `lines` short lines. 60 lines fill a page.
fn long_answer(question: &str, lines: usize) -> Value {
    let mut tags: Vec<&str> = ANSWER_TAGS.to_vec();
    tags.push(question);
    let source: Vec<String> = (0..lines).map(|i| format!("line {}\n", i)).collect();
    json!({
        "cell_type": "raw",
        "metadata": {"tags": tags},
        "source": source
    })
}

fn write_notebook(dir: &Path, cells: Vec<Value>) -> PathBuf {
    let nb = json!({
        "nbformat": 4,
        "nbformat_minor": 2,
        "metadata": {},
        "cells": cells
    });
    let path = dir.join("hw1.ipynb");
    std::fs::write(&path, serde_json::to_string_pretty(&nb).unwrap()).unwrap();
    path
}

fn page_count(path: &Path) -> u32 {
    PdfDocument::open(path).unwrap().page_count()
}

#[test]
fn test_three_questions_padded_to_budget() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(
        dir.path(),
        vec![
            login_cell(),
            answer("q1", "First answer."),
            answer("q2", "Second answer."),
            answer("q3", "Third answer."),
        ],
    );

    let output = convert(&nb, Some(3)).unwrap();
    assert_eq!(output, dir.path().join("hw1_graded.pdf"));

    // one preamble page with the e-mail, then 3 questions x 2 pages
    assert_eq!(page_count(&output), 7);

    let pdf = PdfDocument::open(&output).unwrap();
    let bookmarks = extract_bookmarks(&pdf).unwrap();
    let ranges = question_pages(&bookmarks, pdf.page_count());
    let titles: Vec<&str> = ranges.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["q1", "q2", "q3"]);
    assert!(ranges.iter().all(|r| r.page_count() == 2));
    assert_eq!(ranges[0].first, 2);
}

#[test]
fn test_mismatched_question_count_still_converts() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(
        dir.path(),
        vec![
            login_cell(),
            answer("q1", "a"),
            answer("q2", "b"),
            answer("q3", "c"),
        ],
    );

    let options = ConvertOptions {
        num_questions: Some(2),
        ..Default::default()
    };
    let conversion = convert_with(&nb, &options).unwrap();
    assert_eq!(conversion.question_count_mismatch, Some((2, 3)));
    assert_eq!(conversion.questions.len(), 3);
    let graded: usize = conversion.questions.iter().map(|q| q.pages.len()).sum();
    assert_eq!(graded, 6);
    assert_eq!(conversion.total_pages, conversion.preamble_pages + 6);
}

#[test]
fn test_strict_question_count() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(dir.path(), vec![answer("q1", "a")]);

    let options = ConvertOptions {
        num_questions: Some(2),
        strict: true,
        ..Default::default()
    };
    let err = convert_with(&nb, &options).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::QuestionCountMismatch {
            expected: 2,
            found: 1
        }
    ));
}

#[test]
fn test_overflow_is_reported_not_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(
        dir.path(),
        vec![answer("q1", "short"), long_answer("q2", 150)],
    );

    let err = convert(&nb, None).unwrap_err();
    match err {
        ConvertError::Overflow(overflows) => {
            assert_eq!(overflows.len(), 1);
            assert_eq!(overflows[0].index, 1);
            assert_eq!(overflows[0].question, "q2");
            assert_eq!(overflows[0].pages, 3);
            assert_eq!(overflows[0].amount(), 1);
        }
        other => panic!("expected overflow, got {other:?}"),
    }
    assert!(!dir.path().join("hw1_graded.pdf").exists());
}

#[test]
fn test_overflow_keep_policy_writes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(
        dir.path(),
        vec![answer("q1", "short"), long_answer("q2", 150)],
    );

    let options = ConvertOptions {
        on_overflow: OverflowPolicy::Keep,
        ..Default::default()
    };
    let conversion = convert_with(&nb, &options).unwrap();
    assert_eq!(conversion.overflows.len(), 1);
    assert_eq!(page_count(&conversion.output), 2 + 3);
}

#[test]
fn test_no_markers_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(dir.path(), vec![answer("notes", "just text")]);

    let options = ConvertOptions {
        marker: "heading:^Question (\\d+)".parse().unwrap(),
        ..Default::default()
    };
    let conversion = convert_with(&nb, &options).unwrap();
    assert!(conversion.questions.is_empty());
    assert_eq!(conversion.total_pages, 1);
    assert_eq!(page_count(&conversion.output), 1);
}

#[test]
fn test_heading_marker_and_custom_budget() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(
        dir.path(),
        vec![
            json!({"cell_type": "markdown", "metadata": {}, "source": "## Question 1\nanswer"}),
            json!({"cell_type": "markdown", "metadata": {}, "source": "more for one"}),
            json!({"cell_type": "markdown", "metadata": {}, "source": "## Question 2\nanswer"}),
        ],
    );

    let options = ConvertOptions {
        all_cells: true,
        preamble: false,
        marker: "heading:^Question (\\d+)".parse().unwrap(),
        budget: PageBudget::new(3).unwrap(),
        output: Some(dir.path().join("custom.pdf")),
        ..Default::default()
    };
    let conversion = convert_with(&nb, &options).unwrap();
    let ids: Vec<&str> = conversion.questions.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(conversion.output, dir.path().join("custom.pdf"));
    assert_eq!(page_count(&conversion.output), 6);
}

#[test]
fn test_split_dir_writes_question_pdfs() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(
        dir.path(),
        vec![login_cell(), answer("q1", "a"), answer("q2", "b")],
    );
    let split = dir.path().join("question_pdfs");

    let options = ConvertOptions {
        split_dir: Some(split.clone()),
        ..Default::default()
    };
    let conversion = convert_with(&nb, &options).unwrap();
    assert_eq!(
        conversion.split_files,
        vec![
            split.join("preamble.pdf"),
            split.join("01_q1.pdf"),
            split.join("02_q2.pdf")
        ]
    );
    assert_eq!(page_count(&split.join("01_q1.pdf")), 2);
    assert_eq!(page_count(&split.join("preamble.pdf")), 1);
}

#[test]
fn test_split_dir_keeps_repeated_question() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(
        dir.path(),
        vec![
            answer("q1", "first part"),
            answer("q2", "b"),
            answer("q1", "second part"),
        ],
    );
    let split = dir.path().join("question_pdfs");

    let options = ConvertOptions {
        split_dir: Some(split.clone()),
        ..Default::default()
    };
    let conversion = convert_with(&nb, &options).unwrap();
    assert_eq!(
        conversion.split_files,
        vec![
            split.join("01_q1.pdf"),
            split.join("02_q2.pdf"),
            split.join("03_q1.pdf")
        ]
    );
    let on_disk = std::fs::read_dir(&split).unwrap().count();
    assert_eq!(on_disk, 3);
}

#[test]
fn test_no_markers_with_expected_count() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(dir.path(), vec![answer("notes", "just text")]);
    let marker: nbgrade::marker::MarkerSpec = "heading:^Question (\\d+)".parse().unwrap();

    let options = ConvertOptions {
        num_questions: Some(2),
        marker: marker.clone(),
        ..Default::default()
    };
    let conversion = convert_with(&nb, &options).unwrap();
    assert_eq!(conversion.question_count_mismatch, Some((2, 0)));
    assert!(conversion.questions.is_empty());
    assert_eq!(conversion.total_pages, 1);
    assert_eq!(page_count(&conversion.output), 1);

    let strict = ConvertOptions {
        num_questions: Some(2),
        marker,
        strict: true,
        output: Some(dir.path().join("strict.pdf")),
        ..Default::default()
    };
    let err = convert_with(&nb, &strict).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::QuestionCountMismatch {
            expected: 2,
            found: 0
        }
    ));
    assert!(!dir.path().join("strict.pdf").exists());
}

#[test]
fn test_solution_mode_selects_solution_cells() {
    let dir = tempfile::tempdir().unwrap();
    let nb = write_notebook(
        dir.path(),
        vec![
            answer("q1", "student answer"),
            json!({
                "cell_type": "markdown",
                "metadata": {"tags": ["written", "solution", "q1"]},
                "source": "official solution"
            }),
            json!({
                "cell_type": "markdown",
                "metadata": {"tags": ["written", "solution", "q2"]},
                "source": "official solution two"
            }),
        ],
    );

    let options = ConvertOptions {
        solution: true,
        ..Default::default()
    };
    let conversion = convert_with(&nb, &options).unwrap();
    assert_eq!(conversion.questions.len(), 2);
    assert_eq!(conversion.total_pages, 4);
}

#[test]
fn test_missing_notebook() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert(dir.path().join("nope.ipynb"), None).unwrap_err();
    assert!(matches!(err, ConvertError::Read { .. }));
}
