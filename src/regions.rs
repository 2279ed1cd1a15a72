//! Cell selection and partition into preamble + question regions.

use tracing::debug;

use crate::marker::QuestionMarker;
use crate::notebook::Cell;

pub const STUDENT_TAGS: &[&str] = &["written", "student"];
pub const SOLUTION_TAGS: &[&str] = &["written", "solution"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Cells before the first question marker
    pub preamble: Vec<Cell>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub cells: Vec<Cell>,
}

/// Keep only the cells carrying every tag in `required`. An empty list keeps
/// everything.
pub fn select_cells<'a, S: AsRef<str>>(
    cells: &'a [Cell],
    required: &'a [S],
) -> impl Iterator<Item = &'a Cell> + 'a {
    cells.iter().filter(move |cell| cell.has_tags(required))
}

/// Split cells into a preamble and question regions in document order.
///
/// A marked cell opens a new question unless it carries the same id as the
/// question currently open. Unmarked cells join whatever region is open.
pub fn partition<'a, I, M>(cells: I, marker: &M) -> Partition
where
    I: IntoIterator<Item = &'a Cell>,
    M: QuestionMarker + ?Sized,
{
    let mut partition = Partition::default();

    for cell in cells {
        match marker.question_id(cell) {
            Some(id) if partition.questions.last().map_or(true, |q| q.id != id) => {
                debug!("question {} starts", id);
                partition.questions.push(Question {
                    id,
                    cells: vec![cell.clone()],
                });
            }
            _ => match partition.questions.last_mut() {
                Some(current) => current.cells.push(cell.clone()),
                None => partition.preamble.push(cell.clone()),
            },
        }
    }

    partition
}
