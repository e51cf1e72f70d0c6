//! A1 coordinates and column-major range expansion.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TranspileError, TranspileResult};

/// 1-based cell coordinate (`A1` is `col = 1, row = 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub col: u32,
    pub row: u32,
}

impl CellCoord {
    #[must_use]
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Parse `<letters><digits>`, ignoring any `$` absolute markers.
    ///
    /// Returns `None` when the text does not match the pattern, the row is `0`, or either part
    /// overflows `u32`.
    #[must_use]
    pub fn parse(a1: &str) -> Option<Self> {
        let s = strip_absolute_markers(a1.trim());
        let split = s.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let col = letters_to_column(letters)?;
        let row: u32 = digits.parse().ok()?;
        if row == 0 || digits.starts_with('0') {
            return None;
        }
        Some(Self { col, row })
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

/// Decode base-26 column letters (`A` = 1, `Z` = 26, `AA` = 27). Case-insensitive.
#[must_use]
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(ch.to_ascii_uppercase() as u8 - b'A') + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    Some(col)
}

/// Encode a 1-based column number as letters. Inverse of [`letters_to_column`]; `0` encodes to
/// the empty string.
#[must_use]
pub fn column_to_letters(col: u32) -> String {
    let mut col = col;
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.into_iter().rev().collect()
}

fn strip_absolute_markers(s: &str) -> String {
    s.replace('$', "")
}

/// Expand a coordinate or an `A1:B9` range into individual coordinates.
///
/// A single coordinate yields its canonical form (`$b$7` -> `B7`). Text that is not a coordinate
/// only loses its `$` markers, so defined names still reach CellInfo resolution. Ranges iterate
/// column-major: the
/// outer loop walks columns, the inner loop walks rows. Reversed endpoints describe the same
/// rectangle as their normalized form.
pub fn expand_range(range: &str) -> TranspileResult<CellRangeIter> {
    let Some((start, stop)) = range.split_once(':') else {
        let single = match CellCoord::parse(range) {
            Some(coord) => coord.to_string(),
            None => strip_absolute_markers(range),
        };
        return Ok(CellRangeIter::single(single));
    };

    let malformed = || TranspileError::MalformedRange {
        range: range.to_string(),
    };
    let start = CellCoord::parse(start).ok_or_else(malformed)?;
    let stop = CellCoord::parse(stop).ok_or_else(malformed)?;

    Ok(CellRangeIter::rect(
        CellCoord::new(start.col.min(stop.col), start.row.min(stop.row)),
        CellCoord::new(start.col.max(stop.col), start.row.max(stop.row)),
    ))
}

/// Lazy, single-pass iterator returned by [`expand_range`].
#[derive(Debug, Clone)]
pub struct CellRangeIter {
    inner: RangeState,
}

#[derive(Debug, Clone)]
enum RangeState {
    Single(Option<String>),
    Rect {
        first_row: u32,
        last: CellCoord,
        next: Option<CellCoord>,
    },
}

impl CellRangeIter {
    fn single(coordinate: String) -> Self {
        Self {
            inner: RangeState::Single(Some(coordinate)),
        }
    }

    fn rect(first: CellCoord, last: CellCoord) -> Self {
        Self {
            inner: RangeState::Rect {
                first_row: first.row,
                last,
                next: Some(first),
            },
        }
    }
}

impl Iterator for CellRangeIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match &mut self.inner {
            RangeState::Single(coordinate) => coordinate.take(),
            RangeState::Rect {
                first_row,
                last,
                next,
            } => {
                let current = (*next)?;
                *next = if current.row < last.row {
                    Some(CellCoord::new(current.col, current.row + 1))
                } else if current.col < last.col {
                    Some(CellCoord::new(current.col + 1, *first_row))
                } else {
                    None
                };
                Some(current.to_string())
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match &self.inner {
            RangeState::Single(coordinate) => usize::from(coordinate.is_some()),
            RangeState::Rect {
                first_row,
                last,
                next,
            } => match next {
                None => 0,
                Some(next) => {
                    let height = (last.row - first_row + 1) as usize;
                    let in_column = (last.row - next.row + 1) as usize;
                    let later_columns = (last.col - next.col) as usize;
                    in_column + later_columns * height
                }
            },
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellRangeIter {}
