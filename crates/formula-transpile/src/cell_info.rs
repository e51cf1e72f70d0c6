//! Cell coordinate -> generated variable bindings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{TranspileError, TranspileResult};
use crate::naming::make_variable_name;

/// Binding of one spreadsheet cell to a variable of the generated state container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellInfo {
    pub coordinate: String,
    pub variable_name: String,
    /// Raw cell content; a string starting with `=` is a formula.
    pub value: JsonValue,
}

impl CellInfo {
    #[must_use]
    pub fn new(
        coordinate: impl Into<String>,
        variable_name: impl Into<String>,
        value: JsonValue,
    ) -> Self {
        Self {
            coordinate: coordinate.into(),
            variable_name: variable_name.into(),
            value,
        }
    }

    #[must_use]
    pub fn is_formula(&self) -> bool {
        self.formula().is_some()
    }

    /// The formula text (including the leading `=`), if this cell holds one.
    #[must_use]
    pub fn formula(&self) -> Option<&str> {
        self.value.as_str().filter(|s| s.starts_with('='))
    }
}

/// A cell as read from a sheet, before it is bound to a variable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetCell {
    pub coordinate: String,
    pub value: JsonValue,
}

impl SheetCell {
    #[must_use]
    pub fn new(coordinate: impl Into<String>, value: JsonValue) -> Self {
        Self {
            coordinate: coordinate.into(),
            value,
        }
    }

    fn header_label(&self) -> Option<&str> {
        self.value.as_str().filter(|s| !s.trim().is_empty())
    }
}

/// Lookup table with at most one [`CellInfo`] per coordinate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellInfoTable {
    cells: BTreeMap<String, CellInfo>,
}

impl CellInfoTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: CellInfo) -> TranspileResult<()> {
        if self.cells.contains_key(&info.coordinate) {
            return Err(TranspileError::DuplicateCell {
                coordinate: info.coordinate,
            });
        }
        self.cells.insert(info.coordinate.clone(), info);
        Ok(())
    }

    /// Merge another table into this one, rejecting overlapping coordinates.
    pub fn merge(&mut self, other: CellInfoTable) -> TranspileResult<()> {
        for info in other.cells.into_values() {
            self.insert(info)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, coordinate: &str) -> Option<&CellInfo> {
        self.cells.get(coordinate)
    }

    /// Like [`CellInfoTable::get`], but an absent coordinate is an error.
    pub fn resolve(&self, coordinate: &str) -> TranspileResult<&CellInfo> {
        self.get(coordinate)
            .ok_or_else(|| TranspileError::UnresolvedReference {
                coordinate: coordinate.to_string(),
            })
    }

    /// Cells in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = &CellInfo> {
        self.cells.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Header/value pairs laid out one after the other along a line (`A8:A29` holding
    /// `header, value, header, value, ...`).
    ///
    /// A trailing header without a value cell is ignored.
    pub fn from_alternating(cells: &[SheetCell]) -> TranspileResult<Self> {
        let mut table = Self::new();
        let pairs = cells.chunks_exact(2);
        if !pairs.remainder().is_empty() {
            log::warn!(
                "ignoring trailing header cell {} without a value cell",
                pairs.remainder()[0].coordinate
            );
        }
        for pair in pairs {
            let (header, value) = (&pair[0], &pair[1]);
            let label = match &header.value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Null => value.coordinate.clone(),
                other => other.to_string(),
            };
            table.insert(CellInfo::new(
                value.coordinate.clone(),
                variable_name(&label, &value.coordinate),
                value.value.clone(),
            ))?;
        }
        Ok(table)
    }

    /// A header row and a value row of a table; each value is named after the header at the same
    /// index, falling back to its own coordinate when that header is missing or blank.
    pub fn from_horizontal(headers: &[SheetCell], values: &[SheetCell]) -> TranspileResult<Self> {
        let mut table = Self::new();
        for (idx, cell) in values.iter().enumerate() {
            let label = headers
                .get(idx)
                .and_then(SheetCell::header_label)
                .unwrap_or(cell.coordinate.as_str());
            table.insert(CellInfo::new(
                cell.coordinate.clone(),
                variable_name(label, &cell.coordinate),
                cell.value.clone(),
            ))?;
        }
        Ok(table)
    }
}

/// Header-derived name, or the coordinate's name when the header has no word characters.
fn variable_name(label: &str, coordinate: &str) -> String {
    let name = make_variable_name(label);
    if name.is_empty() {
        log::warn!("header `{label}` yields no identifier; naming {coordinate} after itself");
        make_variable_name(coordinate)
    } else {
        name
    }
}

impl FromIterator<CellInfo> for CellInfoTable {
    /// Later duplicates of a coordinate are dropped (with a warning), keeping the first binding.
    fn from_iter<I: IntoIterator<Item = CellInfo>>(iter: I) -> Self {
        let mut table = Self::new();
        for info in iter {
            if let Err(err) = table.insert(info) {
                log::warn!("{err}");
            }
        }
        table
    }
}
