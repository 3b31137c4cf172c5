//! In-memory tabular model shared by the silver and gold stages.
//!
//! A `RecordSet` is an ordered list of equally long named columns. It carries
//! just the operations the cleaners and loaders need (projection, row filters,
//! duplicate detection, concatenation and single-key joins) with pandas-like
//! semantics where the pipeline relies on them.

pub mod parquet;
pub mod value;

pub use value::Value;

use std::collections::{HashMap, HashSet};

use crate::error::{EtlError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// Suffix given to right-hand columns whose names collide in a join
pub const JOIN_COLLISION_SUFFIX: &str = "_right";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<Column>,
    rows: usize,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, values)` pairs; every column must have the same length
    /// and names must be unique.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Value>)>) -> Result<Self> {
        let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        Self::from_parts(
            columns.into_iter().map(|(n, v)| (n.into(), v)).collect(),
            rows,
        )
    }

    pub(crate) fn from_parts(columns: Vec<(String, Vec<Value>)>, rows: usize) -> Result<Self> {
        let mut set = RecordSet {
            columns: Vec::with_capacity(columns.len()),
            rows,
        };
        for (name, values) in columns {
            if values.len() != rows {
                return Err(schema_error(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    rows
                )));
            }
            if set.has_column(&name) {
                return Err(schema_error(format!("duplicate column '{}'", name)));
            }
            set.columns.push(Column { name, values });
        }
        Ok(set)
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.column_index(name).map(|i| self.columns[i].values.as_slice())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|values| values.get(row))
    }

    /// Replace the values of an existing column or append a new one.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if self.columns.is_empty() && self.rows == 0 {
            self.rows = values.len();
        }
        if values.len() != self.rows {
            return Err(schema_error(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                self.rows
            )));
        }
        match self.column_index(name) {
            Some(i) => self.columns[i].values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
        Ok(())
    }

    /// Append (or overwrite) a column where every row holds `value`
    pub fn fill_column(&mut self, name: &str, value: Value) {
        self.fill_column_with(name, |_| value.clone());
    }

    /// Append (or overwrite) a column computed from each row position
    pub fn fill_column_with<F>(&mut self, name: &str, f: F)
    where
        F: FnMut(usize) -> Value,
    {
        let values: Vec<Value> = (0..self.rows).map(f).collect();
        match self.column_index(name) {
            Some(i) => self.columns[i].values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
    }

    /// Apply `f` to every value of a column in place; false when the column is absent
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(&Value) -> Value,
    {
        match self.column_index(name) {
            Some(i) => {
                for v in self.columns[i].values.iter_mut() {
                    *v = f(v);
                }
                true
            }
            None => false,
        }
    }

    /// Rename `from` to `to`; refused when `from` is absent or `to` already exists
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if from == to || self.has_column(to) {
            return false;
        }
        match self.column_index(from) {
            Some(i) => {
                self.columns[i].name = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Rename every column through `f`. Names that collide after renaming get a
    /// numeric suffix (`_1`, `_2`, ...) in column order, so names stay unique.
    pub fn rename_columns_with<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        let mut taken: HashSet<String> = HashSet::with_capacity(self.columns.len());
        for column in &mut self.columns {
            let base = f(&column.name);
            let mut name = base.clone();
            let mut n = 1;
            while taken.contains(&name) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            taken.insert(name.clone());
            column.name = name;
        }
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Vec<Value>> {
        self.column_index(name)
            .map(|i| self.columns.remove(i).values)
    }

    /// Projection in the requested order; absent names are skipped
    pub fn select(&self, names: &[&str]) -> RecordSet {
        let columns = names
            .iter()
            .filter_map(|n| self.column_index(n))
            .map(|i| self.columns[i].clone())
            .collect();
        RecordSet {
            columns,
            rows: self.rows,
        }
    }

    pub fn head(&self, n: usize) -> RecordSet {
        let take: Vec<usize> = (0..self.rows.min(n)).collect();
        self.take_rows(&take)
    }

    /// New record set holding the given row positions, in order
    pub fn take_rows(&self, indices: &[usize]) -> RecordSet {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        RecordSet {
            columns,
            rows: indices.len(),
        }
    }

    /// Keep rows whose mask entry is true
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in self.columns.iter_mut() {
            let mut it = keep.iter();
            column.values.retain(|_| *it.next().unwrap_or(&true));
        }
        self.rows = keep.iter().take(self.rows).filter(|k| **k).count()
            + self.rows.saturating_sub(keep.len());
    }

    /// Drop rows with a null in any of `subset`; absent columns are ignored.
    /// Returns the number of rows removed.
    pub fn drop_nulls(&mut self, subset: &[&str]) -> usize {
        let idx: Vec<usize> = subset.iter().filter_map(|n| self.column_index(n)).collect();
        if idx.is_empty() {
            return 0;
        }
        let keep: Vec<bool> = (0..self.rows)
            .map(|r| idx.iter().all(|&c| !self.columns[c].values[r].is_null()))
            .collect();
        let before = self.rows;
        self.retain_rows(&keep);
        before - self.rows
    }

    /// Drop repeated rows keeping the first occurrence. `None` compares whole rows.
    /// Returns the number of rows removed.
    pub fn drop_duplicates(&mut self, subset: Option<&[&str]>) -> usize {
        let idx = self.key_indices(subset);
        let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(self.rows);
        let keep: Vec<bool> = (0..self.rows)
            .map(|r| seen.insert(self.key_at(r, &idx)))
            .collect();
        let before = self.rows;
        self.retain_rows(&keep);
        before - self.rows
    }

    /// Rows whose key tuple already appeared earlier (n - distinct)
    pub fn count_duplicates(&self, subset: &[&str]) -> usize {
        let idx = self.key_indices(Some(subset));
        let distinct: HashSet<Vec<Value>> = (0..self.rows).map(|r| self.key_at(r, &idx)).collect();
        self.rows - distinct.len()
    }

    fn key_indices(&self, subset: Option<&[&str]>) -> Vec<usize> {
        match subset {
            Some(names) => names.iter().filter_map(|n| self.column_index(n)).collect(),
            None => (0..self.columns.len()).collect(),
        }
    }

    fn key_at(&self, row: usize, idx: &[usize]) -> Vec<Value> {
        idx.iter().map(|&c| self.columns[c].values[row].clone()).collect()
    }

    /// Stack record sets vertically. Columns are the union in first-seen order;
    /// cells of columns a part lacks are null.
    pub fn concat(parts: Vec<RecordSet>) -> RecordSet {
        let mut names: Vec<String> = Vec::new();
        for part in &parts {
            for column in &part.columns {
                if !names.contains(&column.name) {
                    names.push(column.name.clone());
                }
            }
        }
        let total: usize = parts.iter().map(|p| p.rows).sum();
        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column {
                name,
                values: Vec::with_capacity(total),
            })
            .collect();
        for part in parts {
            let rows = part.rows;
            let mut by_name: HashMap<String, Vec<Value>> = part
                .columns
                .into_iter()
                .map(|c| (c.name, c.values))
                .collect();
            for column in columns.iter_mut() {
                match by_name.remove(&column.name) {
                    Some(values) => column.values.extend(values),
                    None => column.values.extend(std::iter::repeat(Value::Null).take(rows)),
                }
            }
        }
        RecordSet {
            columns,
            rows: total,
        }
    }

    /// Join on a single column present on both sides.
    ///
    /// Every matching right row yields an output row (repeated right keys
    /// multiply left rows). Null keys never match. With `JoinKind::Left`,
    /// unmatched left rows are kept once with nulls on the right side.
    pub fn join(&self, right: &RecordSet, on: &str, kind: JoinKind) -> Result<RecordSet> {
        let left_key = self
            .column(on)
            .ok_or_else(|| schema_error(format!("left side has no join column '{}'", on)))?;
        let right_key = right
            .column(on)
            .ok_or_else(|| schema_error(format!("right side has no join column '{}'", on)))?;

        let mut lookup: HashMap<&Value, Vec<usize>> = HashMap::new();
        for (r, key) in right_key.iter().enumerate() {
            if !key.is_null() {
                lookup.entry(key).or_default().push(r);
            }
        }

        let mut left_rows: Vec<usize> = Vec::new();
        let mut right_rows: Vec<Option<usize>> = Vec::new();
        for (l, key) in left_key.iter().enumerate() {
            match lookup.get(key) {
                Some(matches) if !key.is_null() => {
                    for &r in matches {
                        left_rows.push(l);
                        right_rows.push(Some(r));
                    }
                }
                _ => {
                    if kind == JoinKind::Left {
                        left_rows.push(l);
                        right_rows.push(None);
                    }
                }
            }
        }

        let mut out = self.take_rows(&left_rows);
        for column in right.columns.iter().filter(|c| c.name != on) {
            let name = if out.has_column(&column.name) {
                format!("{}{}", column.name, JOIN_COLLISION_SUFFIX)
            } else {
                column.name.clone()
            };
            let values = right_rows
                .iter()
                .map(|r| r.map(|r| column.values[r].clone()).unwrap_or(Value::Null))
                .collect();
            out.set_column(&name, values)?;
        }
        Ok(out)
    }
}

fn schema_error(message: String) -> EtlError {
    EtlError::Schema {
        table: "record_set".to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::Int(*v)).collect()
    }

    fn sample() -> RecordSet {
        RecordSet::from_columns(vec![
            ("id", vec![Value::Int(1), Value::Int(2), Value::Int(2), Value::Null]),
            ("name", vec!["a".into(), "b".into(), "b".into(), "d".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns_rejects_ragged_input() {
        let err = RecordSet::from_columns(vec![("a", ints(&[1, 2])), ("b", ints(&[1]))]);
        assert!(err.is_err());
        let dup = RecordSet::from_columns(vec![("a", ints(&[1])), ("a", ints(&[2]))]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_drop_nulls_and_duplicates_keep_first() {
        let mut set = sample();
        assert_eq!(set.count_duplicates(&["id"]), 1);
        assert_eq!(set.drop_nulls(&["id", "missing"]), 1);
        assert_eq!(set.drop_duplicates(Some(&["id"][..])), 1);
        assert_eq!(set.num_rows(), 2);
        assert_eq!(set.column("id").unwrap(), ints(&[1, 2]).as_slice());
    }

    #[test]
    fn test_full_row_duplicates() {
        let mut set = sample();
        assert_eq!(set.drop_duplicates(None), 1);
        assert_eq!(set.num_rows(), 3);
    }

    #[test]
    fn test_concat_unions_columns() {
        let a = RecordSet::from_columns(vec![("x", ints(&[1]))]).unwrap();
        let b = RecordSet::from_columns(vec![("y", ints(&[2, 3])), ("x", ints(&[4, 5]))]).unwrap();
        let out = RecordSet::concat(vec![a, b]);
        assert_eq!(out.num_rows(), 3);
        assert_eq!(out.column_names(), vec!["x", "y"]);
        assert_eq!(out.column("y").unwrap(), &[Value::Null, Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_left_join_keeps_unmatched_and_multiplies_repeats() {
        let left = RecordSet::from_columns(vec![
            ("k", vec!["a".into(), "b".into(), Value::Null]),
            ("v", ints(&[1, 2, 3])),
        ])
        .unwrap();
        let right = RecordSet::from_columns(vec![
            ("k", vec!["a".into(), "a".into(), Value::Null]),
            ("v", ints(&[10, 11, 12])),
        ])
        .unwrap();

        let out = left.join(&right, "k", JoinKind::Left).unwrap();
        assert_eq!(out.num_rows(), 4);
        assert_eq!(out.column("v_right").unwrap(), &[Value::Int(10), Value::Int(11), Value::Null, Value::Null]);

        let inner = left.join(&right, "k", JoinKind::Inner).unwrap();
        assert_eq!(inner.num_rows(), 2);
    }

    #[test]
    fn test_rename_refuses_existing_target() {
        let mut set = sample();
        assert!(!set.rename_column("id", "name"));
        assert!(set.rename_column("id", "key"));
        assert!(set.has_column("key"));
    }

    #[test]
    fn test_rename_columns_with_suffixes_collisions() {
        let mut set = RecordSet::from_columns(vec![
            ("A", ints(&[1])),
            ("a", ints(&[2])),
            ("b", ints(&[3])),
        ])
        .unwrap();
        set.rename_columns_with(|name| name.to_lowercase());
        assert_eq!(set.column_names(), vec!["a", "a_1", "b"]);
        assert_eq!(set.column("a_1").unwrap(), ints(&[2]).as_slice());
    }

    #[test]
    fn test_retain_rows_and_head() {
        let mut set = sample();
        set.retain_rows(&[true, false, true, false]);
        assert_eq!(set.num_rows(), 2);
        assert_eq!(set.head(1).num_rows(), 1);
        assert_eq!(set.head(10).num_rows(), 2);
    }
}
