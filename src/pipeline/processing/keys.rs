use std::collections::HashMap;
use tracing::info;

use crate::table::{RecordSet, Value};

/// How a synthetic key was derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Categorical code of the named text column
    Categorical(String),
    /// Zero-based row position
    RowPosition,
}

/// Ordered dictionary from distinct value to sequential code, first seen first.
/// Nulls are never coded.
#[derive(Debug, Default)]
pub struct CategoricalEncoder {
    codes: HashMap<Value, i64>,
}

impl CategoricalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        let next = self.codes.len() as i64;
        Value::Int(*self.codes.entry(value.clone()).or_insert(next))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Derives stand-in identifiers for tables whose natural key is missing.
///
/// Synthetic keys are per-run and non-authoritative, so every synthesis is logged.
pub struct KeySynthesizer;

impl KeySynthesizer {
    /// Add `key_col` when absent, coding `fallback` categorically if it exists and
    /// numbering rows otherwise. Returns `None` when the key already existed.
    pub fn ensure_key(
        set: &mut RecordSet,
        key_col: &str,
        fallback: Option<&str>,
        table: &str,
    ) -> Option<KeySource> {
        if set.has_column(key_col) {
            return None;
        }
        let source = match fallback.and_then(|f| set.column(f).map(|v| (f, v))) {
            Some((name, values)) => {
                let mut encoder = CategoricalEncoder::new();
                let codes: Vec<Value> = values.iter().map(|v| encoder.encode(v)).collect();
                info!(
                    table,
                    key = key_col,
                    from = name,
                    distinct = encoder.len(),
                    "synthesized key from categorical codes"
                );
                set.fill_column_with(key_col, |row| codes[row].clone());
                KeySource::Categorical(name.to_string())
            }
            None => {
                info!(table, key = key_col, rows = set.num_rows(), "synthesized key from row position");
                set.fill_column_with(key_col, |row| Value::Int(row as i64));
                KeySource::RowPosition
            }
        };
        Some(source)
    }

    /// Row-position key: `0..n`
    pub fn row_positions(rows: usize) -> Vec<Value> {
        (0..rows as i64).map(Value::Int).collect()
    }
}
