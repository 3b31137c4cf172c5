use crate::table::RecordSet;

/// Canonical lexical form of a column name: trimmed, lower-cased, spaces and
/// hyphens replaced by underscores.
pub fn standardize_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Rename every column to its canonical form.
///
/// Names that collide after normalization get a numeric suffix (`_1`, `_2`, ...)
/// in column order. Applying this twice is the same as applying it once.
pub fn standardize_columns(mut set: RecordSet) -> RecordSet {
    set.rename_columns_with(standardize_name);
    set
}

/// Apply `(from, to)` renames where `from` exists and `to` does not
pub fn apply_renames(set: &mut RecordSet, renames: &[(&str, &str)]) {
    for (from, to) in renames {
        if set.has_column(from) && !set.has_column(to) {
            set.rename_column(from, to);
        }
    }
}
