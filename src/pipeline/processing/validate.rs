//! Validators. None of these fail on bad data: every finding becomes a
//! quality issue and the record set flows on unchanged (apart from type coercion).

use super::quality::{IssueKind, QualityLog};
use crate::table::{RecordSet, Value};

/// Target kind for [`validate_data_types`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    Datetime,
    Numeric,
}

/// Log one MISSING_COLUMNS error naming every absent required column
pub fn validate_required_columns(
    set: &RecordSet,
    required: &[&str],
    table: &str,
    log: &mut QualityLog,
) -> Vec<String> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !set.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        log.error(
            table,
            IssueKind::MissingColumns,
            format!("Missing required: [{}]", missing.join(", ")),
        );
    }
    missing
}

/// Log a NULL_VALUES warning for each present key column holding nulls
pub fn check_nulls(set: &RecordSet, key_cols: &[&str], table: &str, log: &mut QualityLog) {
    let total = set.num_rows();
    for col in key_cols {
        let Some(values) = set.column(col) else {
            continue;
        };
        let nulls = values.iter().filter(|v| v.is_null()).count();
        if nulls > 0 {
            log.warning(
                table,
                IssueKind::NullValues,
                format!("{}: {}/{} ({}%) nulls", col, nulls, total, null_percentage(nulls, total)),
            );
        }
    }
}

/// `100 * nulls / total`, one decimal place
pub fn null_percentage(nulls: usize, total: usize) -> String {
    if total == 0 {
        return "0.0".to_string();
    }
    format!("{:.1}", nulls as f64 * 100.0 / total as f64)
}

/// Count rows whose key tuple already appeared (n - distinct). Returns 0 without
/// logging when any key column is absent.
pub fn check_duplicates(
    set: &RecordSet,
    key_cols: &[&str],
    table: &str,
    log: &mut QualityLog,
) -> usize {
    if key_cols.is_empty() || !key_cols.iter().all(|c| set.has_column(c)) {
        return 0;
    }
    let count = set.count_duplicates(key_cols);
    if count > 0 {
        log.warning(
            table,
            IssueKind::Duplicates,
            format!("{} duplicate rows on [{}]", count, key_cols.join(", ")),
        );
    }
    count
}

/// Coerce each listed column; values that fail to parse become null and the
/// number of newly null values is logged per column.
pub fn validate_data_types<S: AsRef<str>>(
    set: &mut RecordSet,
    type_map: &[(S, ExpectedKind)],
    table: &str,
    log: &mut QualityLog,
) {
    for (col, kind) in type_map {
        let col = col.as_ref();
        let Some(values) = set.column(col) else {
            continue;
        };
        let before = non_null(values);
        set.map_column(col, |v| match kind {
            ExpectedKind::Datetime => v.coerce_datetime(),
            ExpectedKind::Numeric => v.coerce_numeric(),
        });
        let after = set.column(col).map(non_null).unwrap_or(0);

        let invalid = before - after;
        if invalid > 0 {
            let issue = match kind {
                ExpectedKind::Datetime => IssueKind::InvalidDatetime,
                ExpectedKind::Numeric => IssueKind::InvalidNumeric,
            };
            log.warning(table, issue, format!("{}: {} values coerced to null", col, invalid));
        }
    }
}

fn non_null(values: &[Value]) -> usize {
    values.iter().filter(|v| !v.is_null()).count()
}

/// Summarise ERROR issues already logged for `table`
pub fn flag_errors(table: &str, log: &QualityLog) -> usize {
    log.flag_errors(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::quality::Severity;

    fn set() -> RecordSet {
        RecordSet::from_columns(vec![
            ("id", vec![Value::Int(1), Value::Int(2), Value::Int(2), Value::Null]),
            ("day", vec!["2021-01-02".into(), "garbage".into(), Value::Null, "03/04/2021".into()]),
            ("amount", vec!["1.5".into(), "x".into(), Value::Int(3), Value::Null]),
        ])
        .unwrap()
    }

    #[test]
    fn test_missing_columns_logged_once_as_error() {
        let mut log = QualityLog::new();
        let missing = validate_required_columns(&set(), &["id", "a", "b"], "t", &mut log);
        assert_eq!(missing, vec!["a", "b"]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.issues()[0].severity, Severity::Error);
        assert_eq!(log.issues()[0].details, "Missing required: [a, b]");
    }

    #[test]
    fn test_nulls_one_issue_per_column_with_nulls() {
        let mut log = QualityLog::new();
        check_nulls(&set(), &["id", "amount", "absent"], "t", &mut log);
        assert_eq!(log.len(), 2);
        assert_eq!(log.issues()[0].details, "id: 1/4 (25.0%) nulls");

        let mut clean = QualityLog::new();
        let no_nulls = RecordSet::from_columns(vec![("id", vec![Value::Int(1)])]).unwrap();
        check_nulls(&no_nulls, &["id"], "t", &mut clean);
        assert!(clean.is_empty());
    }

    #[test]
    fn test_null_percentage_rounds_to_one_decimal() {
        assert_eq!(null_percentage(1, 3), "33.3");
        assert_eq!(null_percentage(2, 3), "66.7");
        assert_eq!(null_percentage(0, 0), "0.0");
    }

    #[test]
    fn test_duplicates_counts_repeats_only() {
        let mut log = QualityLog::new();
        assert_eq!(check_duplicates(&set(), &["id"], "t", &mut log), 1);
        assert!(log.has_issue("t", IssueKind::Duplicates));

        let mut quiet = QualityLog::new();
        assert_eq!(check_duplicates(&set(), &["id", "missing"], "t", &mut quiet), 0);
        assert_eq!(check_duplicates(&set(), &["day"], "t", &mut quiet), 0);
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_type_coercion_counts_newly_missing() {
        let mut log = QualityLog::new();
        let mut s = set();
        validate_data_types(
            &mut s,
            &[("day", ExpectedKind::Datetime), ("amount", ExpectedKind::Numeric)],
            "t",
            &mut log,
        );
        assert_eq!(log.len(), 2);
        assert_eq!(log.issues()[0].issue_type, IssueKind::InvalidDatetime);
        assert_eq!(log.issues()[0].details, "day: 1 values coerced to null");
        assert_eq!(log.issues()[1].issue_type, IssueKind::InvalidNumeric);
        assert_eq!(s.column("amount").unwrap()[0], Value::Float(1.5));
        assert!(matches!(s.column("day").unwrap()[3], Value::DateTime(_)));
    }
}
