use chrono::{Datelike, NaiveDate, Weekday};

use crate::constants::DATE_RANGE_SAMPLE_ROWS;
use crate::error::Result;
use crate::table::{RecordSet, Value};
use crate::types::TableId;

/// Silver tables sampled for the calendar span
pub const DATE_SOURCES: [TableId; 4] = [
    TableId::CustomerUser,
    TableId::EnterpriseMerchant,
    TableId::EnterpriseStaff,
    TableId::OperationsOrders,
];

/// Span used when no source holds a parseable date
pub fn default_span() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
        NaiveDate::from_ymd_opt(2020, 12, 31).unwrap_or(NaiveDate::MIN),
    )
}

/// Earliest and latest calendar day found in date-like columns (names containing
/// `date` or `birth`) of the first rows of each source.
pub fn date_span(sources: &[RecordSet]) -> Option<(NaiveDate, NaiveDate)> {
    let mut span: Option<(NaiveDate, NaiveDate)> = None;
    for records in sources {
        let sample = records.num_rows().min(DATE_RANGE_SAMPLE_ROWS);
        for column in records.columns() {
            let name = column.name.to_lowercase();
            if !(name.contains("date") || name.contains("birth")) {
                continue;
            }
            for day in column.values[..sample].iter().filter_map(Value::to_date) {
                span = Some(match span {
                    Some((lo, hi)) => (lo.min(day), hi.max(day)),
                    None => (day, day),
                });
            }
        }
    }
    span
}

/// `yyyymmdd` surrogate key of a calendar day
pub fn date_key(day: NaiveDate) -> i64 {
    i64::from(day.year()) * 10_000 + i64::from(day.month()) * 100 + i64::from(day.day())
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// One row per day from `start` to `end` inclusive
pub fn build_date_dim(start: NaiveDate, end: NaiveDate) -> Result<RecordSet> {
    let days: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
    let int = |f: &dyn Fn(&NaiveDate) -> i64| days.iter().map(|d| Value::Int(f(d))).collect::<Vec<_>>();

    RecordSet::from_columns(vec![
        ("date_key", int(&|d| date_key(*d))),
        ("full_date", days.iter().map(|d| Value::Date(*d)).collect()),
        ("year", int(&|d| i64::from(d.year()))),
        ("quarter", int(&|d| i64::from((d.month() - 1) / 3 + 1))),
        ("month", int(&|d| i64::from(d.month()))),
        (
            "month_name",
            days.iter()
                .map(|d| Value::from(MONTH_NAMES[d.month0() as usize]))
                .collect(),
        ),
        ("day", int(&|d| i64::from(d.day()))),
        (
            "day_name",
            days.iter().map(|d| Value::from(day_name(d.weekday()))).collect(),
        ),
        (
            "is_weekend",
            days.iter()
                .map(|d| Value::Bool(matches!(d.weekday(), Weekday::Sat | Weekday::Sun)))
                .collect(),
        ),
    ])
}
