use chrono::{Datelike, Duration, NaiveDate};

use crate::types::{Window, WalkForwardConfig};

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar date");
    (next_month_first - Duration::days(1)).day()
}

/// Calendar-month-safe addition: clamps the day-of-month to the end of the
/// resulting month (e.g. Jan 31 + 1 month = Feb 28/29).
fn add_months(date: NaiveDate, months: i64) -> NaiveDate {
    let total = date.year() as i64 * 12 + (date.month() as i64 - 1) + months;
    let year = total.div_euclid(12) as i32;
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = date.day().min(last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// Generates rolling train/test windows per the configured cadence. Dates
/// are half-open `[start, end)`, UTC semantics.
pub fn generate_windows(config: &WalkForwardConfig) -> Vec<Window> {
    let mut windows = Vec::new();
    let mut cursor = config.data_start;
    let mut id = 0usize;

    loop {
        let train_start = cursor;
        let train_end = add_months(cursor, config.train_months as i64);
        let test_start = train_end + Duration::days(config.embargo_before_days);
        let test_end = add_months(test_start, config.test_months as i64);

        if test_end > config.data_end {
            break;
        }

        windows.push(Window {
            id,
            train_start,
            train_end,
            test_start,
            test_end,
        });
        id += 1;

        let stepped = add_months(cursor, config.step_months as i64);
        let min_cursor = test_end + Duration::days(config.embargo_after_days);
        let next_cursor = stepped.max(min_cursor);

        if next_cursor <= cursor {
            break;
        }
        cursor = next_cursor;
    }

    windows
}
