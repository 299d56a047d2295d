use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A recognised occasion. Saturdays within two days of `day` in the same
/// month are treated as falling on the occasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holiday {
    pub month: u32,
    pub day: u32,
    pub label: &'static str,
    pub is_long_weekend: bool,
}

/// Matching is first-match-wins in table order.
pub const HOLIDAYS: &[Holiday] = &[
    Holiday { month: 1, day: 26, label: "Republic Day Weekend", is_long_weekend: true },
    Holiday { month: 3, day: 14, label: "Holi Weekend", is_long_weekend: true },
    Holiday { month: 4, day: 6, label: "Ram Navami", is_long_weekend: false },
    Holiday { month: 8, day: 15, label: "Independence Day Weekend", is_long_weekend: true },
    Holiday { month: 8, day: 26, label: "Janmashtami", is_long_weekend: false },
    Holiday { month: 10, day: 2, label: "Gandhi Jayanti Weekend", is_long_weekend: true },
    Holiday { month: 10, day: 20, label: "Diwali Weekend", is_long_weekend: true },
    Holiday { month: 11, day: 5, label: "Guru Nanak Jayanti", is_long_weekend: false },
    Holiday { month: 12, day: 25, label: "Christmas Weekend", is_long_weekend: true },
];

const HOLIDAY_WINDOW_DAYS: i64 = 2;

/// One eligible departure Saturday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub is_holiday_weekend: bool,
    pub occasion: Option<String>,
}

impl CalendarEntry {
    pub fn regular(date: NaiveDate) -> Self {
        Self {
            date,
            is_holiday_weekend: false,
            occasion: None,
        }
    }

    pub fn holiday(date: NaiveDate, occasion: impl Into<String>) -> Self {
        Self {
            date,
            is_holiday_weekend: true,
            occasion: Some(occasion.into()),
        }
    }
}

/// Nearest Saturday on or after `date`
pub fn next_saturday(date: NaiveDate) -> NaiveDate {
    let today = date.weekday().num_days_from_monday() as i64;
    let saturday = Weekday::Sat.num_days_from_monday() as i64;
    date + Duration::days((saturday - today).rem_euclid(7))
}

pub fn find_holiday_in(table: &'static [Holiday], date: NaiveDate) -> Option<&'static Holiday> {
    table.iter().find(|h| {
        h.month == date.month() && (date.day() as i64 - h.day as i64).abs() <= HOLIDAY_WINDOW_DAYS
    })
}

pub fn find_holiday(date: NaiveDate) -> Option<&'static Holiday> {
    find_holiday_in(HOLIDAYS, date)
}

/// Does the occasion stretch into a long weekend? Labels outside the table
/// count when they are named as a weekend.
pub fn occasion_is_long_weekend(label: &str) -> bool {
    match HOLIDAYS.iter().find(|h| h.label.eq_ignore_ascii_case(label)) {
        Some(holiday) => holiday.is_long_weekend,
        None => label.trim_end().to_ascii_lowercase().ends_with("weekend"),
    }
}

/// `weeks_ahead` consecutive Saturdays starting from the first one on or after `start`.
pub fn upcoming_weekends(start: NaiveDate, weeks_ahead: u32) -> Vec<CalendarEntry> {
    upcoming_weekends_with(HOLIDAYS, start, weeks_ahead)
}

pub fn upcoming_weekends_with(
    table: &'static [Holiday],
    start: NaiveDate,
    weeks_ahead: u32,
) -> Vec<CalendarEntry> {
    let first = next_saturday(start);

    (0..weeks_ahead as i64)
        .map(|week| {
            let date = first + Duration::days(7 * week);
            match find_holiday_in(table, date) {
                Some(holiday) => CalendarEntry::holiday(date, holiday.label),
                None => CalendarEntry::regular(date),
            }
        })
        .collect()
}
