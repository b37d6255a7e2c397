//! Indonesian calendar vocabulary used by printed and displayed records.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Weekday names starting from Monday.
pub const WEEKDAYS: [&str; 7] = [
    "Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu", "Minggu",
];

pub const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Date keys the document templates expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarFields {
    pub day: String,
    pub date: String,
    pub month: String,
    pub year: i32,
    pub today: String,
    pub day_number: String,
    pub month_number: String,
    pub year_string: String,
}

impl CalendarFields {
    pub fn from_datetime(value: DateTime<Utc>, tz: Tz) -> Self {
        let local = value.with_timezone(&tz);
        let day = WEEKDAYS[local.weekday().num_days_from_monday() as usize];
        let month = MONTHS[local.month0() as usize];
        let date = format!("{:02}", local.day());
        let month_number = format!("{:02}", local.month());

        CalendarFields {
            day: day.to_string(),
            date: date.clone(),
            month: month.to_string(),
            year: local.year(),
            today: format!("{}/{}/{}", date, month_number, local.year()),
            day_number: date,
            month_number,
            year_string: local.year().to_string(),
        }
    }
}

/// "05 Maret 2025"; empty when there is no date.
pub fn long_date(value: Option<DateTime<Utc>>, tz: Tz) -> String {
    match value {
        Some(value) => {
            let local = value.with_timezone(&tz);
            format!(
                "{:02} {} {}",
                local.day(),
                MONTHS[local.month0() as usize],
                local.year()
            )
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_calendar_fields() {
        // 2025-03-05 is a Wednesday
        let value = Utc.with_ymd_and_hms(2025, 3, 5, 2, 0, 0).unwrap();
        let fields = CalendarFields::from_datetime(value, chrono_tz::Asia::Jakarta);
        assert_eq!(fields.day, "Rabu");
        assert_eq!(fields.date, "05");
        assert_eq!(fields.month, "Maret");
        assert_eq!(fields.year, 2025);
        assert_eq!(fields.today, "05/03/2025");
        assert_eq!(fields.day_number, "05");
        assert_eq!(fields.month_number, "03");
        assert_eq!(fields.year_string, "2025");
    }

    #[test]
    fn test_timezone_shifts_calendar_day() {
        // 20:00 UTC is already the next day in Jakarta (UTC+7)
        let value = Utc.with_ymd_and_hms(2024, 12, 31, 20, 0, 0).unwrap();
        let fields = CalendarFields::from_datetime(value, chrono_tz::Asia::Jakarta);
        assert_eq!(fields.today, "01/01/2025");
        assert_eq!(fields.day, "Rabu");
    }

    #[test]
    fn test_long_date() {
        let value = Utc.with_ymd_and_hms(2025, 8, 17, 3, 0, 0).unwrap();
        assert_eq!(
            long_date(Some(value), chrono_tz::Asia::Jakarta),
            "17 Agustus 2025"
        );
        assert_eq!(long_date(None, chrono_tz::Asia::Jakarta), "");
    }
}
