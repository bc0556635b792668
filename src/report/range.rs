use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::ReportError;

/// Inclusive UTC span covering whole calendar days:
/// `start` is 00:00:00.000 of the first day, `end` is 23:59:59.999 of the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its UTC date is used).
fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

impl DateRange {
    pub fn parse(start: &str, end: &str) -> Result<Self, ReportError> {
        let start_day = parse_day(start)
            .ok_or_else(|| ReportError::InvalidRange(format!("cannot parse startDate '{start}'")))?;
        let end_day = parse_day(end)
            .ok_or_else(|| ReportError::InvalidRange(format!("cannot parse endDate '{end}'")))?;

        Self::from_days(start_day, end_day)
    }

    pub fn from_days(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvalidRange(
                "startDate cannot be after endDate".to_string(),
            ));
        }

        let start = start
            .and_hms_milli_opt(0, 0, 0, 0)
            .ok_or_else(|| ReportError::InvalidRange("startDate out of range".to_string()))?
            .and_utc();
        let end = end
            .and_hms_milli_opt(23, 59, 59, 999)
            .ok_or_else(|| ReportError::InvalidRange("endDate out of range".to_string()))?
            .and_utc();

        Ok(Self { start, end })
    }

    /// Whole-day range ending today, starting on the 1st of the month.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        Self::from_days(first, today).unwrap_or_else(|_| Self::single_day(today))
    }

    pub fn single_day(day: NaiveDate) -> Self {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        Self { start, end }
    }

    #[cfg(test)]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[cfg(test)]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.date_naive()
    }

    #[cfg(test)]
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.first_day() && day <= self.last_day()
    }

    /// Every calendar day of the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |day| *day <= last)
    }
}
