use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Closed set of attendance states. Parsing ignores ASCII case so that rows
/// written as `Present`, `PRESENT` or `present` all land on the same variant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    /// Normalizes a raw store value, `None` for anything outside the enum.
    pub fn normalize(raw: &str) -> Option<Self> {
        Self::from_str(raw.trim()).ok()
    }

    /// Late once the check-in is past the start of the working day.
    pub fn for_check_in(at: DateTime<Utc>, work_start_hour: u32) -> Self {
        let work_start = NaiveTime::from_hms_opt(work_start_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        if at.time() > work_start {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }
}

/// `[longitude, latitude]`, the order the frontend sends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CheckPoint {
    #[schema(value_type = String, format = "date-time")]
    pub time: DateTime<Utc>,
    pub location: Option<GeoPoint>,
}

/// One row per (employee, calendar day).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<CheckPoint>,
    pub check_out: Option<CheckPoint>,
    pub working_minutes: i64,
    pub overtime_minutes: i64,
}

/// Whole minutes between check-in and check-out, 0 when the pair is inverted.
pub fn working_minutes(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    if check_out <= check_in {
        return 0;
    }
    (check_out - check_in).num_minutes()
}

pub fn overtime_minutes(working_minutes: i64, standard_minutes: i64) -> i64 {
    (working_minutes - standard_minutes).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_parsing_ignores_case_and_padding() {
        assert_eq!(AttendanceStatus::normalize("present"), Some(AttendanceStatus::Present));
        assert_eq!(AttendanceStatus::normalize("ABSENT"), Some(AttendanceStatus::Absent));
        assert_eq!(AttendanceStatus::normalize(" Late "), Some(AttendanceStatus::Late));
        assert_eq!(AttendanceStatus::normalize("on-leave"), None);
        assert_eq!(AttendanceStatus::Late.as_ref(), "late");
    }

    #[test]
    fn check_in_after_work_start_is_late() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 8, 59, 59).unwrap();
        let on_time = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 1).unwrap();

        assert_eq!(AttendanceStatus::for_check_in(early, 9), AttendanceStatus::Present);
        assert_eq!(AttendanceStatus::for_check_in(on_time, 9), AttendanceStatus::Present);
        assert_eq!(AttendanceStatus::for_check_in(late, 9), AttendanceStatus::Late);
    }

    #[test]
    fn working_and_overtime_minutes() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 1, 18, 30, 45).unwrap();

        let worked = working_minutes(start, end);
        assert_eq!(worked, 570);
        assert_eq!(overtime_minutes(worked, 480), 90);
        assert_eq!(overtime_minutes(400, 480), 0);
        assert_eq!(working_minutes(end, start), 0);
    }
}
