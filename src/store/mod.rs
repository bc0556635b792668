//! Persistence seam for attendance data.
//!
//! The report pipeline only ever reads through [`AttendanceStore`]; check-in
//! and check-out are the only writers. Status values are normalized to
//! [`AttendanceStatus`] here, on the way out of the store, so nothing above
//! this layer deals with raw status strings.

pub mod mysql;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus, GeoPoint};
use crate::report::range::DateRange;
use crate::report::scope::Scope;

pub use mysql::MySqlAttendanceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTally {
    pub status: AttendanceStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTally {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub count: u64,
}

/// Records of one employee with one status, with their minute totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeTally {
    pub employee_id: u64,
    pub employee_name: Option<String>,
    pub status: AttendanceStatus,
    pub count: u64,
    pub working_minutes: i64,
    pub overtime_minutes: i64,
}

/// Selection for record listings; every field narrows the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFilter {
    pub range: DateRange,
    pub employee_id: Option<u64>,
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
    pub location: GeoPoint,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone)]
pub struct NewCheckOut {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub working_minutes: i64,
    pub overtime_minutes: i64,
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Number of employees currently assigned to the department.
    async fn department_headcount(&self, department_id: u64) -> Result<u64, sqlx::Error>;

    /// Record counts per status within range and scope.
    async fn status_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<StatusTally>, sqlx::Error>;

    /// Record counts per (day, status) within range and scope.
    async fn daily_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<DailyTally>, sqlx::Error>;

    /// Record counts and minute sums per (employee, status), ascending by
    /// employee.
    async fn employee_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<EmployeeTally>, sqlx::Error>;

    /// Record counts per status for everything the filter selects.
    async fn record_tallies(&self, filter: &RecordFilter) -> Result<Vec<StatusTally>, sqlx::Error>;

    /// Newest day first, then by employee.
    async fn list_records(
        &self,
        filter: &RecordFilter,
        page: Page,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error>;

    async fn find_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error>;

    /// Returns `false` when the day already carries a check-in.
    async fn insert_check_in(&self, check_in: &NewCheckIn) -> Result<bool, sqlx::Error>;

    /// Returns the number of rows updated; 0 when there is no open check-in.
    async fn update_check_out(&self, check_out: &NewCheckOut) -> Result<u64, sqlx::Error>;
}

pub(crate) fn to_count(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}

/// Folds raw `(status, count)` rows into typed tallies, merging rows that
/// only differ by case and dropping statuses outside the enum.
pub(crate) fn normalize_status_rows(rows: Vec<(String, i64)>) -> Vec<StatusTally> {
    let mut merged: BTreeMap<AttendanceStatus, u64> = BTreeMap::new();

    for (raw, count) in rows {
        match AttendanceStatus::normalize(&raw) {
            Some(status) => *merged.entry(status).or_default() += to_count(count),
            None => warn!(status = %raw, count, "Ignoring attendance rows with unknown status"),
        }
    }

    merged
        .into_iter()
        .map(|(status, count)| StatusTally { status, count })
        .collect()
}

pub(crate) fn normalize_daily_rows(rows: Vec<(NaiveDate, String, i64)>) -> Vec<DailyTally> {
    let mut merged: BTreeMap<(NaiveDate, AttendanceStatus), u64> = BTreeMap::new();

    for (date, raw, count) in rows {
        match AttendanceStatus::normalize(&raw) {
            Some(status) => *merged.entry((date, status)).or_default() += to_count(count),
            None => warn!(%date, status = %raw, count, "Ignoring attendance rows with unknown status"),
        }
    }

    merged
        .into_iter()
        .map(|((date, status), count)| DailyTally { date, status, count })
        .collect()
}

/// `(employee_id, employee_name, status, count, working_minutes, overtime_minutes)`
pub(crate) type RawEmployeeRow = (u64, Option<String>, String, i64, i64, i64);

pub(crate) fn normalize_employee_rows(rows: Vec<RawEmployeeRow>) -> Vec<EmployeeTally> {
    let mut merged: BTreeMap<(u64, AttendanceStatus), EmployeeTally> = BTreeMap::new();

    for (employee_id, employee_name, raw, count, working, overtime) in rows {
        let Some(status) = AttendanceStatus::normalize(&raw) else {
            warn!(employee_id, status = %raw, count, "Ignoring attendance rows with unknown status");
            continue;
        };

        let tally = merged
            .entry((employee_id, status))
            .or_insert_with(|| EmployeeTally {
                employee_id,
                employee_name: None,
                status,
                count: 0,
                working_minutes: 0,
                overtime_minutes: 0,
            });
        tally.employee_name = tally.employee_name.take().or(employee_name);
        tally.count += to_count(count);
        tally.working_minutes += working;
        tally.overtime_minutes += overtime;
    }

    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_case_variants_and_drops_unknown() {
        let tallies = normalize_status_rows(vec![
            ("present".to_string(), 3),
            ("Present".to_string(), 2),
            ("late".to_string(), 1),
            ("holiday".to_string(), 7),
        ]);

        assert_eq!(
            tallies,
            vec![
                StatusTally { status: AttendanceStatus::Present, count: 5 },
                StatusTally { status: AttendanceStatus::Late, count: 1 },
            ]
        );
    }

    #[test]
    fn daily_rows_are_keyed_by_day_and_status() {
        let d1 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        let tallies = normalize_daily_rows(vec![
            (d2, "ABSENT".to_string(), 1),
            (d1, "present".to_string(), 1),
            (d1, "PRESENT".to_string(), 1),
        ]);

        assert_eq!(
            tallies,
            vec![
                DailyTally { date: d1, status: AttendanceStatus::Present, count: 2 },
                DailyTally { date: d2, status: AttendanceStatus::Absent, count: 1 },
            ]
        );
    }

    #[test]
    fn employee_rows_merge_case_variants_and_sum_minutes() {
        let ann = Some("Ann Lee".to_string());
        let tallies = normalize_employee_rows(vec![
            (2, None, "absent".to_string(), 1, 0, 0),
            (1, ann.clone(), "present".to_string(), 2, 960, 0),
            (1, ann.clone(), "Present".to_string(), 1, 500, 20),
            (1, ann.clone(), "remote".to_string(), 4, 1900, 0),
        ]);

        assert_eq!(
            tallies,
            vec![
                EmployeeTally {
                    employee_id: 1,
                    employee_name: ann,
                    status: AttendanceStatus::Present,
                    count: 3,
                    working_minutes: 1460,
                    overtime_minutes: 20,
                },
                EmployeeTally {
                    employee_id: 2,
                    employee_name: None,
                    status: AttendanceStatus::Absent,
                    count: 1,
                    working_minutes: 0,
                    overtime_minutes: 0,
                },
            ]
        );
    }
}
