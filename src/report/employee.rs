//! Per-employee views over the same attendance rows the report reads:
//! the HR summary table and an employee's own month-to-date summary.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;
use utoipa::ToSchema;

use super::ReportQuery;
use super::aggregate::round2;
use super::range::DateRange;
use super::scope::resolve_scope;
use crate::error::ReportError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::store::{AttendanceStore, EmployeeTally};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "employeeId": 1,
    "employeeName": "Ann Lee",
    "totalDays": 2,
    "presentDays": 1,
    "absentDays": 0,
    "lateDays": 1,
    "totalWorkingMinutes": 960,
    "totalOvertimeMinutes": 15,
    "attendanceRate": 50.0
}))]
pub struct EmployeeSummary {
    pub employee_id: u64,
    pub employee_name: Option<String>,
    pub total_days: u64,
    pub present_days: u64,
    pub absent_days: u64,
    pub late_days: u64,
    pub total_working_minutes: i64,
    pub total_overtime_minutes: i64,
    /// `present_days / total_days * 100`, two decimals.
    pub attendance_rate: f64,
}

impl EmployeeSummary {
    fn empty(employee_id: u64) -> Self {
        Self {
            employee_id,
            employee_name: None,
            total_days: 0,
            present_days: 0,
            absent_days: 0,
            late_days: 0,
            total_working_minutes: 0,
            total_overtime_minutes: 0,
            attendance_rate: 0.0,
        }
    }
}

/// One row per employee with at least one record, ascending by id.
pub fn summarize_employees(tallies: &[EmployeeTally]) -> Vec<EmployeeSummary> {
    let mut rows: BTreeMap<u64, EmployeeSummary> = BTreeMap::new();

    for tally in tallies {
        let row = rows
            .entry(tally.employee_id)
            .or_insert_with(|| EmployeeSummary::empty(tally.employee_id));

        if row.employee_name.is_none() {
            row.employee_name = tally.employee_name.clone();
        }
        match tally.status {
            AttendanceStatus::Present => row.present_days += tally.count,
            AttendanceStatus::Absent => row.absent_days += tally.count,
            AttendanceStatus::Late => row.late_days += tally.count,
        }
        row.total_days += tally.count;
        row.total_working_minutes += tally.working_minutes;
        row.total_overtime_minutes += tally.overtime_minutes;
    }

    rows.into_values()
        .map(|mut row| {
            if row.total_days > 0 {
                row.attendance_rate =
                    round2(row.present_days as f64 / row.total_days as f64 * 100.0);
            }
            row
        })
        .collect()
}

#[instrument(skip(store), fields(start = %query.range.first_day(), end = %query.range.last_day()))]
pub async fn generate_employee_report(
    store: &dyn AttendanceStore,
    query: &ReportQuery,
) -> Result<Vec<EmployeeSummary>, ReportError> {
    let scope = resolve_scope(store, query.department_id).await?;
    if scope.matches_nothing() {
        return Ok(Vec::new());
    }

    let tallies = store.employee_tallies(&query.range, &scope).await?;
    Ok(summarize_employees(&tallies))
}

/// An employee's own attendance over a range, measured against weekdays.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonalSummary {
    pub present: u64,
    pub late: u64,
    /// Weekdays in the range without a present or late record.
    pub absent: u64,
    pub working_days: u64,
    /// Attended weekdays over working days, in percent.
    pub rate: f64,
}

fn is_weekday(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn personal_summary(range: &DateRange, records: &[AttendanceRecord]) -> PersonalSummary {
    let working_days = range.days().filter(|d| is_weekday(*d)).count() as u64;

    let mut present = 0;
    let mut late = 0;
    let mut attended = BTreeSet::new();
    for record in records {
        match record.status {
            AttendanceStatus::Present => present += 1,
            AttendanceStatus::Late => late += 1,
            AttendanceStatus::Absent => continue,
        }
        if is_weekday(record.date) {
            attended.insert(record.date);
        }
    }

    let attended = attended.len() as u64;
    let rate = if working_days == 0 {
        0.0
    } else {
        round2(attended as f64 / working_days as f64 * 100.0)
    };

    PersonalSummary {
        present,
        late,
        absent: working_days.saturating_sub(attended),
        working_days,
        rate,
    }
}
