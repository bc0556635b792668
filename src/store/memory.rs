//! In-memory [`AttendanceStore`] for tests. Statuses are kept as raw strings
//! so the same normalization path as the SQL store is exercised.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{
    AttendanceStore, DailyTally, EmployeeTally, NewCheckIn, NewCheckOut, Page, RecordFilter,
    StatusTally, normalize_daily_rows, normalize_employee_rows, normalize_status_rows,
};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, CheckPoint};
use crate::report::range::DateRange;
use crate::report::scope::Scope;

#[derive(Debug, Clone)]
struct StoredEmployee {
    id: u64,
    department_id: u64,
    name: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    status: String,
    check_in: Option<CheckPoint>,
    check_out: Option<CheckPoint>,
    working_minutes: i64,
    overtime_minutes: i64,
}

#[derive(Default)]
struct Inner {
    rows: Vec<StoredRow>,
    employees: Vec<StoredEmployee>,
    next_id: u64,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl StoredRow {
    fn to_record(&self) -> Option<AttendanceRecord> {
        Some(AttendanceRecord {
            id: self.id,
            employee_id: self.employee_id,
            date: self.date,
            status: AttendanceStatus::normalize(&self.status)?,
            check_in: self.check_in.clone(),
            check_out: self.check_out.clone(),
            working_minutes: self.working_minutes,
            overtime_minutes: self.overtime_minutes,
        })
    }
}

impl Inner {
    fn in_scope(&self, employee_id: u64, scope: &Scope) -> bool {
        match scope {
            Scope::All => true,
            Scope::Department { department_id, .. } => self
                .employees
                .iter()
                .any(|e| e.id == employee_id && e.department_id == *department_id),
        }
    }

    fn name_of(&self, employee_id: u64) -> Option<String> {
        self.employees
            .iter()
            .find(|e| e.id == employee_id)
            .and_then(|e| e.name.clone())
    }
}

impl InMemoryStore {
    pub fn add_employee(&self, employee_id: u64, department_id: u64) {
        self.inner.lock().unwrap().employees.push(StoredEmployee {
            id: employee_id,
            department_id,
            name: None,
        });
    }

    pub fn add_named_employee(&self, employee_id: u64, department_id: u64, name: &str) {
        self.inner.lock().unwrap().employees.push(StoredEmployee {
            id: employee_id,
            department_id,
            name: Some(name.to_string()),
        });
    }

    /// Inserts a bare record, status stored verbatim.
    pub fn mark(&self, employee_id: u64, date: NaiveDate, status: &str) {
        self.mark_worked(employee_id, date, status, 0, 0);
    }

    pub fn mark_worked(
        &self,
        employee_id: u64,
        date: NaiveDate,
        status: &str,
        working_minutes: i64,
        overtime_minutes: i64,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(StoredRow {
            id,
            employee_id,
            date,
            status: status.to_string(),
            check_in: None,
            check_out: None,
            working_minutes,
            overtime_minutes,
        });
    }

    fn matching(&self, range: &DateRange, scope: &Scope) -> Vec<StoredRow> {
        let inner = self.inner.lock().unwrap();
        inner
            .rows
            .iter()
            .filter(|r| range.contains(r.date) && inner.in_scope(r.employee_id, scope))
            .cloned()
            .collect()
    }

    fn selected(&self, filter: &RecordFilter) -> Vec<StoredRow> {
        self.matching(&filter.range, &Scope::All)
            .into_iter()
            .filter(|r| filter.employee_id.is_none_or(|id| id == r.employee_id))
            .filter(|r| {
                filter
                    .status
                    .is_none_or(|status| AttendanceStatus::normalize(&r.status) == Some(status))
            })
            .collect()
    }
}

#[async_trait]
impl AttendanceStore for InMemoryStore {
    async fn department_headcount(&self, department_id: u64) -> Result<u64, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .employees
            .iter()
            .filter(|e| e.department_id == department_id)
            .count() as u64)
    }

    async fn status_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<StatusTally>, sqlx::Error> {
        let mut grouped: BTreeMap<String, i64> = BTreeMap::new();
        for row in self.matching(range, scope) {
            *grouped.entry(row.status.to_lowercase()).or_default() += 1;
        }
        Ok(normalize_status_rows(grouped.into_iter().collect()))
    }

    async fn daily_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<DailyTally>, sqlx::Error> {
        let mut grouped: BTreeMap<(NaiveDate, String), i64> = BTreeMap::new();
        for row in self.matching(range, scope) {
            *grouped.entry((row.date, row.status.to_lowercase())).or_default() += 1;
        }
        Ok(normalize_daily_rows(
            grouped
                .into_iter()
                .map(|((date, status), count)| (date, status, count))
                .collect(),
        ))
    }

    async fn employee_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<EmployeeTally>, sqlx::Error> {
        let mut grouped: BTreeMap<(u64, String), (i64, i64, i64)> = BTreeMap::new();
        for row in self.matching(range, scope) {
            let entry = grouped
                .entry((row.employee_id, row.status.to_lowercase()))
                .or_default();
            entry.0 += 1;
            entry.1 += row.working_minutes;
            entry.2 += row.overtime_minutes;
        }

        let inner = self.inner.lock().unwrap();
        Ok(normalize_employee_rows(
            grouped
                .into_iter()
                .map(|((employee_id, status), (count, working, overtime))| {
                    (employee_id, inner.name_of(employee_id), status, count, working, overtime)
                })
                .collect(),
        ))
    }

    async fn record_tallies(&self, filter: &RecordFilter) -> Result<Vec<StatusTally>, sqlx::Error> {
        let mut grouped: BTreeMap<String, i64> = BTreeMap::new();
        for row in self.selected(filter) {
            *grouped.entry(row.status.to_lowercase()).or_default() += 1;
        }
        Ok(normalize_status_rows(grouped.into_iter().collect()))
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
        page: Page,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let mut rows = self.selected(filter);
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.employee_id.cmp(&b.employee_id)));

        Ok(rows
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .filter_map(StoredRow::to_record)
            .collect())
    }

    async fn find_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        let Some(row) = inner
            .rows
            .iter()
            .find(|r| r.employee_id == employee_id && r.date == date)
        else {
            return Ok(None);
        };

        row.to_record()
            .map(Some)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown status '{}'", row.status).into()))
    }

    async fn insert_check_in(&self, check_in: &NewCheckIn) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let point = CheckPoint {
            time: check_in.at,
            location: Some(check_in.location),
        };

        if let Some(row) = inner
            .rows
            .iter_mut()
            .find(|r| r.employee_id == check_in.employee_id && r.date == check_in.date)
        {
            if row.check_in.is_some() {
                return Ok(false);
            }
            row.status = check_in.status.to_string();
            row.check_in = Some(point);
            return Ok(true);
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(StoredRow {
            id,
            employee_id: check_in.employee_id,
            date: check_in.date,
            status: check_in.status.to_string(),
            check_in: Some(point),
            check_out: None,
            working_minutes: 0,
            overtime_minutes: 0,
        });
        Ok(true)
    }

    async fn update_check_out(&self, check_out: &NewCheckOut) -> Result<u64, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Some(row) = inner.rows.iter_mut().find(|r| {
            r.employee_id == check_out.employee_id
                && r.date == check_out.date
                && r.check_in.is_some()
                && r.check_out.is_none()
        }) else {
            return Ok(0);
        };

        row.check_out = Some(CheckPoint {
            time: check_out.at,
            location: check_out.location,
        });
        row.working_minutes = check_out.working_minutes;
        row.overtime_minutes = check_out.overtime_minutes;
        Ok(1)
    }
}

/// Store whose every call fails, for exercising the 500 path.
pub struct FailingStore;

#[async_trait]
impl AttendanceStore for FailingStore {
    async fn department_headcount(&self, _: u64) -> Result<u64, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn status_tallies(&self, _: &DateRange, _: &Scope) -> Result<Vec<StatusTally>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn daily_tallies(&self, _: &DateRange, _: &Scope) -> Result<Vec<DailyTally>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn employee_tallies(
        &self,
        _: &DateRange,
        _: &Scope,
    ) -> Result<Vec<EmployeeTally>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn record_tallies(&self, _: &RecordFilter) -> Result<Vec<StatusTally>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn list_records(&self, _: &RecordFilter, _: Page) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn find_for_day(
        &self,
        _: u64,
        _: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn insert_check_in(&self, _: &NewCheckIn) -> Result<bool, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn update_check_out(&self, _: &NewCheckOut) -> Result<u64, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }
}
