use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::QueryAs;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, warn};

use super::{
    AttendanceStore, DailyTally, EmployeeTally, NewCheckIn, NewCheckOut, Page, RawEmployeeRow,
    RecordFilter, StatusTally, normalize_daily_rows, normalize_employee_rows,
    normalize_status_rows, to_count,
};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, CheckPoint, GeoPoint};
use crate::report::range::DateRange;
use crate::report::scope::Scope;

/// MySQL-backed store.
///
/// Expected tables:
///
/// ```sql
/// CREATE TABLE attendance (
///     id               BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
///     employee_id      BIGINT UNSIGNED NOT NULL,
///     date             DATE NOT NULL,
///     status           VARCHAR(16) NOT NULL,
///     check_in         DATETIME NULL,
///     check_in_lng     DOUBLE NULL,
///     check_in_lat     DOUBLE NULL,
///     check_out        DATETIME NULL,
///     check_out_lng    DOUBLE NULL,
///     check_out_lat    DOUBLE NULL,
///     working_minutes  BIGINT NOT NULL DEFAULT 0,
///     overtime_minutes BIGINT NOT NULL DEFAULT 0,
///     UNIQUE KEY uq_attendance_employee_day (employee_id, date)
/// );
/// ```
///
/// plus `employees(id BIGINT UNSIGNED, first_name, last_name, department_id BIGINT UNSIGNED, ...)`.
/// DATETIME columns hold UTC.
#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    status: String,
    check_in: Option<NaiveDateTime>,
    check_in_lng: Option<f64>,
    check_in_lat: Option<f64>,
    check_out: Option<NaiveDateTime>,
    check_out_lng: Option<f64>,
    check_out_lat: Option<f64>,
    working_minutes: i64,
    overtime_minutes: i64,
}

fn check_point(
    time: Option<NaiveDateTime>,
    lng: Option<f64>,
    lat: Option<f64>,
) -> Option<CheckPoint> {
    time.map(|t| CheckPoint {
        time: t.and_utc(),
        location: match (lng, lat) {
            (Some(lng), Some(lat)) => Some(GeoPoint { lng, lat }),
            _ => None,
        },
    })
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = sqlx::Error;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::normalize(&row.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown attendance status '{}'", row.status).into())
        })?;

        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            status,
            check_in: check_point(row.check_in, row.check_in_lng, row.check_in_lat),
            check_out: check_point(row.check_out, row.check_out_lng, row.check_out_lat),
            working_minutes: row.working_minutes,
            overtime_minutes: row.overtime_minutes,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    Day(NaiveDate),
    U64(u64),
    Str(String),
}

type MySqlQueryAs<'q, O> = QueryAs<'q, MySql, O, MySqlArguments>;

fn bind_filters<'q, O>(mut query: MySqlQueryAs<'q, O>, args: Vec<FilterValue>) -> MySqlQueryAs<'q, O> {
    for arg in args {
        query = match arg {
            FilterValue::Day(v) => query.bind(v),
            FilterValue::U64(v) => query.bind(v),
            FilterValue::Str(s) => query.bind(s),
        };
    }
    query
}

/// `WHERE` fragment shared by the report queries. Department membership is
/// resolved inside the statement so the bind count stays fixed.
fn report_filter(range: &DateRange, scope: &Scope) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE date BETWEEN ? AND ?");
    let mut args = vec![
        FilterValue::Day(range.first_day()),
        FilterValue::Day(range.last_day()),
    ];

    if let Scope::Department { department_id, .. } = scope {
        where_sql.push_str(" AND employee_id IN (SELECT id FROM employees WHERE department_id = ?)");
        args.push(FilterValue::U64(*department_id));
    }

    (where_sql, args)
}

fn record_filter(filter: &RecordFilter) -> (String, Vec<FilterValue>) {
    let (mut where_sql, mut args) = report_filter(&filter.range, &Scope::All);

    if let Some(employee_id) = filter.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }

    if let Some(status) = filter.status {
        where_sql.push_str(" AND LOWER(status) = ?");
        args.push(FilterValue::Str(status.to_string()));
    }

    (where_sql, args)
}

const RECORD_COLUMNS: &str = "id, employee_id, date, status, \
     check_in, check_in_lng, check_in_lat, \
     check_out, check_out_lng, check_out_lat, \
     working_minutes, overtime_minutes";

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn department_headcount(&self, department_id: u64) -> Result<u64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE department_id = ?")
            .bind(department_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(to_count(count))
    }

    async fn status_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<StatusTally>, sqlx::Error> {
        if scope.matches_nothing() {
            return Ok(Vec::new());
        }

        let (where_sql, args) = report_filter(range, scope);
        let sql = format!(
            "SELECT LOWER(status) AS status, COUNT(*) AS count FROM attendance{} GROUP BY LOWER(status)",
            where_sql
        );
        debug!(sql = %sql, "Counting attendance by status");

        let rows = bind_filters(sqlx::query_as::<_, (String, i64)>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        Ok(normalize_status_rows(rows))
    }

    async fn daily_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<DailyTally>, sqlx::Error> {
        if scope.matches_nothing() {
            return Ok(Vec::new());
        }

        let (where_sql, args) = report_filter(range, scope);
        let sql = format!(
            "SELECT date, LOWER(status) AS status, COUNT(*) AS count FROM attendance{} \
             GROUP BY date, LOWER(status) ORDER BY date",
            where_sql
        );
        debug!(sql = %sql, "Counting attendance by day");

        let rows = bind_filters(sqlx::query_as::<_, (NaiveDate, String, i64)>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        Ok(normalize_daily_rows(rows))
    }

    async fn employee_tallies(
        &self,
        range: &DateRange,
        scope: &Scope,
    ) -> Result<Vec<EmployeeTally>, sqlx::Error> {
        if scope.matches_nothing() {
            return Ok(Vec::new());
        }

        let (where_sql, args) = report_filter(range, scope);
        let sql = format!(
            r#"
            SELECT t.employee_id,
                   CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
                   t.status, t.count, t.working_minutes, t.overtime_minutes
            FROM (
                SELECT employee_id, LOWER(status) AS status, COUNT(*) AS count,
                       CAST(COALESCE(SUM(working_minutes), 0) AS SIGNED) AS working_minutes,
                       CAST(COALESCE(SUM(overtime_minutes), 0) AS SIGNED) AS overtime_minutes
                FROM attendance{}
                GROUP BY employee_id, LOWER(status)
            ) t
            LEFT JOIN employees e ON e.id = t.employee_id
            ORDER BY t.employee_id
            "#,
            where_sql
        );
        debug!(sql = %sql, "Summarizing attendance per employee");

        let rows = bind_filters(sqlx::query_as::<_, RawEmployeeRow>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        Ok(normalize_employee_rows(rows))
    }

    async fn record_tallies(&self, filter: &RecordFilter) -> Result<Vec<StatusTally>, sqlx::Error> {
        let (where_sql, args) = record_filter(filter);
        let sql = format!(
            "SELECT LOWER(status) AS status, COUNT(*) AS count FROM attendance{} GROUP BY LOWER(status)",
            where_sql
        );

        let rows = bind_filters(sqlx::query_as::<_, (String, i64)>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        Ok(normalize_status_rows(rows))
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
        page: Page,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let (where_sql, args) = record_filter(filter);
        let sql = format!(
            r#"
            SELECT {}
            FROM attendance
            {}
            ORDER BY date DESC, employee_id
            LIMIT ? OFFSET ?
            "#,
            RECORD_COLUMNS, where_sql
        );

        let rows = bind_filters(sqlx::query_as::<_, AttendanceRow>(&sql), args)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match AttendanceRecord::try_from(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping attendance row");
                    None
                }
            })
            .collect())
    }

    async fn find_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND date = ?",
            RECORD_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn insert_check_in(&self, check_in: &NewCheckIn) -> Result<bool, sqlx::Error> {
        // A row without a check-in (e.g. marked absent) is filled in first.
        // The connection reports matched rows, so ON DUPLICATE KEY UPDATE
        // cannot tell a fresh check-in from a repeated one.
        let filled = sqlx::query(
            r#"
            UPDATE attendance
            SET status = ?, check_in = ?, check_in_lng = ?, check_in_lat = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in IS NULL
            "#,
        )
        .bind(check_in.status.as_ref())
        .bind(check_in.at.naive_utc())
        .bind(check_in.location.lng)
        .bind(check_in.location.lat)
        .bind(check_in.employee_id)
        .bind(check_in.date)
        .execute(&self.pool)
        .await?;

        if filled.rows_affected() > 0 {
            return Ok(true);
        }

        // The unique (employee_id, date) key turns a repeat into a no-op.
        let inserted = sqlx::query(
            r#"
            INSERT IGNORE INTO attendance (employee_id, date, status, check_in, check_in_lng, check_in_lat)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(check_in.employee_id)
        .bind(check_in.date)
        .bind(check_in.status.as_ref())
        .bind(check_in.at.naive_utc())
        .bind(check_in.location.lng)
        .bind(check_in.location.lat)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() > 0)
    }

    async fn update_check_out(&self, check_out: &NewCheckOut) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, check_out_lng = ?, check_out_lat = ?,
                working_minutes = ?, overtime_minutes = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in IS NOT NULL
            AND check_out IS NULL
            "#,
        )
        .bind(check_out.at.naive_utc())
        .bind(check_out.location.map(|l| l.lng))
        .bind(check_out.location.map(|l| l.lat))
        .bind(check_out.working_minutes)
        .bind(check_out.overtime_minutes)
        .bind(check_out.employee_id)
        .bind(check_out.date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
