use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ReportError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, GeoPoint, overtime_minutes, working_minutes,
};
use crate::report::aggregate::aggregate_totals;
use crate::report::employee::{PersonalSummary, personal_summary};
use crate::report::present;
use crate::report::range::DateRange;
use crate::store::{AttendanceStore, NewCheckIn, NewCheckOut, Page, RecordFilter};
use crate::utils::report_cache::ReportCache;

/// GeoJSON-style point as sent by the clients.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationPayload {
    #[serde(rename = "type")]
    #[schema(example = "Point")]
    pub kind: String,
    /// `[longitude, latitude]`
    #[schema(example = json!([90.4125, 23.8103]))]
    pub coordinates: Vec<f64>,
}

impl LocationPayload {
    fn to_point(&self) -> Option<GeoPoint> {
        if self.kind.trim().is_empty() {
            return None;
        }
        match self.coordinates[..] {
            [lng, lat] if (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat) => {
                Some(GeoPoint { lng, lat })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckInRequest {
    pub location: Option<LocationPayload>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckOutRequest {
    pub location: Option<LocationPayload>,
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "success": false,
        "message": message
    }))
}

fn store_failure(e: sqlx::Error, config: &Config) -> actix_web::Error {
    error!(error = %e, "Attendance store failed");
    ReportError::Store(e).in_env(config).into()
}

async fn record_check_in(
    store: &dyn AttendanceStore,
    cache: &dyn ReportCache,
    config: &Config,
    employee_id: u64,
    location: Option<&LocationPayload>,
    now: DateTime<Utc>,
) -> actix_web::Result<HttpResponse> {
    let Some(location) = location.and_then(LocationPayload::to_point) else {
        return Ok(bad_request("Location is required (type & coordinates)"));
    };

    let status = AttendanceStatus::for_check_in(now, config.work_start_hour);
    let check_in = NewCheckIn {
        employee_id,
        date: now.date_naive(),
        at: now,
        location,
        status,
    };

    let created = store
        .insert_check_in(&check_in)
        .await
        .map_err(|e| store_failure(e, config))?;
    if !created {
        return Ok(bad_request("Already checked in today"));
    }

    cache.invalidate_all().await;
    info!(employee_id, %status, "Checked in");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Check-in successful",
        "data": {
            "date": check_in.date,
            "status": status,
            "checkIn": { "time": now, "location": location }
        }
    })))
}

async fn record_check_out(
    store: &dyn AttendanceStore,
    cache: &dyn ReportCache,
    config: &Config,
    employee_id: u64,
    location: Option<&LocationPayload>,
    now: DateTime<Utc>,
) -> actix_web::Result<HttpResponse> {
    let today = now.date_naive();
    let record = store
        .find_for_day(employee_id, today)
        .await
        .map_err(|e| store_failure(e, config))?;

    let Some(check_in) = record.as_ref().and_then(|r| r.check_in.as_ref()) else {
        return Ok(bad_request("No check-in record found for today"));
    };
    if record.as_ref().is_some_and(|r| r.check_out.is_some()) {
        return Ok(bad_request("Already checked out today"));
    }

    let working = working_minutes(check_in.time, now);
    let overtime = overtime_minutes(working, config.standard_work_minutes);

    let updated = store
        .update_check_out(&NewCheckOut {
            employee_id,
            date: today,
            at: now,
            location: location.and_then(LocationPayload::to_point),
            working_minutes: working,
            overtime_minutes: overtime,
        })
        .await
        .map_err(|e| store_failure(e, config))?;

    // Lost a race with a concurrent check-out.
    if updated == 0 {
        return Ok(bad_request("Already checked out today"));
    }

    cache.invalidate_all().await;
    info!(employee_id, working, overtime, "Checked out");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Check-out successful",
        "data": {
            "date": today,
            "workingMinutes": working,
            "overtimeMinutes": overtime
        }
    })))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "success": true,
            "message": "Check-in successful"
        })),
        (status = 400, description = "Missing location or already checked in today", body = Object, example = json!({
            "success": false,
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "check_in", skip_all, fields(user_id = auth.user_id, user = %auth.username))]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    cache: web::Data<dyn ReportCache>,
    config: web::Data<Config>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;

    record_check_in(
        store.get_ref(),
        cache.get_ref(),
        &config,
        employee_id,
        payload.location.as_ref(),
        Utc::now(),
    )
    .await
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body(content = CheckOutRequest, description = "Optional check-out location"),
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "success": true,
            "message": "Check-out successful",
            "data": { "date": "2025-01-01", "workingMinutes": 495, "overtimeMinutes": 15 }
        })),
        (status = 400, description = "No check-in today or already checked out", body = Object, example = json!({
            "success": false,
            "message": "No check-in record found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "check_out", skip_all, fields(user_id = auth.user_id, user = %auth.username))]
pub async fn check_out(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    cache: web::Data<dyn ReportCache>,
    config: web::Data<Config>,
    payload: Option<web::Json<CheckOutRequest>>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let location = payload.as_ref().and_then(|p| p.location.as_ref());

    record_check_out(
        store.get_ref(),
        cache.get_ref(),
        &config,
        employee_id,
        location,
        Utc::now(),
    )
    .await
}

/// Query string of the admin attendance list.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilter {
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    #[schema(example = 10)]
    /// Items per page, at most 100
    pub per_page: Option<u64>,
    #[schema(example = 7)]
    /// Filter by employee ID
    pub employee: Option<u64>,
    #[schema(example = "late")]
    /// present | absent | late
    pub status: Option<String>,
    #[schema(example = "2025-01-01", format = "date", value_type = String)]
    /// Single day; wins over startDate/endDate. Defaults to today.
    pub date: Option<String>,
    #[serde(rename = "startDate")]
    #[schema(example = "2025-01-01", format = "date", value_type = String)]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    #[schema(example = "2025-01-31", format = "date", value_type = String)]
    pub end_date: Option<String>,
}

/// Query string of the own-attendance view.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MyAttendanceFilter {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    #[schema(example = 10)]
    pub per_page: Option<u64>,
    #[serde(rename = "startDate")]
    #[schema(example = "2025-01-01", format = "date", value_type = String)]
    /// Defaults to the first of the current month
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    #[schema(example = "2025-01-31", format = "date", value_type = String)]
    /// Defaults to today
    pub end_date: Option<String>,
}

/// Status counts over the listed range; `total` honours the status filter.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceStats {
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub total: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceListResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: Vec<AttendanceRecord>,
    pub stats: AttendanceStats,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyAttendance {
    pub summary: PersonalSummary,
    pub history: Vec<AttendanceRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyAttendanceResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: MyAttendance,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

/// `(page, per_page, window)`: page from 1, at most 100 per page.
fn paginate(page: Option<u64>, per_page: Option<u64>) -> (u64, u64, Page) {
    let per_page = per_page.unwrap_or(10).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;
    (page, per_page, Page { limit: per_page, offset })
}

fn listing_range(filter: &AttendanceFilter, today: NaiveDate) -> Result<DateRange, ReportError> {
    if let Some(day) = present(&filter.date) {
        return DateRange::parse(day, day);
    }
    match (present(&filter.start_date), present(&filter.end_date)) {
        (Some(start), Some(end)) => DateRange::parse(start, end),
        _ => Ok(DateRange::single_day(today)),
    }
}

fn status_filter(raw: &Option<String>) -> Result<Option<AttendanceStatus>, ReportError> {
    present(raw)
        .map(|s| AttendanceStatus::normalize(s).ok_or_else(|| ReportError::InvalidStatus(s.to_string())))
        .transpose()
}

fn listing_failure(e: ReportError, config: &Config) -> actix_web::Error {
    if e.status().is_server_error() {
        error!(error = %e, cause = ?e, "Attendance listing failed");
    } else {
        info!(error = %e, "Attendance listing rejected");
    }
    e.in_env(config).into()
}

async fn attendance_page(
    store: &dyn AttendanceStore,
    filter: &AttendanceFilter,
    today: NaiveDate,
) -> Result<AttendanceListResponse, ReportError> {
    let selection = RecordFilter {
        range: listing_range(filter, today)?,
        employee_id: filter.employee,
        status: status_filter(&filter.status)?,
    };
    let unfiltered = RecordFilter {
        status: None,
        ..selection
    };
    let (page, per_page, window) = paginate(filter.page, filter.per_page);

    let (data, tallies) = futures::try_join!(
        store.list_records(&selection, window),
        store.record_tallies(&unfiltered),
    )?;

    let totals = aggregate_totals(&tallies);
    let total = match selection.status {
        Some(status) => totals.count(status),
        None => totals.total,
    };
    debug!(rows = data.len(), total, "Attendance page loaded");

    Ok(AttendanceListResponse {
        success: true,
        data,
        stats: AttendanceStats {
            present: totals.present,
            absent: totals.absent,
            late: totals.late,
            total,
        },
        page,
        per_page,
        total,
    })
}

async fn my_attendance_page(
    store: &dyn AttendanceStore,
    employee_id: u64,
    filter: &MyAttendanceFilter,
    today: NaiveDate,
) -> Result<MyAttendanceResponse, ReportError> {
    let range = match (present(&filter.start_date), present(&filter.end_date)) {
        (Some(start), Some(end)) => DateRange::parse(start, end)?,
        _ => DateRange::month_to_date(today),
    };
    let selection = RecordFilter {
        range,
        employee_id: Some(employee_id),
        status: None,
    };

    // At most one record per day.
    let everything = Page {
        limit: range.days().count() as u64,
        offset: 0,
    };
    let records = store.list_records(&selection, everything).await?;
    let summary = personal_summary(&range, &records);

    let (page, per_page, window) = paginate(filter.page, filter.per_page);
    let total = records.len() as u64;
    let history = records
        .into_iter()
        .skip(window.offset as usize)
        .take(window.limit as usize)
        .collect();

    Ok(MyAttendanceResponse {
        success: true,
        data: MyAttendance { summary, history },
        page,
        per_page,
        total,
    })
}

/// Attendance records with status counts (admin)
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse),
        (status = 400, description = "Invalid date or status filter", body = Object, example = json!({
            "success": false,
            "message": "Invalid status. Use present | absent | late"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "list_attendance", skip_all, fields(user_id = auth.user_id, user = %auth.username))]
pub async fn list_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    config: web::Data<Config>,
    query: web::Query<AttendanceFilter>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;

    let page = attendance_page(store.get_ref(), &query, Utc::now().date_naive())
        .await
        .map_err(|e| listing_failure(e, &config))?;
    Ok(HttpResponse::Ok().json(page))
}

/// Own attendance history with a working-day summary
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(MyAttendanceFilter),
    responses(
        (status = 200, description = "Summary and paginated history", body = MyAttendanceResponse),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "my_attendance", skip_all, fields(user_id = auth.user_id, user = %auth.username))]
pub async fn my_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    config: web::Data<Config>,
    query: web::Query<MyAttendanceFilter>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;

    let page = my_attendance_page(store.get_ref(), employee_id, &query, Utc::now().date_naive())
        .await
        .map_err(|e| listing_failure(e, &config))?;
    Ok(HttpResponse::Ok().json(page))
}
