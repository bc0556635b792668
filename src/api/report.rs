use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ReportError;
use crate::report::assemble::AttendanceReport;
use crate::report::employee::{EmployeeSummary, generate_employee_report};
use crate::report::export::{ExportFormat, csv_stream, render_pdf, render_workbook};
use crate::report::{ReportQuery, ReportRequest, generate_attendance_report};
use crate::store::AttendanceStore;
use crate::utils::report_cache::ReportCache;

#[derive(Serialize, ToSchema)]
pub struct AttendanceReportResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: AttendanceReport,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeReportResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: Vec<EmployeeSummary>,
}

/// Serves from the cache when possible, otherwise runs the pipeline and
/// remembers the result.
async fn load_report(
    store: &dyn AttendanceStore,
    cache: &dyn ReportCache,
    query: &ReportQuery,
) -> Result<Arc<AttendanceReport>, ReportError> {
    let key = query.cache_key();
    if let Some(hit) = cache.get(&key).await {
        debug!(key = %key, "Report cache hit");
        return Ok(hit);
    }

    let report = Arc::new(generate_attendance_report(store, query).await?);
    cache.set(key, report.clone()).await;
    Ok(report)
}

fn log_failure(err: &ReportError) {
    if err.status().is_server_error() {
        error!(error = %err, cause = ?err, "Attendance report failed");
    } else {
        info!(error = %err, "Attendance report request rejected");
    }
}

/// Attendance KPIs and daily series for a date range
#[utoipa::path(
    post,
    path = "/api/reports/attendance",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report generated", body = AttendanceReportResponse),
        (status = 400, description = "Missing or invalid date range", body = Object, example = json!({
            "success": false,
            "message": "startDate and endDate are required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "success": false,
            "message": "Server error"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
#[instrument(name = "attendance_report", skip_all, fields(user_id = auth.user_id, user = %auth.username))]
pub async fn attendance_report(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    cache: web::Data<dyn ReportCache>,
    config: web::Data<Config>,
    payload: web::Json<ReportRequest>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let result = match payload.validate() {
        Ok(query) => load_report(store.get_ref(), cache.get_ref(), &query).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => Ok(HttpResponse::Ok().json(AttendanceReportResponse {
            success: true,
            data: AttendanceReport::clone(&report),
        })),
        Err(e) => {
            log_failure(&e);
            Err(e.in_env(&config).into())
        }
    }
}

/// Per-employee attendance summary for a date range
#[utoipa::path(
    get,
    path = "/api/attendance/reports",
    params(ReportRequest),
    responses(
        (status = 200, description = "One row per employee with records in range", body = EmployeeReportResponse),
        (status = 400, description = "Missing or invalid date range", body = Object, example = json!({
            "success": false,
            "message": "startDate and endDate are required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
#[instrument(name = "employee_report", skip_all, fields(user_id = auth.user_id, user = %auth.username))]
pub async fn employee_report(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    config: web::Data<Config>,
    query: web::Query<ReportRequest>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let result = match query.validate() {
        Ok(query) => generate_employee_report(store.get_ref(), &query).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(rows) => {
            debug!(employees = rows.len(), "Employee report generated");
            Ok(HttpResponse::Ok().json(EmployeeReportResponse {
                success: true,
                data: rows,
            }))
        }
        Err(e) => {
            log_failure(&e);
            Err(e.in_env(&config).into())
        }
    }
}

/// Download the daily series as csv, excel or pdf
#[utoipa::path(
    post,
    path = "/api/reports/attendance/export/{format}",
    request_body = ReportRequest,
    params(
        ("format", Path, description = "One of csv | excel | pdf")
    ),
    responses(
        (status = 200, description = "Report file", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid format or date range", body = Object, example = json!({
            "success": false,
            "message": "Invalid format. Use csv | excel | pdf"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Export failed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
#[instrument(name = "export_attendance_report", skip_all, fields(user_id = auth.user_id, user = %auth.username, format = %path))]
pub async fn export_attendance_report(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    cache: web::Data<dyn ReportCache>,
    config: web::Data<Config>,
    path: web::Path<String>,
    payload: web::Json<ReportRequest>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let fail = |e: ReportError| -> actix_web::Error {
        log_failure(&e);
        e.in_env(&config).into()
    };

    let format = ExportFormat::parse(&path).map_err(fail)?;
    let query = payload.validate().map_err(fail)?;
    let report = load_report(store.get_ref(), cache.get_ref(), &query)
        .await
        .map_err(fail)?;
    let series = report.series.clone();

    let filename = query.export_filename(format.extension());
    info!(rows = series.len(), filename = %filename, "Exporting attendance report");

    let mut response = HttpResponse::Ok();
    response
        .content_type(format.content_type())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        });

    let body = match format {
        ExportFormat::Csv => return Ok(response.streaming(csv_stream(series))),
        ExportFormat::Excel => web::block(move || render_workbook(&series)).await,
        ExportFormat::Pdf => web::block(move || render_pdf(&series)).await,
    };

    let bytes = body
        .map_err(|e| fail(ReportError::Render(e.to_string())))?
        .map_err(fail)?;
    Ok(response.body(bytes))
}
