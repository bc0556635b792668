use crate::api::attendance::{
    AttendanceFilter, AttendanceListResponse, AttendanceStats, CheckInRequest, CheckOutRequest,
    LocationPayload, MyAttendance, MyAttendanceFilter, MyAttendanceResponse,
};
use crate::api::report::{AttendanceReportResponse, EmployeeReportResponse};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, CheckPoint, GeoPoint};
use crate::report::ReportRequest;
use crate::report::assemble::{AttendanceReport, Kpis};
use crate::report::employee::{EmployeeSummary, PersonalSummary};
use crate::report::series::DailySeriesRow;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Reports API",
        version = "1.0.0",
        description = r#"
## Attendance Reports

Attendance KPIs, per-day breakdowns and report exports for the HRM system.

### 🔹 Key Features
- **Attendance Report**
  - Present / absent / late totals and attendance rate for a date range
  - Optional department filter
  - Day-by-day series, ascending by date
- **Exports**
  - The daily series as CSV, Excel or PDF
- **Employee Summary**
  - Per-employee present / absent / late days, working and overtime minutes
- **Attendance Tracking**
  - Daily check-in and check-out with location, lateness and overtime
  - Admin listing with status counts, and each employee's own history

### 🔐 Security
Endpoints are protected using **JWT Bearer authentication**.
Reports are restricted to **Admin** and **HR**.

### 📦 Response Format
`{ "success": true, "data": ... }` on success and
`{ "success": false, "message": ... }` on failure.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::report::attendance_report,
        crate::api::report::export_attendance_report,
        crate::api::report::employee_report,

        crate::api::attendance::list_attendance,
        crate::api::attendance::my_attendance,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out
    ),
    components(
        schemas(
            ReportRequest,
            AttendanceReportResponse,
            AttendanceReport,
            Kpis,
            DailySeriesRow,
            EmployeeReportResponse,
            EmployeeSummary,
            AttendanceStatus,
            AttendanceRecord,
            CheckPoint,
            GeoPoint,
            AttendanceFilter,
            AttendanceStats,
            AttendanceListResponse,
            MyAttendanceFilter,
            MyAttendance,
            MyAttendanceResponse,
            PersonalSummary,
            CheckInRequest,
            CheckOutRequest,
            LocationPayload
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Reports", description = "Attendance reporting and export APIs"),
        (name = "Attendance", description = "Attendance tracking APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
