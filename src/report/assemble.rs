use serde::Serialize;
use utoipa::ToSchema;

use super::aggregate::AggregateTotals;
use super::scope::{EmployeeScope, Scope};
use super::series::DailySeriesRow;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    #[schema(example = 50.0)]
    pub average_attendance: f64,
    #[schema(example = 2)]
    pub present_count: u64,
    #[schema(example = 1)]
    pub absent_count: u64,
    #[schema(example = 1)]
    pub late_count: u64,
    #[schema(example = 4)]
    pub total_marked: u64,
    /// `"All"` without a department filter, otherwise the department head count.
    #[schema(value_type = Object, example = "All")]
    pub employee_scope: EmployeeScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceReport {
    pub kpis: Kpis,
    pub series: Vec<DailySeriesRow>,
}

pub fn assemble(totals: AggregateTotals, series: Vec<DailySeriesRow>, scope: &Scope) -> AttendanceReport {
    AttendanceReport {
        kpis: Kpis {
            average_attendance: totals.average_attendance(),
            present_count: totals.present,
            absent_count: totals.absent,
            late_count: totals.late,
            total_marked: totals.total,
            employee_scope: EmployeeScope::from(scope),
        },
        series,
    }
}
