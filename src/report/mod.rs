//! Attendance report pipeline.
//!
//! `ReportRequest` is validated into a [`ReportQuery`], the department filter
//! is resolved to a [`scope::Scope`], the totals and the per-day series are
//! queried concurrently, and [`assemble::assemble`] combines them into the
//! response. Exports consume only the series. [`employee`] reuses the same
//! query and scope for per-employee summaries.

pub mod aggregate;
pub mod assemble;
pub mod employee;
pub mod export;
pub mod range;
pub mod scope;
pub mod series;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::error::ReportError;
use crate::store::AttendanceStore;
use aggregate::aggregate_totals;
use assemble::{AttendanceReport, assemble};
use range::DateRange;
use scope::resolve_scope;
use series::build_series;

/// Body of the report and export endpoints, query string of the
/// per-employee report.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[schema(example = "2025-01-01", format = "date", value_type = String)]
    pub start_date: Option<String>,

    #[schema(example = "2025-01-31", format = "date", value_type = String)]
    pub end_date: Option<String>,

    /// Department to restrict the report to; number or numeric string.
    #[serde(default, deserialize_with = "deserialize_department_id")]
    #[schema(example = 10, value_type = Option<u64>)]
    pub department_id: Option<u64>,
}

fn deserialize_department_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("departmentId must be a positive integer")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("departmentId must be a numeric id")),
        _ => Err(serde::de::Error::custom("departmentId must be a numeric id")),
    }
}

/// Trimmed value, `None` when missing or blank.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ReportRequest {
    pub fn validate(&self) -> Result<ReportQuery, ReportError> {
        let (Some(start), Some(end)) = (present(&self.start_date), present(&self.end_date)) else {
            return Err(ReportError::MissingRange);
        };

        Ok(ReportQuery {
            range: DateRange::parse(start, end)?,
            department_id: self.department_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    pub range: DateRange,
    pub department_id: Option<u64>,
}

impl ReportQuery {
    pub fn cache_key(&self) -> String {
        let department = self
            .department_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "all".to_string());

        format!(
            "attendance:{}:{}:{}",
            self.range.first_day(),
            self.range.last_day(),
            department
        )
    }

    /// `attendance_report_<start>_to_<end>.<ext>`
    pub fn export_filename(&self, extension: &str) -> String {
        format!(
            "attendance_report_{}_to_{}.{}",
            self.range.first_day(),
            self.range.last_day(),
            extension
        )
    }
}

#[instrument(skip(store), fields(start = %query.range.first_day(), end = %query.range.last_day()))]
pub async fn generate_attendance_report(
    store: &dyn AttendanceStore,
    query: &ReportQuery,
) -> Result<AttendanceReport, ReportError> {
    let scope = resolve_scope(store, query.department_id).await?;

    if scope.matches_nothing() {
        debug!("Department has no employees; returning an empty report");
        return Ok(assemble(Default::default(), Vec::new(), &scope));
    }

    let (status_tallies, daily_tallies) = futures::try_join!(
        store.status_tallies(&query.range, &scope),
        store.daily_tallies(&query.range, &scope),
    )?;

    let totals = aggregate_totals(&status_tallies);
    let series = build_series(&daily_tallies);
    debug!(total = totals.total, days = series.len(), "Attendance report generated");

    Ok(assemble(totals, series, &scope))
}
