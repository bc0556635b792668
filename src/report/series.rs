use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceStatus;
use crate::store::DailyTally;

/// One calendar day of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "date": "2025-01-01",
    "Present": 1,
    "Absent": 1,
    "Late": 0,
    "Total": 2
}))]
pub struct DailySeriesRow {
    #[serde(serialize_with = "serialize_day")]
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(rename = "Present")]
    pub present: u64,
    #[serde(rename = "Absent")]
    pub absent: u64,
    #[serde(rename = "Late")]
    pub late: u64,
    #[serde(rename = "Total")]
    pub total: u64,
}

fn serialize_day<S: serde::Serializer>(day: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&day.format("%Y-%m-%d").to_string())
}

impl DailySeriesRow {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            present: 0,
            absent: 0,
            late: 0,
            total: 0,
        }
    }

    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Field values in export column order: date, Present, Absent, Late, Total.
    pub fn fields(&self) -> [String; 5] {
        [
            self.iso_date(),
            self.present.to_string(),
            self.absent.to_string(),
            self.late.to_string(),
            self.total.to_string(),
        ]
    }
}

/// Column names shared by every export format.
pub const SERIES_FIELDS: [&str; 5] = ["date", "Present", "Absent", "Late", "Total"];

/// Buckets tallies per day; rows come out strictly ascending by date.
pub fn build_series(tallies: &[DailyTally]) -> Vec<DailySeriesRow> {
    let mut days: BTreeMap<NaiveDate, DailySeriesRow> = BTreeMap::new();

    for tally in tallies {
        let row = days
            .entry(tally.date)
            .or_insert_with(|| DailySeriesRow::empty(tally.date));

        match tally.status {
            AttendanceStatus::Present => row.present += tally.count,
            AttendanceStatus::Absent => row.absent += tally.count,
            AttendanceStatus::Late => row.late += tally.count,
        }
        row.total += tally.count;
    }

    days.into_values().collect()
}
