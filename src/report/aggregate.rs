use crate::model::attendance::AttendanceStatus;
use crate::store::StatusTally;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateTotals {
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub total: u64,
}

impl AggregateTotals {
    pub fn count(&self, status: AttendanceStatus) -> u64 {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Absent => self.absent,
            AttendanceStatus::Late => self.late,
        }
    }

    /// Share of `present` records in percent, rounded to two decimals.
    /// Late records are counted separately and do not contribute.
    pub fn average_attendance(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        round2(self.present as f64 / self.total as f64 * 100.0)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn aggregate_totals(tallies: &[StatusTally]) -> AggregateTotals {
    tallies
        .iter()
        .fold(AggregateTotals::default(), |mut acc, tally| {
            match tally.status {
                AttendanceStatus::Present => acc.present += tally.count,
                AttendanceStatus::Absent => acc.absent += tally.count,
                AttendanceStatus::Late => acc.late += tally.count,
            }
            acc.total += tally.count;
            acc
        })
}
