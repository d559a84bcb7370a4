//! Daily safety report

use crate::repository::HistoryRecord;
use chrono::NaiveDate;
use dms::AlertLevel;
use serde::{Deserialize, Serialize};

/// Points lost per danger-or-worse alert
const DANGER_PENALTY: u32 = 10;

/// Summary of one day's alert history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    /// Records at danger level or above
    pub danger_count: u32,
    pub warning_count: u32,
    pub total: u32,
    /// 100 minus 10 per danger alert, floored at 0
    pub safety_score: u32,
}

impl DailyReport {
    /// Summarize the records that fall on `date` (UTC)
    pub fn from_records<'a>(date: NaiveDate, records: impl IntoIterator<Item = &'a HistoryRecord>) -> Self {
        let mut report = Self {
            date,
            danger_count: 0,
            warning_count: 0,
            total: 0,
            safety_score: 100,
        };

        for record in records {
            if record.recorded_at.date_naive() != date {
                continue;
            }
            report.total += 1;
            match record.level {
                AlertLevel::Danger | AlertLevel::Sos => report.danger_count += 1,
                AlertLevel::Warning => report.warning_count += 1,
                _ => {}
            }
        }

        report.safety_score = 100u32.saturating_sub(DANGER_PENALTY.saturating_mul(report.danger_count));
        report
    }
}
