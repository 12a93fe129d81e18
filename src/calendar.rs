//! Holiday/workday oracle boundary.

use async_trait::async_trait;
use chrono::NaiveDate;

/// Answers "is this date a workday" from an external calendar.
#[async_trait]
pub trait WorkdayOracle: Send + Sync {
    async fn is_workday(&self, date: NaiveDate) -> bool;
}

/// Oracle that treats every date as a workday. Useful for tests and for
/// deployments without a holiday calendar.
pub struct EveryDayWorkday;

#[async_trait]
impl WorkdayOracle for EveryDayWorkday {
    async fn is_workday(&self, _date: NaiveDate) -> bool {
        true
    }
}
