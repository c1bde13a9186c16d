use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

use crate::clock::{Clock, SystemClock};
use crate::dose::DoseUnit;
use crate::error::DoseError;

/// Timezone that defines "today" unless configured otherwise.
pub const REFERENCE_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y/%-m/%-d %-H:%M:%S";
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Calendar arithmetic relative to today in a fixed reference timezone, so the
/// result does not depend on the machine's local offset.
#[derive(Clone)]
pub struct DateProjector {
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DateProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateProjector").field("tz", &self.tz).finish()
    }
}

impl Default for DateProjector {
    fn default() -> Self {
        Self::new(REFERENCE_TIMEZONE)
    }
}

impl DateProjector {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.tz).date_naive()
    }

    /// Today as `YYYY-MM-DD`; also the earliest date the appointment field accepts.
    pub fn today_string(&self) -> String {
        self.today().format(DATE_FORMAT).to_string()
    }

    /// Current instant formatted for history records.
    pub fn now_display(&self) -> String {
        self.clock
            .now()
            .with_timezone(&self.tz)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    /// Whole days from today to `target`, negative when `target` is in the past.
    pub fn days_until(&self, target: &str) -> Result<i64, DoseError> {
        let target = parse_date(target)?;
        Ok(self.days_until_date(target))
    }

    pub fn days_until_date(&self, target: NaiveDate) -> i64 {
        // Both dates are anchored at UTC midnight so offset changes cannot skew the difference.
        let today = self.today().and_time(NaiveTime::MIN).and_utc();
        let target = target.and_time(NaiveTime::MIN).and_utc();
        let seconds = (target - today).num_seconds() as f64;
        (seconds / SECONDS_PER_DAY).round() as i64
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, DoseError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| DoseError::InvalidDate(trimmed.to_string()))
}

/// Doses needed to cover `days`. Partial weeks and 28-day months count as whole periods.
/// A product too large to represent is rejected like any other unusable amount.
pub fn project_dose(amount: f64, unit: DoseUnit, days: i64) -> Result<f64, DoseError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DoseError::InvalidAmount);
    }
    let periods = match unit {
        DoseUnit::Day => days as f64,
        DoseUnit::Week | DoseUnit::Month => (days as f64 / unit.period_days() as f64).ceil(),
    };
    let dose = amount * periods;
    if !dose.is_finite() {
        return Err(DoseError::InvalidAmount);
    }
    Ok(dose)
}
