use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;

/// Largest interval the minute field of a cron expression can express as a step.
pub const MAX_INTERVAL_MINUTES: u32 = 59;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("polling interval must be between 1 and {max} minutes, got {0}", max = MAX_INTERVAL_MINUTES)]
    IntervalOutOfRange(u32),
    #[error("invalid cron expression `{expression}`: {reason}")]
    InvalidExpression { expression: String, reason: String },
}

/// A validated "every N minutes" recurrence.
///
/// The public form is the classic five-field expression (`*/N * * * *`). The `cron` crate
/// expects a leading seconds field, so the parsed schedule pins seconds to zero.
#[derive(Debug, Clone)]
pub struct TriggerSpec {
    expression: String,
    schedule: Schedule,
}

impl TriggerSpec {
    pub fn every_minutes(interval_minutes: u32) -> Result<Self, TriggerError> {
        if interval_minutes == 0 || interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(TriggerError::IntervalOutOfRange(interval_minutes));
        }
        Self::parse(&format!("*/{} * * * *", interval_minutes))
    }

    fn parse(expression: &str) -> Result<Self, TriggerError> {
        let fields = expression.split_whitespace().count();
        if fields != 5 {
            return Err(TriggerError::InvalidExpression {
                expression: expression.to_string(),
                reason: format!("expected 5 fields, found {}", fields),
            });
        }

        let schedule = Schedule::from_str(&format!("0 {}", expression)).map_err(|e| {
            TriggerError::InvalidExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Next slot after the last firing that is still ahead of `now`. Slots missed while the
    /// timer was stalled are skipped, not replayed.
    pub fn next_due(&self, last_fire: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_after(last_fire.max(now))
    }
}
