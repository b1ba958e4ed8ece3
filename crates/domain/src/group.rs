use super::errors::ResolveError;
use chrono::{NaiveTime, Weekday};
use std::str::FromStr;
use std::sync::Arc;

/// Group identifiers are interned strings shared across cache keys, policy
/// snapshots, and analytics events.
pub type GroupId = Arc<str>;

/// The implicit group every unassigned client belongs to. It always exists
/// and cannot be removed by configuration.
pub const DEFAULT_GROUP: &str = "default";

/// A scheduled-pause window compiled from its config form.
///
/// While a window is active, the group's blocklist is suspended entirely.
/// Windows may wrap midnight (`start > end` means "until `end` tomorrow").
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPause {
    /// Bitmask over `Weekday::num_days_from_monday()`. Empty input means
    /// every day.
    pub days: u8,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl CompiledPause {
    pub fn parse(days: &[String], start: &str, end: &str) -> Result<Self, ResolveError> {
        let mut mask = 0u8;
        for day in days {
            let wd = Weekday::from_str(day)
                .map_err(|_| ResolveError::Internal(format!("Invalid pause day: {}", day)))?;
            mask |= 1 << wd.num_days_from_monday();
        }
        if mask == 0 {
            mask = 0x7f;
        }
        let start = NaiveTime::parse_from_str(start, "%H:%M")
            .map_err(|e| ResolveError::Internal(format!("Invalid pause start '{}': {}", start, e)))?;
        let end = NaiveTime::parse_from_str(end, "%H:%M")
            .map_err(|e| ResolveError::Internal(format!("Invalid pause end '{}': {}", end, e)))?;
        Ok(Self {
            days: mask,
            start,
            end,
        })
    }

    #[inline]
    pub fn contains(&self, day: Weekday, time: NaiveTime) -> bool {
        if self.days & (1 << day.num_days_from_monday()) == 0 {
            return false;
        }
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            // Wraps midnight: active from start until end on the next day.
            time >= self.start || time < self.end
        }
    }
}
