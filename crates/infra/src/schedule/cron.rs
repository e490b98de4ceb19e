//! Crontab expressions.
//!
//! Jobs are configured with classic 5-field crontab lines
//! (`minute hour day-of-month month day-of-week`). The `cron` crate expects a
//! leading seconds field and numbers weekdays 1-7 from Sunday, so 5-field
//! input is rewritten before parsing: seconds pinned to 0 and weekday
//! numerals (0-7, both 0 and 7 meaning Sunday) replaced by names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ::cron::Schedule;
use thiserror::Error;

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CronError {
    #[error("expected 5 fields (or 6/7 with seconds), got {0}")]
    FieldCount(usize),

    #[error("day of week {0:?} is out of range 0-7")]
    DayOfWeek(String),

    #[error("invalid cron expression {expr:?}: {reason}")]
    Invalid { expr: String, reason: String },
}

/// A parsed schedule plus the expression it came from.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let trimmed = expression.trim();
        let fields: Vec<&str> = trimmed.split_whitespace().collect();

        let normalized = match fields.len() {
            5 => {
                let weekday = translate_weekdays(fields[4])?;
                format!("0 {} {} {} {} {}", fields[0], fields[1], fields[2], fields[3], weekday)
            }
            6 | 7 => fields.join(" "),
            n => return Err(CronError::FieldCount(n)),
        };

        let schedule = Schedule::from_str(&normalized).map_err(|e| CronError::Invalid {
            expr: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }
}

impl FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

fn translate_weekdays(field: &str) -> Result<String, CronError> {
    let items = field
        .split(',')
        .map(translate_weekday_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(","))
}

/// Numeric ranges, steps and single values expand to an explicit list of
/// names (`1-7/2` is `MON,WED,FRI,SUN`); 7 folds onto Sunday. Name-based
/// items are left for the cron parser.
fn translate_weekday_item(item: &str) -> Result<String, CronError> {
    let out_of_range = || CronError::DayOfWeek(item.to_string());

    let (range, step) = match item.split_once('/') {
        Some((range, step)) => {
            let step = step
                .parse::<usize>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(out_of_range)?;
            (range, Some(step))
        }
        None => (item, None),
    };

    let bounds = match range.split_once('-') {
        Some((start, end)) => numeral(start).zip(numeral(end)),
        None if range == "*" || range == "?" => {
            if step.is_none() {
                return Ok(range.to_string());
            }
            Some((0, 6))
        }
        // `n/s` runs from n through the end of the week.
        None => numeral(range).map(|n| (n, if step.is_some() { 7 } else { n })),
    };

    let Some((start, end)) = bounds else {
        return Ok(item.to_string());
    };
    if end > 7 || start > end {
        return Err(out_of_range());
    }

    let mut days: Vec<&str> = Vec::new();
    for day in (start..=end).step_by(step.unwrap_or(1)) {
        let name = WEEKDAYS[day % 7];
        if !days.contains(&name) {
            days.push(name);
        }
    }
    Ok(days.join(","))
}

fn numeral(token: &str) -> Option<usize> {
    token.parse().ok()
}
