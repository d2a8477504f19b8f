//! Schedule expressions for scheduled scaling

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// When a scheduled action fires
///
/// Wraps the engine's schedule expression syntax; constructors cover the
/// rate and cron forms, [`Schedule::expression`] passes raw syntax through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule(String);

impl Schedule {
    /// Raw schedule expression, passed through unchanged
    #[must_use]
    pub fn expression(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    /// Fire once every `interval`, rounded down to whole minutes
    #[must_use]
    pub fn rate(interval: Duration) -> Self {
        let minutes = (interval.as_secs() / 60).max(1);
        if minutes == 1 {
            Self("rate(1 minute)".to_owned())
        } else {
            Self(format!("rate({minutes} minutes)"))
        }
    }

    /// Cron schedule from individual fields
    ///
    /// Unset fields default to every value; when exactly one of `day` and
    /// `week_day` is set, the other renders as `?` as the cron syntax
    /// requires.
    #[must_use]
    pub fn cron(options: CronOptions) -> Self {
        let minute = options.minute.unwrap_or_else(|| "*".to_owned());
        let hour = options.hour.unwrap_or_else(|| "*".to_owned());
        let month = options.month.unwrap_or_else(|| "*".to_owned());
        let year = options.year.unwrap_or_else(|| "*".to_owned());
        let (day, week_day) = match (options.day, options.week_day) {
            (None, None) => ("*".to_owned(), "?".to_owned()),
            (Some(day), None) => (day, "?".to_owned()),
            (None, Some(week_day)) => ("?".to_owned(), week_day),
            (Some(day), Some(week_day)) => (day, week_day),
        };
        Self(format!("cron({minute} {hour} {day} {month} {week_day} {year})"))
    }

    /// Expression string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field values for [`Schedule::cron`]
#[derive(Debug, Clone, Default)]
pub struct CronOptions {
    /// Minute field, every minute by default
    pub minute: Option<String>,
    /// Hour field, every hour by default
    pub hour: Option<String>,
    /// Day-of-month field
    pub day: Option<String>,
    /// Month field, every month by default
    pub month: Option<String>,
    /// Day-of-week field
    pub week_day: Option<String>,
    /// Year field, every year by default
    pub year: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_defaults_every_minute() {
        assert_eq!(
            Schedule::cron(CronOptions::default()).as_str(),
            "cron(* * * * ? *)"
        );
    }

    #[test]
    fn cron_hour_and_minute() {
        let schedule = Schedule::cron(CronOptions {
            hour: Some("8".to_owned()),
            minute: Some("0".to_owned()),
            ..CronOptions::default()
        });
        assert_eq!(schedule.as_str(), "cron(0 8 * * ? *)");
    }

    #[test]
    fn cron_week_day_blanks_day_of_month() {
        let schedule = Schedule::cron(CronOptions {
            week_day: Some("MON".to_owned()),
            ..CronOptions::default()
        });
        assert_eq!(schedule.as_str(), "cron(* * ? * MON *)");
    }

    #[test]
    fn cron_day_of_month_blanks_week_day() {
        let schedule = Schedule::cron(CronOptions {
            day: Some("15".to_owned()),
            ..CronOptions::default()
        });
        assert_eq!(schedule.as_str(), "cron(* * 15 * ? *)");
    }

    #[test]
    fn rate_renders_minutes() {
        assert_eq!(
            Schedule::rate(Duration::from_secs(600)).as_str(),
            "rate(10 minutes)"
        );
        assert_eq!(
            Schedule::rate(Duration::from_secs(60)).as_str(),
            "rate(1 minute)"
        );
        assert_eq!(
            Schedule::rate(Duration::from_secs(5)).as_str(),
            "rate(1 minute)"
        );
    }

    #[test]
    fn raw_expression_passes_through() {
        assert_eq!(
            Schedule::expression("at(2026-01-01T00:00:00)").as_str(),
            "at(2026-01-01T00:00:00)"
        );
    }
}
