//! Date windows used to scope aggregation and KPI computation.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::LedgerEntry;

/// Interval with optional, inclusive ends. Both ends absent means all time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub const ALL_TIME: TimeWindow = TimeWindow {
        start: None,
        end: None,
    };

    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn is_all_time(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }

    /// Entries whose `occurred_at` falls inside the window, in input order.
    pub fn filter(&self, entries: &[LedgerEntry]) -> Vec<LedgerEntry> {
        entries
            .iter()
            .filter(|e| self.contains(e.occurred_at))
            .cloned()
            .collect()
    }
}

/// Free-function form of [`TimeWindow::filter`].
pub fn filter(entries: &[LedgerEntry], window: &TimeWindow) -> Vec<LedgerEntry> {
    window.filter(entries)
}

/// Where calendar windows (this week/month/quarter/year) end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEnd {
    /// The window ends at "now": period-to-date figures.
    #[default]
    ToDate,
    /// The window ends at the last instant of the period.
    PeriodEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

/// Everything needed to turn a [`WindowPreset`] into concrete instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRules {
    pub tz: Tz,
    pub calendar_end: CalendarEnd,
    pub week_start: WeekStart,
}

impl Default for WindowRules {
    fn default() -> Self {
        Self {
            tz: chrono_tz::UTC,
            calendar_end: CalendarEnd::default(),
            week_start: WeekStart::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPreset {
    AllTime,
    /// `[now - n days, now]`.
    TrailingDays(u32),
    Week,
    Month,
    Quarter,
    Year,
    Custom(TimeWindow),
}

impl WindowPreset {
    /// Parse `all`, `week`, `month`, `quarter`, `year` or a trailing window like `30d`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "all" | "all-time" | "all_time" => Ok(WindowPreset::AllTime),
            "week" => Ok(WindowPreset::Week),
            "month" => Ok(WindowPreset::Month),
            "quarter" => Ok(WindowPreset::Quarter),
            "year" => Ok(WindowPreset::Year),
            other => {
                let days = other
                    .strip_suffix('d')
                    .context(format!(
                        "Invalid window: {s}. Use: all, week, month, quarter, year, or <N>d"
                    ))?
                    .parse::<u32>()
                    .with_context(|| format!("Invalid trailing window: {s}"))?;
                if days == 0 {
                    anyhow::bail!("Trailing window must be at least 1d");
                }
                Ok(WindowPreset::TrailingDays(days))
            }
        }
    }

    pub fn resolve(&self, now: DateTime<Utc>, rules: &WindowRules) -> TimeWindow {
        match *self {
            WindowPreset::AllTime => TimeWindow::ALL_TIME,
            // Trailing windows reaching past the earliest representable
            // instant are open at the start.
            WindowPreset::TrailingDays(days) => TimeWindow::new(
                now.checked_sub_signed(chrono::Duration::days(i64::from(days))),
                Some(now),
            ),
            WindowPreset::Custom(window) => window,
            WindowPreset::Week
            | WindowPreset::Month
            | WindowPreset::Quarter
            | WindowPreset::Year => {
                let today = now.with_timezone(&rules.tz).date_naive();
                let start_date = self.period_start(today, rules.week_start);
                let start = local_midnight(rules.tz, start_date);
                let end = match rules.calendar_end {
                    CalendarEnd::ToDate => now,
                    CalendarEnd::PeriodEnd => {
                        let next = self.next_period_start(start_date);
                        local_midnight(rules.tz, next) - chrono::Duration::nanoseconds(1)
                    }
                };
                TimeWindow::between(start, end)
            }
        }
    }

    /// The comparable window immediately before this one, for growth figures.
    ///
    /// Trailing and custom windows shift back by their own length. Calendar
    /// windows use the previous period: the full period under
    /// [`CalendarEnd::PeriodEnd`], or the same elapsed span under
    /// [`CalendarEnd::ToDate`]. All-time has no prior window, and neither
    /// does a window whose predecessor would start before the earliest
    /// representable instant.
    pub fn previous(&self, now: DateTime<Utc>, rules: &WindowRules) -> Option<TimeWindow> {
        let one_ns = chrono::Duration::nanoseconds(1);
        match *self {
            WindowPreset::AllTime => None,
            WindowPreset::TrailingDays(days) => {
                let span = chrono::Duration::days(i64::from(days));
                let end = now.checked_sub_signed(span)?.checked_sub_signed(one_ns)?;
                Some(TimeWindow::between(end.checked_sub_signed(span)?, end))
            }
            WindowPreset::Custom(window) => {
                let (start, end) = (window.start?, window.end?);
                let prior_end = start.checked_sub_signed(one_ns)?;
                Some(TimeWindow::between(
                    prior_end.checked_sub_signed(end - start)?,
                    prior_end,
                ))
            }
            WindowPreset::Week
            | WindowPreset::Month
            | WindowPreset::Quarter
            | WindowPreset::Year => {
                let today = now.with_timezone(&rules.tz).date_naive();
                let current_start_date = self.period_start(today, rules.week_start);
                let prior_start_date = self.previous_period_start(current_start_date);
                let current_start = local_midnight(rules.tz, current_start_date);
                let prior_start = local_midnight(rules.tz, prior_start_date);
                let full_prior_end = current_start - one_ns;
                let end = match rules.calendar_end {
                    CalendarEnd::PeriodEnd => full_prior_end,
                    CalendarEnd::ToDate => (prior_start + (now - current_start)).min(full_prior_end),
                };
                Some(TimeWindow::between(prior_start, end))
            }
        }
    }

    fn period_start(&self, today: NaiveDate, week_start: WeekStart) -> NaiveDate {
        match self {
            WindowPreset::Week => {
                let offset = match week_start {
                    WeekStart::Monday => today.weekday().num_days_from_monday(),
                    WeekStart::Sunday => today.weekday().num_days_from_sunday(),
                };
                today - chrono::Duration::days(offset as i64)
            }
            WindowPreset::Month => {
                NaiveDate::from_ymd_opt(today.year(), today.month(), 1).expect("valid date")
            }
            WindowPreset::Quarter => {
                let q0 = (today.month0() / 3) * 3;
                NaiveDate::from_ymd_opt(today.year(), q0 + 1, 1).expect("valid date")
            }
            WindowPreset::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).expect("valid date"),
            _ => today,
        }
    }

    fn next_period_start(&self, start: NaiveDate) -> NaiveDate {
        match self {
            WindowPreset::Week => start + chrono::Duration::days(7),
            WindowPreset::Month => start + Months::new(1),
            WindowPreset::Quarter => start + Months::new(3),
            WindowPreset::Year => start + Months::new(12),
            _ => start,
        }
    }

    fn previous_period_start(&self, start: NaiveDate) -> NaiveDate {
        match self {
            WindowPreset::Week => start - chrono::Duration::days(7),
            WindowPreset::Month => start - Months::new(1),
            WindowPreset::Quarter => start - Months::new(3),
            WindowPreset::Year => start - Months::new(12),
            _ => start,
        }
    }
}

impl fmt::Display for WindowPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowPreset::AllTime => f.write_str("all"),
            WindowPreset::TrailingDays(days) => write!(f, "{days}d"),
            WindowPreset::Week => f.write_str("week"),
            WindowPreset::Month => f.write_str("month"),
            WindowPreset::Quarter => f.write_str("quarter"),
            WindowPreset::Year => f.write_str("year"),
            WindowPreset::Custom(_) => f.write_str("custom"),
        }
    }
}

/// First instant of `date` in `tz`, as UTC.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).expect("valid time");
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST jump: fall back to the UTC reading.
        None => naive.and_utc(),
    }
}

/// Last instant of `date` in `tz`, as UTC.
pub fn local_end_of_day(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    local_midnight(tz, date + chrono::Duration::days(1)) - chrono::Duration::nanoseconds(1)
}

/// One end of a custom window: a whole day in the report's zone or an
/// exact instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl Bound {
    fn parse(label: &str, s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Bound::Day(date));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|ts| Bound::Instant(ts.with_timezone(&Utc)))
            .with_context(|| format!("Invalid {label} date: {s} (use YYYY-MM-DD or RFC 3339)"))
    }

    fn start(self, tz: Tz) -> DateTime<Utc> {
        match self {
            Bound::Day(date) => local_midnight(tz, date),
            Bound::Instant(at) => at,
        }
    }

    fn end(self, tz: Tz) -> DateTime<Utc> {
        match self {
            Bound::Day(date) => local_end_of_day(tz, date),
            Bound::Instant(at) => at,
        }
    }
}

/// Custom window from optional bounds. A `YYYY-MM-DD` bound covers the whole
/// day in `tz`; an RFC 3339 bound is used as the exact instant.
pub fn custom_window(start: Option<&str>, end: Option<&str>, tz: Tz) -> Result<TimeWindow> {
    let start = start
        .map(|s| Bound::parse("start", s))
        .transpose()?
        .map(|b| b.start(tz));
    let end = end
        .map(|s| Bound::parse("end", s))
        .transpose()?
        .map(|b| b.end(tz));
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            anyhow::bail!("end {e} is before start {s}");
        }
    }
    Ok(TimeWindow::new(start, end))
}
