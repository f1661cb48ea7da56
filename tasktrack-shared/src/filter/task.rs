/// Task list filters
///
/// | parameter                 | constraint                                        |
/// |---------------------------|---------------------------------------------------|
/// | `description`             | case-insensitive exact match                      |
/// | `description__contains`   | case-insensitive substring                        |
/// | `description__startswith` | case-insensitive prefix                           |
/// | `description__regex`      | case-insensitive regex search                     |
/// | `completed`               | `true`/`false`/`1`/`0`                            |
/// | `created_after`           | local creation date on or after `YYYY-MM-DD`      |
/// | `created_before`          | local creation date on or before `YYYY-MM-DD`     |
/// | `created_on`              | created within that local calendar day, inclusive |
///
/// "Local" means the configured time zone, never implicitly UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::{Regex, RegexBuilder};
use sqlx::{Postgres, QueryBuilder};
use std::fmt;

use super::{iexact, icontains, istartswith, like_escape, param, QueryParams};
use super::{INVALID_CHOICE, INVALID_DATE, INVALID_REGEX};
use crate::models::task::Task;
use crate::validation::FieldErrors;

/// Upper bound on compiled regex size, in bytes
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A compiled case-insensitive description pattern
#[derive(Debug, Clone)]
pub struct DescriptionPattern {
    source: String,
    regex: Regex,
}

impl DescriptionPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Search semantics: the pattern may match anywhere in the text
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Parsed task filters
#[derive(Debug, Clone)]
pub struct TaskFilter {
    pub description: Option<String>,
    pub description_contains: Option<String>,
    pub description_startswith: Option<String>,
    pub description_regex: Option<DescriptionPattern>,
    pub completed: Option<bool>,
    pub created_after: Option<NaiveDate>,
    pub created_before: Option<NaiveDate>,
    pub created_on: Option<NaiveDate>,

    /// Zone used for every date comparison
    pub time_zone: Tz,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self::unfiltered(chrono_tz::UTC)
    }
}

impl TaskFilter {
    /// A filter that matches every task
    pub fn unfiltered(time_zone: Tz) -> Self {
        Self {
            description: None,
            description_contains: None,
            description_startswith: None,
            description_regex: None,
            completed: None,
            created_after: None,
            created_before: None,
            created_on: None,
            time_zone,
        }
    }

    /// Parses filters from query parameters
    ///
    /// Unknown parameters are ignored. Every invalid value is reported, keyed
    /// by its parameter name.
    pub fn from_params(params: &QueryParams, time_zone: Tz) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut filter = Self::unfiltered(time_zone);

        filter.description = param(params, "description").map(str::to_string);
        filter.description_contains = param(params, "description__contains").map(str::to_string);
        filter.description_startswith =
            param(params, "description__startswith").map(str::to_string);

        if let Some(source) = param(params, "description__regex") {
            match DescriptionPattern::new(source) {
                Ok(pattern) => filter.description_regex = Some(pattern),
                Err(_) => errors.add("description__regex", INVALID_REGEX),
            }
        }

        if let Some(raw) = param(params, "completed") {
            match parse_bool(raw) {
                Some(value) => filter.completed = Some(value),
                None => errors.add("completed", INVALID_CHOICE),
            }
        }

        filter.created_after = parse_date_param(params, "created_after", &mut errors);
        filter.created_before = parse_date_param(params, "created_before", &mut errors);
        filter.created_on = parse_date_param(params, "created_on", &mut errors);

        errors.into_result().map(|()| filter)
    }

    /// True when no constraint is set
    pub fn is_empty(&self) -> bool {
        self.applied().is_empty()
    }

    /// Active constraints as `(parameter, value)` pairs
    pub fn applied(&self) -> Vec<(&'static str, String)> {
        let mut applied = Vec::new();
        if let Some(value) = &self.description {
            applied.push(("description", value.clone()));
        }
        if let Some(value) = &self.description_contains {
            applied.push(("description__contains", value.clone()));
        }
        if let Some(value) = &self.description_startswith {
            applied.push(("description__startswith", value.clone()));
        }
        if let Some(pattern) = &self.description_regex {
            applied.push(("description__regex", pattern.as_str().to_string()));
        }
        if let Some(value) = self.completed {
            applied.push(("completed", value.to_string()));
        }
        if let Some(date) = self.created_after {
            applied.push(("created_after", date.to_string()));
        }
        if let Some(date) = self.created_before {
            applied.push(("created_before", date.to_string()));
        }
        if let Some(date) = self.created_on {
            applied.push(("created_on", date.to_string()));
        }
        applied
    }

    /// Closed UTC interval covering the `created_on` day in the filter's zone
    pub fn created_on_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.created_on
            .map(|date| local_day_bounds(date, self.time_zone))
    }

    /// Evaluates the filter against one task
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(value) = &self.description {
            if !iexact(&task.description, value) {
                return false;
            }
        }
        if let Some(value) = &self.description_contains {
            if !icontains(&task.description, value) {
                return false;
            }
        }
        if let Some(value) = &self.description_startswith {
            if !istartswith(&task.description, value) {
                return false;
            }
        }
        if let Some(pattern) = &self.description_regex {
            if !pattern.is_match(&task.description) {
                return false;
            }
        }
        if let Some(completed) = self.completed {
            if task.completed != completed {
                return false;
            }
        }

        let local_date = task.creation_time.with_timezone(&self.time_zone).date_naive();
        if let Some(after) = self.created_after {
            if local_date < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if local_date > before {
                return false;
            }
        }
        if let Some((start, end)) = self.created_on_bounds() {
            if task.creation_time < start || task.creation_time > end {
                return false;
            }
        }

        true
    }

    /// Appends `AND ...` clauses for every active constraint
    ///
    /// The builder must already contain a `WHERE` clause.
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(value) = &self.description {
            qb.push(" AND LOWER(description) = LOWER(");
            qb.push_bind(value.clone());
            qb.push(")");
        }
        if let Some(value) = &self.description_contains {
            qb.push(" AND description ILIKE ");
            qb.push_bind(format!("%{}%", like_escape(value)));
            qb.push(" ESCAPE '\\'");
        }
        if let Some(value) = &self.description_startswith {
            qb.push(" AND description ILIKE ");
            qb.push_bind(format!("{}%", like_escape(value)));
            qb.push(" ESCAPE '\\'");
        }
        if let Some(pattern) = &self.description_regex {
            qb.push(" AND description ~* ");
            qb.push_bind(pattern.as_str().to_string());
        }
        if let Some(completed) = self.completed {
            qb.push(" AND completed = ");
            qb.push_bind(completed);
        }
        if let Some(after) = self.created_after {
            qb.push(" AND (creation_time AT TIME ZONE ");
            qb.push_bind(self.time_zone.name());
            qb.push(")::date >= ");
            qb.push_bind(after);
        }
        if let Some(before) = self.created_before {
            qb.push(" AND (creation_time AT TIME ZONE ");
            qb.push_bind(self.time_zone.name());
            qb.push(")::date <= ");
            qb.push_bind(before);
        }
        if let Some((start, end)) = self.created_on_bounds() {
            qb.push(" AND creation_time BETWEEN ");
            qb.push_bind(start);
            qb.push(" AND ");
            qb.push_bind(end);
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let applied = self.applied();
        if applied.is_empty() {
            return f.write_str("none");
        }
        let parts: Vec<String> = applied
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_date_param(params: &QueryParams, name: &str, errors: &mut FieldErrors) -> Option<NaiveDate> {
    let raw = param(params, name)?;
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(name, INVALID_DATE);
            None
        }
    }
}

/// First instant of a local calendar day, as UTC
///
/// When local midnight does not exist (a DST gap), the first existing local
/// time of that day is used.
fn local_day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::default());
    (0..=3)
        .find_map(|hours| {
            tz.from_local_datetime(&(midnight + Duration::hours(hours)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Closed UTC interval `[start of day, end of day]` for a local date
///
/// The end is one microsecond before the next local day begins.
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_day_start(date, tz);
    let end = match date.succ_opt() {
        Some(next) => local_day_start(next, tz) - Duration::microseconds(1),
        None => DateTime::<Utc>::MAX_UTC,
    };
    (start, end)
}
