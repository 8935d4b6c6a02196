//! Field filters for entity listings
//!
//! A filter names one top-level field, a set of constraints on that field's
//! text, and whether all (`and`) or any (`or`) must hold. Text matching is
//! case-insensitive. Date modes compare the calendar date of the field
//! against an ISO date-time.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    StartsWith,
    EndsWith,
    Contains,
    Equals,
    DateIs,
    DateIsNot,
    DateBefore,
    DateAfter,
}

impl MatchMode {
    /// `None` for names this store does not know.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "startsWith" => MatchMode::StartsWith,
            "endsWith" => MatchMode::EndsWith,
            "contains" => MatchMode::Contains,
            "equals" => MatchMode::Equals,
            "dateIs" => MatchMode::DateIs,
            "dateIsNot" => MatchMode::DateIsNot,
            "dateBefore" => MatchMode::DateBefore,
            "dateAfter" => MatchMode::DateAfter,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConstraint {
    pub match_mode: String,
    pub value: String,
}

impl FilterConstraint {
    pub fn new(match_mode: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            match_mode: match_mode.into(),
            value: value.into(),
        }
    }

    /// `None` when the match mode is unknown and the constraint is ignored.
    fn evaluate(&self, field: Option<&str>) -> Option<bool> {
        let mode = MatchMode::parse(&self.match_mode)?;
        // a missing or null field satisfies nothing, negations included
        let Some(field) = field else {
            return Some(false);
        };

        let matched = match mode {
            MatchMode::StartsWith => field.to_lowercase().starts_with(&self.value.to_lowercase()),
            MatchMode::EndsWith => field.to_lowercase().ends_with(&self.value.to_lowercase()),
            MatchMode::Contains => field.to_lowercase().contains(&self.value.to_lowercase()),
            MatchMode::Equals => field.to_lowercase() == self.value.to_lowercase(),
            MatchMode::DateIs
            | MatchMode::DateIsNot
            | MatchMode::DateBefore
            | MatchMode::DateAfter => {
                let (Some(date), Some(bound)) = (field_date(field), parse_date_time(&self.value)) else {
                    return Some(false);
                };
                match mode {
                    MatchMode::DateIs => date == bound,
                    MatchMode::DateIsNot => date != bound,
                    MatchMode::DateBefore => date < bound,
                    _ => date > bound,
                }
            }
        };
        Some(matched)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFilter {
    pub key: String,
    /// `and` or `or`; anything but `or` combines with `and`
    pub operator: String,
    #[serde(default)]
    pub constraints: Vec<FilterConstraint>,
}

impl EntityFilter {
    pub fn new(key: impl Into<String>, operator: impl Into<String>, constraints: Vec<FilterConstraint>) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            constraints,
        }
    }

    /// Filters with an empty key or operator are skipped.
    pub fn is_active(&self) -> bool {
        !self.key.trim().is_empty() && !self.operator.trim().is_empty()
    }

    pub fn matches(&self, document: &Value) -> bool {
        if !self.is_active() {
            return true;
        }
        let field = field_text(document, &self.key);
        let results: Vec<bool> = self
            .constraints
            .iter()
            .filter_map(|c| c.evaluate(field.as_deref()))
            .collect();
        if results.is_empty() {
            return true;
        }
        if self.operator.eq_ignore_ascii_case("or") {
            results.into_iter().any(|r| r)
        } else {
            results.into_iter().all(|r| r)
        }
    }
}

/// True when `document` passes every filter.
pub fn matches_all(filters: &[EntityFilter], document: &Value) -> bool {
    filters.iter().all(|f| f.matches(document))
}

/// Text of a top-level field: strings as-is, other values as JSON.
fn field_text(document: &Value, key: &str) -> Option<String> {
    match document.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Calendar date of the field, as midnight.
fn field_date(field: &str) -> Option<NaiveDateTime> {
    let prefix = field.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

/// ISO date-time with or without offset; an offset is dropped, not applied.
fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|d| d.naive_local()))
}
