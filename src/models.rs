use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::RatingError;

pub const MIN_RATING: i32 = -2;
pub const MAX_RATING: i32 = 2;

/// Identifiers of the categories that predate per-category ratings.
pub const LEGACY_CATEGORIES: [&str; 4] = ["health", "work", "growth", "family"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyRatings {
    pub health: Option<i32>,
    pub work: Option<i32>,
    pub growth: Option<i32>,
    pub family: Option<i32>,
}

impl LegacyRatings {
    pub fn get(&self, category: &str) -> Option<i32> {
        match category {
            "health" => self.health,
            "work" => self.work,
            "growth" => self.growth,
            "family" => self.family,
            _ => None,
        }
    }
}

/// Which tier of the lookup produced a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingSource {
    Mapped(i32),
    Legacy(i32),
    Default,
}

impl RatingSource {
    pub fn value(self) -> i32 {
        match self {
            RatingSource::Mapped(value) | RatingSource::Legacy(value) => value,
            RatingSource::Default => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DailyRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub ratings: BTreeMap<String, i32>,
    pub legacy: LegacyRatings,
    pub notes: String,
}

impl DailyRecord {
    #[cfg(test)]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            ratings: BTreeMap::new(),
            legacy: LegacyRatings::default(),
            notes: String::new(),
        }
    }

    #[cfg(test)]
    pub fn with_rating(mut self, category: &str, value: i32) -> Self {
        self.ratings.insert(category.to_string(), value);
        self
    }

    pub fn lookup(&self, category: &str) -> RatingSource {
        if let Some(value) = self.ratings.get(category) {
            return RatingSource::Mapped(*value);
        }
        match self.legacy.get(category) {
            Some(value) => RatingSource::Legacy(value),
            None => RatingSource::Default,
        }
    }

    pub fn rating(&self, category: &str) -> i32 {
        self.lookup(category).value()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub identifier: String,
    pub display_name: String,
    pub display_order: i32,
    pub active: bool,
}

impl Category {
    pub fn new(identifier: &str, display_name: &str, display_order: i32) -> Self {
        Self {
            identifier: identifier.to_string(),
            display_name: display_name.to_string(),
            display_order,
            active: true,
        }
    }
}

/// Ratings and notes for one day, as entered before they reach storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInput {
    pub date: NaiveDate,
    pub ratings: BTreeMap<String, i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollingAverages {
    pub all_time: f64,
    pub trailing_10: f64,
    pub trailing_30: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub identifier: String,
    pub averages: RollingAverages,
}

pub fn validate_rating(category: &str, value: i32) -> Result<i32, RatingError> {
    if category.trim().is_empty() {
        return Err(RatingError::EmptyCategory);
    }
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(RatingError::OutOfRange {
            category: category.to_string(),
            value,
        });
    }
    Ok(value)
}

/// Canonical form of a category identifier: trimmed and lowercased.
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Parses a `category=value` assignment from the command line.
pub fn parse_assignment(raw: &str) -> Result<(String, i32), RatingError> {
    let (category, value) = raw
        .split_once('=')
        .ok_or_else(|| RatingError::Malformed(raw.to_string()))?;
    let category = normalize_category(category);
    let value: i32 = value
        .trim()
        .parse()
        .map_err(|_| RatingError::Malformed(raw.to_string()))?;
    validate_rating(&category, value)?;
    Ok((category, value))
}

/// Fails on the first rated category that is not configured, active or not.
pub fn ensure_known_categories(
    ratings: &BTreeMap<String, i32>,
    known: &[Category],
) -> Result<(), RatingError> {
    match ratings
        .keys()
        .find(|category| !known.iter().any(|c| &c.identifier == *category))
    {
        Some(unknown) => Err(RatingError::UnknownCategory(unknown.clone())),
        None => Ok(()),
    }
}
