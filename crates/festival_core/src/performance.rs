use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

use crate::timeparse::{self, DateKey};

/// Stable identifier of a performance across refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceId(String);

impl PerformanceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds the composite key used when the source does not issue its own.
    pub fn composite(event: &str, date: &str, time: &str, artist: &str, title: &str) -> Self {
        Self(format!("{event}-{date}-{time}-{artist}-{title}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PerformanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PerformanceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PerformanceStatus {
    #[default]
    Unknown,
    Normal,
    Orange,
    Red,
    Full,
    Cancelled,
}

impl PerformanceStatus {
    /// Maps the admin-entered crowd level cell, Dutch or English.
    pub fn from_crowd_level(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "groen" | "green" | "normaal" | "normal" => Self::Normal,
            "oranje" | "orange" => Self::Orange,
            "rood" | "red" => Self::Red,
            "vol" | "full" => Self::Full,
            "geannuleerd" | "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Normal => "normal",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Full => "full",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a favorite in this status can no longer be attended.
    pub fn is_unavailable(self) -> bool {
        matches!(self, Self::Full | Self::Cancelled)
    }
}

impl From<String> for PerformanceStatus {
    fn from(value: String) -> Self {
        Self::from_crowd_level(&value)
    }
}

impl From<PerformanceStatus> for String {
    fn from(value: PerformanceStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PerformanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityTags {
    pub wheelchair_accessible: bool,
    pub suitable_for_children: bool,
    pub dutch_language: bool,
    pub english_language: bool,
    pub dialogue_free: bool,
    pub dining_facility: bool,
    pub sign_language: bool,
    pub calm_route: bool,
}

/// One show as materialized by the data source. Immutable per refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub id: PerformanceId,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub status: PerformanceStatus,
    #[serde(default)]
    pub accessibility: AccessibilityTags,
}

impl Performance {
    pub fn display_title(&self) -> String {
        if self.artist.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist, self.title)
        }
    }

    pub fn date_key(&self) -> DateKey {
        timeparse::parse_date(&self.date)
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        timeparse::performance_start(&self.date, &self.time)
    }

    pub fn genres(&self) -> impl Iterator<Item = &str> {
        self.genre
            .split(',')
            .map(str::trim)
            .filter(|genre| !genre.is_empty())
    }

    /// Orders by start instant; performances without a valid start sort last.
    pub fn cmp_by_start(&self, other: &Self) -> Ordering {
        match (self.start(), other.start()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.date_key().cmp(&other.date_key()),
        }
        .then_with(|| self.title.cmp(&other.title))
        .then_with(|| self.id.cmp(&other.id))
    }
}
