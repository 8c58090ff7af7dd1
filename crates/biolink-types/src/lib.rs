//! Shared types, error definitions, and constants for the biolink platform.
//!
//! This crate holds the value types every other crate agrees on: caller
//! roles and principals, analytics event types and dimensions, date ranges,
//! pagination, and the retention policy. It performs no I/O.

mod page;
mod time;

pub use page::{search_pattern, Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use time::{DateRange, RetentionPolicy, DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};

use serde::{Deserialize, Serialize};

/// Errors produced when constructing validated values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The start of a date range falls after its end.
    #[error("invalid date range: {from} is after {to}")]
    InvalidDateRange {
        /// Requested first day.
        from: String,
        /// Requested last day.
        to: String,
    },

    /// A date range reaches past the representable calendar.
    #[error("date out of range: {0}")]
    DateOutOfRange(String),

    /// A retention window outside `1..=MAX_RETENTION_DAYS` was requested.
    #[error("retention days must be between 1 and 36500, got {0}")]
    InvalidRetentionDays(i64),
}

/// Caller roles.
///
/// Stored as `USER`, `ADMIN` or `SUPER_ADMIN`. Parsing is case-insensitive
/// and happens once, when a principal is resolved; comparisons after that
/// are exact enum matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// A regular account holder.
    User,
    /// An administrator.
    Admin,
    /// An administrator who can also manage other administrators.
    SuperAdmin,
}

impl Role {
    /// Normalises a stored or claimed role label.
    ///
    /// Returns `None` for anything outside the closed set.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            "SUPER_ADMIN" | "SUPERADMIN" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    /// Returns the canonical label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Whether this role may use administrative surfaces.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved caller identity. Lives for one request and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The user ID.
    pub id: String,
    /// The normalised role.
    pub role: Role,
}

/// Kinds of analytics events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Someone opened a public profile page.
    ProfileView,
    /// Someone followed a link on a profile page.
    LinkClick,
}

impl EventType {
    /// Returns the stored label for this event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProfileView => "profile_view",
            Self::LinkClick => "link_click",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile_view" => Ok(Self::ProfileView),
            "link_click" => Ok(Self::LinkClick),
            _ => Err(ParseLabelError {
                kind: "event type",
                value: s.to_string(),
            }),
        }
    }
}

/// An attribute that aggregation groups events by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Visitor country code.
    Country,
    /// Referring site.
    Referrer,
}

impl Dimension {
    /// The `events` column holding this dimension.
    pub fn column(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Referrer => "referrer",
        }
    }

    /// The bucket label for events with no value for this dimension.
    pub fn sentinel(self) -> &'static str {
        match self {
            Self::Country => "Unknown",
            Self::Referrer => "Direct/Unknown",
        }
    }

    /// Returns the query-string label for this dimension.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Referrer => "referrer",
        }
    }
}

impl std::str::FromStr for Dimension {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "country" => Ok(Self::Country),
            "referrer" => Ok(Self::Referrer),
            _ => Err(ParseLabelError {
                kind: "dimension",
                value: s.to_string(),
            }),
        }
    }
}

/// Error returned when parsing an unknown label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseLabelError {
    /// What was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}
