//! Database row types: these map directly to SQLite rows.
//! Distinct from warbler-types models to keep the password hash inside the DB layer.
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use warbler_types::models::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};
use warbler_types::{Message, User, UserId};

pub const USER_COLUMNS: &str =
    "id, username, email, password, image_url, header_image_url, bio, location";

pub const MESSAGE_COLUMNS: &str = "id, text, timestamp, user_id";

#[derive(Debug)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl UserRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            image_url: row.get(4)?,
            header_image_url: row.get(5)?,
            bio: row.get(6)?,
            location: row.get(7)?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            image_url: row.image_url,
            header_image_url: row.header_image_url,
            bio: row.bio,
            location: row.location,
        }
    }
}

/// A signed-up user that has not been committed yet. `password` already
/// holds the hash. Missing required fields are left for the NOT NULL
/// constraints to reject at insert time.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// Explicit surrogate key; `None` lets SQLite assign one.
    pub id: Option<UserId>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub text: String,
    pub user_id: Option<UserId>,
}

/// Profile edits. `None` keeps the stored value, and so does a blank
/// username or email. An empty image URL resets it to the default; an empty
/// bio or location clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// Follow and like counters shown on a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCounts {
    pub following: u64,
    pub followers: u64,
    pub likes: u64,
}

/// Image URL to store for an optional user-supplied value.
pub fn image_or_default(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(DEFAULT_IMAGE_URL)
}

pub fn header_image_or_default(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(DEFAULT_HEADER_IMAGE_URL)
}

pub fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let raw: String = row.get(2)?;
    let timestamp = parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Message {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp,
        user_id: row.get(3)?,
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS.SSS" without timezone.
/// Parse as naive UTC and convert.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_timestamps_with_and_without_millis() {
        let ts = parse_timestamp("2024-03-01 12:34:56.789").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 1));
        assert_eq!(ts.timestamp_subsec_millis(), 789);

        let ts = parse_timestamp("2024-03-01 12:34:56").unwrap();
        assert_eq!(ts.second(), 56);

        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn image_defaults() {
        assert_eq!(image_or_default(None), DEFAULT_IMAGE_URL);
        assert_eq!(image_or_default(Some("")), DEFAULT_IMAGE_URL);
        assert_eq!(image_or_default(Some("/me.png")), "/me.png");
        assert_eq!(header_image_or_default(Some("")), DEFAULT_HEADER_IMAGE_URL);
    }
}
