use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use warbler_types::UserId;

use crate::models::{
    NewUser, ProfileChanges, ProfileCounts, USER_COLUMNS, UserRow, header_image_or_default, image_or_default,
};
use crate::{Database, DbError};

impl Database {
    /// Commit a staged signup. Fails with `DbError::Integrity` when the
    /// username or email is taken or a required field is missing.
    pub fn insert_user(&self, new: &NewUser) -> Result<UserRow, DbError> {
        self.transaction(|tx| insert_user(tx, new))
    }

    pub fn user(&self, id: UserId) -> Result<Option<UserRow>, DbError> {
        self.with_conn(|conn| user_by_id(conn, id))
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<UserRow>, DbError> {
        self.with_conn(|conn| user_by_username(conn, username))
    }

    pub fn search_users(&self, query: Option<&str>) -> Result<Vec<UserRow>, DbError> {
        self.with_conn(|conn| search_users(conn, query))
    }

    pub fn count_users(&self) -> Result<u64, DbError> {
        self.with_conn(|conn| -> Result<_, DbError> {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }

    pub fn profile_counts(&self, id: UserId) -> Result<ProfileCounts, DbError> {
        self.with_conn(|conn| profile_counts(conn, id))
    }

    pub fn update_user(&self, id: UserId, changes: &ProfileChanges) -> Result<Option<UserRow>, DbError> {
        self.transaction(|tx| update_user(tx, id, changes))
    }

    pub fn delete_user(&self, id: UserId) -> Result<bool, DbError> {
        self.transaction(|tx| delete_user(tx, id))
    }
}

pub fn insert_user(conn: &Connection, new: &NewUser) -> Result<UserRow, DbError> {
    let id: UserId = conn.query_row(
        "INSERT INTO users (id, username, email, password, image_url)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id",
        params![
            new.id,
            new.username,
            new.email,
            new.password,
            image_or_default(new.image_url.as_deref()),
        ],
        |row| row.get(0),
    )?;

    let row = user_by_id(conn, id)?
        .ok_or_else(|| DbError::Integrity(format!("user {} vanished after insert", id)))?;
    info!("Created user #{} ({})", row.id, row.username);
    Ok(row)
}

pub fn user_by_id(conn: &Connection, id: UserId) -> Result<Option<UserRow>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, [id], UserRow::from_row).optional()?)
}

pub fn user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, [username], UserRow::from_row).optional()?)
}

/// Users whose username contains `query`; every user when the query is
/// absent or blank. Ordered by username.
pub fn search_users(conn: &Connection, query: Option<&str>) -> Result<Vec<UserRow>, DbError> {
    let query = query.map(str::trim).filter(|q| !q.is_empty());
    let sql = format!(
        "SELECT {} FROM users WHERE ?1 IS NULL OR instr(username, ?1) > 0 ORDER BY username",
        USER_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([query], UserRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_user(
    conn: &Connection,
    id: UserId,
    changes: &ProfileChanges,
) -> Result<Option<UserRow>, DbError> {
    let username = non_blank(changes.username.as_deref());
    let email = non_blank(changes.email.as_deref());
    let image_url = changes.image_url.as_deref().map(|v| image_or_default(Some(v)));
    let header_image_url = changes
        .header_image_url
        .as_deref()
        .map(|v| header_image_or_default(Some(v)));

    let updated = conn.execute(
        "UPDATE users SET
            username = COALESCE(?2, username),
            email = COALESCE(?3, email),
            image_url = COALESCE(?4, image_url),
            header_image_url = COALESCE(?5, header_image_url),
            bio = CASE WHEN ?6 IS NULL THEN bio ELSE NULLIF(?6, '') END,
            location = CASE WHEN ?7 IS NULL THEN location ELSE NULLIF(?7, '') END
         WHERE id = ?1",
        params![
            id,
            username,
            email,
            image_url,
            header_image_url,
            changes.bio,
            changes.location,
        ],
    )?;

    if updated == 0 {
        return Ok(None);
    }
    user_by_id(conn, id)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// How many users `id` follows, how many follow them, and how many messages
/// they have liked.
pub fn profile_counts(conn: &Connection, id: UserId) -> Result<ProfileCounts, DbError> {
    let (following, followers, likes): (i64, i64, i64) = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1),
            (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1),
            (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    Ok(ProfileCounts {
        following: following as u64,
        followers: followers as u64,
        likes: likes as u64,
    })
}

/// Remove a user and everything that hangs off them: their likes, likes on
/// their messages, their messages and every follow edge touching them.
pub fn delete_user(conn: &Connection, id: UserId) -> Result<bool, DbError> {
    conn.execute(
        "DELETE FROM likes
         WHERE user_id = ?1
            OR message_id IN (SELECT id FROM messages WHERE user_id = ?1)",
        [id],
    )?;
    conn.execute(
        "DELETE FROM follows WHERE user_being_followed_id = ?1 OR user_following_id = ?1",
        [id],
    )?;
    let messages = conn.execute("DELETE FROM messages WHERE user_id = ?1", [id])?;
    let removed = conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0;

    if removed {
        info!("Deleted user #{} and {} messages", id, messages);
    }
    Ok(removed)
}
