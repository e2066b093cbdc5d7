use rusqlite::Connection;

use warbler_types::UserId;

use crate::models::{USER_COLUMNS, UserRow};
use crate::{Database, DbError};

impl Database {
    /// Add the edge "follower follows followed". Returns `false` when the
    /// edge already existed.
    pub fn insert_follow(&self, follower: UserId, followed: UserId) -> Result<bool, DbError> {
        self.transaction(|tx| insert_follow(tx, follower, followed))
    }

    /// Returns `false` when there was no edge to remove.
    pub fn delete_follow(&self, follower: UserId, followed: UserId) -> Result<bool, DbError> {
        self.transaction(|tx| delete_follow(tx, follower, followed))
    }

    pub fn is_following(&self, follower: UserId, followed: UserId) -> Result<bool, DbError> {
        self.with_conn(|conn| is_following(conn, follower, followed))
    }

    pub fn following(&self, user_id: UserId) -> Result<Vec<UserRow>, DbError> {
        self.with_conn(|conn| following(conn, user_id))
    }

    pub fn followers(&self, user_id: UserId) -> Result<Vec<UserRow>, DbError> {
        self.with_conn(|conn| followers(conn, user_id))
    }
}

pub fn insert_follow(conn: &Connection, follower: UserId, followed: UserId) -> Result<bool, DbError> {
    let inserted = conn.execute(
        "INSERT INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)
         ON CONFLICT DO NOTHING",
        [followed, follower],
    )?;
    Ok(inserted > 0)
}

pub fn delete_follow(conn: &Connection, follower: UserId, followed: UserId) -> Result<bool, DbError> {
    let removed = conn.execute(
        "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
        [followed, follower],
    )?;
    Ok(removed > 0)
}

pub fn is_following(conn: &Connection, follower: UserId, followed: UserId) -> Result<bool, DbError> {
    Ok(conn.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2
         )",
        [followed, follower],
        |row| row.get(0),
    )?)
}

/// Users that `user_id` follows, ordered by username.
pub fn following(conn: &Connection, user_id: UserId) -> Result<Vec<UserRow>, DbError> {
    let sql = format!(
        "SELECT {} FROM users
         WHERE id IN (SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1)
         ORDER BY username",
        USER_COLUMNS
    );
    query_users(conn, &sql, user_id)
}

/// Users following `user_id`, ordered by username.
pub fn followers(conn: &Connection, user_id: UserId) -> Result<Vec<UserRow>, DbError> {
    let sql = format!(
        "SELECT {} FROM users
         WHERE id IN (SELECT user_following_id FROM follows WHERE user_being_followed_id = ?1)
         ORDER BY username",
        USER_COLUMNS
    );
    query_users(conn, &sql, user_id)
}

fn query_users(conn: &Connection, sql: &str, user_id: UserId) -> Result<Vec<UserRow>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id], UserRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
