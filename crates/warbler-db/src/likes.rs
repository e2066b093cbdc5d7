use rusqlite::Connection;

use warbler_types::models::MessageId;
use warbler_types::{Message, UserId};

use crate::models::message_from_row;
use crate::{Database, DbError};

impl Database {
    /// Returns `false` when the like already existed.
    pub fn insert_like(&self, user_id: UserId, message_id: MessageId) -> Result<bool, DbError> {
        self.transaction(|tx| insert_like(tx, user_id, message_id))
    }

    pub fn delete_like(&self, user_id: UserId, message_id: MessageId) -> Result<bool, DbError> {
        self.transaction(|tx| delete_like(tx, user_id, message_id))
    }

    pub fn like_count(&self, message_id: MessageId) -> Result<u64, DbError> {
        self.with_conn(|conn| like_count(conn, message_id))
    }

    pub fn liked_messages(&self, user_id: UserId) -> Result<Vec<Message>, DbError> {
        self.with_conn(|conn| liked_messages(conn, user_id))
    }
}

pub fn insert_like(conn: &Connection, user_id: UserId, message_id: MessageId) -> Result<bool, DbError> {
    let inserted = conn.execute(
        "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
        [user_id, message_id],
    )?;
    Ok(inserted > 0)
}

pub fn delete_like(conn: &Connection, user_id: UserId, message_id: MessageId) -> Result<bool, DbError> {
    let removed = conn.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
        [user_id, message_id],
    )?;
    Ok(removed > 0)
}

pub fn like_count(conn: &Connection, message_id: MessageId) -> Result<u64, DbError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE message_id = ?1",
        [message_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Messages `user_id` has liked, newest first.
pub fn liked_messages(conn: &Connection, user_id: UserId) -> Result<Vec<Message>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.text, m.timestamp, m.user_id
         FROM messages m
         JOIN likes l ON l.message_id = m.id
         WHERE l.user_id = ?1
         ORDER BY m.timestamp DESC, m.id DESC",
    )?;
    let rows = stmt
        .query_map([user_id], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
