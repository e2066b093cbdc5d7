use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use warbler_types::models::MessageId;
use warbler_types::{Message, UserId};

use crate::models::{MESSAGE_COLUMNS, NewMessage, message_from_row};
use crate::{Database, DbError};

impl Database {
    /// Persist a message. Text longer than 140 characters, a missing author
    /// or an unknown author are all rejected with `DbError::Integrity`.
    pub fn insert_message(&self, new: &NewMessage) -> Result<Message, DbError> {
        self.transaction(|tx| insert_message(tx, new))
    }

    pub fn message(&self, id: MessageId) -> Result<Option<Message>, DbError> {
        self.with_conn(|conn| message_by_id(conn, id))
    }

    pub fn delete_message(&self, id: MessageId) -> Result<bool, DbError> {
        self.transaction(|tx| delete_message(tx, id))
    }

    pub fn messages_for_user(&self, user_id: UserId) -> Result<Vec<Message>, DbError> {
        self.with_conn(|conn| messages_for_user(conn, user_id))
    }

    pub fn timeline(&self, user_id: UserId, limit: u32) -> Result<Vec<Message>, DbError> {
        self.with_conn(|conn| timeline(conn, user_id, limit))
    }
}

pub fn insert_message(conn: &Connection, new: &NewMessage) -> Result<Message, DbError> {
    let sql = format!(
        "INSERT INTO messages (text, user_id) VALUES (?1, ?2) RETURNING {}",
        MESSAGE_COLUMNS
    );
    let message = conn.query_row(&sql, params![new.text, new.user_id], message_from_row)?;
    debug!("Message #{} posted by user #{}", message.id, message.user_id);
    Ok(message)
}

pub fn message_by_id(conn: &Connection, id: MessageId) -> Result<Option<Message>, DbError> {
    let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
    Ok(conn.query_row(&sql, [id], message_from_row).optional()?)
}

pub fn message_author(conn: &Connection, id: MessageId) -> Result<Option<UserId>, DbError> {
    Ok(conn
        .query_row("SELECT user_id FROM messages WHERE id = ?1", [id], |row| row.get(0))
        .optional()?)
}

/// Hard delete, taking the message's likes with it.
pub fn delete_message(conn: &Connection, id: MessageId) -> Result<bool, DbError> {
    conn.execute("DELETE FROM likes WHERE message_id = ?1", [id])?;
    Ok(conn.execute("DELETE FROM messages WHERE id = ?1", [id])? > 0)
}

/// All of a user's messages, newest first.
pub fn messages_for_user(conn: &Connection, user_id: UserId) -> Result<Vec<Message>, DbError> {
    let sql = format!(
        "SELECT {} FROM messages WHERE user_id = ?1 ORDER BY timestamp DESC, id DESC",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A user's own messages plus those of everyone they follow, newest first.
pub fn timeline(conn: &Connection, user_id: UserId, limit: u32) -> Result<Vec<Message>, DbError> {
    let sql = format!(
        "SELECT {} FROM messages
         WHERE user_id = ?1
            OR user_id IN (SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1)
         ORDER BY timestamp DESC, id DESC
         LIMIT ?2",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id, limit], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
