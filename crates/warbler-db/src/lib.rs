pub mod error;
pub mod follows;
pub mod likes;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use error::DbError;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private database that disappears with the handle. Used by tests.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DbError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }

    /// Run `f` inside a scoped transaction. Commits when `f` returns `Ok`;
    /// any `Err` drops the transaction, which rolls every write back.
    pub fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))?;
        let tx = conn.transaction().map_err(DbError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(out)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_transaction_rolls_back() {
        let db = test_support::db();
        test_support::user(&db, 1, "abc");

        let result: Result<(), DbError> = db.transaction(|tx| -> Result<(), DbError> {
            tx.execute("INSERT INTO messages (text, user_id) VALUES ('first', 1)", [])?;
            // Dangling author, rejected by the foreign key.
            tx.execute("INSERT INTO messages (text, user_id) VALUES ('second', 999)", [])?;
            Ok(())
        });

        assert!(result.unwrap_err().is_integrity());
        assert!(db.messages_for_user(1).unwrap().is_empty());
    }

    #[test]
    fn reopening_file_database_keeps_rows() {
        let path = std::env::temp_dir().join(format!("warbler-test-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let db = Database::open(&path).unwrap();
            test_support::user(&db, 1111, "testuser1");
        }
        let db = Database::open(&path).unwrap();
        assert!(db.user(1111).unwrap().is_some());

        drop(db);
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }
}
