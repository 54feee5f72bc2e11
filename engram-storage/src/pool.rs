//! Single write connection + round-robin read pool.
//!
//! SQLite allows one writer at a time; every write path in the workspace
//! funnels through [`WriteConnection`]. Reads fan out across the pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use engram_core::EngramResult;

use crate::to_storage_err;

fn open_connection(uri: &str) -> EngramResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(uri, flags)
        .map_err(|e| to_storage_err(format!("open {uri}: {e}")))?;
    // WAL only applies to on-disk databases; in-memory quietly stays "memory".
    conn.pragma_update(None, "journal_mode", "WAL").ok();
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.pragma_update(None, "busy_timeout", 5_000)
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conn)
}

/// The one writer. Callers pass a closure; the connection never escapes.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn open(uri: &str) -> EngramResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_connection(uri)?),
        })
    }

    /// Run a closure against the write connection.
    ///
    /// The closure is synchronous; rusqlite work completes within the
    /// scheduling quantum and the lock is never held across an await.
    pub async fn with_conn<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        self.with_conn_sync(f)
    }

    pub fn with_conn_sync<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| to_storage_err("write connection poisoned".to_string()))?;
        f(&conn)
    }

    /// Run a closure inside an IMMEDIATE transaction. Roll back on error.
    pub async fn with_tx<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        self.with_conn_sync(|conn| {
            conn.execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| to_storage_err(format!("begin: {e}")))?;
            match f(conn) {
                Ok(value) => {
                    conn.execute_batch("COMMIT")
                        .map_err(|e| to_storage_err(format!("commit: {e}")))?;
                    Ok(value)
                }
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK");
                    Err(e)
                }
            }
        })
    }
}

/// Round-robin pool of read connections.
pub struct ReadPool {
    conns: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    pub fn open(uri: &str, size: usize) -> EngramResult<Self> {
        let size = size.max(1);
        let mut conns = Vec::with_capacity(size);
        for _ in 0..size {
            conns.push(Mutex::new(open_connection(uri)?));
        }
        Ok(Self {
            conns,
            next: AtomicUsize::new(0),
        })
    }

    pub async fn with_conn<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.conns.len();
        let conn = self.conns[idx]
            .lock()
            .map_err(|_| to_storage_err("read connection poisoned".to_string()))?;
        f(&conn)
    }
}
