pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

/// Connections kept open for reuse between calls.
const MAX_IDLE: usize = 16;

/// How long a writer waits for SQLite's write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared store of users, campaigns, requests and transactions.
///
/// A file database hands each call its own WAL connection, so callers only
/// meet at SQLite's write lock, held for the length of one write statement
/// or one `with_tx` closure. Readers never wait on writers. An in-memory
/// database exists only inside its single connection, so calls take turns.
pub struct Database {
    pool: Pool,
}

enum Pool {
    Memory(Mutex<Connection>),
    File {
        path: PathBuf,
        idle: Mutex<Vec<Connection>>,
    },
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            pool: Pool::File {
                path: path.to_path_buf(),
                idle: Mutex::new(vec![conn]),
            },
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        info!("Database opened at :memory:");
        Ok(Self {
            pool: Pool::Memory(Mutex::new(conn)),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.checkout(|conn| f(conn))
    }

    /// Run `f` inside an immediate SQLite transaction. The write lock is
    /// taken up front, so reads inside `f` cannot go stale before its
    /// writes. Committed only if `f` returns `Ok`; any error rolls
    /// everything back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    {
        self.checkout(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }

    fn checkout<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        match &self.pool {
            Pool::Memory(conn) => f(&mut *lock(conn)?),
            Pool::File { path, idle } => {
                let reused = lock(idle)?.pop();
                let mut conn = match reused {
                    Some(conn) => conn,
                    None => connect(path)?,
                };
                let out = f(&mut conn);

                let mut idle = lock(idle)?;
                if idle.len() < MAX_IDLE {
                    idle.push(conn);
                }
                out
            }
        }
    }
}

fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    m.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
}
