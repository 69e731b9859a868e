//! Database connection pool management.

use fileserve_common::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Open (or create) the database file and run pending migrations.
///
/// ```no_run
/// use fileserve_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/fileserve/fileserve.db").unwrap();
/// ```
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    build(SqliteConnectionManager::file(db_path), 4)
}

/// In-memory pool for tests. Each SQLite in-memory connection is a separate
/// database, so the pool holds exactly one.
///
/// ```
/// use fileserve_db::pool::{init_memory_pool, get_conn};
///
/// let pool = init_memory_pool().unwrap();
/// let conn = get_conn(&pool).unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    build(SqliteConnectionManager::memory(), 1)
}

/// The `share_file` cascade needs foreign keys on every connection.
fn build(manager: SqliteConnectionManager, max_size: u32) -> Result<DbPool> {
    let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    migrations::run_migrations(&*get_conn(&pool)?)?;
    Ok(pool)
}

/// Get a connection from the pool, mapping the r2d2 error.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}
