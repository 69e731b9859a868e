//! Fileserve-DB: share storage on SQLite.
//!
//! # Modules
//!
//! - `migrations` - embedded schema migrations
//! - `pool` - r2d2 connection pool management
//! - `models` - `Share` and `ShareFile` rows
//! - `password` - password hashing and verification
//! - `queries` - query functions over a single connection
//! - `repository` - the read-only [`ShareRepository`] used by the server
//!
//! # Example
//!
//! ```no_run
//! use fileserve_db::pool::{init_pool, get_conn};
//! use fileserve_db::queries::shares;
//!
//! let pool = init_pool("/var/lib/fileserve/fileserve.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let share = shares::create_share(&conn, "Holiday", Some("hunter2")).unwrap();
//! println!("Created share {}", share.reference);
//! ```

pub mod migrations;
pub mod models;
pub mod password;
pub mod pool;
pub mod queries;
pub mod repository;

pub use models::{Share, ShareFile};
pub use pool::DbPool;
pub use repository::{ShareRepository, SqliteShareRepository};
