//! Read-only share access for the server.

use fileserve_common::Result;

use crate::models::{Share, ShareFile};
use crate::pool::{get_conn, DbPool};
use crate::queries::{share_files, shares};

/// Lookups the request path and the batch workflows need.
///
/// Implementations must be cheap to share across tasks; the server holds one
/// behind an `Arc`.
pub trait ShareRepository: Send + Sync {
    fn share_by_reference(&self, reference: &str) -> Result<Option<Share>>;

    fn share_by_id(&self, id: i64) -> Result<Option<Share>>;

    fn files_of_share(&self, share_id: i64) -> Result<Vec<ShareFile>>;

    fn file_by_reference(&self, reference: &str) -> Result<Option<ShareFile>>;
}

/// [`ShareRepository`] over the SQLite pool. Each call checks out a
/// connection and returns it before yielding.
#[derive(Clone)]
pub struct SqliteShareRepository {
    pool: DbPool,
}

impl SqliteShareRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl ShareRepository for SqliteShareRepository {
    fn share_by_reference(&self, reference: &str) -> Result<Option<Share>> {
        let conn = get_conn(&self.pool)?;
        shares::get_share_by_reference(&conn, reference)
    }

    fn share_by_id(&self, id: i64) -> Result<Option<Share>> {
        let conn = get_conn(&self.pool)?;
        shares::get_share_by_id(&conn, id)
    }

    fn files_of_share(&self, share_id: i64) -> Result<Vec<ShareFile>> {
        let conn = get_conn(&self.pool)?;
        share_files::get_share_files(&conn, share_id)
    }

    fn file_by_reference(&self, reference: &str) -> Result<Option<ShareFile>> {
        let conn = get_conn(&self.pool)?;
        share_files::get_share_file_by_reference(&conn, reference)
    }
}
