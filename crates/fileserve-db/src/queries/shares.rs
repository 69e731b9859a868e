//! Share queries.

use fileserve_common::{Error, Result};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::Share;
use crate::password::hash_password;

const SHARE_COLUMNS: &str = "id, name, reference, password";

pub(crate) fn share_from_row(row: &Row<'_>) -> rusqlite::Result<Share> {
    Ok(Share {
        id: row.get(0)?,
        name: row.get(1)?,
        reference: row.get(2)?,
        password_hash: row.get(3)?,
    })
}

/// Create a share with a fresh UUID reference.
///
/// An empty or missing password creates an open share.
pub fn create_share(conn: &Connection, name: &str, password: Option<&str>) -> Result<Share> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Share name must not be empty".into()));
    }

    let reference = Uuid::new_v4().to_string();
    let password_hash = match password.filter(|p| !p.is_empty()) {
        Some(plaintext) => Some(hash_password(plaintext)?),
        None => None,
    };

    conn.execute(
        "INSERT INTO share (name, reference, password) VALUES (:name, :reference, :password)",
        rusqlite::named_params! {
            ":name": name,
            ":reference": reference,
            ":password": password_hash,
        },
    )
    .map_err(Error::database)?;

    Ok(Share {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        reference,
        password_hash,
    })
}

pub fn get_share_by_reference(conn: &Connection, reference: &str) -> Result<Option<Share>> {
    let result = conn.query_row(
        &format!("SELECT {SHARE_COLUMNS} FROM share WHERE reference = :reference"),
        rusqlite::named_params! { ":reference": reference },
        share_from_row,
    );

    match result {
        Ok(share) => Ok(Some(share)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

pub fn get_share_by_id(conn: &Connection, id: i64) -> Result<Option<Share>> {
    let result = conn.query_row(
        &format!("SELECT {SHARE_COLUMNS} FROM share WHERE id = :id"),
        rusqlite::named_params! { ":id": id },
        share_from_row,
    );

    match result {
        Ok(share) => Ok(Some(share)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

pub fn list_shares(conn: &Connection) -> Result<Vec<Share>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {SHARE_COLUMNS} FROM share ORDER BY id"))
        .map_err(Error::database)?;

    let shares = stmt
        .query_map([], share_from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(shares)
}

/// Replace a share's password; `None` opens the share.
///
/// Existing auth cookies stop matching because the token derives from the
/// stored hash.
pub fn update_share_password(conn: &Connection, id: i64, password: Option<&str>) -> Result<bool> {
    let password_hash = match password.filter(|p| !p.is_empty()) {
        Some(plaintext) => Some(hash_password(plaintext)?),
        None => None,
    };

    let rows_affected = conn
        .execute(
            "UPDATE share SET password = :password WHERE id = :id",
            rusqlite::named_params! { ":password": password_hash, ":id": id },
        )
        .map_err(Error::database)?;

    Ok(rows_affected > 0)
}

/// Delete a share and, by cascade, its files.
pub fn delete_share(conn: &Connection, id: i64) -> Result<bool> {
    let rows_affected = conn
        .execute(
            "DELETE FROM share WHERE id = :id",
            rusqlite::named_params! { ":id": id },
        )
        .map_err(Error::database)?;

    Ok(rows_affected > 0)
}
