//! Share file queries.

use std::fs::File;
use std::path::Path;

use fileserve_common::paths::{normalize_stored_path, stored_basename};
use fileserve_common::{Error, Result};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::ShareFile;

const FILE_COLUMNS: &str = "id, share_id, file_path, file_name, reference";

fn share_file_from_row(row: &Row<'_>) -> rusqlite::Result<ShareFile> {
    Ok(ShareFile {
        id: row.get(0)?,
        share_id: row.get(1)?,
        file_path: row.get(2)?,
        file_name: row.get(3)?,
        reference: row.get(4)?,
    })
}

/// Register a file in a share.
///
/// The path must be absolute and name a readable regular file (symlinks are
/// followed). It is stored normalized with forward slashes. `file_name`
/// defaults to the basename.
///
/// # Errors
///
/// * `Error::Validation` - relative path, directory, special or unreadable file
/// * `Error::NotFound` - the path or the share does not exist
pub fn add_file_to_share(
    conn: &Connection,
    share_id: i64,
    file_path: &Path,
    file_name: Option<&str>,
) -> Result<ShareFile> {
    if !file_path.is_absolute() {
        return Err(Error::Validation(format!(
            "File path must be absolute: {}",
            file_path.display()
        )));
    }

    let metadata = std::fs::metadata(file_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::not_found("file", file_path.display()),
        _ => Error::Validation(format!("Cannot access {}: {}", file_path.display(), e)),
    })?;
    if !metadata.is_file() {
        return Err(Error::Validation(format!(
            "Not a regular file: {}",
            file_path.display()
        )));
    }
    File::open(file_path).map_err(|e| {
        Error::Validation(format!("File is not readable: {}: {}", file_path.display(), e))
    })?;

    let stored_path = normalize_stored_path(&file_path.to_string_lossy());
    let display_name = file_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| stored_basename(&stored_path))
        .to_string();
    let reference = Uuid::new_v4().to_string();

    conn.execute(
        "INSERT INTO share_file (share_id, file_path, file_name, reference)
         VALUES (:share_id, :file_path, :file_name, :reference)",
        rusqlite::named_params! {
            ":share_id": share_id,
            ":file_path": stored_path,
            ":file_name": display_name,
            ":reference": reference,
        },
    )
    .map_err(|e| {
        if e.to_string().contains("FOREIGN KEY constraint failed") {
            Error::not_found("share", share_id)
        } else {
            Error::database(e)
        }
    })?;

    Ok(ShareFile {
        id: conn.last_insert_rowid(),
        share_id,
        file_path: stored_path,
        file_name: display_name,
        reference,
    })
}

/// Files of a share in registration order.
pub fn get_share_files(conn: &Connection, share_id: i64) -> Result<Vec<ShareFile>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM share_file WHERE share_id = :share_id ORDER BY id"
        ))
        .map_err(Error::database)?;

    let files = stmt
        .query_map(
            rusqlite::named_params! { ":share_id": share_id },
            share_file_from_row,
        )
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;

    Ok(files)
}

pub fn get_share_file_by_reference(conn: &Connection, reference: &str) -> Result<Option<ShareFile>> {
    let result = conn.query_row(
        &format!("SELECT {FILE_COLUMNS} FROM share_file WHERE reference = :reference"),
        rusqlite::named_params! { ":reference": reference },
        share_file_from_row,
    );

    match result {
        Ok(file) => Ok(Some(file)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

pub fn remove_share_file(conn: &Connection, reference: &str) -> Result<bool> {
    let rows_affected = conn
        .execute(
            "DELETE FROM share_file WHERE reference = :reference",
            rusqlite::named_params! { ":reference": reference },
        )
        .map_err(Error::database)?;

    Ok(rows_affected > 0)
}
