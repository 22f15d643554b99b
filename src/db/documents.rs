//! Path-addressed document storage.
//!
//! Documents are JSON blobs addressed like `users/{userId}/{collection}/{docId}`.
//! Every function takes a plain connection so callers decide whether it runs
//! on a pooled connection or inside a transaction.

use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, SqliteConnection};

use crate::errors::AppError;
use crate::models::User;

/// Build the path of a collection nested under a user, e.g. `users/u1/teams`.
pub fn subcollection(user_id: &str, collection: &str) -> Result<String, AppError> {
    Ok(format!(
        "{}/{}/{}",
        User::COLLECTION,
        segment(user_id)?,
        segment(collection)?
    ))
}

/// Reject ids that would escape their path position.
pub fn segment(value: &str) -> Result<&str, AppError> {
    if value.is_empty() || value.contains('/') {
        return Err(AppError::Validation(format!(
            "Invalid document id {:?}",
            value
        )));
    }
    Ok(value)
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn collection_id(collection: &str) -> &str {
    collection.rsplit('/').next().unwrap_or(collection)
}

fn decode<T: DeserializeOwned>(row: &sqlx::sqlite::SqliteRow) -> Result<T, AppError> {
    let data: String = row.get("data");
    Ok(serde_json::from_str(&data)?)
}

/// Read one document.
pub async fn get<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    collection: &str,
    doc_id: &str,
) -> Result<Option<T>, AppError> {
    let path = format!("{}/{}", collection, segment(doc_id)?);
    let row = sqlx::query("SELECT data FROM documents WHERE path = ?")
        .bind(&path)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(decode).transpose()
}

/// Create a document. Fails with `Conflict` if the path is taken.
pub async fn insert<T: Serialize>(
    conn: &mut SqliteConnection,
    collection: &str,
    doc_id: &str,
    doc: &T,
) -> Result<(), AppError> {
    let path = format!("{}/{}", collection, segment(doc_id)?);
    let data = serde_json::to_string(doc)?;
    let now = timestamp();

    let result = sqlx::query(
        "INSERT INTO documents (path, collection, collection_id, doc_id, data, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&path)
    .bind(collection)
    .bind(collection_id(collection))
    .bind(doc_id)
    .bind(&data)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
            format!("Document {} already exists", path),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Create or overwrite a document.
pub async fn put<T: Serialize>(
    conn: &mut SqliteConnection,
    collection: &str,
    doc_id: &str,
    doc: &T,
) -> Result<(), AppError> {
    let path = format!("{}/{}", collection, segment(doc_id)?);
    let data = serde_json::to_string(doc)?;
    let now = timestamp();

    sqlx::query(
        r#"INSERT INTO documents (path, collection, collection_id, doc_id, data, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(path) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"#,
    )
    .bind(&path)
    .bind(collection)
    .bind(collection_id(collection))
    .bind(doc_id)
    .bind(&data)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Delete a document, reporting whether one was there.
pub async fn delete(
    conn: &mut SqliteConnection,
    collection: &str,
    doc_id: &str,
) -> Result<bool, AppError> {
    let path = format!("{}/{}", collection, segment(doc_id)?);
    let result = sqlx::query("DELETE FROM documents WHERE path = ?")
        .bind(&path)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// All documents of one collection, oldest first.
pub async fn list<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    collection: &str,
) -> Result<Vec<T>, AppError> {
    let rows = sqlx::query(
        "SELECT data FROM documents WHERE collection = ? ORDER BY created_at, rowid",
    )
    .bind(collection)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(decode).collect()
}

/// Documents of one collection whose top-level string `field` equals `value`.
pub async fn query_eq<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    collection: &str,
    field: &str,
    value: &str,
) -> Result<Vec<T>, AppError> {
    let rows = sqlx::query(
        "SELECT data FROM documents WHERE collection = ? AND json_extract(data, ?) = ? ORDER BY created_at, rowid",
    )
    .bind(collection)
    .bind(format!("$.{}", field))
    .bind(value)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(decode).collect()
}

/// Drop every collection with the given id, whichever user it lives under.
pub async fn delete_collection_group(
    conn: &mut SqliteConnection,
    collection_id: &str,
) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM documents WHERE collection_id = ?")
        .bind(collection_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
