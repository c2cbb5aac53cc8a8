//! [`SqliteStore`] — the SQLite implementation of [`Store`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use attest_core::{AttendanceEvent, Embedding, EventKind, Identity, Store};

use crate::{schema::SCHEMA, Error, Result};

/// An attest store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
    conn: tokio_rusqlite::Connection,
}

/// Row image of `identities` before domain decoding.
struct RawIdentity {
    id: String,
    name: String,
    department: String,
    email: String,
    embedding_json: Option<String>,
    enrolled_at: String,
}

/// Row image of `attendance` before domain decoding.
struct RawEvent {
    id: String,
    identity_id: String,
    identity_name: String,
    kind: String,
    confidence: f64,
    timestamp: String,
}

fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::DateParse(format!("{s}: {e}")))
}

fn decode_identity(raw: RawIdentity) -> Result<Identity> {
    let embedding: Option<Embedding> = raw
        .embedding_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(Identity {
        id: Uuid::parse_str(&raw.id)?,
        name: raw.name,
        department: raw.department,
        email: raw.email,
        embedding,
        enrolled_at: decode_dt(&raw.enrolled_at)?,
    })
}

fn decode_event(raw: RawEvent) -> Result<AttendanceEvent> {
    let kind: EventKind = raw
        .kind
        .parse()
        .map_err(|_| Error::EventKind(raw.kind.clone()))?;

    Ok(AttendanceEvent {
        id: Uuid::parse_str(&raw.id)?,
        identity_id: Uuid::parse_str(&raw.identity_id)?,
        identity_name: raw.identity_name,
        kind,
        confidence: raw.confidence as f32,
        timestamp: decode_dt(&raw.timestamp)?,
    })
}

const IDENTITY_COLUMNS: &str =
    "identity_id, name, department, email, embedding_json, enrolled_at";

fn read_identity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawIdentity> {
    Ok(RawIdentity {
        id: row.get(0)?,
        name: row.get(1)?,
        department: row.get(2)?,
        email: row.get(3)?,
        embedding_json: row.get(4)?,
        enrolled_at: row.get(5)?,
    })
}

impl SqliteStore {
    /// Open (or create) a store at `path` and run schema initialisation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store — useful for testing.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn identity_where(&self, column: &'static str, value: String) -> Result<Option<Identity>> {
        let raw: Option<RawIdentity> = self
            .conn
            .call(move |conn| {
                let raw = conn
                    .query_row(
                        &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE {column} = ?1"),
                        rusqlite::params![value],
                        read_identity_row,
                    )
                    .optional()?;
                Ok(raw)
            })
            .await?;

        raw.map(decode_identity).transpose()
    }
}

impl Store for SqliteStore {
    type Error = Error;

    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
        self.identity_where("identity_id", id.to_string()).await
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        self.identity_where("email", email.to_owned()).await
    }

    async fn put_identity(&self, identity: Identity) -> Result<()> {
        let email = identity.email.clone();
        let embedding_json = identity
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO identities (
                         identity_id, name, department, email, embedding_json, enrolled_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        identity.id.to_string(),
                        identity.name,
                        identity.department,
                        identity.email,
                        embedding_json,
                        identity.enrolled_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| Error::from(e).identity_conflict(&email))?;

        tracing::debug!(email = %email, "identity persisted");
        Ok(())
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        let raws: Vec<RawIdentity> = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {IDENTITY_COLUMNS} FROM identities ORDER BY enrolled_at DESC"
                ))?;
                let raws = stmt
                    .query_map([], read_identity_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(raws)
            })
            .await?;

        raws.into_iter().map(decode_identity).collect()
    }

    async fn append_attendance(&self, event: AttendanceEvent) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO attendance (
                         event_id, identity_id, identity_name, kind, confidence, timestamp
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        event.id.to_string(),
                        event.identity_id.to_string(),
                        event.identity_name,
                        event.kind.as_str(),
                        event.confidence as f64,
                        event.timestamp.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn list_attendance(&self) -> Result<Vec<AttendanceEvent>> {
        let raws: Vec<RawEvent> = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT event_id, identity_id, identity_name, kind, confidence, timestamp
                     FROM attendance
                     ORDER BY timestamp DESC",
                )?;
                let raws = stmt
                    .query_map([], |row| {
                        Ok(RawEvent {
                            id: row.get(0)?,
                            identity_id: row.get(1)?,
                            identity_name: row.get(2)?,
                            kind: row.get(3)?,
                            confidence: row.get(4)?,
                            timestamp: row.get(5)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(raws)
            })
            .await?;

        raws.into_iter().map(decode_event).collect()
    }
}
