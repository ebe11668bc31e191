//! Generation and entry operations for the SQLite store.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_rusqlite::{params, rusqlite};

use super::CacheStore;
use super::connection::SqliteStore;
use crate::{CapturedResponse, Error, RequestIdentity, ResponseKind};

/// One `entries` row, owned so it can cross into the database thread.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    kind: &'static str,
    headers_json: String,
    body: Vec<u8>,
    captured_at: String,
}

impl EntryRow {
    fn encode(identity: &RequestIdentity, response: &CapturedResponse) -> Result<Self, Error> {
        Ok(Self {
            key_hash: identity.hash(),
            method: identity.method().to_string(),
            url: identity.url().to_string(),
            status: i64::from(response.status),
            kind: response.kind.as_str(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
            captured_at: response.captured_at.to_rfc3339(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, generation: &str) -> Result<(), Error> {
        conn.execute(
            "INSERT INTO entries (
                generation, key_hash, method, url, status, kind, headers_json, body, captured_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(generation, key_hash) DO UPDATE SET
                status = excluded.status,
                kind = excluded.kind,
                headers_json = excluded.headers_json,
                body = excluded.body,
                captured_at = excluded.captured_at",
            params![
                generation,
                &self.key_hash,
                &self.method,
                &self.url,
                self.status,
                self.kind,
                &self.headers_json,
                &self.body,
                &self.captured_at,
            ],
        )?;
        Ok(())
    }
}

fn ensure_generation(conn: &rusqlite::Connection, generation: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![generation, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn generation_exists(conn: &rusqlite::Connection, generation: &str) -> Result<bool, Error> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
        params![generation],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn require_generation(conn: &rusqlite::Connection, generation: &str) -> Result<(), Error> {
    if generation_exists(conn, generation)? {
        Ok(())
    } else {
        Err(Error::MissingGeneration(generation.to_string()))
    }
}

fn decode_response(
    url: String, status: i64, kind: String, headers_json: String, body: Vec<u8>, captured_at: String,
) -> Result<CapturedResponse, Error> {
    let kind = ResponseKind::parse(&kind).ok_or_else(|| Error::CorruptEntry(format!("unknown kind: {kind}")))?;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("bad status: {status}")))?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    let captured_at = DateTime::parse_from_rfc3339(&captured_at)
        .map_err(|e| Error::CorruptEntry(e.to_string()))?
        .with_timezone(&Utc);

    Ok(CapturedResponse { url, status, headers, body: Bytes::from(body), kind, captured_at })
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_generation(conn, &generation) })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> { generation_exists(conn, &generation) })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                // Entries go with the generation through ON DELETE CASCADE.
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_entry(
        &self, generation: &str, identity: &RequestIdentity,
    ) -> Result<Option<CapturedResponse>, Error> {
        let generation = generation.to_string();
        let key_hash = identity.hash();
        self.conn
            .call(move |conn| -> Result<Option<CapturedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, kind, headers_json, body, captured_at
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((url, status, kind, headers_json, body, captured_at)) => {
                        decode_response(url, status, kind, headers_json, body, captured_at).map(Some)
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(
        &self, generation: &str, identity: &RequestIdentity, response: &CapturedResponse,
    ) -> Result<(), Error> {
        let generation = generation.to_string();
        let row = EntryRow::encode(identity, response)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                require_generation(conn, &generation)?;
                row.insert(conn, &generation)
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, generation: &str, entries: &[(RequestIdentity, CapturedResponse)]) -> Result<(), Error> {
        let generation = generation.to_string();
        let rows = entries
            .iter()
            .map(|(identity, response)| EntryRow::encode(identity, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation)?;
                for row in &rows {
                    row.insert(&tx, &generation)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, generation: &str) -> Result<Vec<RequestIdentity>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestIdentity>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE generation = ?1 ORDER BY url, method")?;
                let ids = stmt
                    .query_map(params![generation], |row| {
                        Ok(RequestIdentity::from_parts(row.get(0)?, row.get(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .await
            .map_err(Error::from)
    }
}
