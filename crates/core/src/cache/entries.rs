//! SQLite implementation of the generation-partitioned entry store.
//!
//! Entries are keyed by `(generation, key_hash)` and cascade-delete with
//! their generation row.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::entry::{CacheEntry, CacheKey};
use super::store::CacheStore;
use crate::Error;

const UPSERT_GENERATION: &str = "INSERT INTO generations (id, created_at) VALUES (?1, ?2)
    ON CONFLICT(id) DO NOTHING";

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        generation, key_hash, method, url, status, status_text,
        headers_json, body, expire_at, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(generation, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status = excluded.status,
        status_text = excluded.status_text,
        headers_json = excluded.headers_json,
        body = excluded.body,
        expire_at = excluded.expire_at,
        stored_at = excluded.stored_at";

/// Entry row ready for insertion.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    expire_at: Option<i64>,
}

impl EntryRow {
    fn new(key: &CacheKey, entry: &CacheEntry) -> Result<Self, Error> {
        Ok(Self {
            key_hash: key.digest(),
            method: key.method.clone(),
            url: key.url.clone(),
            status: entry.status,
            status_text: entry.status_text.clone(),
            headers_json: serde_json::to_string(&entry.headers)?,
            body: entry.body.clone(),
            expire_at: entry.expire_at(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, generation: &str, now: &str) -> Result<(), Error> {
        conn.execute(
            UPSERT_ENTRY,
            params![
                generation,
                &self.key_hash,
                &self.method,
                &self.url,
                self.status,
                &self.status_text,
                &self.headers_json,
                &self.body,
                self.expire_at,
                now,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let inserted = conn.execute(UPSERT_GENERATION, params![&generation, chrono::Utc::now().to_rfc3339()])?;
                if inserted > 0 {
                    tracing::info!(generation = %generation, "opened cache generation");
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, generation: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let generation = generation.to_string();
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
                        Ok(Some(CacheEntry { status, status_text, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, generation: &str, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error> {
        let generation = generation.to_string();
        let row = EntryRow::new(key, entry)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let now = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(UPSERT_GENERATION, params![&generation, &now])?;
                row.insert(&tx, &generation, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, generation: &str, entries: &[(CacheKey, CacheEntry)]) -> Result<(), Error> {
        let generation = generation.to_string();
        let rows = entries
            .iter()
            .map(|(key, entry)| EntryRow::new(key, entry))
            .collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let now = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(UPSERT_GENERATION, params![&generation, &now])?;
                for row in &rows {
                    row.insert(&tx, &generation, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE id = ?1", params![generation])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT id FROM generations ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn purge_expired(&self, generation: &str, now_ms: i64) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND expire_at IS NOT NULL AND expire_at <= ?2",
                    params![generation, now_ms],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
