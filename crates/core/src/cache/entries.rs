//! Cache store and entry operations on the SQLite backend.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{RequestKey, StorageBackend};
use crate::Error;
use crate::types::{Response, ResponseType};

/// Raw column values for one entry, converted outside the SQLite thread.
struct EntryRow {
    response_url: String,
    status: u16,
    status_text: String,
    response_type: String,
    headers_json: String,
    body: Vec<u8>,
}

impl TryFrom<EntryRow> for Response {
    type Error = Error;

    fn try_from(row: EntryRow) -> Result<Self, Error> {
        Ok(Response {
            url: row.response_url,
            status: row.status,
            status_text: row.status_text,
            response_type: row.response_type.parse::<ResponseType>()?,
            headers: serde_json::from_str(&row.headers_json)?,
            body: Bytes::from(row.body),
        })
    }
}

/// Owned values bound into the upsert statement.
struct EntryParams {
    key_hash: String,
    method: String,
    request_url: String,
    response_url: String,
    status: u16,
    status_text: String,
    response_type: &'static str,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryParams {
    fn new(key: &RequestKey, response: &Response) -> Result<Self, Error> {
        Ok(Self {
            key_hash: key.digest(),
            method: key.method().to_string(),
            request_url: key.url().to_string(),
            response_url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.response_type.as_str(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

fn ensure_store(conn: &rusqlite::Connection, store: &str, now: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
        params![store, now],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, store: &str, entry: &EntryParams, now: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO cache_entries (
            store, key_hash, method, request_url, response_url, status,
            status_text, response_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(store, key_hash) DO UPDATE SET
            response_url = excluded.response_url,
            status = excluded.status,
            status_text = excluded.status_text,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            &entry.key_hash,
            &entry.method,
            &entry.request_url,
            &entry.response_url,
            entry.status,
            &entry.status_text,
            entry.response_type,
            &entry.headers_json,
            &entry.body,
            now,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl StorageBackend for CacheDb {
    async fn open(&self, store: &str) -> Result<(), Error> {
        let store = store.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_store(conn, &store, &now)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        let store = store.to_string();
        let key_hash = key.digest();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT response_url, status, status_text, response_type, headers_json, body
                     FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, key_hash],
                    |row| {
                        Ok(EntryRow {
                            response_url: row.get(0)?,
                            status: row.get(1)?,
                            status_text: row.get(2)?,
                            response_type: row.get(3)?,
                            headers_json: row.get(4)?,
                            body: row.get(5)?,
                        })
                    },
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(Response::try_from).transpose()
    }

    async fn put(&self, store: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let store = store.to_string();
        let entry = EntryParams::new(key, response)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_store(&tx, &store, &now)?;
                upsert_entry(&tx, &store, &entry, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, store: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error> {
        let store = store.to_string();
        let entries = entries
            .iter()
            .map(|(key, response)| EntryParams::new(key, response))
            .collect::<Result<Vec<_>, Error>>()?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_store(&tx, &store, &now)?;
                for entry in &entries {
                    upsert_entry(&tx, &store, entry, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, store: &str) -> Result<Vec<RequestKey>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, request_url FROM cache_entries
                     WHERE store = ?1 ORDER BY method, request_url",
                )?;
                let keys = stmt
                    .query_map(params![store], |row| Ok(RequestKey::from_parts(row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_namespace(&self, store: &str) -> Result<bool, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![store])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
