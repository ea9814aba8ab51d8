//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the GraphStore trait.

use crate::graph::{ArtistAttributes, ArtistId, ArtistRecord, SocialGraph};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{GraphStore, StorageError, StorageResult};
use crate::storage::{LoadedGraph, SessionRecord, SessionStatus};
use crate::EchoError;
use chrono::Utc;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// Text stored in place of an attribute the platform reported as unavailable
pub const UNAVAILABLE: &str = "n/a";

/// SQLite graph storage backend
pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Creates a new SqliteGraphStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteGraphStore)` - Successfully opened/created database
    /// * `Err(EchoError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, EchoError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, EchoError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl GraphStore for SqliteGraphStore {
    // ===== Graph =====

    fn save_graph(
        &mut self,
        graph: &SocialGraph,
        encounters: &HashMap<ArtistId, u64>,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM follows", [])?;
        tx.execute("DELETE FROM artists", [])?;

        {
            let mut insert_node = tx.prepare(
                "INSERT INTO artists
                    (id, position, name, track_ct, follower_ct, favorite_ct,
                     url, city, country, explored, encounters)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, node) in graph.nodes().enumerate() {
                let attrs = &node.attributes;
                let count = encounters
                    .get(&node.id)
                    .and_then(|c| i64::try_from(*c).ok());
                insert_node.execute(params![
                    sql_id(node.id)?,
                    position as i64,
                    node.name,
                    count_value(attrs.track_count),
                    count_value(attrs.follower_count),
                    count_value(attrs.favorite_count),
                    text_value(&attrs.profile_url),
                    text_value(&attrs.city),
                    text_value(&attrs.country),
                    node.explored,
                    count,
                ])?;
            }

            let mut insert_edge =
                tx.prepare("INSERT OR IGNORE INTO follows (from_id, to_id) VALUES (?1, ?2)")?;
            for (from, to) in graph.edges() {
                insert_edge.execute(params![sql_id(from)?, sql_id(to)?])?;
            }
        }

        tx.commit()?;
        tracing::debug!(
            "Saved graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(())
    }

    fn load_graph(&self) -> StorageResult<LoadedGraph> {
        let mut loaded = LoadedGraph::default();

        let mut stmt = self.conn.prepare(
            "SELECT id, name, track_ct, follower_ct, favorite_ct, url, city, country,
                    explored, encounters
             FROM artists ORDER BY position",
        )?;
        let rows = stmt.query_map([], read_node)?;
        for row in rows {
            match row? {
                Ok((record, count)) => {
                    if let Some(count) = count {
                        loaded.encounters.insert(record.id, count);
                    }
                    loaded.graph.upsert_node(record);
                }
                Err(raw_id) => {
                    tracing::warn!("Skipping malformed artist row {}", raw_id);
                    loaded.skipped_nodes += 1;
                }
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT from_id, to_id FROM follows ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (from, to) = row?;
            let endpoints = u64::try_from(from)
                .ok()
                .zip(u64::try_from(to).ok())
                .map(|(f, t)| (ArtistId(f), ArtistId(t)));
            match endpoints {
                Some((from, to)) if loaded.graph.contains(from) && loaded.graph.contains(to) => {
                    loaded.graph.add_edge(from, to);
                }
                _ => loaded.skipped_edges += 1,
            }
        }

        if loaded.skipped_nodes > 0 || loaded.skipped_edges > 0 {
            tracing::warn!(
                "Loaded graph with {} malformed nodes and {} dangling edges skipped",
                loaded.skipped_nodes,
                loaded.skipped_edges
            );
        }

        Ok(loaded)
    }

    // ===== Session Management =====

    fn create_session(&mut self, seed: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sessions (seed, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![seed, now, config_hash, SessionStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed, started_at, finished_at, config_hash, status
             FROM sessions WHERE id = ?1",
        )?;

        stmt.query_row(params![session_id], read_session)
            .optional()?
            .ok_or(StorageError::SessionNotFound(session_id))
    }

    fn get_latest_session(&self) -> StorageResult<Option<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed, started_at, finished_at, config_hash, status
             FROM sessions ORDER BY id DESC LIMIT 1",
        )?;

        Ok(stmt.query_row([], read_session).optional()?)
    }

    fn finish_session(&mut self, session_id: i64, status: SessionStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sessions SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, session_id],
        )?;
        if updated == 0 {
            return Err(StorageError::SessionNotFound(session_id));
        }
        Ok(())
    }
}

fn sql_id(id: ArtistId) -> StorageResult<i64> {
    i64::try_from(id.0).map_err(|_| StorageError::IdOutOfRange(id))
}

fn count_value(value: Option<u64>) -> Value {
    value
        .and_then(|v| i64::try_from(v).ok())
        .map(Value::Integer)
        .unwrap_or_else(|| Value::Text(UNAVAILABLE.to_string()))
}

fn text_value(value: &Option<String>) -> Value {
    Value::Text(value.clone().unwrap_or_else(|| UNAVAILABLE.to_string()))
}

/// `None` for NULL, `Some(None)` for the unavailable marker
fn count_cell(value: ValueRef<'_>) -> Option<Option<u64>> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(u64::try_from(v).ok()),
        ValueRef::Text(t) => Some(
            std::str::from_utf8(t)
                .ok()
                .and_then(|s| s.trim().parse().ok()),
        ),
        ValueRef::Real(_) | ValueRef::Blob(_) => Some(None),
    }
}

/// `None` for NULL, `Some(None)` for the unavailable marker
fn text_cell(value: ValueRef<'_>) -> Option<Option<String>> {
    match value {
        ValueRef::Null => None,
        ValueRef::Text(t) => {
            let text = String::from_utf8_lossy(t);
            if text == UNAVAILABLE {
                Some(None)
            } else {
                Some(Some(text.into_owned()))
            }
        }
        ValueRef::Integer(v) => Some(Some(v.to_string())),
        ValueRef::Real(v) => Some(Some(v.to_string())),
        ValueRef::Blob(_) => Some(None),
    }
}

/// Decodes one artist row; a malformed row yields its raw id as the error
fn read_node(
    row: &Row<'_>,
) -> rusqlite::Result<Result<(ArtistRecord, Option<u64>), String>> {
    let raw_id = match row.get_ref(0)? {
        ValueRef::Integer(v) => v.to_string(),
        other => format!("{:?}", other),
    };
    let id = match row.get_ref(0)? {
        ValueRef::Integer(v) => u64::try_from(v).ok().map(ArtistId),
        _ => None,
    };
    let name = match row.get_ref(1)? {
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Integer(v) => Some(v.to_string()),
        _ => None,
    };
    let explored = match row.get_ref(8)? {
        ValueRef::Integer(v) => Some(v != 0),
        _ => None,
    };
    let encounters = match row.get_ref(9)? {
        ValueRef::Integer(v) => u64::try_from(v).ok(),
        _ => None,
    };

    let (
        Some(id),
        Some(name),
        Some(track_count),
        Some(follower_count),
        Some(favorite_count),
        Some(profile_url),
        Some(city),
        Some(country),
        Some(explored),
    ) = (
        id,
        name,
        count_cell(row.get_ref(2)?),
        count_cell(row.get_ref(3)?),
        count_cell(row.get_ref(4)?),
        text_cell(row.get_ref(5)?),
        text_cell(row.get_ref(6)?),
        text_cell(row.get_ref(7)?),
        explored,
    )
    else {
        return Ok(Err(raw_id));
    };

    let attributes = ArtistAttributes {
        track_count,
        follower_count,
        favorite_count,
        profile_url,
        city,
        country,
    };
    let record = if explored {
        ArtistRecord::explored(id, name, attributes)
    } else {
        ArtistRecord::discovered(id, name, attributes)
    };

    Ok(Ok((record, encounters)))
}

fn read_session(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        seed: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: SessionStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(SessionStatus::Running),
    })
}
