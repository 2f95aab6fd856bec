//! SQLite store backend for persistent storage.

use super::{HistoryStore, HistoryWriter, InternalTag, ItemResolver};
use crate::core::history::{HistoryImageId, ImageHistory, ItemId, ItemInfo};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, uuid, album_id, album_root_id, name, file_path,
    modification_date, creation_date, file_size, unique_hash";

/// SQLite-backed persistent store
///
/// Uses WAL (Write-Ahead Logging) mode for better concurrent access.
/// Removed items stay in the database with their status cleared.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create a history database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                uuid TEXT,
                album_id INTEGER,
                album_root_id INTEGER,
                name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                modification_date INTEGER,
                creation_date INTEGER,
                file_size INTEGER,
                unique_hash TEXT,
                present INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_items_uuid ON items(uuid);
            CREATE INDEX IF NOT EXISTS idx_items_hash ON items(unique_hash, file_size);

            CREATE TABLE IF NOT EXISTS image_relations (
                subject INTEGER NOT NULL,
                object INTEGER NOT NULL,
                UNIQUE(subject, object)
            );
            CREATE INDEX IF NOT EXISTS idx_relations_object ON image_relations(object);

            CREATE TABLE IF NOT EXISTS image_history (
                item_id INTEGER PRIMARY KEY,
                history TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS image_tags (
                item_id INTEGER NOT NULL,
                tag TEXT NOT NULL,
                UNIQUE(item_id, tag)
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Ids of all present items, ascending
    pub fn item_ids(&self) -> Result<Vec<ItemId>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM items WHERE present = 1 ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<ItemId>, _>>()?;
        Ok(ids)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn to_timestamp(date: Option<DateTime<Utc>>) -> Option<i64> {
        date.map(|d| d.timestamp_millis())
    }

    fn from_timestamp(millis: Option<i64>) -> Option<DateTime<Utc>> {
        millis.and_then(DateTime::from_timestamp_millis)
    }

    fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemInfo> {
        Ok(ItemInfo {
            id: row.get(0)?,
            uuid: row.get(1)?,
            album_id: row.get(2)?,
            album_root_id: row.get(3)?,
            name: row.get(4)?,
            file_path: row.get(5)?,
            modification_date: Self::from_timestamp(row.get(6)?),
            creation_date: Self::from_timestamp(row.get(7)?),
            file_size: row.get::<_, Option<i64>>(8)?.map(|size| size as u64),
            unique_hash: row.get(9)?,
        })
    }

    fn query_ids(conn: &Connection, condition: &str, values: &[&dyn ToSql]) -> Result<Vec<ItemId>, StoreError> {
        let sql = format!("SELECT id FROM items WHERE present = 1 AND {condition} ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(values, |row| row.get(0))?
            .collect::<Result<Vec<ItemId>, _>>()?;
        Ok(ids)
    }

    fn resolve(&self, id: &HistoryImageId) -> Result<Vec<ItemId>, StoreError> {
        if !id.is_valid() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let file_size = id.file_size.map(|size| size as i64);
        let creation_date = Self::to_timestamp(id.creation_date);

        if let Some(uuid) = id.uuid() {
            let found = Self::query_ids(&conn, "uuid = ?1", &[&uuid])?;
            if !found.is_empty() {
                return Ok(found);
            }
        }

        if id.has_unique_hash_identifier() {
            let found = Self::query_ids(&conn, "unique_hash = ?1 AND file_size = ?2", &[&id.unique_hash(), &file_size])?;
            if !found.is_empty() {
                return Ok(found);
            }
        }

        if id.has_file_name_and_date() {
            let found = Self::query_ids(&conn, "name = ?1 AND creation_date = ?2", &[&id.file_name(), &creation_date])?;
            if !found.is_empty() {
                return Ok(found);
            }
        }

        if id.has_file_on_disk() {
            return Self::query_ids(&conn, "file_path = ?1 AND name = ?2", &[&id.file_path(), &id.file_name()]);
        }

        Ok(Vec::new())
    }

    /// Relations touching `id` whose both ends are present
    fn relations_of(conn: &Connection, id: ItemId) -> Result<Vec<(ItemId, ItemId)>, StoreError> {
        let mut stmt = conn.prepare_cached(
            "SELECT r.subject, r.object FROM image_relations r
             JOIN items s ON s.id = r.subject AND s.present = 1
             JOIN items o ON o.id = r.object AND o.present = 1
             WHERE r.subject = ?1 OR r.object = ?1",
        )?;
        let pairs = stmt
            .query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    fn cloud(&self, id: ItemId) -> Result<Vec<(ItemId, ItemId)>, StoreError> {
        let conn = self.lock()?;

        let present: bool = conn
            .query_row("SELECT present FROM items WHERE id = ?1", [id], |row| row.get(0))
            .optional()?
            .unwrap_or(false);
        if !present {
            return Ok(Vec::new());
        }

        let mut pairs = BTreeSet::new();
        let mut seen = BTreeSet::from([id]);
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for (subject, object) in Self::relations_of(&conn, current)? {
                pairs.insert((subject, object));
                for next in [subject, object] {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        Ok(pairs.into_iter().collect())
    }

    fn history(&self, id: ItemId) -> Result<ImageHistory, StoreError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row("SELECT history FROM image_history WHERE item_id = ?1", [id], |row| row.get(0))
            .optional()?;

        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(ImageHistory::default()),
        }
    }
}

impl ItemResolver for SqliteStore {
    fn item_info(&self, id: ItemId) -> Option<ItemInfo> {
        let result = self.lock().and_then(|conn| {
            let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1 AND present = 1");
            Ok(conn.query_row(&sql, [id], Self::item_from_row).optional()?)
        });

        result.unwrap_or_else(|e| {
            warn!(id, error = %e, "Failed to load item");
            None
        })
    }

    fn resolve_history_image_id(&self, id: &HistoryImageId) -> Vec<ItemId> {
        self.resolve(id).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to resolve history image id");
            Vec::new()
        })
    }
}

impl HistoryStore for SqliteStore {
    fn relation_cloud(&self, id: ItemId) -> Vec<(ItemId, ItemId)> {
        self.cloud(id).unwrap_or_else(|e| {
            warn!(id, error = %e, "Failed to load relation cloud");
            Vec::new()
        })
    }

    fn image_history(&self, id: ItemId) -> ImageHistory {
        self.history(id).unwrap_or_else(|e| {
            warn!(id, error = %e, "Failed to load image history");
            ImageHistory::default()
        })
    }
}

impl HistoryWriter for SqliteStore {
    fn add_item(&self, mut info: ItemInfo, history: &ImageHistory) -> Result<ItemId, StoreError> {
        if info.uuid().is_none() {
            info.uuid = Some(Uuid::new_v4().to_string());
        }
        let history_json = if history.is_empty() {
            None
        } else {
            Some(serde_json::to_string(history)?)
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO items
             (id, uuid, album_id, album_root_id, name, file_path,
              modification_date, creation_date, file_size, unique_hash, present)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)",
            params![
                Some(info.id).filter(|&id| id > 0),
                info.uuid,
                info.album_id,
                info.album_root_id,
                info.name,
                info.file_path,
                Self::to_timestamp(info.modification_date),
                Self::to_timestamp(info.creation_date),
                info.file_size.map(|size| size as i64),
                info.unique_hash,
            ],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(json) = history_json {
            tx.execute(
                "INSERT OR REPLACE INTO image_history (item_id, history) VALUES (?1, ?2)",
                params![id, json],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO image_tags (item_id, tag) VALUES (?1, ?2)",
                params![id, InternalTag::NeedResolvingHistory.as_str()],
            )?;
        }

        tx.commit()?;
        debug!(id, "Stored item");
        Ok(id)
    }

    fn add_image_relations(&self, subjects: &[ItemId], objects: &[ItemId]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO image_relations (subject, object) VALUES (?1, ?2)")?;
            for (subject, object) in subjects.iter().zip(objects) {
                stmt.execute([subject, object])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn items_with_tag(&self, tag: InternalTag) -> Result<Vec<ItemId>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT t.item_id FROM image_tags t
             JOIN items i ON i.id = t.item_id AND i.present = 1
             WHERE t.tag = ?1 ORDER BY t.item_id",
        )?;
        let ids = stmt
            .query_map([tag.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<ItemId>, _>>()?;
        Ok(ids)
    }

    fn add_tag(&self, ids: &[ItemId], tag: InternalTag) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO image_tags (item_id, tag) VALUES (?1, ?2)")?;
            for id in ids {
                stmt.execute(params![id, tag.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_tag(&self, ids: &[ItemId], tag: InternalTag) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM image_tags WHERE item_id = ?1 AND tag = ?2")?;
            for id in ids {
                stmt.execute(params![id, tag.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn tags(&self, id: ItemId) -> Result<Vec<InternalTag>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT tag FROM image_tags WHERE item_id = ?1")?;
        let names = stmt
            .query_map([id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tags: Vec<InternalTag> = names.iter().filter_map(|name| name.parse().ok()).collect();
        tags.sort();
        Ok(tags)
    }

    fn mark_removed(&self, ids: &[ItemId]) -> Result<Vec<ItemId>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut removed = Vec::new();
        for &id in ids {
            if tx.execute("UPDATE items SET present = 0 WHERE id = ?1 AND present = 1", [id])? > 0 {
                removed.push(id);
            }
        }

        let mut related = Vec::new();
        {
            let mut stmt = tx.prepare(
                "SELECT other FROM (
                     SELECT object AS other FROM image_relations WHERE subject = ?1
                     UNION SELECT subject AS other FROM image_relations WHERE object = ?1
                 ) JOIN items ON items.id = other AND items.present = 1
                 ORDER BY other LIMIT 1",
            )?;
            for &id in &removed {
                let survivor: Option<ItemId> = stmt.query_row([id], |row| row.get(0)).optional()?;
                if let Some(other) = survivor.filter(|other| !related.contains(other)) {
                    related.push(other);
                }
            }
        }

        tx.commit()?;
        Ok(related)
    }
}
