//! JSON catalogs of items and their histories.
//!
//! ```json
//! { "items": [
//!     { "name": "orig.jpg", "uuid": "a1" },
//!     { "name": "edit.jpg",
//!       "history": { "entries": [
//!         { "referred_images": [{ "type": "original", "uuid": "a1" }] },
//!         { "action": { "identifier": "transform:crop", "version": 1 } }
//!       ] } }
//! ] }
//! ```

use super::HistoryWriter;
use crate::core::history::{ImageHistory, ItemId, ItemInfo};
use crate::error::{HistoryGraphError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One item of a catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub info: ItemInfo,
    #[serde(default)]
    pub history: ImageHistory,
}

/// A set of items to import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub items: Vec<CatalogEntry>,
}

impl Catalog {
    /// Read a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| HistoryGraphError::Catalog {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&text).map_err(|e| HistoryGraphError::Catalog {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Store every item, returning the assigned ids in catalog order
    ///
    /// Histories are only stored here; a history scan turns them into
    /// relations.
    pub fn import<W>(&self, store: &W) -> Result<Vec<ItemId>>
    where
        W: HistoryWriter + ?Sized,
    {
        let mut ids = Vec::with_capacity(self.items.len());
        for entry in &self.items {
            ids.push(store.add_item(entry.info.clone(), &entry.history)?);
        }

        info!(count = ids.len(), "Imported catalog");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{HistoryStore, InMemoryStore, InternalTag, ItemResolver};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"{ "items": [
        { "name": "orig.jpg", "uuid": "a1", "album_id": 3 },
        { "name": "edit.jpg",
          "history": { "entries": [
            { "referred_images": [{ "type": "original", "uuid": "a1" }] },
            { "action": { "identifier": "transform:crop", "version": 1 } }
          ] } }
    ] }"#;

    #[test]
    fn catalog_loads_and_imports() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        let store = InMemoryStore::new();
        let ids = catalog.import(&store).unwrap();

        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.item_info(1).unwrap().album_id, Some(3));
        assert_eq!(store.image_history(2).len(), 2);
        assert_eq!(store.items_with_tag(InternalTag::NeedResolvingHistory).unwrap(), vec![2]);
    }

    #[test]
    fn malformed_catalog_names_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ items: ").unwrap();

        let error = Catalog::load(file.path()).unwrap_err();

        assert!(matches!(error, HistoryGraphError::Catalog { .. }));
        assert!(error.to_string().contains(&file.path().display().to_string()));
    }
}
