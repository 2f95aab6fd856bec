//! In-memory store backend for testing.

use super::{resolve_among, HistoryStore, HistoryWriter, InternalTag, ItemResolver};
use crate::core::history::{HistoryImageId, ImageHistory, ItemId, ItemInfo};
use crate::error::StoreError;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredItem {
    info: ItemInfo,
    removed: bool,
}

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<ItemId, StoredItem>,
    histories: HashMap<ItemId, ImageHistory>,
    /// `(derived, ancestor)` pairs
    relations: BTreeSet<(ItemId, ItemId)>,
    tags: HashMap<ItemId, BTreeSet<InternalTag>>,
}

impl State {
    fn is_present(&self, id: ItemId) -> bool {
        self.items.get(&id).is_some_and(|item| !item.removed)
    }

    fn present_items(&self) -> impl Iterator<Item = &ItemInfo> + Clone {
        self.items.values().filter(|item| !item.removed).map(|item| &item.info)
    }

    fn present_relations_of(&self, id: ItemId) -> impl Iterator<Item = (ItemId, ItemId)> + '_ {
        self.relations
            .iter()
            .copied()
            .filter(move |&(derived, ancestor)| derived == id || ancestor == id)
            .filter(move |&(derived, ancestor)| self.is_present(derived) && self.is_present(ancestor))
    }
}

/// In-memory store backend
///
/// Useful for testing and scenarios where persistence isn't needed.
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Put an item into the store as is, replacing an item with the same id
    pub fn insert(&self, info: ItemInfo) {
        if let Ok(mut state) = self.write() {
            state.items.insert(info.id, StoredItem { info, removed: false });
        }
    }

    /// Replace the stored history of an item
    pub fn set_history(&self, id: ItemId, history: ImageHistory) {
        if let Ok(mut state) = self.write() {
            state.histories.insert(id, history);
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn read_or_warn(&self) -> Option<RwLockReadGuard<'_, State>> {
        match self.read() {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "In-memory store is unavailable");
                None
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemResolver for InMemoryStore {
    fn item_info(&self, id: ItemId) -> Option<ItemInfo> {
        let state = self.read_or_warn()?;
        state
            .items
            .get(&id)
            .filter(|item| !item.removed)
            .map(|item| item.info.clone())
    }

    fn resolve_history_image_id(&self, id: &HistoryImageId) -> Vec<ItemId> {
        match self.read_or_warn() {
            Some(state) => resolve_among(id, state.present_items()),
            None => Vec::new(),
        }
    }
}

impl HistoryStore for InMemoryStore {
    fn relation_cloud(&self, id: ItemId) -> Vec<(ItemId, ItemId)> {
        let Some(state) = self.read_or_warn() else {
            return Vec::new();
        };

        if !state.is_present(id) {
            return Vec::new();
        }

        let mut pairs = BTreeSet::new();
        let mut seen = BTreeSet::from([id]);
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for (derived, ancestor) in state.present_relations_of(current) {
                pairs.insert((derived, ancestor));
                for next in [derived, ancestor] {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        pairs.into_iter().collect()
    }

    fn image_history(&self, id: ItemId) -> ImageHistory {
        self.read_or_warn()
            .and_then(|state| state.histories.get(&id).cloned())
            .unwrap_or_default()
    }
}

impl HistoryWriter for InMemoryStore {
    fn add_item(&self, mut info: ItemInfo, history: &ImageHistory) -> Result<ItemId, StoreError> {
        let mut state = self.write()?;

        if info.id < 1 {
            info.id = state.items.keys().next_back().map_or(1, |last| last + 1);
        }
        if info.uuid().is_none() {
            info.uuid = Some(Uuid::new_v4().to_string());
        }

        let id = info.id;
        state.items.insert(id, StoredItem { info, removed: false });

        if !history.is_empty() {
            state.histories.insert(id, history.clone());
            state.tags.entry(id).or_default().insert(InternalTag::NeedResolvingHistory);
        }

        Ok(id)
    }

    fn add_image_relations(&self, subjects: &[ItemId], objects: &[ItemId]) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for (&subject, &object) in subjects.iter().zip(objects) {
            state.relations.insert((subject, object));
        }
        Ok(())
    }

    fn items_with_tag(&self, tag: InternalTag) -> Result<Vec<ItemId>, StoreError> {
        let state = self.read()?;
        let mut ids: Vec<ItemId> = state
            .tags
            .iter()
            .filter(|(id, tags)| tags.contains(&tag) && state.is_present(**id))
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn add_tag(&self, ids: &[ItemId], tag: InternalTag) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for &id in ids {
            state.tags.entry(id).or_default().insert(tag);
        }
        Ok(())
    }

    fn remove_tag(&self, ids: &[ItemId], tag: InternalTag) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for id in ids {
            if let Some(tags) = state.tags.get_mut(id) {
                tags.remove(&tag);
            }
        }
        Ok(())
    }

    fn tags(&self, id: ItemId) -> Result<Vec<InternalTag>, StoreError> {
        let state = self.read()?;
        Ok(state
            .tags
            .get(&id)
            .map(|tags| tags.iter().copied().collect())
            .unwrap_or_default())
    }

    fn mark_removed(&self, ids: &[ItemId]) -> Result<Vec<ItemId>, StoreError> {
        let mut state = self.write()?;

        let mut removed = Vec::new();
        for id in ids {
            if let Some(item) = state.items.get_mut(id).filter(|item| !item.removed) {
                item.removed = true;
                removed.push(*id);
            }
        }

        let mut related = Vec::new();
        for id in removed {
            let survivor = state
                .relations
                .iter()
                .filter_map(|&(derived, ancestor)| {
                    if derived == id {
                        Some(ancestor)
                    } else if ancestor == id {
                        Some(derived)
                    } else {
                        None
                    }
                })
                .filter(|&other| state.is_present(other))
                .min();

            if let Some(other) = survivor {
                if !related.contains(&other) {
                    related.push(other);
                }
            }
        }

        Ok(related)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::{FilterAction, HistoryImageType};

    fn item(id: ItemId, uuid: &str) -> ItemInfo {
        ItemInfo {
            id,
            uuid: Some(uuid.to_string()),
            name: format!("{uuid}.jpg"),
            ..Default::default()
        }
    }

    fn store_with_chain() -> InMemoryStore {
        let store = InMemoryStore::new();
        for id in 1..=4 {
            store.insert(item(id, &format!("u{id}")));
        }
        store.add_image_relations(&[2, 3], &[1, 2]).unwrap();
        store
    }

    #[test]
    fn removed_items_are_invisible() {
        let store = store_with_chain();

        store.mark_removed(&[2]).unwrap();

        assert!(store.item_info(2).is_none());
        let id = HistoryImageId::new(HistoryImageType::Original).with_uuid("u2");
        assert!(store.resolve_history_image_id(&id).is_empty());
    }

    #[test]
    fn relation_cloud_covers_the_component() {
        let store = store_with_chain();

        assert_eq!(store.relation_cloud(3), vec![(2, 1), (3, 2)]);
        assert!(store.relation_cloud(4).is_empty());
    }

    #[test]
    fn relation_cloud_skips_removed_items() {
        let store = store_with_chain();

        let related = store.mark_removed(&[3]).unwrap();

        assert_eq!(related, vec![2]);
        assert_eq!(store.relation_cloud(1), vec![(2, 1)]);
    }

    #[test]
    fn removing_twice_reports_nothing() {
        let store = store_with_chain();

        store.mark_removed(&[3]).unwrap();

        assert!(store.mark_removed(&[3]).unwrap().is_empty());
    }

    #[test]
    fn add_item_assigns_id_and_uuid() {
        let store = store_with_chain();
        let history = ImageHistory::new()
            .referring(HistoryImageId::new(HistoryImageType::Original).with_uuid("u1"))
            .then(FilterAction::new("transform:rotate", 1));

        let id = store.add_item(ItemInfo::default(), &history).unwrap();

        assert_eq!(id, 5);
        assert!(store.item_info(5).unwrap().uuid().is_some());
        assert_eq!(store.image_history(5), history);
        assert_eq!(store.items_with_tag(InternalTag::NeedResolvingHistory).unwrap(), vec![5]);
    }

    #[test]
    fn tags_are_added_and_removed() {
        let store = store_with_chain();

        store.add_tag(&[1, 2], InternalTag::OriginalVersion).unwrap();
        store.remove_tag(&[2], InternalTag::OriginalVersion).unwrap();

        assert_eq!(store.tags(1).unwrap(), vec![InternalTag::OriginalVersion]);
        assert!(store.tags(2).unwrap().is_empty());
        assert_eq!(store.items_with_tag(InternalTag::OriginalVersion).unwrap(), vec![1]);
    }
}
