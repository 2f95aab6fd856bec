//! Store trait definitions.

use super::proximity;
use super::InternalTag;
use crate::core::history::{HistoryImageId, HistoryImageType, ImageHistory, ItemId, ItemInfo};
use crate::error::StoreError;

/// Looks up persisted items for the history graph
///
/// Lookups never fail: a backend that cannot answer logs the problem and
/// returns nothing. Results are never cached by the graph, so a backend may
/// change between calls.
pub trait ItemResolver: Send + Sync {
    /// Snapshot of an item, `None` if unknown or removed
    fn item_info(&self, id: ItemId) -> Option<ItemInfo>;

    /// Ids of the present items matching a history id
    ///
    /// Tried in order, the first criterion with matches wins: uuid, unique
    /// hash with file size, file name with creation date, directory with
    /// file name.
    fn resolve_history_image_id(&self, id: &HistoryImageId) -> Vec<ItemId>;

    /// The history id describing an item as the current version of itself
    fn history_image_id(&self, info: &ItemInfo) -> HistoryImageId {
        HistoryImageId {
            kind: HistoryImageType::Current,
            uuid: info.uuid.clone(),
            file_name: Some(info.name.clone()).filter(|n| !n.is_empty()),
            file_path: Some(info.file_path.clone()).filter(|p| !p.is_empty()),
            creation_date: info.creation_date,
            unique_hash: info.unique_hash.clone(),
            file_size: info.file_size,
            original_uuid: None,
        }
    }

    /// Order content-identical items by closeness to `subject`
    fn sort_by_proximity(&self, infos: &mut Vec<ItemInfo>, subject: &ItemInfo) {
        proximity::sort_by_proximity(infos, subject);
    }
}

/// Read access to relations and histories
pub trait HistoryStore: ItemResolver {
    /// Derived-from pairs `(derived, ancestor)` of the connected component
    /// containing `id`; removed items are left out
    fn relation_cloud(&self, id: ItemId) -> Vec<(ItemId, ItemId)>;

    /// The stored history of an item, empty if none
    fn image_history(&self, id: ItemId) -> ImageHistory;
}

/// Write access used by scanning and import
pub trait HistoryWriter: HistoryStore {
    /// Store an item and its history, returning its id
    ///
    /// Items without an id get the next free one, items without a uuid get
    /// a fresh random uuid. Items with a history are tagged
    /// [`InternalTag::NeedResolvingHistory`].
    fn add_item(&self, info: ItemInfo, history: &ImageHistory) -> Result<ItemId, StoreError>;

    /// Record `subjects[i]` as derived from `objects[i]`; known pairs are skipped
    fn add_image_relations(&self, subjects: &[ItemId], objects: &[ItemId]) -> Result<(), StoreError>;

    /// Ids of present items carrying `tag`, ascending
    fn items_with_tag(&self, tag: InternalTag) -> Result<Vec<ItemId>, StoreError>;

    fn add_tag(&self, ids: &[ItemId], tag: InternalTag) -> Result<(), StoreError>;

    fn remove_tag(&self, ids: &[ItemId], tag: InternalTag) -> Result<(), StoreError>;

    /// Tags of one item
    fn tags(&self, id: ItemId) -> Result<Vec<InternalTag>, StoreError>;

    /// Mark items removed
    ///
    /// Returns, for each removed item that had relations, one related item
    /// that is still present. Callers queue those for re-tagging.
    fn mark_removed(&self, ids: &[ItemId]) -> Result<Vec<ItemId>, StoreError>;
}

/// Resolve a history id against a set of candidate items
///
/// Shared by backends that keep their items in memory.
pub(crate) fn resolve_among<'a, I>(id: &HistoryImageId, candidates: I) -> Vec<ItemId>
where
    I: IntoIterator<Item = &'a ItemInfo> + Clone,
{
    if !id.is_valid() {
        return Vec::new();
    }

    let criteria: [&dyn Fn(&ItemInfo) -> bool; 4] = [
        &|info: &ItemInfo| id.uuid().is_some() && info.uuid() == id.uuid(),
        &|info: &ItemInfo| {
            id.has_unique_hash_identifier()
                && info.unique_hash.as_deref() == id.unique_hash()
                && info.file_size == id.file_size
        },
        &|info: &ItemInfo| {
            id.has_file_name_and_date()
                && Some(info.name.as_str()) == id.file_name()
                && info.creation_date == id.creation_date
        },
        &|info: &ItemInfo| {
            id.has_file_on_disk()
                && Some(info.file_path.as_str()) == id.file_path()
                && Some(info.name.as_str()) == id.file_name()
        },
    ];

    for matches in criteria {
        let mut found: Vec<ItemId> = candidates
            .clone()
            .into_iter()
            .filter(|&info| matches(info))
            .map(|info| info.id)
            .collect();

        if !found.is_empty() {
            found.sort_unstable();
            return found;
        }
    }

    Vec::new()
}
