//! Payloads carried by history graph vertices and edges.

use super::types::{FilterAction, HistoryImageId, HistoryImageType, ItemId, ItemInfo};
use serde::Serialize;
use std::fmt;

/// What one vertex knows about its image
///
/// A vertex stands for all files with identical content. It collects the
/// history ids that referred to it and the persisted items it resolved to.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryVertexProperties {
    pub uuid: Option<String>,
    pub referred_images: Vec<HistoryImageId>,
    pub infos: Vec<ItemInfo>,
}

impl HistoryVertexProperties {
    /// The first resolved item, `None` for a dangling vertex
    pub fn first_item_info(&self) -> Option<&ItemInfo> {
        self.infos.first()
    }

    /// True once at least one persisted item is known
    pub fn is_resolved(&self) -> bool {
        !self.infos.is_empty()
    }

    /// True if any referred image carries `kind`
    pub fn marked_as(&self, kind: HistoryImageType) -> bool {
        self.referred_images.iter().any(|id| id.kind == kind)
    }

    /// True if there are referred images and all of them carry `kind`
    pub fn always_marked_as(&self, kind: HistoryImageType) -> bool {
        !self.referred_images.is_empty() && self.referred_images.iter().all(|id| id.kind == kind)
    }

    pub fn has_uuid(&self, uuid: &str) -> bool {
        self.uuid.as_deref() == Some(uuid)
    }

    pub fn contains_info(&self, info: &ItemInfo) -> bool {
        self.infos.contains(info)
    }

    pub fn contains_id(&self, id: ItemId) -> bool {
        self.infos.iter().any(|info| info.id == id)
    }

    /// Whether `id` refers to the image of this vertex
    ///
    /// If both sides know a uuid, it decides alone. Otherwise the id is
    /// compared with every referred image collected so far.
    pub fn matches(&self, id: &HistoryImageId) -> bool {
        if let (Some(own), Some(other)) = (self.uuid.as_deref().filter(|u| !u.is_empty()), id.uuid()) {
            return own == other;
        }

        self.referred_images
            .iter()
            .any(|referred| same_referred_image(referred, id))
    }

    /// Set the uuid unless one is known already
    pub fn merge_uuid(&mut self, uuid: &str) {
        if self.uuid.is_none() && !uuid.is_empty() {
            self.uuid = Some(uuid.to_string());
        }
    }

    /// Add a resolved item; null and known items are ignored
    pub fn add_info(&mut self, info: ItemInfo) {
        if info.is_null() || self.infos.contains(&info) {
            return;
        }

        if let Some(uuid) = info.uuid() {
            let uuid = uuid.to_string();
            self.merge_uuid(&uuid);
        }
        self.infos.push(info);
    }

    /// Add a referred image; invalid and known ids are ignored
    pub fn add_history_image_id(&mut self, id: HistoryImageId) {
        if !id.is_valid() || self.referred_images.contains(&id) {
            return;
        }

        if let Some(uuid) = id.uuid() {
            let uuid = uuid.to_string();
            self.merge_uuid(&uuid);
        }
        self.referred_images.push(id);
    }

    /// Ids of all resolved items
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.infos.iter().map(|info| info.id).collect()
    }
}

/// Short diagnostic form: `Id: 3`, `Ids: (3,4) UUID: 1a2b3c...`
impl fmt::Display for HistoryVertexProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.infos.iter().map(|info| info.id.to_string()).collect();

        if ids.len() == 1 {
            write!(f, "Id: {}", ids[0])?;
        } else {
            write!(f, "Ids: ({})", ids.join(","))?;
        }

        if let Some(uuid) = self.uuid.as_deref().filter(|u| !u.is_empty()) {
            let prefix: String = uuid.chars().take(6).collect();
            write!(f, " UUID: {}...", prefix)?;
        }

        Ok(())
    }
}

/// The actions that turned the parent of an edge into its child
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryEdgeProperties {
    pub actions: Vec<FilterAction>,
}

impl HistoryEdgeProperties {
    /// Append an action; repeated actions are kept
    pub fn push(&mut self, action: FilterAction) {
        self.actions.push(action);
    }

    pub fn first_action(&self) -> Option<&FilterAction> {
        self.actions.first()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Whether two history ids point at the same file
///
/// Checked in order: uuid, unique hash with file size, file name with
/// creation date, directory with file name. The first criterion that `a`
/// can answer decides.
pub fn same_referred_image(a: &HistoryImageId, b: &HistoryImageId) -> bool {
    if !a.is_valid() || !b.is_valid() {
        return false;
    }

    if let (Some(x), Some(y)) = (a.uuid(), b.uuid()) {
        return x == y;
    }

    if a.has_unique_hash_identifier() && b.has_unique_hash_identifier() {
        return a.unique_hash() == b.unique_hash() && a.file_size == b.file_size;
    }

    if a.has_file_name_and_date() {
        return a.file_name() == b.file_name() && a.creation_date == b.creation_date;
    }

    if a.has_file_on_disk() {
        return a.file_path() == b.file_path() && a.file_name() == b.file_name();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    fn original(uuid: &str) -> HistoryImageId {
        HistoryImageId::new(HistoryImageType::Original).with_uuid(uuid)
    }

    #[test]
    fn marked_as_any_always_marked_as_all() {
        let mut props = HistoryVertexProperties::default();
        props.add_history_image_id(HistoryImageId::new(HistoryImageType::Original).with_file_name("x.jpg"));
        props.add_history_image_id(HistoryImageId::new(HistoryImageType::Intermediate).with_file_name("y.jpg"));

        assert!(props.marked_as(HistoryImageType::Original));
        assert!(!props.always_marked_as(HistoryImageType::Original));
        assert!(!props.marked_as(HistoryImageType::Source));
    }

    #[test]
    fn always_marked_as_needs_referred_images() {
        let props = HistoryVertexProperties::default();
        assert!(!props.always_marked_as(HistoryImageType::Source));
    }

    #[test]
    fn adding_the_same_id_twice_keeps_one() {
        let mut props = HistoryVertexProperties::default();
        props.add_history_image_id(original("u1"));
        props.add_history_image_id(original("u1"));
        props.add_info(ItemInfo::new(3));
        props.add_info(ItemInfo::new(3));
        props.add_info(ItemInfo::new(0));

        assert_eq!(props.referred_images.len(), 1);
        assert_eq!(props.item_ids(), vec![3]);
        assert_eq!(props.uuid.as_deref(), Some("u1"));
    }

    #[test]
    fn uuid_is_backfilled_from_first_source_only() {
        let mut props = HistoryVertexProperties::default();
        let mut info = ItemInfo::new(1);
        info.uuid = Some("from-info".to_string());

        props.add_info(info);
        props.add_history_image_id(original("from-id"));

        assert_eq!(props.uuid.as_deref(), Some("from-info"));
    }

    #[test]
    fn uuid_decides_when_both_sides_know_one() {
        let mut props = HistoryVertexProperties::default();
        props.add_history_image_id(
            HistoryImageId::new(HistoryImageType::Original)
                .with_uuid("u1")
                .with_unique_hash("h", 10),
        );

        let same_hash_other_uuid = HistoryImageId::new(HistoryImageType::Current)
            .with_uuid("u2")
            .with_unique_hash("h", 10);
        let same_hash_no_uuid = HistoryImageId::new(HistoryImageType::Current)
            .with_file_name("x.jpg")
            .with_unique_hash("h", 10);

        assert!(!props.matches(&same_hash_other_uuid));
        assert!(props.matches(&same_hash_no_uuid));
    }

    #[test]
    fn same_referred_image_rules() {
        let date = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let by_name = |name: &str| {
            HistoryImageId::new(HistoryImageType::Current)
                .with_file_name(name)
                .with_creation_date(date)
        };

        assert!(same_referred_image(&by_name("a.jpg"), &by_name("a.jpg")));
        assert!(!same_referred_image(&by_name("a.jpg"), &by_name("b.jpg")));

        let on_disk = |dir: &str| HistoryImageId::new(HistoryImageType::Current).with_file(dir, "a.jpg");
        assert!(same_referred_image(&on_disk("/p"), &on_disk("/p")));
        assert!(!same_referred_image(&on_disk("/p"), &on_disk("/q")));

        assert!(!same_referred_image(&HistoryImageId::default(), &HistoryImageId::default()));
    }

    #[test]
    fn display_shows_ids_and_uuid_prefix() {
        let mut props = HistoryVertexProperties::default();
        props.add_info(ItemInfo::new(3));
        assert_eq!(props.to_string(), "Id: 3");

        props.add_info(ItemInfo::new(4));
        props.merge_uuid("1a2b3c4d5e");
        assert_eq!(props.to_string(), "Ids: (3,4) UUID: 1a2b3c...");
    }
}
