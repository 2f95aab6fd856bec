//! Ordering of content-identical items by closeness to a subject.

use crate::core::history::ItemInfo;

/// Sort `infos` so the copies closest to `subject` come first
///
/// Same album first, then same album root, then nearest modification time,
/// then id. The sort is stable and keeps every item.
pub fn sort_by_proximity(infos: &mut [ItemInfo], subject: &ItemInfo) {
    infos.sort_by_cached_key(|info| proximity_key(info, subject));
}

fn proximity_key(info: &ItemInfo, subject: &ItemInfo) -> (bool, bool, i64, i64) {
    let same_album = info.album_id.is_some() && info.album_id == subject.album_id;
    let same_root = info.album_root_id.is_some() && info.album_root_id == subject.album_root_id;

    let distance = match (info.modification_date, subject.modification_date) {
        (Some(a), Some(b)) => (a - b).num_seconds().saturating_abs(),
        _ => i64::MAX,
    };

    (!same_album, !same_root, distance, info.id)
}
