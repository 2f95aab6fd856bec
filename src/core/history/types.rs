//! Value types for image histories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;

/// Numeric id of a persisted item; valid ids are positive
pub type ItemId = i64;

/// Snapshot of a persisted item
///
/// Two snapshots are equal when they name the same item id, whatever the
/// state of their other fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemInfo {
    pub id: ItemId,
    /// Content identity shared by all copies of the same image
    pub uuid: Option<String>,
    pub album_id: Option<i64>,
    pub album_root_id: Option<i64>,
    /// File name without directory
    pub name: String,
    /// Directory containing the file
    pub file_path: String,
    pub modification_date: Option<DateTime<Utc>>,
    pub creation_date: Option<DateTime<Utc>>,
    pub file_size: Option<u64>,
    pub unique_hash: Option<String>,
}

impl ItemInfo {
    /// A snapshot carrying nothing but the id
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// True for the invalid handle (id < 1)
    pub fn is_null(&self) -> bool {
        self.id < 1
    }

    /// The uuid, if set and non-empty
    pub fn uuid(&self) -> Option<&str> {
        non_empty(&self.uuid)
    }

    /// Full path of the file on disk
    pub fn full_path(&self) -> PathBuf {
        PathBuf::from(&self.file_path).join(&self.name)
    }
}

impl PartialEq for ItemInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ItemInfo {}

impl Hash for ItemInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Role of a referred image within a history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryImageType {
    #[default]
    Unspecified,
    /// Not part of the history itself, used as an input (e.g. an overlay)
    Source,
    Original,
    Intermediate,
    Current,
}

impl HistoryImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Source => "source",
            Self::Original => "original",
            Self::Intermediate => "intermediate",
            Self::Current => "current",
        }
    }
}

/// A set of [`HistoryImageType`] flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryImageTypes(u8);

impl HistoryImageTypes {
    pub const NONE: Self = Self(0);
    pub const SOURCE: Self = Self(1);
    pub const ORIGINAL: Self = Self(1 << 1);
    pub const INTERMEDIATE: Self = Self(1 << 2);
    pub const CURRENT: Self = Self(1 << 3);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: impl Into<HistoryImageTypes>) -> bool {
        let other = other.into();
        !other.is_empty() && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: impl Into<HistoryImageTypes>) {
        self.0 |= other.into().0;
    }

    /// The individual types in this set
    pub fn types(self) -> Vec<HistoryImageType> {
        [
            HistoryImageType::Source,
            HistoryImageType::Original,
            HistoryImageType::Intermediate,
            HistoryImageType::Current,
        ]
        .into_iter()
        .filter(|&t| self.contains(t))
        .collect()
    }
}

impl From<HistoryImageType> for HistoryImageTypes {
    fn from(kind: HistoryImageType) -> Self {
        match kind {
            HistoryImageType::Unspecified => Self::NONE,
            HistoryImageType::Source => Self::SOURCE,
            HistoryImageType::Original => Self::ORIGINAL,
            HistoryImageType::Intermediate => Self::INTERMEDIATE,
            HistoryImageType::Current => Self::CURRENT,
        }
    }
}

impl BitOr for HistoryImageTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for HistoryImageTypes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for HistoryImageTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }

        let names: Vec<&str> = self.types().iter().map(|t| t.as_str()).collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Identifies an image referred to from a history
///
/// The fields describe the file as it was when the history was written;
/// any of them may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryImageId {
    #[serde(rename = "type")]
    pub kind: HistoryImageType,
    pub uuid: Option<String>,
    pub file_name: Option<String>,
    /// Directory containing the file
    pub file_path: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub unique_hash: Option<String>,
    pub file_size: Option<u64>,
    /// Uuid of the original this image was derived from
    pub original_uuid: Option<String>,
}

impl HistoryImageId {
    pub fn new(kind: HistoryImageType) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_file(mut self, file_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_unique_hash(mut self, hash: impl Into<String>, file_size: u64) -> Self {
        self.unique_hash = Some(hash.into());
        self.file_size = Some(file_size);
        self
    }

    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    /// A usable id has a type and either a uuid or a file name
    pub fn is_valid(&self) -> bool {
        self.kind != HistoryImageType::Unspecified && (self.uuid().is_some() || self.file_name().is_some())
    }

    pub fn uuid(&self) -> Option<&str> {
        non_empty(&self.uuid)
    }

    pub fn file_name(&self) -> Option<&str> {
        non_empty(&self.file_name)
    }

    pub fn file_path(&self) -> Option<&str> {
        non_empty(&self.file_path)
    }

    pub fn unique_hash(&self) -> Option<&str> {
        non_empty(&self.unique_hash)
    }

    /// Unique hash together with the file size
    pub fn has_unique_hash_identifier(&self) -> bool {
        self.unique_hash().is_some() && self.file_size.is_some()
    }

    /// File name together with the creation date
    pub fn has_file_name_and_date(&self) -> bool {
        self.file_name().is_some() && self.creation_date.is_some()
    }

    /// Directory and file name
    pub fn has_file_on_disk(&self) -> bool {
        self.file_path().is_some() && self.file_name().is_some()
    }
}

/// Category of a filter action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    /// Fully described by identifier and parameters
    #[default]
    ReproducibleFilter,
    /// Described, but depends on more than its parameters
    ComplexFilter,
    /// Only documented, cannot be replayed
    DocumentedHistory,
    CustomCategory,
}

/// Flags of a filter action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterActionFlags(u8);

impl FilterActionFlags {
    pub const NONE: Self = Self(0);
    /// The input of this action stays a visible current version
    pub const EXPLICIT_BRANCH: Self = Self(1);

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for FilterActionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One transformation step applied to an image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterAction {
    /// Machine-readable filter name, e.g. `transform:rotate`
    pub identifier: String,
    pub version: u32,
    pub category: FilterCategory,
    pub flags: FilterActionFlags,
    pub description: Option<String>,
    pub params: BTreeMap<String, serde_json::Value>,
}

impl FilterAction {
    pub fn new(identifier: impl Into<String>, version: u32) -> Self {
        Self {
            identifier: identifier.into(),
            version,
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: FilterActionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn is_explicit_branch(&self) -> bool {
        self.flags.contains(FilterActionFlags::EXPLICIT_BRANCH)
    }

    /// Human-readable name: the description if any, else the identifier
    pub fn display_name(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.identifier)
    }
}

/// One step of an image history
///
/// `action` produced this step from the previous one. `referred_images`
/// lists the files holding the result of this step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    pub action: Option<FilterAction>,
    pub referred_images: Vec<HistoryImageId>,
}

/// The history sequence of one image, oldest step first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageHistory {
    pub entries: Vec<HistoryEntry>,
}

impl ImageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Append a step produced by `action`
    pub fn push_action(&mut self, action: FilterAction) {
        self.entries.push(HistoryEntry {
            action: Some(action),
            referred_images: Vec::new(),
        });
    }

    /// Record `id` as a file holding the result of the last step
    pub fn push_referred_image(&mut self, id: HistoryImageId) {
        match self.entries.last_mut() {
            Some(entry) => entry.referred_images.push(id),
            None => self.entries.push(HistoryEntry {
                action: None,
                referred_images: vec![id],
            }),
        }
    }

    /// Builder form of [`push_action`](Self::push_action)
    pub fn then(mut self, action: FilterAction) -> Self {
        self.push_action(action);
        self
    }

    /// Builder form of [`push_referred_image`](Self::push_referred_image)
    pub fn referring(mut self, id: HistoryImageId) -> Self {
        self.push_referred_image(id);
        self
    }

    /// All referred images of all steps, oldest first
    pub fn referred_images(&self) -> impl Iterator<Item = &HistoryImageId> {
        self.entries.iter().flat_map(|e| e.referred_images.iter())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
