//! Photo, session and pagination models
//!
//! `EnhancedPhoto` is the single canonical record shape shared by the local
//! pending-photo cache and the server photo list. Payment gating is carried by
//! [`PhotoAccess`]: a record is `Gated` exactly when the backend assigned it an
//! identifier.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Server-assigned photo identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(pub i64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Download access of a photo record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoAccess {
    /// Ephemeral preview, never persisted server-side, free to download
    Free,
    /// Persisted server-side, download requires a completed payment
    Gated(PhotoId),
}

impl PhotoAccess {
    pub fn from_id(id: Option<PhotoId>) -> Self {
        match id {
            Some(id) => PhotoAccess::Gated(id),
            None => PhotoAccess::Free,
        }
    }

    pub fn id(&self) -> Option<PhotoId> {
        match self {
            PhotoAccess::Free => None,
            PhotoAccess::Gated(id) => Some(*id),
        }
    }

    pub fn is_gated(&self) -> bool {
        matches!(self, PhotoAccess::Gated(_))
    }
}

/// Which processing endpoint produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionKind {
    #[default]
    #[serde(alias = "enhancement")]
    Standard,
    #[serde(alias = "night_conversion")]
    Night,
}

impl ConversionKind {
    /// Map the backend's `conversion_type` column onto a kind
    ///
    /// Unknown values are treated as standard enhancement.
    pub fn from_backend_name(name: &str) -> Self {
        match name {
            "night" | "night_conversion" => ConversionKind::Night,
            _ => ConversionKind::Standard,
        }
    }
}

/// A processed photo shown in a before/after comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredPhoto", into = "StoredPhoto")]
pub struct EnhancedPhoto {
    pub access: PhotoAccess,
    pub original_name: String,
    /// Source image location
    pub original_url: String,
    /// Processed image location, either a `data:` URI or a server path
    pub enhanced_url: String,
    pub enhancement_params: Map<String, Value>,
    pub conversion_kind: ConversionKind,
    pub selected: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl EnhancedPhoto {
    /// Build the canonical record for a photo persisted on the server
    ///
    /// Image locations are derived from the id.
    pub fn from_server(
        id: PhotoId,
        original_name: String,
        enhancement_params: Map<String, Value>,
        conversion_kind: ConversionKind,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access: PhotoAccess::Gated(id),
            original_name,
            original_url: original_image_path(id),
            enhanced_url: enhanced_image_path(id),
            enhancement_params,
            conversion_kind,
            selected: false,
            created_at,
        }
    }

    pub fn id(&self) -> Option<PhotoId> {
        self.access.id()
    }

    pub fn is_gated(&self) -> bool {
        self.access.is_gated()
    }

    /// True when the enhanced image is carried inline rather than served by the backend
    pub fn is_inline(&self) -> bool {
        self.enhanced_url.starts_with("data:")
    }

    /// File name used when saving the enhanced image
    ///
    /// `beach.png` becomes `beach_enhanced.jpg`.
    pub fn download_file_name(&self) -> String {
        enhanced_file_name(&self.original_name)
    }
}

/// Replace the extension of `name` with `_enhanced.jpg`
pub fn enhanced_file_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    };
    format!("{}_enhanced.jpg", stem)
}

/// Server path of the original image for a persisted photo
pub fn original_image_path(id: PhotoId) -> String {
    format!("/api/photos/{}/original", id)
}

/// Server path of the enhanced image for a persisted photo
pub fn enhanced_image_path(id: PhotoId) -> String {
    format!("/api/photos/{}/enhanced", id)
}

/// Wire shape of a photo in the local key-value store
///
/// Field names match the keys the web front end has always written, so a
/// cache left behind by an older page still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPhoto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PhotoId>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub enhanced_url: Option<String>,
    #[serde(default, alias = "enhancements")]
    pub enhancement_params: Option<Map<String, Value>>,
    #[serde(default)]
    pub conversion_kind: Option<ConversionKind>,
    #[serde(default)]
    pub selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl TryFrom<StoredPhoto> for EnhancedPhoto {
    type Error = String;

    fn try_from(stored: StoredPhoto) -> std::result::Result<Self, Self::Error> {
        let original_url = stored
            .original_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "missing originalUrl".to_string())?;
        let enhanced_url = stored
            .enhanced_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "missing enhancedUrl".to_string())?;

        Ok(Self {
            access: PhotoAccess::from_id(stored.id),
            original_name: stored.original_name.unwrap_or_default(),
            original_url,
            enhanced_url,
            enhancement_params: stored.enhancement_params.unwrap_or_default(),
            conversion_kind: stored.conversion_kind.unwrap_or_default(),
            selected: stored.selected.unwrap_or(false),
            created_at: stored.created_at.as_deref().and_then(parse_timestamp),
        })
    }
}

impl From<EnhancedPhoto> for StoredPhoto {
    fn from(photo: EnhancedPhoto) -> Self {
        Self {
            id: photo.access.id(),
            original_name: Some(photo.original_name),
            original_url: Some(photo.original_url),
            enhanced_url: Some(photo.enhanced_url),
            enhancement_params: Some(photo.enhancement_params),
            conversion_kind: Some(photo.conversion_kind),
            selected: Some(photo.selected),
            created_at: photo.created_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Parse a backend timestamp
///
/// Accepts RFC 3339 and the naive ISO-8601 form the backend emits (assumed UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Pending photos produced by an anonymous upload
///
/// Always replaced wholesale, never partially updated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalSession {
    pub pending_photos: Vec<EnhancedPhoto>,
    pub requires_login: bool,
}

impl LocalSession {
    pub fn new(pending_photos: Vec<EnhancedPhoto>, requires_login: bool) -> Self {
        Self {
            pending_photos,
            requires_login,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending_photos.is_empty()
    }
}

/// Pagination state of the server photo list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// Current page number (1-indexed)
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageState {
    /// State before any page has been fetched
    pub fn empty(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size,
            total_pages: 0,
            total_count: 0,
            has_next: false,
            has_prev: false,
        }
    }
}

/// Strength of the standard enhancement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeIntensity {
    Subtle,
    #[default]
    Moderate,
    Strong,
}

impl ChangeIntensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeIntensity::Subtle => "subtle",
            ChangeIntensity::Moderate => "moderate",
            ChangeIntensity::Strong => "strong",
        }
    }
}

/// Amount of detail recovery in the standard enhancement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Minimal,
    #[default]
    Moderate,
    Extensive,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Minimal => "minimal",
            DetailLevel::Moderate => "moderate",
            DetailLevel::Extensive => "extensive",
        }
    }
}

/// Per-batch processing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnhanceSettings {
    pub change_intensity: ChangeIntensity,
    pub detail_level: DetailLevel,
    /// Send the batch to night conversion instead of standard enhancement
    pub night_mode: bool,
}
