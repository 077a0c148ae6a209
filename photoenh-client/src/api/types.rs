//! Backend request/response shapes

use photoenh_common::models::{parse_timestamp, ConversionKind, EnhancedPhoto, PageState, PhotoAccess};
use photoenh_common::PhotoId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error body returned by the backend on failure
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}

/// Response of `/api/enhance` and `/api/convert-to-night`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnhanceResponse {
    pub enhanced_image_url: String,
    pub original_image_url: String,
    #[serde(default)]
    pub enhancements: Option<Map<String, Value>>,
    #[serde(default)]
    pub image_id: Option<PhotoId>,
    #[serde(default)]
    pub photo_id: Option<PhotoId>,
    #[serde(default)]
    pub requires_login: Option<bool>,
    #[serde(default)]
    pub conversion_type: Option<String>,
}

impl EnhanceResponse {
    /// Server id, if the backend persisted the result
    pub fn id(&self) -> Option<PhotoId> {
        self.image_id.or(self.photo_id)
    }

    /// Absent means the backend did not ask for a login
    pub fn requires_login(&self) -> bool {
        self.requires_login.unwrap_or(false)
    }

    pub fn into_photo(self, original_name: String, kind: ConversionKind) -> EnhancedPhoto {
        let access = PhotoAccess::from_id(self.id());
        let conversion_kind = match self.conversion_type.as_deref() {
            Some(name) => ConversionKind::from_backend_name(name),
            None => kind,
        };
        EnhancedPhoto {
            access,
            original_name,
            original_url: self.original_image_url,
            enhanced_url: self.enhanced_image_url,
            enhancement_params: self.enhancements.unwrap_or_default(),
            conversion_kind,
            selected: false,
            created_at: None,
        }
    }
}

/// One record of `GET /api/photos`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerPhoto {
    pub id: PhotoId,
    pub original_filename: String,
    #[serde(default)]
    pub enhancement_settings: Option<Map<String, Value>>,
    #[serde(default)]
    pub conversion_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<ServerPhoto> for EnhancedPhoto {
    fn from(photo: ServerPhoto) -> Self {
        let kind = photo
            .conversion_type
            .as_deref()
            .map(ConversionKind::from_backend_name)
            .unwrap_or_default();
        EnhancedPhoto::from_server(
            photo.id,
            photo.original_filename,
            photo.enhancement_settings.unwrap_or_default(),
            kind,
            photo.created_at.as_deref().and_then(parse_timestamp),
        )
    }
}

/// `pagination` object of `GET /api/photos`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationInfo {
    pub page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
    pub pages: u32,
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Body of `GET /api/photos`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhotoListResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub photos: Vec<ServerPhoto>,
    #[serde(default)]
    pub pagination: Option<PaginationInfo>,
}

/// One fetched page mapped into canonical records
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoPage {
    pub photos: Vec<EnhancedPhoto>,
    pub page_state: PageState,
}

/// Body of `GET /api/user/stats`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserStats {
    pub images_processed: u64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Body of `POST /api/payment/check-status`
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub paid: bool,
}

/// Body of `POST /api/payment/create-checkout-session`
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A photo covered by a just-completed payment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaidPhoto {
    pub id: PhotoId,
    pub enhanced_filename: String,
}

impl PaidPhoto {
    /// Name to save the download under: `enhanced_beach.jpg` becomes `beach.jpg`
    pub fn download_file_name(&self) -> String {
        let stem = self
            .enhanced_filename
            .replace("enhanced_", "")
            .replace(".jpg", "");
        format!("{}.jpg", stem)
    }
}
