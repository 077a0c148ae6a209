//! Backend collaborators
//!
//! Each external service the controller talks to sits behind a trait so the
//! reconciliation logic can be driven by fakes in tests. [`BackendClient`]
//! implements all of them over HTTP.

mod client;
mod types;

pub use client::BackendClient;
pub use types::{
    CheckoutResponse, EnhanceResponse, ErrorBody, PaginationInfo, PaidPhoto, PaymentStatusResponse,
    PhotoListResponse, PhotoPage, ServerPhoto, UserStats,
};

use crate::error::ClientResult;
use crate::upload::UploadFile;
use async_trait::async_trait;
use photoenh_common::models::EnhanceSettings;
use photoenh_common::PhotoId;

/// AI processing endpoints
#[async_trait]
pub trait EnhancementBackend: Send + Sync {
    /// `POST /api/enhance`
    async fn enhance(
        &self,
        file: &UploadFile,
        settings: &EnhanceSettings,
    ) -> ClientResult<EnhanceResponse>;

    /// `POST /api/convert-to-night`
    async fn convert_to_night(&self, file: &UploadFile) -> ClientResult<EnhanceResponse>;
}

/// Durable, paginated photo list
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Fetch one page of the user's photos
    ///
    /// # Errors
    /// Transport failure, non-success status or `success: false`. Callers
    /// must keep whatever they were displaying.
    async fn fetch_page(&self, page: u32, page_size: u32) -> ClientResult<PhotoPage>;

    /// `DELETE /api/photos/{id}`
    async fn delete_photo(&self, id: PhotoId) -> ClientResult<()>;
}

/// Authentication session and account data
#[async_trait]
pub trait AccountService: Send + Sync {
    /// `GET /api/check-auth`
    async fn check_auth(&self) -> ClientResult<bool>;

    /// `GET /api/user/stats`
    async fn user_stats(&self) -> ClientResult<UserStats>;
}

/// Hosted checkout and payment status
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// True only when the backend confirms every id is covered by a completed payment
    async fn check_status(&self, ids: &[PhotoId]) -> ClientResult<bool>;

    /// Create a checkout session and return its redirect URL
    async fn create_checkout(&self, ids: &[PhotoId]) -> ClientResult<String>;
}

/// Raw image bytes served by the backend
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch `path`, which is either a backend-relative path or an absolute URL
    async fn fetch_asset(&self, path: &str) -> ClientResult<Vec<u8>>;
}
