//! HTTP client for the photo enhancement backend

use super::types::{
    CheckoutResponse, EnhanceResponse, ErrorBody, PaymentStatusResponse, PhotoListResponse,
    PhotoPage, UserStats,
};
use super::{AccountService, AssetFetcher, EnhancementBackend, PaymentService, PhotoSource};
use crate::error::{ClientError, ClientResult};
use crate::pagination::page_state_from;
use crate::upload::UploadFile;
use async_trait::async_trait;
use photoenh_common::config::ClientConfig;
use photoenh_common::models::{EnhanceSettings, EnhancedPhoto};
use photoenh_common::PhotoId;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const USER_AGENT: &str = concat!("photoenh/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct AuthStatus {
    #[serde(default)]
    authenticated: bool,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Backend API client
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session_cookie: Option<&str>,
    ) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ClientError::InvalidState(format!("Invalid session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            config.session_cookie.as_deref(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Turn a non-success status into `ClientError::Api`
    ///
    /// The message is the body's `error` field, the status when a JSON body
    /// has none, or "Unknown error" when the body is not JSON at all.
    async fn check_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(status.as_u16(), &text);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn image_part(file: &UploadFile) -> ClientResult<Part> {
        Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| ClientError::Parse(format!("Invalid MIME type {}: {}", file.mime, e)))
    }

    async fn post_image(&self, path: &str, form: Form) -> ClientResult<EnhanceResponse> {
        let response = self.http.post(self.url(path)).multipart(form).send().await?;
        let response = Self::check_response(response).await?;
        response
            .json::<EnhanceResponse>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(error) }) => error,
        Ok(ErrorBody { error: None }) => format!("HTTP error! status: {}", status),
        Err(_) => "Unknown error".to_string(),
    }
}

#[async_trait]
impl EnhancementBackend for BackendClient {
    async fn enhance(
        &self,
        file: &UploadFile,
        settings: &EnhanceSettings,
    ) -> ClientResult<EnhanceResponse> {
        let form = Form::new()
            .part("image", Self::image_part(file)?)
            .text("change_intensity", settings.change_intensity.as_str())
            .text("detail_level", settings.detail_level.as_str());

        tracing::debug!(file = %file.name, "POST /api/enhance");
        self.post_image("/api/enhance", form).await
    }

    async fn convert_to_night(&self, file: &UploadFile) -> ClientResult<EnhanceResponse> {
        let form = Form::new().part("image", Self::image_part(file)?);

        tracing::debug!(file = %file.name, "POST /api/convert-to-night");
        self.post_image("/api/convert-to-night", form).await
    }
}

#[async_trait]
impl PhotoSource for BackendClient {
    async fn fetch_page(&self, page: u32, page_size: u32) -> ClientResult<PhotoPage> {
        let response = self
            .http
            .get(self.url("/api/photos"))
            .query(&[("page", page), ("per_page", page_size)])
            .send()
            .await?;
        let status = response.status().as_u16();
        let response = Self::check_response(response).await?;

        let body: PhotoListResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        if !body.success {
            return Err(ClientError::Api {
                status,
                message: "Photo list request was not successful".to_string(),
            });
        }

        let info = body
            .pagination
            .ok_or_else(|| ClientError::Parse("Photo list response missing pagination".to_string()))?;

        let photos: Vec<EnhancedPhoto> = body.photos.into_iter().map(EnhancedPhoto::from).collect();
        tracing::debug!(page, count = photos.len(), total = info.total, "Fetched photo page");

        Ok(PhotoPage {
            photos,
            page_state: page_state_from(&info, page_size),
        })
    }

    async fn delete_photo(&self, id: PhotoId) -> ClientResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/api/photos/{}", id)))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body: DeleteResponse = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        if body.success {
            Ok(())
        } else {
            Err(ClientError::Api {
                status,
                message: body.error.unwrap_or_else(|| "Delete failed".to_string()),
            })
        }
    }
}

#[async_trait]
impl AccountService for BackendClient {
    async fn check_auth(&self) -> ClientResult<bool> {
        let response = self.http.get(self.url("/api/check-auth")).send().await?;
        let body: AuthStatus = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(body.authenticated)
    }

    async fn user_stats(&self) -> ClientResult<UserStats> {
        let response = self.http.get(self.url("/api/user/stats")).send().await?;
        Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentService for BackendClient {
    async fn check_status(&self, ids: &[PhotoId]) -> ClientResult<bool> {
        let response = self
            .http
            .post(self.url("/api/payment/check-status"))
            .json(&json!({ "photo_ids": ids }))
            .send()
            .await?;
        let body: PaymentStatusResponse = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(body.success && body.paid)
    }

    async fn create_checkout(&self, ids: &[PhotoId]) -> ClientResult<String> {
        let response = self
            .http
            .post(self.url("/api/payment/create-checkout-session"))
            .json(&json!({ "photo_ids": ids }))
            .send()
            .await
            .map_err(|e| ClientError::Checkout(e.to_string()))?;

        let ok = response.status().is_success();
        let body: CheckoutResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Checkout(format!("Unreadable checkout response: {}", e)))?;

        if !ok {
            return Err(ClientError::Checkout(
                body.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        body.url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ClientError::Checkout("Payment session URL not received".to_string()))
    }
}

#[async_trait]
impl AssetFetcher for BackendClient {
    async fn fetch_asset(&self, path: &str) -> ClientResult<Vec<u8>> {
        let response = self.http.get(self.url(path)).send().await?;
        let bytes = Self::check_response(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
