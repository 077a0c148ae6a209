//! Test doubles for the controller's collaborators
//!
//! Every fake records the calls it receives so tests can assert on what was
//! (and was not) requested.

#![allow(dead_code)]

use async_trait::async_trait;
use photoenh_client::api::{
    AccountService, EnhanceResponse, EnhancementBackend, PaymentService, PhotoPage, PhotoSource,
    UserStats,
};
use photoenh_client::download::{DownloadItem, Downloader};
use photoenh_client::reconcile::{Collaborators, ReadinessGate};
use photoenh_client::selection::PaymentGate;
use photoenh_client::session_store::{MemoryKeyValueStore, SessionStore};
use photoenh_client::upload::{UploadFile, UploadPipeline};
use photoenh_client::view::{View, ViewModel};
use photoenh_client::{ClientError, ClientResult, PhotoSessionController};
use photoenh_common::events::EventBus;
use photoenh_common::models::{ConversionKind, EnhanceSettings};
use photoenh_common::{EnhancedPhoto, LocalSession, PageState, PhotoAccess, PhotoId};
use serde_json::Map;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PAGE_SIZE: u32 = 2;

/// A pending (id-less) photo with inline images
pub fn inline_photo(name: &str) -> EnhancedPhoto {
    EnhancedPhoto {
        access: PhotoAccess::Free,
        original_name: name.to_string(),
        original_url: "data:image/png;base64,AAAA".to_string(),
        enhanced_url: "data:image/jpeg;base64,AQID".to_string(),
        enhancement_params: Map::new(),
        conversion_kind: ConversionKind::Standard,
        selected: false,
        created_at: None,
    }
}

pub fn server_photo(id: i64) -> EnhancedPhoto {
    EnhancedPhoto::from_server(
        PhotoId(id),
        format!("photo{}.jpg", id),
        Map::new(),
        ConversionKind::Standard,
        None,
    )
}

/// Page `page` of a list with `total_count` photos, ids starting at 1
pub fn server_page(page: u32, total_count: u64) -> PhotoPage {
    let total_pages = total_count.div_ceil(u64::from(PAGE_SIZE)) as u32;
    let first = u64::from(page - 1) * u64::from(PAGE_SIZE) + 1;
    let last = (first + u64::from(PAGE_SIZE) - 1).min(total_count);
    let photos = (first..=last).map(|id| server_photo(id as i64)).collect();
    PhotoPage {
        photos,
        page_state: PageState {
            current_page: page,
            page_size: PAGE_SIZE,
            total_pages,
            total_count,
            has_next: page < total_pages,
            has_prev: page > 1,
        },
    }
}

/// Photo list with scripted pages; unscripted pages fail
#[derive(Default)]
pub struct FakePhotoSource {
    pages: Mutex<HashMap<u32, PhotoPage>>,
    pub fetches: Mutex<Vec<u32>>,
    pub deletes: Mutex<Vec<PhotoId>>,
    pub fail_delete: AtomicBool,
}

impl FakePhotoSource {
    pub fn set_page(&self, page: PhotoPage) {
        self.pages
            .lock()
            .unwrap()
            .insert(page.page_state.current_page, page);
    }

    pub fn fail_page(&self, page: u32) {
        self.pages.lock().unwrap().remove(&page);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl PhotoSource for FakePhotoSource {
    async fn fetch_page(&self, page: u32, _page_size: u32) -> ClientResult<PhotoPage> {
        self.fetches.lock().unwrap().push(page);
        self.pages
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .ok_or_else(|| ClientError::Network("connection refused".to_string()))
    }

    async fn delete_photo(&self, id: PhotoId) -> ClientResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 404,
                message: "Photo not found".to_string(),
            });
        }
        self.deletes.lock().unwrap().push(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAccount {
    pub authenticated: AtomicBool,
    pub fail_auth: AtomicBool,
    pub fail_stats: AtomicBool,
    pub auth_checks: AtomicUsize,
    pub stats_calls: AtomicUsize,
}

#[async_trait]
impl AccountService for FakeAccount {
    async fn check_auth(&self) -> ClientResult<bool> {
        self.auth_checks.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(ClientError::Network("timeout".to_string()));
        }
        Ok(self.authenticated.load(Ordering::SeqCst))
    }

    async fn user_stats(&self) -> ClientResult<UserStats> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(UserStats {
            images_processed: 12,
            username: Some("demo".to_string()),
        })
    }
}

#[derive(Default)]
pub struct FakePayments {
    pub paid: AtomicBool,
    pub fail_checkout: AtomicBool,
    pub status_calls: AtomicUsize,
    pub checkouts: Mutex<Vec<Vec<PhotoId>>>,
}

#[async_trait]
impl PaymentService for FakePayments {
    async fn check_status(&self, _ids: &[PhotoId]) -> ClientResult<bool> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.paid.load(Ordering::SeqCst))
    }

    async fn create_checkout(&self, ids: &[PhotoId]) -> ClientResult<String> {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(ClientError::Checkout("Unknown error".to_string()));
        }
        self.checkouts.lock().unwrap().push(ids.to_vec());
        Ok("https://checkout.example/pay/cs_test".to_string())
    }
}

#[derive(Default)]
pub struct RecordingDownloader {
    pub saved: Mutex<Vec<DownloadItem>>,
}

#[async_trait]
impl Downloader for RecordingDownloader {
    async fn download(&self, item: &DownloadItem) -> ClientResult<PathBuf> {
        self.saved.lock().unwrap().push(item.clone());
        Ok(PathBuf::from(&item.file_name))
    }
}

/// Enhancement backend failing every file whose name contains "bad"
///
/// With `assign_ids` set, results carry server ids 101, 102, ... in call order
/// while the images stay inline.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<String>>,
    pub requires_login: AtomicBool,
    pub assign_ids: AtomicBool,
}

impl FakeBackend {
    fn respond(&self, file: &UploadFile) -> ClientResult<EnhanceResponse> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(file.name.clone());
            calls.len() as i64
        };
        if file.name.contains("bad") {
            return Err(ClientError::Api {
                status: 500,
                message: "Enhancement failed".to_string(),
            });
        }
        Ok(EnhanceResponse {
            enhanced_image_url: "data:image/jpeg;base64,AQID".to_string(),
            original_image_url: "data:image/jpeg;base64,AAAA".to_string(),
            enhancements: None,
            image_id: self
                .assign_ids
                .load(Ordering::SeqCst)
                .then(|| PhotoId(100 + call)),
            photo_id: None,
            requires_login: Some(self.requires_login.load(Ordering::SeqCst)),
            conversion_type: None,
        })
    }
}

#[async_trait]
impl EnhancementBackend for FakeBackend {
    async fn enhance(&self, file: &UploadFile, _settings: &EnhanceSettings) -> ClientResult<EnhanceResponse> {
        self.respond(file)
    }

    async fn convert_to_night(&self, file: &UploadFile) -> ClientResult<EnhanceResponse> {
        self.respond(file)
    }
}

#[derive(Default)]
pub struct RecordingView {
    pub renders: Mutex<Vec<ViewModel>>,
    pub alerts: Mutex<Vec<String>>,
    pub redirects: Mutex<Vec<String>>,
}

impl RecordingView {
    pub fn last(&self) -> ViewModel {
        self.renders.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl View for RecordingView {
    fn render(&self, model: &ViewModel) {
        self.renders.lock().unwrap().push(model.clone());
    }

    fn upload_progress(&self, _jobs: &[photoenh_client::upload::UploadJob]) {}

    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn redirect(&self, url: &str) {
        self.redirects.lock().unwrap().push(url.to_string());
    }
}

/// Controller wired to fakes
pub struct Harness {
    pub controller: PhotoSessionController,
    pub kv: Arc<MemoryKeyValueStore>,
    pub store: SessionStore,
    pub photos: Arc<FakePhotoSource>,
    pub account: Arc<FakeAccount>,
    pub payments: Arc<FakePayments>,
    pub downloader: Arc<RecordingDownloader>,
    pub backend: Arc<FakeBackend>,
    pub view: Arc<RecordingView>,
    pub ready: ReadinessGate,
}

/// Build a harness; the readiness gate is left unsignalled
pub fn harness_unready() -> Harness {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let store = SessionStore::new(kv.clone());
    let photos = Arc::new(FakePhotoSource::default());
    let account = Arc::new(FakeAccount::default());
    let payments = Arc::new(FakePayments::default());
    let downloader = Arc::new(RecordingDownloader::default());
    let backend = Arc::new(FakeBackend::default());
    let view = Arc::new(RecordingView::default());
    let ready = ReadinessGate::new();

    let gate = PaymentGate::new(
        payments.clone(),
        downloader.clone(),
        Duration::ZERO,
        Duration::ZERO,
    );
    let controller = PhotoSessionController::new(
        store.clone(),
        Collaborators {
            photos: photos.clone(),
            account: account.clone(),
            gate,
            pipeline: UploadPipeline::new(backend.clone(), EventBus::default()),
            view: view.clone(),
        },
        PAGE_SIZE,
        ready.clone(),
    );

    Harness {
        controller,
        kv,
        store,
        photos,
        account,
        payments,
        downloader,
        backend,
        view,
        ready,
    }
}

pub fn harness() -> Harness {
    let h = harness_unready();
    h.ready.signal();
    h
}

/// Harness whose store already holds a pending session
pub fn harness_with_cache(photos: Vec<EnhancedPhoto>, requires_login: bool) -> Harness {
    let h = harness();
    h.store.save(&LocalSession::new(photos, requires_login));
    h
}

pub fn jpeg(name: &str) -> UploadFile {
    UploadFile::new(name, vec![0xff, 0xd8, 0xff], "image/jpeg")
}
