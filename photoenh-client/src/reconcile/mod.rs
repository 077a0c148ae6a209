//! Photo session controller
//!
//! Decides which photo list is shown (pending local cache or the server list),
//! keeps selection and pagination consistent with it, and routes downloads
//! through the payment gate.
//!
//! States: `Bootstrapping → Local | Server`, and `Server(page) → Server(page k)`
//! on navigation. Every collaborator failure leaves the displayed state as it
//! was.

mod readiness;
mod state;

pub use readiness::ReadinessGate;
pub use state::{DisplaySource, SessionState};

use crate::api::{AccountService, PaidPhoto, PhotoPage, PhotoSource};
use crate::download::DownloadBatch;
use crate::error::{ClientError, ClientResult};
use crate::pagination::{check_navigation, clamp_page, NavigationCheck};
use crate::selection::{compute_charge, DownloadOutcome, PaymentGate};
use crate::session_store::SessionStore;
use crate::upload::{UploadBatch, UploadFile, UploadPipeline};
use crate::view::{project, View};
use photoenh_common::models::EnhanceSettings;
use photoenh_common::{LocalSession, PageState, PhotoId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What prompted an auth check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTrigger {
    PageLoad,
    FocusRegained,
    VisibilityRegained,
    /// A landing upload just replaced the local session
    UploadFinished,
}

/// Where an upload was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadContext {
    /// Anonymous landing flow: results are cached locally
    Landing,
    /// Signed-in dashboard: results are re-read from the server
    Dashboard,
}

/// Result of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Loaded(PageState),
    /// Out of range or already on that page; nothing fetched
    Ignored,
}

/// External services the controller drives
pub struct Collaborators {
    pub photos: Arc<dyn PhotoSource>,
    pub account: Arc<dyn AccountService>,
    pub gate: PaymentGate,
    pub pipeline: UploadPipeline,
    pub view: Arc<dyn View>,
}

pub struct PhotoSessionController {
    store: SessionStore,
    photos: Arc<dyn PhotoSource>,
    account: Arc<dyn AccountService>,
    gate: PaymentGate,
    pipeline: UploadPipeline,
    view: Arc<dyn View>,
    ready: ReadinessGate,
    page_size: u32,
    state: SessionState,
}

impl PhotoSessionController {
    pub fn new(
        store: SessionStore,
        collaborators: Collaborators,
        page_size: u32,
        ready: ReadinessGate,
    ) -> Self {
        Self {
            store,
            photos: collaborators.photos,
            account: collaborators.account,
            gate: collaborators.gate,
            pipeline: collaborators.pipeline,
            view: collaborators.view,
            ready,
            page_size,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn apply(&mut self, transition: impl FnOnce(SessionState) -> SessionState) {
        self.state = transition(std::mem::take(&mut self.state));
        self.render();
    }

    fn render(&self) {
        self.view.render(&project(&self.state));
    }

    /// Decide the initial display
    ///
    /// A valid cached session is shown as-is without touching the server list;
    /// otherwise page 1 is fetched.
    pub async fn bootstrap(&mut self) {
        self.ready.wait().await;

        if let Some(session) = self.store.load() {
            info!(count = session.pending_photos.len(), "Showing pending photos from local cache");
            self.apply(|s| s.show_local(session));
            self.on_auth_check(AuthTrigger::PageLoad).await;
            return;
        }

        match self.photos.fetch_page(1, self.page_size).await {
            Ok(page) => self.show_page(page),
            Err(e) => {
                error!(error = %e, "Failed to load photos");
                let empty = PageState::empty(self.page_size);
                self.apply(|s| s.show_server(Vec::new(), empty));
            }
        }
        self.refresh_stats().await;
    }

    fn show_page(&mut self, page: PhotoPage) {
        debug!(
            page = page.page_state.current_page,
            count = page.photos.len(),
            "Showing server page"
        );
        self.apply(|s| s.show_server(page.photos, page.page_state));
    }

    /// Re-check authentication and update a displayed local session
    ///
    /// A failed check counts as signed out. The session is written back to the
    /// cache unless a download has already consumed it. Returns the auth status.
    pub async fn on_auth_check(&mut self, trigger: AuthTrigger) -> bool {
        let authenticated = match self.account.check_auth().await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                warn!(error = %e, ?trigger, "Auth check failed, treating as signed out");
                false
            }
        };
        debug!(?trigger, authenticated, "Auth checked");

        if matches!(self.state.source, DisplaySource::Local { .. }) {
            self.apply(|s| s.auth_checked(authenticated));
            if let Some(session) = self.state.local_session() {
                self.store.save(&session);
            }
        }
        authenticated
    }

    /// Go to `target`; only valid while showing the server list
    ///
    /// # Errors
    /// `InvalidState` when not showing the server list, or the fetch error.
    /// On error the displayed page is unchanged.
    pub async fn navigate(&mut self, target: i64) -> ClientResult<NavOutcome> {
        let current = self.state.page_state().ok_or_else(|| {
            ClientError::InvalidState("Pagination is only available for saved photos".to_string())
        })?;

        let page = match check_navigation(&current, target) {
            NavigationCheck::Accepted(page) => page,
            check => {
                debug!(target, ?check, "Ignoring navigation");
                return Ok(NavOutcome::Ignored);
            }
        };

        match self.photos.fetch_page(page, self.page_size).await {
            Ok(fetched) => {
                let page_state = fetched.page_state;
                self.show_page(fetched);
                Ok(NavOutcome::Loaded(page_state))
            }
            Err(e) => {
                error!(page, error = %e, "Failed to load page, keeping current one");
                Err(e)
            }
        }
    }

    pub async fn next_page(&mut self) -> ClientResult<NavOutcome> {
        let current = self.state.page_state().map(|p| p.current_page).unwrap_or(1);
        self.navigate(i64::from(current) + 1).await
    }

    pub async fn prev_page(&mut self) -> ClientResult<NavOutcome> {
        let current = self.state.page_state().map(|p| p.current_page).unwrap_or(1);
        self.navigate(i64::from(current) - 1).await
    }

    /// Enhance `files` and show the results
    ///
    /// Landing uploads replace the cached session and re-check auth; dashboard
    /// uploads refetch page 1 and the stats. Nothing changes when every file
    /// failed.
    pub async fn upload(
        &mut self,
        files: Vec<UploadFile>,
        settings: &EnhanceSettings,
        context: UploadContext,
    ) -> UploadBatch {
        let batch = self.pipeline.submit(files, settings).await;
        self.view.upload_progress(&batch.jobs);

        if batch.succeeded() == 0 {
            warn!(failed = batch.failed(), "No files were enhanced");
            return batch;
        }

        match context {
            UploadContext::Landing => {
                let session = LocalSession::new(batch.photos(), batch.requires_login);
                self.store.save(&session);
                self.apply(|s| s.show_local(session));
                self.on_auth_check(AuthTrigger::UploadFinished).await;
            }
            UploadContext::Dashboard => {
                match self.photos.fetch_page(1, self.page_size).await {
                    Ok(page) => self.show_page(page),
                    Err(e) => error!(error = %e, "Failed to refresh photos after upload"),
                }
                self.refresh_stats().await;
            }
        }
        batch
    }

    pub fn toggle(&mut self, index: usize) {
        self.apply(|s| s.toggle(index));
    }

    pub fn select_all(&mut self) {
        self.apply(SessionState::select_all);
    }

    pub fn deselect_all(&mut self) {
        self.apply(SessionState::deselect_all);
    }

    /// Charge in cents for the current selection
    pub fn charge(&self) -> u64 {
        compute_charge(self.state.selected_count())
    }

    /// Download the selection, going through checkout if needed
    ///
    /// The local cache is cleared once downloads start for a result set that
    /// is entirely inline.
    ///
    /// # Errors
    /// Checkout creation failure; the selection is kept for a retry.
    pub async fn request_download(&mut self) -> ClientResult<DownloadOutcome> {
        let selected = self.state.selected_photos();
        let outcome = match self
            .gate
            .request_download(&selected, self.state.authenticated())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Download request failed");
                self.view.alert(&e.to_string());
                return Err(e);
            }
        };

        match &outcome {
            DownloadOutcome::NothingSelected => {
                self.view.alert("Please select at least one photo to download.");
            }
            DownloadOutcome::Started(batch) => {
                info!(count = batch.len(), "Downloads started");
                if self.state.all_inline() {
                    self.store.clear();
                    self.apply(SessionState::cache_consumed);
                }
            }
            DownloadOutcome::CheckoutRedirect { url } | DownloadOutcome::LoginRequired { url } => {
                self.view.redirect(url);
            }
        }
        Ok(outcome)
    }

    /// Select everything, then download
    pub async fn download_all(&mut self) -> ClientResult<DownloadOutcome> {
        self.select_all();
        self.request_download().await
    }

    /// Download photos returned from a completed checkout
    pub fn download_paid(&self, paid: &[PaidPhoto]) -> DownloadBatch {
        info!(count = paid.len(), "Downloading paid photos");
        self.gate.download_paid(paid)
    }

    /// Delete a saved photo and reload the current page
    ///
    /// If the current page no longer exists the last page is shown instead.
    pub async fn delete_photo(&mut self, id: PhotoId) -> ClientResult<()> {
        let current = self.state.page_state().ok_or_else(|| {
            ClientError::InvalidState("Only saved photos can be deleted".to_string())
        })?;

        if let Err(e) = self.photos.delete_photo(id).await {
            error!(%id, error = %e, "Failed to delete photo");
            self.view.alert(&format!("Failed to delete photo: {}", e));
            return Err(e);
        }
        info!(%id, "Photo deleted");

        let mut page = self.photos.fetch_page(current.current_page, self.page_size).await;
        if let Ok(fetched) = &page {
            let last = fetched.page_state.total_pages;
            if fetched.photos.is_empty() && last >= 1 && last < current.current_page {
                let target = clamp_page(i64::from(current.current_page), last);
                page = self.photos.fetch_page(target, self.page_size).await;
            }
        }

        match page {
            Ok(fetched) => self.show_page(fetched),
            Err(e) => error!(error = %e, "Failed to reload photos after delete"),
        }
        Ok(())
    }

    /// Refresh the processed-images counter; failures are ignored
    pub async fn refresh_stats(&mut self) {
        match self.account.user_stats().await {
            Ok(stats) => {
                let count = stats.images_processed;
                self.apply(|s| s.with_images_processed(count));
            }
            Err(e) => warn!(error = %e, "Could not load user stats"),
        }
    }
}
