//! Pricing and the payment gate in front of bulk downloads
//!
//! Free (id-less) photos download straight away. Any gated photo in the
//! selection sends the whole request through the payment-status check, and an
//! unconfirmed or failed check always ends in a checkout redirect.

use crate::api::{PaidPhoto, PaymentService};
use crate::download::{start_staggered, DownloadBatch, DownloadItem, Downloader};
use crate::error::ClientResult;
use photoenh_common::models::enhanced_image_path;
use photoenh_common::{EnhancedPhoto, PhotoId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Price of one photo in cents
pub const UNIT_PRICE_CENTS: u64 = 55;

/// Where an anonymous user is sent before paying for gated photos
pub const LOGIN_REDIRECT: &str = "/login?return_url=/";

/// Charge in cents for `count` selected photos
pub fn compute_charge(count: usize) -> u64 {
    count as u64 * UNIT_PRICE_CENTS
}

/// Format cents as dollars with two decimals (`165` → `"1.65"`)
pub fn format_amount(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// What a download request resulted in
#[derive(Debug)]
pub enum DownloadOutcome {
    NothingSelected,
    /// Downloads are running
    Started(DownloadBatch),
    /// Payment needed; nothing was downloaded
    CheckoutRedirect { url: String },
    /// Gated photos requested by an anonymous user; nothing was downloaded
    LoginRequired { url: String },
}

/// Payment check and checkout redirect in front of downloads
pub struct PaymentGate {
    payments: Arc<dyn PaymentService>,
    downloader: Arc<dyn Downloader>,
    stagger: Duration,
    paid_stagger: Duration,
}

impl PaymentGate {
    pub fn new(
        payments: Arc<dyn PaymentService>,
        downloader: Arc<dyn Downloader>,
        stagger: Duration,
        paid_stagger: Duration,
    ) -> Self {
        Self {
            payments,
            downloader,
            stagger,
            paid_stagger,
        }
    }

    /// Download `selected`, or redirect to checkout if any gated photo is unpaid
    ///
    /// `authenticated` is `Some(false)` only when an auth check has confirmed
    /// the user is anonymous.
    ///
    /// # Errors
    /// `ClientError::Checkout` when the checkout session cannot be created. The
    /// caller's selection is left as it was so the request can be retried.
    pub async fn request_download(
        &self,
        selected: &[EnhancedPhoto],
        authenticated: Option<bool>,
    ) -> ClientResult<DownloadOutcome> {
        if selected.is_empty() {
            return Ok(DownloadOutcome::NothingSelected);
        }

        let gated: Vec<PhotoId> = selected.iter().filter_map(EnhancedPhoto::id).collect();

        if !gated.is_empty() {
            if authenticated == Some(false) {
                info!(gated = gated.len(), "Gated photos requested while signed out");
                return Ok(DownloadOutcome::LoginRequired {
                    url: LOGIN_REDIRECT.to_string(),
                });
            }

            let paid = match self.payments.check_status(&gated).await {
                Ok(paid) => paid,
                Err(e) => {
                    warn!(error = %e, "Payment status check failed, treating as unpaid");
                    false
                }
            };

            if !paid {
                let url = self.payments.create_checkout(&gated).await?;
                info!(photos = gated.len(), "Redirecting to checkout");
                return Ok(DownloadOutcome::CheckoutRedirect { url });
            }
        }

        let items = selected.iter().map(DownloadItem::from).collect();
        Ok(DownloadOutcome::Started(start_staggered(
            self.downloader.clone(),
            items,
            self.stagger,
        )))
    }

    /// Download photos covered by a just-completed checkout
    pub fn download_paid(&self, paid: &[PaidPhoto]) -> DownloadBatch {
        let items = paid
            .iter()
            .map(|photo| DownloadItem {
                source: enhanced_image_path(photo.id),
                file_name: photo.download_file_name(),
            })
            .collect();
        start_staggered(self.downloader.clone(), items, self.paid_stagger)
    }
}
