//! Rendering
//!
//! [`project`] turns a `SessionState` into a `ViewModel` with no side effects.
//! A [`View`] only ever sees the projection.

use crate::reconcile::{DisplaySource, SessionState};
use crate::selection::{compute_charge, format_amount};
use crate::upload::UploadJob;
use photoenh_common::models::ConversionKind;

/// One before/after comparison card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoCard {
    /// Display index, used for toggling
    pub index: usize,
    pub title: String,
    pub original_url: String,
    pub enhanced_url: String,
    pub selected: bool,
    /// Needs a completed payment to download
    pub gated: bool,
    pub night: bool,
    pub created_at: Option<String>,
}

/// Prompt under a local (landing) result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallToAction {
    SignUp { note: String },
    Download { note: String, button_label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationView {
    pub label: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewModel {
    pub cards: Vec<PhotoCard>,
    pub selection_text: String,
    pub download_label: String,
    pub download_enabled: bool,
    pub call_to_action: Option<CallToAction>,
    pub pagination: Option<PaginationView>,
    pub images_processed: Option<u64>,
    pub empty_message: Option<String>,
}

/// Display surface
pub trait View: Send + Sync {
    fn render(&self, model: &ViewModel);

    /// Per-file upload progress
    fn upload_progress(&self, jobs: &[UploadJob]);

    /// Blocking message to the user
    fn alert(&self, message: &str);

    /// Hand control to another page (login, checkout)
    fn redirect(&self, url: &str);
}

fn photos(count: usize) -> String {
    if count == 1 {
        "1 photo".to_string()
    } else {
        format!("{} photos", count)
    }
}

fn download_label(selected: usize) -> String {
    if selected == 0 {
        return "Download Selected (0)".to_string();
    }
    let noun = if selected == 1 { "Photo" } else { "Photos" };
    format!(
        "Download {} {} - ${}",
        selected,
        noun,
        format_amount(compute_charge(selected))
    )
}

/// Project state into what the view shows
pub fn project(state: &SessionState) -> ViewModel {
    let cards = state
        .photos
        .iter()
        .enumerate()
        .map(|(index, photo)| PhotoCard {
            index,
            title: photo.original_name.clone(),
            original_url: photo.original_url.clone(),
            enhanced_url: photo.enhanced_url.clone(),
            selected: photo.selected,
            gated: photo.is_gated(),
            night: photo.conversion_kind == ConversionKind::Night,
            created_at: photo.created_at.map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
        })
        .collect();

    let selected = state.selected_count();
    let count = state.photos.len();

    let call_to_action = match state.source {
        DisplaySource::Local { requires_login, .. } if count > 0 => Some(if requires_login {
            CallToAction::SignUp {
                note: format!("You've enhanced {}. Sign up to download all!", photos(count)),
            }
        } else {
            CallToAction::Download {
                note: format!("You've enhanced {}. Ready to download!", photos(count)),
                button_label: format!(
                    "Download All {} Photo{}",
                    count,
                    if count == 1 { "" } else { "s" }
                ),
            }
        }),
        _ => None,
    };

    let pagination = state.page_state().filter(|p| p.total_pages > 0).map(|p| PaginationView {
        label: format!("Page {} of {} ({} total)", p.current_page, p.total_pages, p.total_count),
        current_page: p.current_page,
        total_pages: p.total_pages,
        has_prev: p.has_prev,
        has_next: p.has_next,
    });

    let empty_message = match state.source {
        DisplaySource::Server { .. } if count == 0 => {
            Some("No photos yet. Upload some to get started!".to_string())
        }
        _ => None,
    };

    ViewModel {
        cards,
        selection_text: format!("{} selected", selected),
        download_label: download_label(selected),
        download_enabled: selected > 0,
        call_to_action,
        pagination,
        images_processed: state.images_processed,
        empty_message,
    }
}

/// Plain-text view on stdout
#[derive(Debug, Default)]
pub struct TerminalView;

impl View for TerminalView {
    fn render(&self, model: &ViewModel) {
        if let Some(count) = model.images_processed {
            println!("Images processed: {}", count);
        }
        if let Some(message) = &model.empty_message {
            println!("{}", message);
        }
        for card in &model.cards {
            let mark = if card.selected { "[x]" } else { "[ ]" };
            let lock = if card.gated { " (paid)" } else { "" };
            let night = if card.night { " night" } else { "" };
            println!("{} {:>3}  {}{}{}", mark, card.index + 1, card.title, night, lock);
            if let Some(created) = &card.created_at {
                println!("         {}", created);
            }
        }
        if let Some(pagination) = &model.pagination {
            println!("{}", pagination.label);
        }
        match &model.call_to_action {
            Some(CallToAction::SignUp { note }) => println!("{}", note),
            Some(CallToAction::Download { note, button_label }) => {
                println!("{}", note);
                println!("> {}", button_label);
            }
            None => {}
        }
        if !model.cards.is_empty() {
            println!("{} | {}", model.selection_text, model.download_label);
        }
    }

    fn upload_progress(&self, jobs: &[UploadJob]) {
        for job in jobs {
            println!("{:>3}%  {}  {}", job.progress_percent, job.file_name, job.status_text);
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn redirect(&self, url: &str) {
        println!("Continue at: {}", url);
    }
}
