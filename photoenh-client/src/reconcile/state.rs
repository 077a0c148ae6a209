//! Displayed-photo state and its transitions
//!
//! Every transition consumes the state and returns the next one. Nothing here
//! performs I/O; the controller decides when a transition applies.

use photoenh_common::{EnhancedPhoto, LocalSession, PageState};

/// Where the displayed photos came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplaySource {
    /// Nothing decided yet
    #[default]
    Bootstrapping,
    /// Pending photos from the local cache
    Local {
        requires_login: bool,
        /// `None` until the first auth check completes
        authenticated: Option<bool>,
        /// False once the cached copy has been consumed by a download
        persisted: bool,
    },
    /// One page of the server photo list
    Server { page: PageState },
}

/// Everything the view is projected from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub source: DisplaySource,
    pub photos: Vec<EnhancedPhoto>,
    pub images_processed: Option<u64>,
}

impl SessionState {
    /// Display a cached session; a known auth status carries over
    pub fn show_local(self, session: LocalSession) -> Self {
        let authenticated = self.authenticated();
        Self {
            source: DisplaySource::Local {
                requires_login: session.requires_login,
                authenticated,
                persisted: true,
            },
            photos: session.pending_photos,
            ..self
        }
    }

    /// Replace photos and page state together
    pub fn show_server(self, photos: Vec<EnhancedPhoto>, page: PageState) -> Self {
        Self {
            source: DisplaySource::Server { page },
            photos,
            ..self
        }
    }

    /// Record an auth check result; only a local session is affected
    pub fn auth_checked(self, authenticated: bool) -> Self {
        match self.source {
            DisplaySource::Local { persisted, .. } => Self {
                source: DisplaySource::Local {
                    requires_login: !authenticated,
                    authenticated: Some(authenticated),
                    persisted,
                },
                ..self
            },
            _ => self,
        }
    }

    /// Mark the displayed local session as removed from the cache
    pub fn cache_consumed(self) -> Self {
        match self.source {
            DisplaySource::Local {
                requires_login,
                authenticated,
                ..
            } => Self {
                source: DisplaySource::Local {
                    requires_login,
                    authenticated,
                    persisted: false,
                },
                ..self
            },
            _ => self,
        }
    }

    pub fn with_images_processed(self, count: u64) -> Self {
        Self {
            images_processed: Some(count),
            ..self
        }
    }

    /// Flip selection of the photo at `index`; out-of-range indexes are ignored
    pub fn toggle(mut self, index: usize) -> Self {
        if let Some(photo) = self.photos.get_mut(index) {
            photo.selected = !photo.selected;
        }
        self
    }

    pub fn select_all(self) -> Self {
        self.set_all(true)
    }

    pub fn deselect_all(self) -> Self {
        self.set_all(false)
    }

    fn set_all(mut self, selected: bool) -> Self {
        for photo in &mut self.photos {
            photo.selected = selected;
        }
        self
    }

    pub fn selected_photos(&self) -> Vec<EnhancedPhoto> {
        self.photos.iter().filter(|p| p.selected).cloned().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.photos.iter().filter(|p| p.selected).count()
    }

    /// The pending session as it should be cached
    ///
    /// `None` unless a local session is displayed and still backed by the cache.
    pub fn local_session(&self) -> Option<LocalSession> {
        match self.source {
            DisplaySource::Local {
                requires_login,
                persisted: true,
                ..
            } => {
                Some(LocalSession::new(self.photos.clone(), requires_login))
            }
            _ => None,
        }
    }

    pub fn page_state(&self) -> Option<PageState> {
        match self.source {
            DisplaySource::Server { page } => Some(page),
            _ => None,
        }
    }

    /// Known auth status of a local session
    pub fn authenticated(&self) -> Option<bool> {
        match self.source {
            DisplaySource::Local { authenticated, .. } => authenticated,
            _ => None,
        }
    }

    /// True when every displayed photo is carried inline
    pub fn all_inline(&self) -> bool {
        !self.photos.is_empty() && self.photos.iter().all(EnhancedPhoto::is_inline)
    }
}
