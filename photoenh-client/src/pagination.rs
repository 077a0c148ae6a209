//! Pagination utilities for the server photo list
//!
//! `PageState` is only ever rebuilt from a server response; navigation
//! requests are checked here before any fetch is issued.

use crate::api::PaginationInfo;
use photoenh_common::PageState;

/// Result of checking a navigation request against the current page state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationCheck {
    /// Fetch this page
    Accepted(u32),
    /// Target is the page already shown
    Unchanged,
    /// Target is below 1 or beyond the last page
    OutOfRange,
}

/// Build page state from the `pagination` object of a photo list response
///
/// `page_size` is the size that was requested; the backend's echo is preferred when present.
pub fn page_state_from(info: &PaginationInfo, page_size: u32) -> PageState {
    PageState {
        current_page: info.page.max(1),
        page_size: info.per_page.unwrap_or(page_size),
        total_pages: info.pages,
        total_count: info.total,
        has_next: info.has_next,
        has_prev: info.has_prev,
    }
}

/// Check whether navigating to `target` should issue a fetch
///
/// # Examples
/// ```
/// use photoenh_client::pagination::{check_navigation, NavigationCheck};
/// use photoenh_common::PageState;
///
/// let state = PageState {
///     current_page: 2,
///     page_size: 50,
///     total_pages: 3,
///     total_count: 120,
///     has_next: true,
///     has_prev: true,
/// };
/// assert_eq!(check_navigation(&state, 3), NavigationCheck::Accepted(3));
/// assert_eq!(check_navigation(&state, 2), NavigationCheck::Unchanged);
/// assert_eq!(check_navigation(&state, 0), NavigationCheck::OutOfRange);
/// assert_eq!(check_navigation(&state, 4), NavigationCheck::OutOfRange);
/// ```
pub fn check_navigation(state: &PageState, target: i64) -> NavigationCheck {
    if target < 1 || target > i64::from(state.total_pages) {
        return NavigationCheck::OutOfRange;
    }
    if target == i64::from(state.current_page) {
        return NavigationCheck::Unchanged;
    }
    NavigationCheck::Accepted(target as u32)
}

/// Clamp a requested page into `[1, total_pages]`
///
/// An empty list still has page 1.
pub fn clamp_page(requested: i64, total_pages: u32) -> u32 {
    requested.max(1).min(i64::from(total_pages.max(1))) as u32
}
