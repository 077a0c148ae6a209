//! photoenh-client library
//!
//! Client-side controller for the photo enhancement service: uploads photos
//! for enhancement, keeps anonymous results in a local key-value store across
//! sign-up redirects, pages through the server photo list, and gates bulk
//! downloads behind the payment check.

pub mod api;
pub mod download;
pub mod error;
pub mod pagination;
pub mod reconcile;
pub mod selection;
pub mod session_store;
pub mod upload;
pub mod view;

pub use crate::error::{ClientError, ClientResult};
pub use crate::reconcile::{PhotoSessionController, SessionState};
