//! # Photo Enhancement Common Library
//!
//! Shared code for the photo enhancement client including:
//! - Photo, session and pagination models
//! - Upload progress events (UploadEvent enum, EventBus)
//! - Client configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use models::{ConversionKind, EnhancedPhoto, LocalSession, PageState, PhotoAccess, PhotoId};
