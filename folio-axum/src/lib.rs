//! folio-axum: Axum adapter for Folio.
//!
//! Builds the HTTP router (request ids, tracing, CORS), turns Folio errors
//! into JSON responses and reads multipart uploads.

pub mod app;
pub mod middlewares;
mod error;
pub use error::{FolioAxumError, FolioAxumResult, INTERNAL_ERROR_MESSAGE};

pub use app::{axum, AxumApp};
