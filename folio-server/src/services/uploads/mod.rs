pub mod uploads_repository;
pub mod uploads_routes;
pub mod uploads_service;

pub use uploads_repository::{UploadRecord, UploadsRepository};
pub use uploads_service::{UploadResponse, UploadsService};
