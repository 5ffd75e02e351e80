use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::errors::{ErrorKind, FolioError};

/// Message sent for every unexpected failure. Details stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct FolioAxumError(pub anyhow::Error);

pub type FolioAxumResult<T> = Result<T, FolioAxumError>;

impl From<anyhow::Error> for FolioAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<FolioError> for FolioAxumError {
    fn from(e: FolioError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for FolioAxumError {
    fn into_response(self) -> Response {
        // a FolioError keeps its fields, even under anyhow context layers
        let safe = match FolioError::find_in(&self.0) {
            Some(folio) if folio.kind != ErrorKind::GeneralError => folio.sanitize_for_client(),
            _ => {
                tracing::error!(error = ?self.0, "request failed");
                FolioError::general_error(INTERNAL_ERROR_MESSAGE)
            }
        };

        if safe.code() >= 500 && safe.kind != ErrorKind::GeneralError {
            tracing::warn!(error = %safe, "request failed");
        }

        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
