//! # Errors
//!
//! Folio errors are structured values that travel inside `anyhow::Error`
//! from storage and ingestion code up to the HTTP boundary, where
//! `folio-axum` serializes them.
//!
//! Every error carries:
//! - a kind (HTTP status, `name`, kebab-case `className`)
//! - a client-facing message
//! - optional `data` / `errors` JSON payloads
//! - an optional source that is never shown to clients

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

/// A convenience result type for Folio service APIs.
pub type FolioResult<T> = std::result::Result<T, AnyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotAuthenticated,
    Forbidden,
    NotFound,
    PayloadTooLarge,
    Unprocessable,
    GeneralError,
    Unavailable,
}

impl ErrorKind {
    /// `(status, name, className)` as sent to clients.
    const fn parts(self) -> (u16, &'static str, &'static str) {
        use ErrorKind::*;
        match self {
            BadRequest => (400, "BadRequest", "bad-request"),
            NotAuthenticated => (401, "NotAuthenticated", "not-authenticated"),
            Forbidden => (403, "Forbidden", "forbidden"),
            NotFound => (404, "NotFound", "not-found"),
            PayloadTooLarge => (413, "PayloadTooLarge", "payload-too-large"),
            Unprocessable => (422, "Unprocessable", "unprocessable"),
            GeneralError => (500, "GeneralError", "general-error"),
            Unavailable => (503, "Unavailable", "unavailable"),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.parts().0
    }

    pub fn name(&self) -> &'static str {
        self.parts().1
    }

    pub fn class_name(&self) -> &'static str {
        self.parts().2
    }
}

/// A structured Folio error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct FolioError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub errors: Option<Value>,
    pub source: Option<AnyError>,
}

impl FolioError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `FolioError` anywhere in an `anyhow` chain.
    pub fn find_in(err: &AnyError) -> Option<&FolioError> {
        err.chain().find_map(|e| e.downcast_ref::<FolioError>())
    }

    /// Keep an existing `FolioError`, wrap anything else as `GeneralError`.
    pub fn normalize(err: AnyError) -> FolioError {
        match err.downcast::<FolioError>() {
            Ok(folio) => folio,
            Err(other) => {
                FolioError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// Copy suitable for clients: the `source` (backend details) is dropped.
    pub fn sanitize_for_client(&self) -> FolioError {
        FolioError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            errors: self.errors.clone(),
            source: None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut base = serde_json::json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for FolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for FolioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn find_in_sees_through_context() {
        let err: AnyError = FolioError::forbidden("nope").into_anyhow();
        let err = Err::<(), _>(err).context("while reading").unwrap_err();

        let found = FolioError::find_in(&err).unwrap();
        assert_eq!(found.code(), 403);
    }

    #[test]
    fn sanitize_drops_source() {
        let err = FolioError::general_error("Upload failed")
            .with_source(anyhow::anyhow!("secret=abc"));
        let safe = err.sanitize_for_client();
        assert!(safe.source.is_none());
        assert_eq!(safe.to_json()["className"], "general-error");
    }

    #[test]
    fn normalize_wraps_foreign_errors() {
        let folio = FolioError::normalize(anyhow::anyhow!("boom"));
        assert_eq!(folio.kind, ErrorKind::GeneralError);
        assert!(folio.source.is_some());
    }

    #[test]
    fn errors_payload_is_serialized() {
        let json = FolioError::unprocessable("Invalid posts")
            .with_errors(serde_json::json!(["a.md: Missing top-level H1 title"]))
            .to_json();
        assert_eq!(json["code"], 422);
        assert_eq!(json["errors"][0], "a.md: Missing top-level H1 title");
    }
}
