//! Single-administrator access control.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use folio_axum::FolioAxumError;
use folio_core::FolioError;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

pub const SESSION_COOKIE: &str = "folio_session";

/// Decides whether a request comes from the administrator.
#[async_trait]
pub trait AuthGate: Send + Sync {
    async fn is_admin(&self, headers: &HeaderMap) -> bool;
}

/// Server-side session ids (cookie `folio_session`) plus an optional
/// static bearer token for scripts.
#[derive(Default)]
pub struct SessionAuthGate {
    sessions: RwLock<HashSet<String>>,
    admin_token: Option<String>,
}

impl SessionAuthGate {
    pub fn new(admin_token: Option<String>) -> Self {
        Self {
            sessions: RwLock::new(HashSet::new()),
            admin_token: admin_token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Mark a new admin session and return its id.
    pub async fn open_session(&self) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(id.clone());
        id
    }

    pub async fn close_session(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id)
    }

    fn bearer_matches(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.admin_token.as_deref() else {
            return false;
        };
        let Some(provided) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return false;
        };
        provided.trim().as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

#[async_trait]
impl AuthGate for SessionAuthGate {
    async fn is_admin(&self, headers: &HeaderMap) -> bool {
        if self.bearer_matches(headers) {
            return true;
        }
        match session_cookie(headers) {
            Some(id) => self.sessions.read().await.contains(&id),
            None => false,
        }
    }
}

/// Route layer rejecting non-admin requests with 401.
pub async fn require_admin(
    State(gate): State<Arc<dyn AuthGate>>,
    req: Request,
    next: Next,
) -> Response {
    if gate.is_admin(req.headers()).await {
        return next.run(req).await;
    }
    tracing::debug!(uri = %req.uri(), "rejected unauthenticated admin request");
    FolioAxumError::from(FolioError::not_authenticated("Authentication required")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(name, HeaderValue::from_str(value).unwrap());
        h
    }

    #[tokio::test]
    async fn bearer_token() {
        let gate = SessionAuthGate::new(Some("s3cret".into()));
        assert!(gate.is_admin(&headers(header::AUTHORIZATION, "Bearer s3cret")).await);
        assert!(!gate.is_admin(&headers(header::AUTHORIZATION, "Bearer s3cre")).await);
        assert!(!gate.is_admin(&headers(header::AUTHORIZATION, "s3cret")).await);
        assert!(!gate.is_admin(&HeaderMap::new()).await);
    }

    #[tokio::test]
    async fn blank_token_disables_bearer_auth() {
        let gate = SessionAuthGate::new(Some("  ".into()));
        assert!(!gate.is_admin(&headers(header::AUTHORIZATION, "Bearer   ")).await);
    }

    #[tokio::test]
    async fn session_cookie_lifecycle() {
        let gate = SessionAuthGate::new(None);
        let id = gate.open_session().await;
        let cookie = format!("theme=dark; {SESSION_COOKIE}={id}");

        assert!(gate.is_admin(&headers(header::COOKIE, &cookie)).await);
        assert!(gate.close_session(&id).await);
        assert!(!gate.is_admin(&headers(header::COOKIE, &cookie)).await);
    }
}
