use std::sync::Arc;

use axum::extract::Request;
use axum::handler::Handler;
use axum::routing::get;
use axum::Router;
use folio_core::FolioConfigSnapshot;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// An axum router plus the configuration it was built from.
///
/// Routes are collected with [`use_router`](Self::use_router) /
/// [`service`](Self::service); [`into_router`](Self::into_router) wraps the
/// result with request ids, tracing and (optionally) CORS.
#[derive(Clone)]
pub struct AxumApp {
    pub config: Arc<FolioConfigSnapshot>,
    pub router: Router<()>,
    cors_any: bool,
}

impl AxumApp {
    pub fn new(config: FolioConfigSnapshot) -> Self {
        let cors_any = config.get_bool("cors.allow_any").unwrap_or(false);
        Self {
            config: Arc::new(config),
            router: Router::new(),
            cors_any,
        }
    }

    /// Mount `router` under `path`; `""` or `"/"` merges at the root.
    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = match path.trim_end_matches('/') {
            "" => self.router.merge(router),
            prefix => self.router.nest(prefix, router),
        };
        self
    }

    /// A single GET handler at `path`.
    pub fn use_get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    pub fn service<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.use_get(path, handler)
    }

    /// The finished router with request-id, trace and CORS layers applied.
    pub fn into_router(self) -> Router<()> {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id());

        let router = self.router.layer(layers);
        if self.cors_any {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}

pub fn axum(config: FolioConfigSnapshot) -> AxumApp {
    AxumApp::new(config)
}
