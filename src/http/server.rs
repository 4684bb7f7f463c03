//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every API route
//! - Wire up middleware (request ID, tracing, timeout, body limit,
//!   metrics, security headers, auth rate limiting)
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::AuthService;
use crate::blockchain::BlockchainClient;
use crate::claim::ClaimService;
use crate::config::DexmailConfig;
use crate::http::{auth, claim, mail, market, wallet};
use crate::ipfs::SharedContentStore;
use crate::lifecycle::shutdown;
use crate::mail::MailService;
use crate::market::{NftService, PriceService};
use crate::observability::metrics;
use crate::relay::SharedRelay;
use crate::security::headers::with_security_headers;
use crate::security::{rate_limit_middleware, RateLimiterState};
use crate::storage::StoreError;
use crate::wallets::WalletService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DexmailConfig>,
    pub auth: AuthService,
    pub mail: MailService,
    pub claims: ClaimService,
    pub wallets: WalletService,
    pub price: PriceService,
    pub nfts: NftService,
    pub relay: SharedRelay,
    pub content: SharedContentStore,
    pub chain: Option<BlockchainClient>,
}

impl AppState {
    /// Write every persistent store to disk.
    pub fn persist(&self) -> Result<(), StoreError> {
        self.auth.save()?;
        self.claims.save()?;
        self.mail.save()
    }
}

/// HTTP server for the mail API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// The fully layered router, for serving or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();
        let limiter = Arc::new(RateLimiterState::new(&config.rate_limit));

        let auth_routes = Router::new()
            .route("/challenge", post(auth::challenge))
            .route("/register", post(auth::register))
            .route("/login", post(auth::login))
            .route("/logout", post(auth::logout))
            .route("/profile", get(auth::profile).patch(auth::update_profile))
            .route("/link-wallet", post(auth::link_wallet))
            .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

        let mail_routes = Router::new()
            .route("/send", post(mail::send))
            .route("/inbox", get(mail::inbox))
            .route("/sent", get(mail::sent))
            .route("/unread", get(mail::unread))
            .route("/folders/{folder}", get(mail::folder))
            .route("/{id}", get(mail::message).delete(mail::delete))
            .route("/{id}/flags", post(mail::flag))
            .route("/{id}/reply", post(mail::reply))
            .route("/{id}/forward", post(mail::forward));

        let claim_routes = Router::new()
            .route("/deploy", post(claim::deploy))
            .route("/{token}", get(claim::verify))
            .route("/{token}/status", get(claim::status))
            .route("/{token}/summary", get(claim::summary))
            .route("/{token}/code", post(claim::verify_code));

        let wallet_routes = Router::new()
            .route("/deploy", post(wallet::deploy))
            .route("/batch-deploy", post(wallet::batch_deploy))
            .route("/{email}", get(wallet::info))
            .route("/{email}/estimate", get(wallet::estimate));

        let api = Router::new()
            .nest("/auth", auth_routes)
            .nest("/mail", mail_routes)
            .nest("/claim", claim_routes)
            .nest("/wallet", wallet_routes)
            .route("/ipfs", post(market::upload))
            .route("/price/eth", get(market::eth_price))
            .route("/nfts", get(market::nfts))
            .route("/sendgrid/send", post(market::sendgrid));

        let router = Router::new()
            .route("/health", get(health))
            .nest("/api", api)
            .with_state(state)
            .layer(middleware::from_fn(track_metrics))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        if config.security.enable_headers {
            with_security_headers(router)
        } else {
            router
        }
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&method, &route, response.status().as_u16(), start);
    response
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let chain = match &state.chain {
        Some(client) => {
            if client.is_healthy().await {
                "connected"
            } else {
                "unreachable"
            }
        }
        None => "disabled",
    };
    Json(json!({
        "status": "ok",
        "chain": chain,
        "relay": state.relay.is_configured(),
    }))
}
