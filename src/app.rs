use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::{AuthDelegate, TokenIssuer};
use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::executor::CommandRunner;
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, TokenLookup};
use crate::registry::HandlerRegistry;

/// Everything a request needs. Built once, read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub dispatcher: Arc<Dispatcher>,
    pub auth: Arc<AuthDelegate>,
    pub tokens: Arc<TokenIssuer>,
    pub token_lookup: Arc<TokenLookup>,
}

impl AppState {
    pub fn new(config: AppConfig, registry: HandlerRegistry, runner: Arc<dyn CommandRunner>) -> Self {
        let path = config.exec.path.clone();
        let id_key = config.security.id_key.clone();

        let dispatcher = Dispatcher::new(Arc::new(registry), runner.clone(), path.clone(), id_key.clone());
        let auth = AuthDelegate::new(runner, config.login_program(), path, id_key);
        let tokens = TokenIssuer::from_config(&config.security);
        let token_lookup = TokenLookup::parse(&config.security.jwt_token_lookup);

        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            auth: Arc::new(auth),
            tokens: Arc::new(tokens),
            token_lookup: Arc::new(token_lookup),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    // Anything static files cannot answer ends in an authenticated 404
    let static_files = ServeDir::new(&config.server.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(authenticated_not_found(state.clone()));

    let mut app = Router::new()
        .nest("/api", api_routes(state.clone()))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes))
        .layer(TraceLayer::new_for_http());

    if config.server.enable_compression {
        app = app.layer(CompressionLayer::new());
    }
    if config.server.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Checks the token first, so only authenticated callers learn a path is unknown.
fn authenticated_not_found(state: AppState) -> Router {
    Router::new()
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
        .with_state(state)
}

// Wrong methods on known paths answer like unknown paths, never a bare 405
fn api_routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/logout", post(handlers::session::logout).fallback(handlers::not_found))
        .route("/:route", post(handlers::route::dispatch).fallback(handlers::not_found))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route(
            "/login",
            post(handlers::session::login).fallback_service(authenticated_not_found(state.clone())),
        )
        .merge(protected)
        .with_state(state)
}
