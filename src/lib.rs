use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod http_client;
pub mod middleware;
pub mod services;
pub mod state;
pub mod store;

use auth::{require_access, RouteAccess};
use config::SecurityConfig;
use error::{error_envelope_middleware, panic_response};
use middleware::session_auth_middleware;
pub use state::AppState;

/// Full HTTP surface. Layers, outermost first: error path stamping, panic
/// catcher, CORS, request tracing, session authenticator; per-route access
/// rules run innermost.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(external_routes())
        .merge(stream_routes())
        .fallback(handlers::root::not_found)
        .layer(from_fn_with_state(state.sessions.clone(), session_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.security))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(error_envelope_middleware))
        .with_state(state)
}

/// Attach an access rule to the methods registered so far on `route`
fn guard(access: RouteAccess, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(access, require_access))
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", guard(RouteAccess::authenticated(), post(auth::refresh)))
}

fn user_routes() -> Router<AppState> {
    use axum::routing::{delete, put};
    use handlers::users;

    Router::new()
        .route(
            "/users",
            guard(RouteAccess::authenticated(), post(users::create)).get(users::list),
        )
        .route(
            "/users/:id",
            guard(
                RouteAccess::authenticated().with_roles(["admin"]),
                delete(users::remove),
            )
            .merge(guard(RouteAccess::authenticated(), put(users::update)))
            .get(users::get),
        )
}

fn external_routes() -> Router<AppState> {
    use handlers::external;

    Router::new()
        .route("/users/external", get(external::list).post(external::create))
        .route("/users/external/search", get(external::search))
        .route(
            "/users/external/:id",
            get(external::get).put(external::update).delete(external::remove),
        )
}

fn stream_routes() -> Router<AppState> {
    use handlers::stream;

    Router::new()
        .route("/users/stream/events", get(stream::events))
        .route("/users/stream/raw/:id", get(stream::raw))
        .route("/users/stream/stream-json", get(stream::stream_json))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
