//! HTTP surface: routes, CORS, health and the bundled pages.

use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::headers::cors_headers;
use crate::proxy::{self, AppState};

const HOME_PAGE: &str = include_str!("../assets/home.html");
const PLAYER_PAGE: &str = include_str!("../assets/player.html");

pub fn router(state: AppState) -> Router {
    let routes = &state.config.routes;

    let mut router = Router::new()
        .route("/", get(home))
        .route("/player", get(player))
        .route(&routes.health_path, get(health))
        .route(&routes.proxy_path, get(proxy::handle));
    for alias in &routes.proxy_aliases {
        router = router.route(alias, get(proxy::handle));
    }

    router
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(cors)),
        )
        .with_state(state)
}

/// Answers preflights for any path and adds CORS headers to every response.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return (StatusCode::OK, cors_headers()).into_response();
    }

    let mut response = next.run(request).await;
    for (name, value) in cors_headers().iter() {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

async fn player() -> Html<&'static str> {
    Html(PLAYER_PAGE)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "Not Found",
    )
}
