//! Route definitions for the API.

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers;
use crate::auth::{authenticate, require_authenticated, RoutePolicy};
use crate::AppState;

/// Security scheme modifier for OpenAPI.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::login,
        handlers::current_user,
        handlers::session_status,
    ),
    components(schemas(
        crate::api::types::LoginRequest,
        crate::api::types::LoginResponse,
        crate::api::types::CurrentUserResponse,
        crate::api::types::SessionResponse,
        crate::api::types::HealthResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "Tokengate API",
        version = "0.1.0",
        description = "Stateless bearer-token authentication",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the API router.
///
/// Request flow: CORS, trace, `authenticate`, `require_authenticated`,
/// then the handler.
pub fn build_router(state: AppState, policy: RoutePolicy) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let authenticator = state.authenticator.clone();

    Router::new()
        // Public
        .route("/health", get(handlers::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/auth/login", post(handlers::login))
        .route("/auth/session", get(handlers::session_status))
        // Protected
        .route("/me", get(handlers::current_user))
        .with_state(state)
        // Layers run bottom-up: the last one added sees the request first
        .layer(middleware::from_fn_with_state(policy, require_authenticated))
        .layer(middleware::from_fn_with_state(authenticator, authenticate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
