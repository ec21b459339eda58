//! HTTP service with modular organization
//!
//! - context: shared handler state
//! - converters: domain model → JSON response conversions
//! - endpoints: handlers grouped by resource
//! - error: the `{"error": ...}` taxonomy every handler returns
//! - extractors: JSON-rejecting extractors and bearer authentication

mod context;
mod converters;
mod endpoints;
mod error;
mod extractors;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::persistence::Persistence;
use endpoints::{auth, connections, health, links, option_profiles, profiles, qr, users};

pub use context::AppState;

/// Build the full application: every route under `/api`, request tracing
/// and CORS restricted to `origins`.
pub fn router<D: Persistence>(state: AppState<D>, origins: &[String]) -> Router {
    let api = Router::new()
        .merge(health::router())
        .route("/generate-qr", post(qr::generate_qr))
        .route("/signup", post(auth::signup::<D>))
        .route("/signin", post(auth::signin::<D>))
        .route("/users", get(users::list_users::<D>))
        .route(
            "/users/:user_id/profiles",
            get(users::list_user_profiles::<D>),
        )
        .route("/profiles", post(profiles::create_profile::<D>))
        .route(
            "/profiles/:id",
            get(profiles::get_profile::<D>)
                .put(profiles::update_profile::<D>)
                .delete(profiles::delete_profile::<D>),
        )
        .route("/profiles/:id/icon", get(profiles::get_profile_icon::<D>))
        .route(
            "/profiles/:id/option-profiles",
            get(option_profiles::list_option_profiles::<D>),
        )
        .route("/profiles/:id/links", get(links::list_profile_links::<D>))
        .route(
            "/option-profiles",
            post(option_profiles::create_option_profile::<D>),
        )
        .route(
            "/option-profiles/:id",
            put(option_profiles::update_option_profile::<D>)
                .delete(option_profiles::delete_option_profile::<D>),
        )
        .route("/link-types", get(links::list_link_types))
        .route("/links", post(links::create_link::<D>))
        .route(
            "/links/:id",
            get(links::get_link::<D>)
                .put(links::update_link::<D>)
                .delete(links::delete_link::<D>),
        )
        .route("/links/:id/image", get(links::get_link_image::<D>))
        .route(
            "/connections",
            post(connections::create_connection::<D>).get(connections::list_connections::<D>),
        )
        .route("/connections/mutual", get(connections::mutual::<D>))
        .route(
            "/connections/:id",
            get(connections::get_connection::<D>)
                .put(connections::decide_connection::<D>)
                .delete(connections::delete_connection::<D>),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}
