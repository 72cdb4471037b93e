use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers, Config};
use crate::handlers::{events, health_check, registrations, users};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/me", get(users::me).put(users::update_me))
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::replace_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/register", post(events::register_for_event))
        .route(
            "/events/:id/registrations",
            get(events::event_registrations),
        )
        .route("/registrations", get(registrations::list_registrations))
        .route(
            "/registrations/:id",
            get(registrations::get_registration).delete(registrations::delete_registration),
        )
        .route(
            "/registrations/:id/cancel",
            post(registrations::cancel_registration),
        );

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .with_state(state);

    with_security_headers(router, config.production).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&config.cors_allowed_origins)),
    )
}
