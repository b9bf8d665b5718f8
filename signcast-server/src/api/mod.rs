pub mod auth_api;
pub mod displays_api;
pub mod playlists_api;
pub mod service_types_api;
pub mod settings_api;
pub mod stats_api;
pub mod tickets_api;
pub mod users_api;

use crate::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        // Displays
        .route("/displays", get(displays_api::list_displays))
        .route("/displays", post(displays_api::create_display))
        .route(
            "/displays/:id",
            delete(displays_api::delete_display).put(displays_api::update_display),
        )
        .route(
            "/displays/:id/playlist",
            put(displays_api::assign_playlist),
        )
        // Playlists
        .route("/playlists", get(playlists_api::list_playlists))
        .route("/playlists", post(playlists_api::create_playlist))
        .route("/playlists/:id", put(playlists_api::update_playlist))
        .route("/playlists/:id", delete(playlists_api::delete_playlist))
        .route("/playlists/:id/slides", get(playlists_api::list_slides))
        .route("/playlists/:id/slides", post(playlists_api::create_slide))
        .route(
            "/playlists/:playlist_id/slides/:slide_id",
            put(playlists_api::update_slide),
        )
        .route(
            "/playlists/:playlist_id/slides/:slide_id",
            delete(playlists_api::delete_slide),
        )
        // Queue
        .route("/tickets", get(tickets_api::list_tickets))
        .route("/tickets", post(tickets_api::create_ticket))
        .route("/tickets/:id/call", post(tickets_api::call_ticket))
        .route("/tickets/:id/complete", post(tickets_api::complete_ticket))
        .route("/service-types", get(service_types_api::list_service_types))
        .route(
            "/service-types",
            post(service_types_api::create_service_type),
        )
        .route(
            "/service-types/:id",
            delete(service_types_api::delete_service_type),
        )
        .route("/stats", get(stats_api::get_queue_stats))
        // Users
        .route("/users", get(users_api::list_users))
        .route("/users", post(users_api::create_user))
        .route("/users/:id", put(users_api::update_user))
        .route("/users/:id", delete(users_api::delete_user))
        // Settings
        .route("/settings/:key", put(settings_api::update_setting))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::auth::middleware::auth_middleware,
        ));

    Router::new()
        // Public auth endpoints
        .route("/auth/login", post(auth_api::login))
        .route("/auth/logout", post(auth_api::logout))
        // Players fetch their content with a display secret instead of a JWT
        .route(
            "/displays/:id/content",
            get(displays_api::get_display_content),
        )
        .route("/settings", get(settings_api::list_settings))
        .merge(protected_routes)
}
