//! Route-Definitionen fuer die REST-API

use axum::routing::{get, post, put};
use axum::Router;

use stammtisch_directory::Verzeichnis;

use crate::handlers;
use crate::server::health;
use crate::state::ApiState;

/// Erstellt den vollstaendigen API-Router
pub fn router<D: Verzeichnis + 'static>() -> Router<ApiState<D>> {
    Router::new()
        // Chatrooms
        .route("/rooms", get(handlers::rooms::alle_chatrooms::<D>))
        .route("/rooms", post(handlers::rooms::chatroom_erstellen::<D>))
        .route("/rooms/:chatroom_id", get(handlers::rooms::chatroom_laden::<D>))
        .route(
            "/rooms/:chatroom_id/messages",
            get(handlers::rooms::chatroom_nachrichten::<D>),
        )
        // Benutzer
        .route("/users", get(handlers::users::alle_benutzer::<D>))
        .route("/users", post(handlers::users::benutzer_erstellen::<D>))
        .route(
            "/users/:user_id/messages",
            get(handlers::users::benutzer_nachrichten::<D>),
        )
        .route(
            "/users/:user_id/rooms",
            put(handlers::users::benutzer_zu_chatrooms::<D>),
        )
        // Health
        .route("/health", get(health))
}
