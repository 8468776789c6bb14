//! Geteilter Zustand fuer die REST-Handler
//!
//! Verzeichnis, PresenceRegistry und EventBroadcaster sind dieselben
//! Instanzen die auch der Session-Service verwendet – REST-Mutationen
//! erreichen so die aktuell verbundenen Clients.

use std::sync::Arc;

use stammtisch_directory::Verzeichnis;
use stammtisch_session::{EventBroadcaster, PresenceRegistry};

/// Axum-State fuer alle REST-Handler
pub struct ApiState<D: Verzeichnis + 'static> {
    /// Verzeichnis (Benutzer, Chatrooms, Nachrichten-Historie)
    pub verzeichnis: Arc<D>,
    /// Presence-Registry des Session-Service
    pub presence: PresenceRegistry,
    /// Event-Broadcaster des Session-Service
    pub broadcaster: EventBroadcaster,
}

impl<D: Verzeichnis + 'static> ApiState<D> {
    /// Erstellt einen neuen ApiState
    pub fn neu(
        verzeichnis: Arc<D>,
        presence: PresenceRegistry,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            verzeichnis,
            presence,
            broadcaster,
        }
    }
}

impl<D: Verzeichnis + 'static> Clone for ApiState<D> {
    fn clone(&self) -> Self {
        Self {
            verzeichnis: Arc::clone(&self.verzeichnis),
            presence: self.presence.clone(),
            broadcaster: self.broadcaster.clone(),
        }
    }
}
