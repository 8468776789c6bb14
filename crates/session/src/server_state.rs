//! Gemeinsamer Server-Zustand fuer den Session-Service
//!
//! Haelt alle geteilten Services und Zustands-Manager als Arc-Referenzen,
//! die sicher zwischen tokio-Tasks geteilt werden koennen.

use std::sync::Arc;

use stammtisch_directory::Verzeichnis;

use crate::broadcast::EventBroadcaster;
use crate::presence::PresenceRegistry;

/// Konfiguration fuer den Session-Service
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_name: "Stammtisch Server".to_string(),
            max_clients: 512,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
///
/// Das Verzeichnis ist als Trait-Parameter injiziert, damit das fluechtige
/// In-Memory-Backend spaeter durch ein echtes ersetzt werden kann, ohne
/// Dispatcher oder Handler anzufassen.
pub struct SessionState<D: Verzeichnis + 'static> {
    /// Session-Konfiguration
    pub config: Arc<SessionConfig>,
    /// Verzeichnis (Benutzer, Chatrooms, Nachrichten-Historie)
    pub verzeichnis: Arc<D>,
    /// Presence-Registry (wer ist online, ueber welche Verbindungen)
    pub presence: PresenceRegistry,
    /// Event-Broadcaster (Events an Verbindungen senden)
    pub broadcaster: EventBroadcaster,
}

impl<D: Verzeichnis + 'static> SessionState<D> {
    /// Erstellt einen neuen SessionState
    pub fn neu(config: SessionConfig, verzeichnis: Arc<D>) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            verzeichnis,
            presence: PresenceRegistry::neu(),
            broadcaster: EventBroadcaster::neu(),
        })
    }
}
