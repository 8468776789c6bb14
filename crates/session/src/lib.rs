//! stammtisch-session – TCP Session- und Presence-Service
//!
//! Dieses Crate implementiert den Echtzeit-Kern von Stammtisch: es
//! verwaltet TCP-Verbindungen, die Zuordnung von Verbindungen zu
//! Benutzern und das Routing von Nachrichten und Online-Status-Events.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SessionServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task, Events in Eingangsreihenfolge)
//!     |
//!     v
//! EventDispatcher
//!     |
//!     +-- sitzung_handler    (Login, Logout, Disconnect)
//!     +-- nachricht_handler  (Raum- und Direktnachrichten, Tipp-Indikatoren)
//!
//! PresenceRegistry – Wer ist online, ueber welche Verbindungen
//! EventBroadcaster – Events an Raeume, Verbindungen oder alle senden
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod presence;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::EventDispatcher;
pub use error::{SessionError, SessionResult};
pub use presence::{PresenceRegistry, PresenzUebergang};
pub use server_state::{SessionConfig, SessionState};
pub use tcp::SessionServer;
