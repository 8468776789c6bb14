//! Event-Dispatcher – Routet ClientEvents an die richtigen Handler
//!
//! Ein Dispatcher pro Server, geteilt ueber alle Verbindungen; er haelt
//! selbst keinen Verbindungszustand (der lebt in PresenceRegistry und
//! EventBroadcaster). Jedes Ereignis traegt die ConnectionId der
//! Verbindung, auf der es ankam.
//!
//! ## Reihenfolge
//! Die `ClientConnection` awaitet jeden Dispatch bevor sie das naechste
//! Frame liest – Ereignisse einer Verbindung laufen strikt in
//! Eingangsreihenfolge, und ein Disconnect wird nach allen zuvor
//! eingetroffenen Ereignissen derselben Verbindung verarbeitet.
//! Zwischen verschiedenen Verbindungen gibt es keine Ordnung.
//!
//! ## Fehlerverhalten
//! Kein Handler laesst einen Fehler nach oben durchschlagen: ein
//! fehlerhaftes Ereignis wird geloggt und verworfen, die gemeinsame
//! Event-Schleife und alle anderen Verbindungen laufen weiter.

use std::sync::Arc;

use stammtisch_core::types::ConnectionId;
use stammtisch_directory::Verzeichnis;
use stammtisch_protocol::control::ClientEvent;

use crate::handlers::{nachricht_handler, sitzung_handler};
use crate::presence::PresenzUebergang;
use crate::server_state::SessionState;

/// Zentraler Event-Dispatcher
pub struct EventDispatcher<D: Verzeichnis + 'static> {
    state: Arc<SessionState<D>>,
}

impl<D: Verzeichnis + 'static> EventDispatcher<D> {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SessionState<D>>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes Ereignis einer Verbindung
    pub async fn dispatch(&self, verbindung: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::Login { user_id, username } => {
                sitzung_handler::handle_login(user_id, username, verbindung, &self.state).await;
            }

            ClientEvent::Logout => {
                sitzung_handler::handle_logout(verbindung, &self.state);
            }

            ClientEvent::NachrichtAnChatroom {
                chatroom_id,
                message,
            } => {
                nachricht_handler::handle_chatroom_nachricht(
                    verbindung,
                    chatroom_id,
                    message,
                    &self.state,
                )
                .await;
            }

            ClientEvent::NachrichtAnBenutzer {
                to_user_id,
                message,
            } => {
                nachricht_handler::handle_direktnachricht(
                    verbindung,
                    to_user_id,
                    message,
                    &self.state,
                )
                .await;
            }

            ClientEvent::TippenInChatroom {
                to_chatroom_id,
                typing,
            } => {
                nachricht_handler::handle_tippen_chatroom(
                    verbindung,
                    to_chatroom_id,
                    typing,
                    &self.state,
                );
            }

            ClientEvent::TippenDirekt { to_user_id, typing } => {
                nachricht_handler::handle_tippen_direkt(verbindung, to_user_id, typing, &self.state);
            }
        }
    }

    /// Bereinigt eine physisch getrennte Verbindung
    ///
    /// Wird von der `ClientConnection` genau einmal pro Disconnect
    /// aufgerufen: Presence-Zuordnung loesen (wie Logout) und die
    /// Send-Queue samt Raum-Mitgliedschaften aus dem Broadcaster nehmen.
    pub fn verbindung_getrennt(&self, verbindung: &ConnectionId) {
        if let Some(entfernt) = self.state.presence.verbindung_entfernen(verbindung) {
            if let Some(uebergang) = entfernt.uebergang {
                uebergang_melden(&self.state, uebergang);
            }
        }
        self.state.broadcaster.verbindung_entfernen(verbindung);
        tracing::debug!(verbindung = %verbindung, "Verbindungs-Ressourcen bereinigt");
    }
}

/// Meldet einen Presence-Uebergang als Online-Status-Broadcast
///
/// Genau ein Broadcast pro Offline->Online- bzw. Online->Offline-
/// Uebergang; Online->Online-Selbstuebergaenge erreichen diese Funktion
/// nie.
pub(crate) fn uebergang_melden<D: Verzeichnis + 'static>(
    state: &Arc<SessionState<D>>,
    uebergang: PresenzUebergang,
) {
    match uebergang {
        PresenzUebergang::Online(user_id) => {
            state.broadcaster.online_status_broadcast(user_id, true);
        }
        PresenzUebergang::Offline(user_id) => {
            state.broadcaster.online_status_broadcast(user_id, false);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
