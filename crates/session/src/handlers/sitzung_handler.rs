//! Sitzungs-Handler – Login und Logout
//!
//! Login koppelt eine Verbindung an eine Benutzeridentitaet und traegt
//! sie in die Raum-Mitgliedschaft des Transports ein; Logout loest nur
//! die Presence-Zuordnung, die Verbindung selbst bleibt offen.

use std::sync::Arc;

use stammtisch_core::types::{ConnectionId, UserId};
use stammtisch_directory::Verzeichnis;

use crate::dispatcher::uebergang_melden;
use crate::server_state::SessionState;

/// Verarbeitet ein Login-Ereignis
///
/// Das Verzeichnis wird zuerst befragt: ein unbekannter Benutzer darf
/// keinen Presence-Eintrag ohne Raum-Mitgliedschaften hinterlassen, der
/// spaetere Raum-Broadcasts stillschweigend ins Leere laufen laesst.
pub async fn handle_login<D: Verzeichnis + 'static>(
    user_id: UserId,
    username: String,
    verbindung: ConnectionId,
    state: &Arc<SessionState<D>>,
) {
    let benutzer = match state.verzeichnis.benutzer_laden(user_id).await {
        Ok(benutzer) => benutzer,
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                verbindung = %verbindung,
                fehler = %e,
                "Login fuer unbekannten Benutzer verworfen"
            );
            return;
        }
    };

    let uebergaenge = state
        .presence
        .verbindung_hinzufuegen(user_id, username.clone(), verbindung);

    // Verbindung in alle Mitgliedschafts-Raeume eintragen
    for chatroom_id in &benutzer.chatroom_ids {
        state.broadcaster.raum_beitreten(verbindung, *chatroom_id);
    }

    for uebergang in uebergaenge {
        uebergang_melden(state, uebergang);
    }

    tracing::info!(
        user_id = %user_id,
        username = %username,
        verbindung = %verbindung,
        raeume = benutzer.chatroom_ids.len(),
        "Benutzer angemeldet"
    );
}

/// Verarbeitet ein Logout-Ereignis
///
/// No-op wenn die Verbindung nie angemeldet war. Die Transport-Raum-
/// Mitgliedschaft bleibt bis zum Disconnect bestehen.
pub fn handle_logout<D: Verzeichnis + 'static>(
    verbindung: ConnectionId,
    state: &Arc<SessionState<D>>,
) {
    match state.presence.verbindung_entfernen(&verbindung) {
        Some(entfernt) => {
            if let Some(uebergang) = entfernt.uebergang {
                uebergang_melden(state, uebergang);
            }
            tracing::info!(
                user_id = %entfernt.user_id,
                verbindung = %verbindung,
                "Benutzer abgemeldet"
            );
        }
        None => {
            tracing::debug!(verbindung = %verbindung, "Logout ohne Anmeldung – no-op");
        }
    }
}
