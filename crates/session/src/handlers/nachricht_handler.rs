//! Nachrichten-Handler – Raum- und Direktnachrichten, Tipp-Indikatoren
//!
//! Alle Handler loesen den Absender ueber die Presence-Registry anhand
//! der Verbindung auf; nicht angemeldete Absender werden mit einer
//! Warnung verworfen, nie als Fehler an die Verbindung gereicht.
//! Nachrichten werden erst persistiert, dann verteilt.

use std::sync::Arc;

use stammtisch_core::models::Nachricht;
use stammtisch_core::types::{ChatroomId, ConnectionId, UserId};
use stammtisch_directory::Verzeichnis;
use stammtisch_protocol::control::ServerEvent;

use crate::presence::PresenceEintrag;
use crate::server_state::SessionState;

/// Verarbeitet eine Nachricht an einen Chatroom
pub async fn handle_chatroom_nachricht<D: Verzeichnis + 'static>(
    verbindung: ConnectionId,
    chatroom_id: ChatroomId,
    text: String,
    state: &Arc<SessionState<D>>,
) {
    let Some(absender) = absender_aufloesen(&verbindung, state, "Raum-Nachricht") else {
        return;
    };

    let nachricht = Nachricht::an_raum(
        absender.user_id,
        absender.username.clone(),
        chatroom_id,
        text,
    );

    // Erst persistieren, dann verteilen – eine nicht gespeicherte
    // Nachricht darf nie zugestellt werden
    match state
        .verzeichnis
        .raum_nachricht_anfuegen(chatroom_id, nachricht.clone())
        .await
    {
        Ok(()) => {
            state
                .broadcaster
                .an_raum_senden(&chatroom_id, ServerEvent::Nachricht(nachricht));
            tracing::debug!(
                user_id = %absender.user_id,
                chatroom_id = %chatroom_id,
                "Raum-Nachricht zugestellt"
            );
        }
        Err(e) => {
            tracing::warn!(
                user_id = %absender.user_id,
                chatroom_id = %chatroom_id,
                fehler = %e,
                "Raum-Nachricht konnte nicht gespeichert werden"
            );
        }
    }
}

/// Verarbeitet eine Direktnachricht an einen Benutzer
///
/// Der Empfaenger darf offline sein – die Nachricht landet trotzdem in
/// beiden Konversationskopien. Zugestellt wird an die Vereinigung aller
/// lebenden Verbindungen von Absender und Empfaenger (dedupliziert).
pub async fn handle_direktnachricht<D: Verzeichnis + 'static>(
    verbindung: ConnectionId,
    to_user_id: UserId,
    text: String,
    state: &Arc<SessionState<D>>,
) {
    let Some(absender) = absender_aufloesen(&verbindung, state, "Direktnachricht") else {
        return;
    };

    let nachricht = Nachricht::an_benutzer(
        absender.user_id,
        absender.username.clone(),
        to_user_id,
        text,
    );

    if let Err(e) = state
        .verzeichnis
        .direktnachricht_anfuegen(absender.user_id, to_user_id, nachricht.clone())
        .await
    {
        tracing::warn!(
            von = %absender.user_id,
            an = %to_user_id,
            fehler = %e,
            "Direktnachricht konnte nicht gespeichert werden"
        );
        return;
    }

    let mut ziele = state.presence.verbindungen_von(&to_user_id);
    ziele.extend(state.presence.verbindungen_von(&absender.user_id));
    state
        .broadcaster
        .an_verbindungen_senden(&ziele, ServerEvent::Nachricht(nachricht));

    tracing::debug!(
        von = %absender.user_id,
        an = %to_user_id,
        ziele = ziele.len(),
        "Direktnachricht zugestellt"
    );
}

/// Verarbeitet einen Tipp-Indikator fuer einen Chatroom (best-effort)
pub fn handle_tippen_chatroom<D: Verzeichnis + 'static>(
    verbindung: ConnectionId,
    to_chatroom_id: ChatroomId,
    typing: bool,
    state: &Arc<SessionState<D>>,
) {
    let Some(absender) = absender_aufloesen(&verbindung, state, "Raum-Tipp-Indikator") else {
        return;
    };

    state.broadcaster.an_raum_senden(
        &to_chatroom_id,
        ServerEvent::TippenInChatroomGeaendert {
            user_id: absender.user_id,
            username: absender.username,
            to_chatroom_id,
            typing,
        },
    );
}

/// Verarbeitet einen direkten Tipp-Indikator (best-effort)
///
/// Ein offline Empfaenger ist kein Fehler; der Indikator verfaellt dann
/// einfach.
pub fn handle_tippen_direkt<D: Verzeichnis + 'static>(
    verbindung: ConnectionId,
    to_user_id: UserId,
    typing: bool,
    state: &Arc<SessionState<D>>,
) {
    let Some(absender) = absender_aufloesen(&verbindung, state, "direkter Tipp-Indikator") else {
        return;
    };

    let Ok(empfaenger) = state.presence.nach_benutzer(&to_user_id) else {
        tracing::debug!(an = %to_user_id, "Tipp-Indikator an offline Benutzer verfallen");
        return;
    };

    state.broadcaster.an_verbindungen_senden(
        &[empfaenger.connection_id],
        ServerEvent::TippenDirektGeaendert {
            user_id: absender.user_id,
            username: absender.username,
            to_user_id,
            typing,
        },
    );
}

/// Loest den Absender eines Ereignisses ueber seine Verbindung auf
///
/// Nicht angemeldete Verbindungen (oder Ereignisse die einen Disconnect
/// ueberholen) werden geloggt und verworfen.
fn absender_aufloesen<D: Verzeichnis + 'static>(
    verbindung: &ConnectionId,
    state: &Arc<SessionState<D>>,
    kontext: &str,
) -> Option<PresenceEintrag> {
    match state.presence.nach_verbindung(verbindung) {
        Ok(eintrag) => Some(eintrag),
        Err(e) => {
            tracing::warn!(
                verbindung = %verbindung,
                fehler = %e,
                "{} von nicht angemeldeter Verbindung verworfen",
                kontext
            );
            None
        }
    }
}
