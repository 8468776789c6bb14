//! REST-Handler fuer Benutzer-Endpunkte

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use stammtisch_core::models::{BenutzerAnsicht, Nachricht};
use stammtisch_core::types::{ChatroomId, UserId};
use stammtisch_directory::{Verzeichnis, VerzeichnisError};
use stammtisch_protocol::control::ServerEvent;

use crate::error::ApiError;
use crate::handlers::anfrager_aus_headers;
use crate::state::ApiState;

/// GET /users – alle Benutzer als Ansicht
///
/// `messages` wird entfernt, `online` transient aus der
/// Presence-Registry berechnet.
pub async fn alle_benutzer<D: Verzeichnis + 'static>(
    State(state): State<ApiState<D>>,
) -> Result<Response, ApiError> {
    let benutzer = state.verzeichnis.alle_benutzer().await?;
    let ansichten: Vec<BenutzerAnsicht> = benutzer
        .iter()
        .map(|b| BenutzerAnsicht::aus(b, state.presence.ist_online(&b.user_id)))
        .collect();
    Ok(Json(ansichten).into_response())
}

/// GET /users/:user_id/messages – Direktnachrichten mit dem Anfrager
///
/// Der Pfad benennt den Konversationspartner, der Header den Anfrager;
/// zurueckgegeben wird die Konversation aus Sicht des Pfad-Benutzers.
pub async fn benutzer_nachrichten<D: Verzeichnis + 'static>(
    State(state): State<ApiState<D>>,
    Path(user_id): Path<UserId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let anfrager = anfrager_aus_headers(&headers)?;
    let nachrichten = state.verzeichnis.direktnachrichten(user_id, anfrager).await?;
    Ok(Json(nachrichten).into_response())
}

#[derive(Debug, Deserialize)]
pub struct BenutzerErstellenBody {
    pub username: String,
}

/// POST /users – Benutzer erstellen
///
/// Die Notiz ueber den neuen Benutzer geht an alle Verbindungen.
pub async fn benutzer_erstellen<D: Verzeichnis + 'static>(
    State(state): State<ApiState<D>>,
    Json(body): Json<BenutzerErstellenBody>,
) -> Result<Response, ApiError> {
    let benutzer = state.verzeichnis.benutzer_erstellen(&body.username).await?;

    state
        .broadcaster
        .neuer_benutzer_broadcast(BenutzerAnsicht::aus(&benutzer, false));

    tracing::info!(user_id = %benutzer.user_id, username = %benutzer.username, "Benutzer erstellt");
    Ok((StatusCode::CREATED, Json(benutzer)).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatroomsZuweisenBody {
    pub chatroom_ids: Vec<ChatroomId>,
}

/// PUT /users/:user_id/rooms – Benutzer zu Chatrooms hinzufuegen
///
/// Idempotent pro Raum: nur tatsaechlich geaenderte Raeume erhalten eine
/// Beitritts-Notiz. Lebende Verbindungen des Benutzers werden sofort in
/// die Transport-Raeume eingetragen, damit nachfolgender Raum-Verkehr sie
/// ohne erneuten Login erreicht.
pub async fn benutzer_zu_chatrooms<D: Verzeichnis + 'static>(
    State(state): State<ApiState<D>>,
    Path(user_id): Path<UserId>,
    Json(body): Json<ChatroomsZuweisenBody>,
) -> Result<Response, ApiError> {
    if body.chatroom_ids.is_empty() {
        return Err(ApiError::validierung("'chatroomIds' darf nicht leer sein"));
    }

    let benutzer = state.verzeichnis.benutzer_laden(user_id).await?;

    let mut geaenderte: Vec<ChatroomId> = Vec::new();
    for chatroom_id in &body.chatroom_ids {
        match state
            .verzeichnis
            .mitglied_hinzufuegen(*chatroom_id, user_id)
            .await
        {
            Ok(true) => geaenderte.push(*chatroom_id),
            Ok(false) => {
                tracing::debug!(
                    user_id = %user_id,
                    chatroom_id = %chatroom_id,
                    "Bereits Mitglied – Raum unveraendert"
                );
            }
            Err(VerzeichnisError::NichtGefunden(_)) => {
                tracing::warn!(
                    user_id = %user_id,
                    chatroom_id = %chatroom_id,
                    "Unbekannter Chatroom uebersprungen"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    if !geaenderte.is_empty() {
        state
            .verzeichnis
            .chatrooms_hinzufuegen(user_id, &geaenderte)
            .await?;
    }

    for chatroom_id in &geaenderte {
        let beitritts_notiz = Nachricht::system_an_raum(
            *chatroom_id,
            benutzer.username.clone(),
            format!("{} has joined the chat!", benutzer.username),
        );

        if let Err(e) = state
            .verzeichnis
            .raum_nachricht_anfuegen(*chatroom_id, beitritts_notiz.clone())
            .await
        {
            tracing::warn!(
                chatroom_id = %chatroom_id,
                fehler = %e,
                "Beitritts-Notiz konnte nicht gespeichert werden"
            );
            continue;
        }

        for verbindung in state.presence.verbindungen_von(&user_id) {
            state.broadcaster.raum_beitreten(verbindung, *chatroom_id);
        }
        state
            .broadcaster
            .an_raum_senden(chatroom_id, ServerEvent::Nachricht(beitritts_notiz));
    }

    tracing::info!(
        user_id = %user_id,
        angefragt = body.chatroom_ids.len(),
        geaendert = geaenderte.len(),
        "Benutzer zu Chatrooms hinzugefuegt"
    );

    Ok(Json(json!({ "message": "Success" })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::REQUESTER_HEADER;
    use axum::http::HeaderValue;
    use std::sync::Arc;
    use stammtisch_core::types::ConnectionId;
    use stammtisch_directory::{BenutzerRepository, ChatroomRepository, MemoryVerzeichnis};
    use stammtisch_session::{EventBroadcaster, PresenceRegistry};

    fn test_state() -> (ApiState<MemoryVerzeichnis>, MemoryVerzeichnis) {
        let verzeichnis = MemoryVerzeichnis::neu();
        let state = ApiState::neu(
            Arc::new(verzeichnis.clone()),
            PresenceRegistry::neu(),
            EventBroadcaster::neu(),
        );
        (state, verzeichnis)
    }

    fn headers_fuer(user_id: UserId) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            REQUESTER_HEADER,
            HeaderValue::from_str(&user_id.inner().to_string()).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn erstellen_sendet_globale_notiz() {
        let (state, _verzeichnis) = test_state();
        let beobachter = ConnectionId::new();
        let mut rx = state.broadcaster.verbindung_registrieren(beobachter);

        let antwort = benutzer_erstellen(
            State(state),
            Json(BenutzerErstellenBody {
                username: "Tracer".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(antwort.status(), StatusCode::CREATED);

        let event = rx.try_recv().unwrap();
        assert!(
            matches!(event, ServerEvent::NeuerBenutzer(ansicht) if ansicht.username == "Tracer")
        );
    }

    #[tokio::test]
    async fn leerer_username_ist_validierungsfehler() {
        let (state, _verzeichnis) = test_state();
        let fehler = benutzer_erstellen(
            State(state),
            Json(BenutzerErstellenBody { username: "".into() }),
        )
        .await;
        assert!(matches!(fehler, Err(ApiError::Validierung(_))));
    }

    #[tokio::test]
    async fn beitritt_ist_idempotent_und_benachrichtigt_den_raum() {
        let (state, verzeichnis) = test_state();
        let gastgeber = verzeichnis.benutzer_erstellen("Gastgeber").await.unwrap();
        let gast = verzeichnis.benutzer_erstellen("Gast").await.unwrap();
        let raum = verzeichnis
            .chatroom_erstellen("abend", gastgeber.user_id, &[])
            .await
            .unwrap();

        // Gastgeber ist verbunden und im Transport-Raum
        let verbindung = ConnectionId::new();
        let mut rx = state.broadcaster.verbindung_registrieren(verbindung);
        state
            .presence
            .verbindung_hinzufuegen(gastgeber.user_id, "Gastgeber", verbindung);
        state.broadcaster.raum_beitreten(verbindung, raum.chatroom_id);

        benutzer_zu_chatrooms(
            State(state.clone()),
            Path(gast.user_id),
            Json(ChatroomsZuweisenBody {
                chatroom_ids: vec![raum.chatroom_id],
            }),
        )
        .await
        .unwrap();

        // Beitritts-Notiz ist persistiert und zugestellt
        let geladen = verzeichnis
            .chatroom_laden(raum.chatroom_id, gastgeber.user_id)
            .await
            .unwrap();
        assert_eq!(geladen.messages.len(), 1);
        assert!(geladen.messages[0].message.contains("has joined"));
        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::Nachricht(_)));

        // Zweiter Beitritt: keine weitere Notiz
        benutzer_zu_chatrooms(
            State(state),
            Path(gast.user_id),
            Json(ChatroomsZuweisenBody {
                chatroom_ids: vec![raum.chatroom_id],
            }),
        )
        .await
        .unwrap();

        let geladen = verzeichnis
            .chatroom_laden(raum.chatroom_id, gastgeber.user_id)
            .await
            .unwrap();
        assert_eq!(geladen.messages.len(), 1, "idempotenter Beitritt");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn beitritt_traegt_lebende_verbindungen_in_den_raum_ein() {
        let (state, verzeichnis) = test_state();
        let gastgeber = verzeichnis.benutzer_erstellen("Gastgeber").await.unwrap();
        let gast = verzeichnis.benutzer_erstellen("Gast").await.unwrap();
        let raum = verzeichnis
            .chatroom_erstellen("abend", gastgeber.user_id, &[])
            .await
            .unwrap();

        let verbindung = ConnectionId::new();
        let _rx = state.broadcaster.verbindung_registrieren(verbindung);
        state
            .presence
            .verbindung_hinzufuegen(gast.user_id, "Gast", verbindung);

        benutzer_zu_chatrooms(
            State(state.clone()),
            Path(gast.user_id),
            Json(ChatroomsZuweisenBody {
                chatroom_ids: vec![raum.chatroom_id],
            }),
        )
        .await
        .unwrap();

        assert!(state
            .broadcaster
            .verbindungen_in_raum(&raum.chatroom_id)
            .contains(&verbindung));
    }

    #[tokio::test]
    async fn leere_raum_liste_ist_validierungsfehler() {
        let (state, verzeichnis) = test_state();
        let gast = verzeichnis.benutzer_erstellen("Gast").await.unwrap();

        let fehler = benutzer_zu_chatrooms(
            State(state),
            Path(gast.user_id),
            Json(ChatroomsZuweisenBody { chatroom_ids: vec![] }),
        )
        .await;
        assert!(matches!(fehler, Err(ApiError::Validierung(_))));
    }

    #[tokio::test]
    async fn online_status_in_der_benutzerliste() {
        let (state, verzeichnis) = test_state();
        let online = verzeichnis.benutzer_erstellen("Online").await.unwrap();
        let offline = verzeichnis.benutzer_erstellen("Offline").await.unwrap();
        state
            .presence
            .verbindung_hinzufuegen(online.user_id, "Online", ConnectionId::new());

        let _antwort = alle_benutzer(State(state.clone())).await.unwrap();
        // Die Ansicht selbst laesst sich direkt pruefen
        assert!(state.presence.ist_online(&online.user_id));
        assert!(!state.presence.ist_online(&offline.user_id));
    }

    #[tokio::test]
    async fn direktnachrichten_aus_sicht_des_pfad_benutzers() {
        let (state, verzeichnis) = test_state();
        let winston = verzeichnis.benutzer_erstellen("Winston").await.unwrap();
        let nathaniel = verzeichnis.benutzer_erstellen("Nathaniel").await.unwrap();

        let nachricht =
            Nachricht::an_benutzer(nathaniel.user_id, "Nathaniel", winston.user_id, "Hello!");
        verzeichnis
            .direktnachricht_anfuegen(nathaniel.user_id, winston.user_id, nachricht)
            .await
            .unwrap();

        let antwort = benutzer_nachrichten(
            State(state),
            Path(winston.user_id),
            headers_fuer(nathaniel.user_id),
        )
        .await
        .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
    }
}
