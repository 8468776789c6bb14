//! REST-Handler fuer Chatroom-Endpunkte

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use stammtisch_core::models::Nachricht;
use stammtisch_core::types::{ChatroomId, ConnectionId, UserId};
use stammtisch_directory::Verzeichnis;
use stammtisch_protocol::control::ServerEvent;

use crate::error::ApiError;
use crate::handlers::anfrager_aus_headers;
use crate::state::ApiState;

/// GET /rooms – alle Chatrooms
pub async fn alle_chatrooms<D: Verzeichnis + 'static>(
    State(state): State<ApiState<D>>,
) -> Result<Response, ApiError> {
    let chatrooms = state.verzeichnis.alle_chatrooms().await?;
    Ok(Json(chatrooms).into_response())
}

/// GET /rooms/:chatroom_id – ein Chatroom, nur fuer Mitglieder
pub async fn chatroom_laden<D: Verzeichnis + 'static>(
    State(state): State<ApiState<D>>,
    Path(chatroom_id): Path<ChatroomId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let anfrager = anfrager_aus_headers(&headers)?;
    let chatroom = state.verzeichnis.chatroom_laden(chatroom_id, anfrager).await?;
    Ok(Json(chatroom).into_response())
}

/// GET /rooms/:chatroom_id/messages – Nachrichten-Historie, nur fuer Mitglieder
pub async fn chatroom_nachrichten<D: Verzeichnis + 'static>(
    State(state): State<ApiState<D>>,
    Path(chatroom_id): Path<ChatroomId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let anfrager = anfrager_aus_headers(&headers)?;
    let chatroom = state.verzeichnis.chatroom_laden(chatroom_id, anfrager).await?;
    Ok(Json(chatroom.messages).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatroomErstellenBody {
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
}

/// POST /rooms – Chatroom erstellen
///
/// Der Anfrager ist implizit Mitglied. Die Benachrichtigung ueber den
/// neuen Raum geht gezielt nur an die Verbindungen der Mitglieder –
/// Nicht-Mitglieder sollen Raeume nicht sehen, auf die sie keinen
/// Zugriff haben. Anschliessend wird die Erstellungs-Notiz in den Raum
/// gesendet.
pub async fn chatroom_erstellen<D: Verzeichnis + 'static>(
    State(state): State<ApiState<D>>,
    headers: HeaderMap,
    Json(body): Json<ChatroomErstellenBody>,
) -> Result<Response, ApiError> {
    let anfrager = anfrager_aus_headers(&headers)?;

    let ersteller = state.verzeichnis.benutzer_laden(anfrager).await?;
    let chatroom = state
        .verzeichnis
        .chatroom_erstellen(&body.name, anfrager, &body.member_ids)
        .await?;

    // Mitgliedschaft auch auf den Benutzer-Datensaetzen nachziehen, damit
    // ein spaeterer Login die Verbindung in den Raum eintraegt. Unbekannte
    // member_ids bleiben im Raum stehen, erhalten aber keinen Datensatz.
    for mitglied in &chatroom.member_ids {
        if let Err(e) = state
            .verzeichnis
            .chatrooms_hinzufuegen(*mitglied, &[chatroom.chatroom_id])
            .await
        {
            tracing::warn!(
                user_id = %mitglied,
                chatroom_id = %chatroom.chatroom_id,
                fehler = %e,
                "Mitglied ohne Benutzereintrag uebersprungen"
            );
        }
    }

    let erstellungs_notiz = Nachricht::system_an_raum(
        chatroom.chatroom_id,
        ersteller.username.clone(),
        format!(
            "{} has created chatroom # {}",
            ersteller.username, chatroom.name
        ),
    );
    state
        .verzeichnis
        .raum_nachricht_anfuegen(chatroom.chatroom_id, erstellungs_notiz.clone())
        .await?;

    // Lebende Verbindungen aller Mitglieder aufloesen, in den
    // Transport-Raum eintragen und gezielt benachrichtigen
    let mitglieder_verbindungen: Vec<ConnectionId> = chatroom
        .member_ids
        .iter()
        .flat_map(|user_id| state.presence.verbindungen_von(user_id))
        .collect();

    for verbindung in &mitglieder_verbindungen {
        state
            .broadcaster
            .raum_beitreten(*verbindung, chatroom.chatroom_id);
    }

    state
        .broadcaster
        .neuer_chatroom_an(&mitglieder_verbindungen, chatroom.clone());
    state
        .broadcaster
        .an_raum_senden(&chatroom.chatroom_id, ServerEvent::Nachricht(erstellungs_notiz));

    tracing::info!(
        chatroom_id = %chatroom.chatroom_id,
        name = %chatroom.name,
        ersteller = %anfrager,
        mitglieder = chatroom.member_ids.len(),
        "Chatroom erstellt"
    );

    Ok((StatusCode::CREATED, Json(chatroom)).into_response())
}
