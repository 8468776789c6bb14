//! Chat-Protokoll (TCP)
//!
//! Definiert alle Ereignisse die ueber die TCP-Verbindung zwischen Client
//! und Server ausgetauscht werden.
//!
//! ## Design
//! - Fire-and-forget: Ereignisse haben keine Request/Response-Kopplung
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Tagged Enums mit den historischen Event-Namen auf dem Draht
//!   (`"event"` + `"data"`), damit bestehende Clients unveraendert
//!   weitersprechen koennen

use serde::{Deserialize, Serialize};
use stammtisch_core::models::{BenutzerAnsicht, Chatroom, Nachricht};
use stammtisch_core::types::{ChatroomId, UserId};

// ---------------------------------------------------------------------------
// Eingehende Ereignisse (Client -> Server)
// ---------------------------------------------------------------------------

/// Alle Ereignisse die ein Client an den Server senden kann
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Meldet die Verbindung als Benutzer an
    ///
    /// UserId und Username kommen derzeit ungeprueft vom Client; sobald
    /// Tokens eingefuehrt werden, ersetzt deren Inhalt diese Felder.
    #[serde(rename = "login", rename_all = "camelCase")]
    Login { user_id: UserId, username: String },

    /// Meldet die Verbindung ab (Verbindung bleibt offen)
    #[serde(rename = "logout")]
    Logout,

    /// Nachricht an einen Chatroom
    #[serde(rename = "new message to chatroom", rename_all = "camelCase")]
    NachrichtAnChatroom {
        chatroom_id: ChatroomId,
        message: String,
    },

    /// Direktnachricht an einen Benutzer
    #[serde(rename = "new message to user", rename_all = "camelCase")]
    NachrichtAnBenutzer { to_user_id: UserId, message: String },

    /// Tipp-Indikator fuer einen Chatroom (fluechtig, best-effort)
    #[serde(rename = "typing in chatroom", rename_all = "camelCase")]
    TippenInChatroom {
        to_chatroom_id: ChatroomId,
        typing: bool,
    },

    /// Tipp-Indikator fuer eine Direktkonversation (fluechtig, best-effort)
    #[serde(rename = "typing direct", rename_all = "camelCase")]
    TippenDirekt { to_user_id: UserId, typing: bool },
}

// ---------------------------------------------------------------------------
// Ausgehende Ereignisse (Server -> Client)
// ---------------------------------------------------------------------------

/// Alle Ereignisse die der Server an Clients sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Online-Status eines Benutzers hat sich geaendert
    ///
    /// Wird nur beim Offline->Online- bzw. Online->Offline-Uebergang
    /// gesendet, nicht bei jedem weiteren Geraete-Login.
    #[serde(rename = "online status change", rename_all = "camelCase")]
    OnlineStatus { user_id: UserId, online: bool },

    /// Zustellung einer Raum- oder Direktnachricht
    #[serde(rename = "message")]
    Nachricht(Nachricht),

    /// Ein neuer Chatroom wurde erstellt (nur an Mitglieder)
    #[serde(rename = "rooms updated")]
    NeuerChatroom(Chatroom),

    /// Ein neuer Benutzer wurde erstellt (an alle Verbindungen)
    #[serde(rename = "users updated")]
    NeuerBenutzer(BenutzerAnsicht),

    /// Jemand tippt (oder hat aufgehoert) in einem Chatroom
    #[serde(rename = "typing in chatroom change", rename_all = "camelCase")]
    TippenInChatroomGeaendert {
        user_id: UserId,
        username: String,
        to_chatroom_id: ChatroomId,
        typing: bool,
    },

    /// Jemand tippt (oder hat aufgehoert) in einer Direktkonversation
    #[serde(rename = "direct typing change", rename_all = "camelCase")]
    TippenDirektGeaendert {
        user_id: UserId,
        username: String,
        to_user_id: UserId,
        typing: bool,
    },
}
