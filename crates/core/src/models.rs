//! Domain-Modelle fuer Stammtisch
//!
//! Benutzer und Chatrooms werden vom Verzeichnis verwaltet; Nachrichten
//! gehoeren dem Chatroom bzw. dem Benutzerpaar, an das sie angehaengt
//! wurden. Alle Wire-sichtbaren Felder serialisieren in camelCase, wie
//! es die REST- und Socket-Schnittstelle erwartet.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatroomId, UserId};

// ---------------------------------------------------------------------------
// Nachricht
// ---------------------------------------------------------------------------

/// Eine Chat-Nachricht – entweder an einen Raum oder direkt an einen Benutzer
///
/// Genau eines der Felder `chatroom_id` / `to_user_id` ist gesetzt. Die
/// Konstruktoren erzwingen das; eine Nachricht wird nach dem Anfuegen nie
/// mehr veraendert.
///
/// `username` wird beim Schreiben denormalisiert: eine spaetere Umbenennung
/// des Absenders aendert historische Nachrichten nicht. `user_id` ist `None`
/// fuer systemgenerierte Notizen (Raum erstellt, Mitglied beigetreten).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nachricht {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chatroom_id: Option<ChatroomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_user_id: Option<UserId>,
    pub message: String,
    /// Server-seitig beim Erstellen vergeben, nie vom Client uebernommen
    pub timestamp: DateTime<Utc>,
}

impl Nachricht {
    /// Erstellt eine Raum-Nachricht mit Server-Zeitstempel
    pub fn an_raum(
        absender: UserId,
        username: impl Into<String>,
        chatroom_id: ChatroomId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: Some(absender),
            username: username.into(),
            chatroom_id: Some(chatroom_id),
            to_user_id: None,
            message: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Erstellt eine Direktnachricht mit Server-Zeitstempel
    pub fn an_benutzer(
        absender: UserId,
        username: impl Into<String>,
        to_user_id: UserId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: Some(absender),
            username: username.into(),
            chatroom_id: None,
            to_user_id: Some(to_user_id),
            message: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Erstellt eine systemgenerierte Raum-Notiz (ohne Absender-ID)
    pub fn system_an_raum(
        chatroom_id: ChatroomId,
        username: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: None,
            username: username.into(),
            chatroom_id: Some(chatroom_id),
            to_user_id: None,
            message: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Prueft ob die Nachricht raumadressiert ist
    pub fn ist_raum_nachricht(&self) -> bool {
        self.chatroom_id.is_some()
    }

    /// Prueft ob die Nachricht direktadressiert ist
    pub fn ist_direktnachricht(&self) -> bool {
        self.to_user_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Chatroom
// ---------------------------------------------------------------------------

/// Ein Chatroom mit Mitgliederliste und Nachrichten-Historie
///
/// `member_ids` hat Set-Semantik (eindeutig, Einfuegereihenfolge bleibt
/// fuer die Anzeige erhalten). `messages` ist eine append-only Sequenz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chatroom {
    pub chatroom_id: ChatroomId,
    pub name: String,
    pub member_ids: Vec<UserId>,
    pub messages: Vec<Nachricht>,
}

impl Chatroom {
    /// Prueft ob der Benutzer Mitglied dieses Chatrooms ist
    pub fn ist_mitglied(&self, user_id: &UserId) -> bool {
        self.member_ids.contains(user_id)
    }
}

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Ein Benutzer-Datensatz im Verzeichnis
///
/// `messages` haelt Direktnachrichten pro Gegenueber: Schluessel ist die
/// UserId des jeweils anderen Teilnehmers, Wert die geordnete Konversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Benutzer {
    pub user_id: UserId,
    pub username: String,
    pub chatroom_ids: Vec<ChatroomId>,
    #[serde(default)]
    pub messages: HashMap<UserId, Vec<Nachricht>>,
}

/// REST-Ansicht eines Benutzers: `messages` entfernt, `online` transient
/// aus der Presence-Registry berechnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenutzerAnsicht {
    pub user_id: UserId,
    pub username: String,
    pub chatroom_ids: Vec<ChatroomId>,
    pub online: bool,
}

impl BenutzerAnsicht {
    /// Erstellt die Ansicht aus einem Datensatz und dem Online-Status
    pub fn aus(benutzer: &Benutzer, online: bool) -> Self {
        Self {
            user_id: benutzer.user_id,
            username: benutzer.username.clone(),
            chatroom_ids: benutzer.chatroom_ids.clone(),
            online,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raum_nachricht_ist_exklusiv_adressiert() {
        let n = Nachricht::an_raum(UserId::new(), "Winston", ChatroomId::new(), "hallo");
        assert!(n.ist_raum_nachricht());
        assert!(!n.ist_direktnachricht());
        assert!(n.to_user_id.is_none());
    }

    #[test]
    fn direktnachricht_ist_exklusiv_adressiert() {
        let n = Nachricht::an_benutzer(UserId::new(), "Winston", UserId::new(), "psst");
        assert!(n.ist_direktnachricht());
        assert!(!n.ist_raum_nachricht());
        assert!(n.chatroom_id.is_none());
    }

    #[test]
    fn system_notiz_hat_keine_absender_id() {
        let n = Nachricht::system_an_raum(ChatroomId::new(), "Gary", "Gary has joined the chat!");
        assert!(n.user_id.is_none());
        assert_eq!(n.username, "Gary");
    }

    #[test]
    fn nachricht_serialisiert_camel_case() {
        let uid = UserId::new();
        let rid = ChatroomId::new();
        let n = Nachricht::an_raum(uid, "Winston", rid, "hallo");
        let json = serde_json::to_value(&n).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("chatroomId").is_some());
        assert!(json.get("timestamp").is_some());
        // Nicht gesetzte Adressierung wird ausgelassen
        assert!(json.get("toUserId").is_none());
    }

    #[test]
    fn benutzer_ansicht_entfernt_nachrichten() {
        let benutzer = Benutzer {
            user_id: UserId::new(),
            username: "Tracer".into(),
            chatroom_ids: vec![ChatroomId::new()],
            messages: HashMap::new(),
        };
        let ansicht = BenutzerAnsicht::aus(&benutzer, true);
        assert!(ansicht.online);
        let json = serde_json::to_value(&ansicht).unwrap();
        assert!(json.get("messages").is_none());
        assert!(json.get("chatroomIds").is_some());
    }

    #[test]
    fn chatroom_mitglieder_pruefung() {
        let mitglied = UserId::new();
        let raum = Chatroom {
            chatroom_id: ChatroomId::new(),
            name: "war-of-the-worlds".into(),
            member_ids: vec![mitglied],
            messages: Vec::new(),
        };
        assert!(raum.ist_mitglied(&mitglied));
        assert!(!raum.ist_mitglied(&UserId::new()));
    }
}
