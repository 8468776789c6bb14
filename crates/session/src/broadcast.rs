//! Event-Broadcaster – Sendet Events an alle relevanten Verbindungen
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller Verbindungen und
//! die Transport-Raum-Mitgliedschaft. Jede Sendung ist fire-and-forget:
//! eine volle oder geschlossene Queue wird geloggt und geschluckt, nie
//! als Fehler an den Aufrufer gereicht.
//!
//! ## Selektives Broadcasting
//! - An alle Verbindungen: `an_alle_senden`
//! - An einen Raum: `an_raum_senden`
//! - An eine Liste von Verbindungen (dedupliziert): `an_verbindungen_senden`

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use stammtisch_core::models::{BenutzerAnsicht, Chatroom};
use stammtisch_core::types::{ChatroomId, ConnectionId, UserId};
use stammtisch_protocol::control::ServerEvent;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub connection_id: ConnectionId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Sendet ein Event nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(verbindung = %self.connection_id, "Send-Queue voll – Event verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.connection_id, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Send-Queues, indiziert nach ConnectionId
    verbindungen: DashMap<ConnectionId, ClientSender>,
    /// Transport-Raum-Mitgliedschaft: chatroom_id -> Verbindungen.
    /// Eine Verbindung kann in beliebig vielen Raeumen sein.
    raum_mitglieder: DashMap<ChatroomId, Vec<ConnectionId>>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                verbindungen: DashMap::new(),
                raum_mitglieder: DashMap::new(),
            }),
        }
    }

    /// Registriert eine Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und sendet via TCP.
    /// Registrierung passiert beim Accept, nicht erst beim Login – globale
    /// Broadcasts erreichen auch noch nicht angemeldete Verbindungen.
    pub fn verbindung_registrieren(
        &self,
        connection_id: ConnectionId,
    ) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let sender = ClientSender { connection_id, tx };
        self.inner.verbindungen.insert(connection_id, sender);
        tracing::debug!(verbindung = %connection_id, "Verbindung im Broadcaster registriert");
        rx
    }

    /// Entfernt eine Verbindung samt aller Raum-Mitgliedschaften
    pub fn verbindung_entfernen(&self, connection_id: &ConnectionId) {
        self.inner.verbindungen.remove(connection_id);
        self.inner.raum_mitglieder.iter_mut().for_each(|mut eintrag| {
            eintrag.value_mut().retain(|cid| cid != connection_id);
        });
        // Leere Raum-Eintraege aufraeumen
        self.inner
            .raum_mitglieder
            .retain(|_, mitglieder| !mitglieder.is_empty());
        tracing::debug!(verbindung = %connection_id, "Verbindung aus Broadcaster entfernt");
    }

    /// Fuegt eine Verbindung einem Raum hinzu (idempotent)
    pub fn raum_beitreten(&self, connection_id: ConnectionId, chatroom_id: ChatroomId) {
        let mut eintrag = self.inner.raum_mitglieder.entry(chatroom_id).or_default();
        if !eintrag.contains(&connection_id) {
            eintrag.push(connection_id);
        }
    }

    /// Entfernt eine Verbindung aus einem Raum
    pub fn raum_verlassen(&self, connection_id: &ConnectionId, chatroom_id: &ChatroomId) {
        if let Some(mut eintrag) = self.inner.raum_mitglieder.get_mut(chatroom_id) {
            eintrag.retain(|cid| cid != connection_id);
            let ist_leer = eintrag.is_empty();
            drop(eintrag);
            if ist_leer {
                self.inner.raum_mitglieder.remove(chatroom_id);
            }
        }
    }

    /// Sendet ein Event an alle Verbindungen in einem Raum
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_raum_senden(&self, chatroom_id: &ChatroomId, event: ServerEvent) -> usize {
        let verbindungen = match self.inner.raum_mitglieder.get(chatroom_id) {
            Some(ids) => ids.clone(),
            None => return 0,
        };

        let mut gesendet = 0;
        for connection_id in &verbindungen {
            if let Some(sender) = self.inner.verbindungen.get(connection_id) {
                if sender.senden(event.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    /// Sendet ein Event an eine Liste von Verbindungen
    ///
    /// Die Liste wird vor dem Senden dedupliziert – jede Verbindung
    /// erhaelt das Event genau einmal, auch wenn sie mehrfach gelistet ist
    /// (z.B. wenn Absender und Empfaenger derselbe Benutzer sind).
    /// Verschwundene Verbindungen werden uebersprungen.
    pub fn an_verbindungen_senden(
        &self,
        connection_ids: &[ConnectionId],
        event: ServerEvent,
    ) -> usize {
        let mut gesehen = HashSet::new();
        let mut gesendet = 0;
        for connection_id in connection_ids {
            if !gesehen.insert(*connection_id) {
                continue;
            }
            match self.inner.verbindungen.get(connection_id) {
                Some(sender) => {
                    if sender.senden(event.clone()) {
                        gesendet += 1;
                    }
                }
                None => {
                    tracing::debug!(verbindung = %connection_id, "Senden an unbekannte Verbindung uebersprungen");
                }
            }
        }
        gesendet
    }

    /// Sendet ein Event an alle Verbindungen
    pub fn an_alle_senden(&self, event: ServerEvent) -> usize {
        let mut gesendet = 0;
        self.inner.verbindungen.iter().for_each(|eintrag| {
            if eintrag.value().senden(event.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Globaler Fan-out einer Online-Status-Aenderung
    pub fn online_status_broadcast(&self, user_id: UserId, online: bool) -> usize {
        self.an_alle_senden(ServerEvent::OnlineStatus { user_id, online })
    }

    /// Globaler Fan-out eines neuen Benutzers
    pub fn neuer_benutzer_broadcast(&self, benutzer: BenutzerAnsicht) -> usize {
        self.an_alle_senden(ServerEvent::NeuerBenutzer(benutzer))
    }

    /// Gezielte Benachrichtigung ueber einen neuen Chatroom
    ///
    /// Bewusst kein globaler Broadcast: Nicht-Mitglieder sollen Raeume
    /// nicht sehen, auf die sie keinen Zugriff haben.
    pub fn neuer_chatroom_an(
        &self,
        connection_ids: &[ConnectionId],
        chatroom: Chatroom,
    ) -> usize {
        self.an_verbindungen_senden(connection_ids, ServerEvent::NeuerChatroom(chatroom))
    }

    /// Gibt die Anzahl der registrierten Verbindungen zurueck
    pub fn verbindungs_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, connection_id: &ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(connection_id)
    }

    /// Gibt alle Verbindungen in einem Raum zurueck
    pub fn verbindungen_in_raum(&self, chatroom_id: &ChatroomId) -> Vec<ConnectionId> {
        self.inner
            .raum_mitglieder
            .get(chatroom_id)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_event(online: bool) -> ServerEvent {
        ServerEvent::OnlineStatus {
            user_id: UserId::new(),
            online,
        }
    }

    #[tokio::test]
    async fn registrieren_und_senden() {
        let broadcaster = EventBroadcaster::neu();
        let cid = ConnectionId::new();

        let mut rx = broadcaster.verbindung_registrieren(cid);
        assert!(broadcaster.ist_registriert(&cid));

        let gesendet = broadcaster.an_verbindungen_senden(&[cid], test_event(true));
        assert_eq!(gesendet, 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn an_raum_senden_erreicht_nur_mitglieder() {
        let broadcaster = EventBroadcaster::neu();
        let raum = ChatroomId::new();

        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();
        let c3 = ConnectionId::new(); // kein Raum-Mitglied

        let mut rx1 = broadcaster.verbindung_registrieren(c1);
        let mut rx2 = broadcaster.verbindung_registrieren(c2);
        let mut rx3 = broadcaster.verbindung_registrieren(c3);

        broadcaster.raum_beitreten(c1, raum);
        broadcaster.raum_beitreten(c2, raum);

        let gesendet = broadcaster.an_raum_senden(&raum, test_event(true));
        assert_eq!(gesendet, 2);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err(), "c3 darf nichts empfangen");
    }

    #[tokio::test]
    async fn doppelte_verbindungen_werden_dedupliziert() {
        // Absender == Empfaenger: die Verbindung steht zweimal in der
        // Zielliste, bekommt das Event aber genau einmal
        let broadcaster = EventBroadcaster::neu();
        let cid = ConnectionId::new();
        let mut rx = broadcaster.verbindung_registrieren(cid);

        let gesendet = broadcaster.an_verbindungen_senden(&[cid, cid], test_event(true));
        assert_eq!(gesendet, 1);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "nur eine Zustellung erwartet");
    }

    #[tokio::test]
    async fn verschwundene_verbindung_wird_geschluckt() {
        let broadcaster = EventBroadcaster::neu();
        let fremd = ConnectionId::new();

        // Kein Panik, kein Fehler – nur 0 Zustellungen
        assert_eq!(broadcaster.an_verbindungen_senden(&[fremd], test_event(true)), 0);
        assert_eq!(broadcaster.an_raum_senden(&ChatroomId::new(), test_event(true)), 0);
    }

    #[tokio::test]
    async fn volle_queue_verwirft_statt_zu_blockieren() {
        let broadcaster = EventBroadcaster::neu();
        let cid = ConnectionId::new();
        let _rx = broadcaster.verbindung_registrieren(cid);

        // Queue (64 Plaetze) ohne Verbraucher fluten
        let mut erfolgreich = 0;
        for _ in 0..SEND_QUEUE_GROESSE + 8 {
            erfolgreich += broadcaster.an_verbindungen_senden(&[cid], test_event(true));
        }
        assert_eq!(erfolgreich, SEND_QUEUE_GROESSE);
    }

    #[tokio::test]
    async fn eine_verbindung_in_mehreren_raeumen() {
        let broadcaster = EventBroadcaster::neu();
        let cid = ConnectionId::new();
        let raum_a = ChatroomId::new();
        let raum_b = ChatroomId::new();

        let mut rx = broadcaster.verbindung_registrieren(cid);
        broadcaster.raum_beitreten(cid, raum_a);
        broadcaster.raum_beitreten(cid, raum_b);

        assert_eq!(broadcaster.an_raum_senden(&raum_a, test_event(true)), 1);
        assert_eq!(broadcaster.an_raum_senden(&raum_b, test_event(false)), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn verbindung_entfernen_bereinigt_raum_mitgliedschaft() {
        let broadcaster = EventBroadcaster::neu();
        let raum = ChatroomId::new();
        let cid = ConnectionId::new();

        let _rx = broadcaster.verbindung_registrieren(cid);
        broadcaster.raum_beitreten(cid, raum);
        assert_eq!(broadcaster.verbindungen_in_raum(&raum).len(), 1);

        broadcaster.verbindung_entfernen(&cid);
        assert!(!broadcaster.ist_registriert(&cid));
        assert_eq!(broadcaster.verbindungen_in_raum(&raum).len(), 0);
    }

    #[test]
    fn raum_verlassen_entfernt_nur_diesen_raum() {
        let broadcaster = EventBroadcaster::neu();
        let raum_a = ChatroomId::new();
        let raum_b = ChatroomId::new();
        let cid = ConnectionId::new();

        broadcaster.raum_beitreten(cid, raum_a);
        broadcaster.raum_beitreten(cid, raum_b);

        broadcaster.raum_verlassen(&cid, &raum_a);
        assert!(broadcaster.verbindungen_in_raum(&raum_a).is_empty());
        assert_eq!(broadcaster.verbindungen_in_raum(&raum_b), vec![cid]);
    }

    #[test]
    fn raum_beitreten_ist_idempotent() {
        let broadcaster = EventBroadcaster::neu();
        let raum = ChatroomId::new();
        let cid = ConnectionId::new();

        broadcaster.raum_beitreten(cid, raum);
        broadcaster.raum_beitreten(cid, raum);
        assert_eq!(broadcaster.verbindungen_in_raum(&raum).len(), 1);
    }
}
