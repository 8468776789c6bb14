//! Presence-Registry – Verwaltet die Zuordnung Benutzer <-> Verbindungen
//!
//! Die autoritative Abbildung von logischer Benutzeridentitaet auf null
//! oder mehr lebende Verbindungen, plus die Rueckwaerts-Suche von
//! Verbindung zu Identitaet. Reine In-Memory-Zustandsmaschine ohne I/O.
//!
//! ## Zustandsmaschine pro Benutzer
//! ```text
//! Offline --(erste Verbindung)--> Online --(letzte Verbindung weg)--> Offline
//!                                   |
//!                                   +-- weitere Verbindungen: Online -> Online
//!                                       (kein extern sichtbarer Uebergang)
//! ```
//!
//! Alle Mutationen an der Verbindungsliste eines Benutzers laufen unter
//! dessen Map-Eintrag; Uebergaenge sind dadurch pro Benutzer linearisiert
//! und ein Reconnect-Gewitter erzeugt keinen falschen Offline-Blip,
//! solange mindestens eine Verbindung durchgehend lebt.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use stammtisch_core::types::{ConnectionId, UserId};
use std::sync::Arc;

use crate::error::{SessionError, SessionResult};

// ---------------------------------------------------------------------------
// Presence-Typen
// ---------------------------------------------------------------------------

/// Ein Eintrag der Presence-Registry: Benutzer auf einer Verbindung
///
/// Wird nie in-place veraendert, nur erstellt und verworfen. `username`
/// ist der beim Login mitgelieferte Anzeigename und dient als Quelle fuer
/// die Denormalisierung in Nachrichten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEintrag {
    pub user_id: UserId,
    pub username: String,
    pub connection_id: ConnectionId,
}

/// Extern sichtbarer Zustandsuebergang eines Benutzers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenzUebergang {
    /// Offline -> Online (erste lebende Verbindung)
    Online(UserId),
    /// Online -> Offline (letzte Verbindung entfernt)
    Offline(UserId),
}

/// Ergebnis einer Verbindungs-Entfernung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerbindungEntfernt {
    /// Der Benutzer dem die Verbindung gehoerte
    pub user_id: UserId,
    /// Offline-Uebergang, falls dies die letzte Verbindung war
    pub uebergang: Option<PresenzUebergang>,
}

// ---------------------------------------------------------------------------
// PresenceRegistry
// ---------------------------------------------------------------------------

/// Presence-Info eines Benutzers: Anzeigename plus Verbindungen in
/// Einfuegereihenfolge (die juengste steht hinten)
#[derive(Debug)]
struct BenutzerPraesenz {
    username: String,
    verbindungen: Vec<ConnectionId>,
}

/// Verwaltet den Online-Status aller verbundenen Benutzer
///
/// Thread-safe via Arc + DashMap. Clone der Registry teilt den inneren
/// Zustand.
#[derive(Clone)]
pub struct PresenceRegistry {
    inner: Arc<PresenceRegistryInner>,
}

struct PresenceRegistryInner {
    /// Autoritativer Zustand: Benutzer -> Praesenz. Ein Eintrag existiert
    /// genau dann wenn der Benutzer mindestens eine Verbindung hat.
    benutzer: DashMap<UserId, BenutzerPraesenz>,
    /// Rueckwaerts-Index: Verbindung -> Benutzer
    verbindungen: DashMap<ConnectionId, UserId>,
}

impl PresenceRegistry {
    /// Erstellt eine neue, leere PresenceRegistry
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(PresenceRegistryInner {
                benutzer: DashMap::new(),
                verbindungen: DashMap::new(),
            }),
        }
    }

    /// Registriert eine Verbindung fuer einen Benutzer
    ///
    /// War die Verbindung bereits einem anderen Benutzer zugeordnet, wird
    /// die alte Zuordnung stillschweigend ersetzt (der letzte Login auf
    /// einer Verbindung gewinnt). Gibt alle extern sichtbaren Uebergaenge
    /// zurueck: hoechstens ein Offline des verdraengten Benutzers und ein
    /// Online des neuen. Ein weiterer Geraete-Login eines bereits
    /// online Benutzers erzeugt keinen Uebergang.
    pub fn verbindung_hinzufuegen(
        &self,
        user_id: UserId,
        username: impl Into<String>,
        connection_id: ConnectionId,
    ) -> Vec<PresenzUebergang> {
        let username = username.into();
        let mut uebergaenge = Vec::new();

        // Bestehende Zuordnung der Verbindung zu einem anderen Benutzer loesen
        let vorheriger = self
            .inner
            .verbindungen
            .get(&connection_id)
            .map(|e| *e.value());
        if let Some(vorher) = vorheriger {
            if vorher != user_id {
                tracing::debug!(
                    verbindung = %connection_id,
                    alt = %vorher,
                    neu = %user_id,
                    "Verbindung wechselt den Benutzer – alte Zuordnung ersetzt"
                );
                if let Some(uebergang) = self.aus_benutzer_loesen(&vorher, &connection_id) {
                    uebergaenge.push(uebergang);
                }
            }
        }

        let war_offline = match self.inner.benutzer.entry(user_id) {
            Entry::Occupied(mut eintrag) => {
                let praesenz = eintrag.get_mut();
                let war_offline = praesenz.verbindungen.is_empty();
                praesenz.verbindungen.retain(|c| c != &connection_id);
                praesenz.verbindungen.push(connection_id);
                praesenz.username = username.clone();
                war_offline
            }
            Entry::Vacant(eintrag) => {
                eintrag.insert(BenutzerPraesenz {
                    username: username.clone(),
                    verbindungen: vec![connection_id],
                });
                true
            }
        };

        self.inner.verbindungen.insert(connection_id, user_id);

        tracing::info!(
            user_id = %user_id,
            username = %username,
            verbindung = %connection_id,
            "Verbindung registriert"
        );

        if war_offline {
            uebergaenge.push(PresenzUebergang::Online(user_id));
        }
        uebergaenge
    }

    /// Entfernt genau eine Verbindung
    ///
    /// Gibt `None` zurueck wenn die Verbindung unbekannt ist (no-op, kein
    /// Fehler). War es die letzte Verbindung des Benutzers, enthaelt das
    /// Ergebnis den Offline-Uebergang.
    pub fn verbindung_entfernen(&self, connection_id: &ConnectionId) -> Option<VerbindungEntfernt> {
        let user_id = self
            .inner
            .verbindungen
            .get(connection_id)
            .map(|e| *e.value())?;

        let uebergang = self.aus_benutzer_loesen(&user_id, connection_id);
        self.inner
            .verbindungen
            .remove_if(connection_id, |_, uid| *uid == user_id);

        tracing::debug!(
            user_id = %user_id,
            verbindung = %connection_id,
            offline = uebergang.is_some(),
            "Verbindung entfernt"
        );

        Some(VerbindungEntfernt { user_id, uebergang })
    }

    /// Entfernt alle Verbindungen eines Benutzers
    ///
    /// No-op wenn der Benutzer keine Verbindungen hat. Gibt den
    /// Offline-Uebergang zurueck wenn der Benutzer online war.
    pub fn benutzer_entfernen(&self, user_id: &UserId) -> Option<PresenzUebergang> {
        let (_, praesenz) = self.inner.benutzer.remove(user_id)?;

        for connection_id in &praesenz.verbindungen {
            self.inner
                .verbindungen
                .remove_if(connection_id, |_, uid| uid == user_id);
        }

        tracing::info!(user_id = %user_id, "Alle Verbindungen des Benutzers entfernt");
        Some(PresenzUebergang::Offline(*user_id))
    }

    /// Liefert einen repraesentativen Eintrag fuer einen Benutzer
    ///
    /// Bei mehreren Geraeten gewinnt die zuletzt registrierte Verbindung –
    /// "welches Geraet" ist sonst nicht definiert. Fehlt eine lebende
    /// Verbindung, schlaegt die Suche mit `NichtGefunden` fehl.
    pub fn nach_benutzer(&self, user_id: &UserId) -> SessionResult<PresenceEintrag> {
        let eintrag = self.inner.benutzer.get(user_id).ok_or_else(|| {
            SessionError::nicht_gefunden(format!(
                "Benutzer '{}' hat keine aktive Verbindung",
                user_id
            ))
        })?;

        let connection_id = *eintrag.verbindungen.last().ok_or_else(|| {
            SessionError::nicht_gefunden(format!(
                "Benutzer '{}' hat keine aktive Verbindung",
                user_id
            ))
        })?;

        Ok(PresenceEintrag {
            user_id: *user_id,
            username: eintrag.username.clone(),
            connection_id,
        })
    }

    /// Liefert den Eintrag zur angegebenen Verbindung
    ///
    /// Schlaegt mit `NichtGefunden` fehl wenn die Verbindung nicht
    /// angemeldet ist, z.B. bei Ereignissen die einen Disconnect ueberholen.
    pub fn nach_verbindung(&self, connection_id: &ConnectionId) -> SessionResult<PresenceEintrag> {
        let user_id = self
            .inner
            .verbindungen
            .get(connection_id)
            .map(|e| *e.value())
            .ok_or_else(|| {
                SessionError::nicht_gefunden(format!(
                    "Verbindung '{}' ist nicht angemeldet",
                    connection_id
                ))
            })?;

        let eintrag = self.inner.benutzer.get(&user_id).ok_or_else(|| {
            SessionError::nicht_gefunden(format!(
                "Benutzer '{}' hat keine aktive Verbindung",
                user_id
            ))
        })?;

        Ok(PresenceEintrag {
            user_id,
            username: eintrag.username.clone(),
            connection_id: *connection_id,
        })
    }

    /// Prueft ob ein Benutzer online ist (mindestens eine Verbindung)
    pub fn ist_online(&self, user_id: &UserId) -> bool {
        self.inner
            .benutzer
            .get(user_id)
            .map(|e| !e.verbindungen.is_empty())
            .unwrap_or(false)
    }

    /// Gibt alle lebenden Verbindungen eines Benutzers zurueck
    pub fn verbindungen_von(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.inner
            .benutzer
            .get(user_id)
            .map(|e| e.verbindungen.clone())
            .unwrap_or_default()
    }

    /// Gibt die Anzahl der online Benutzer zurueck
    pub fn online_anzahl(&self) -> usize {
        self.inner.benutzer.len()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Loest eine Verbindung aus der Liste eines Benutzers und entfernt
    /// den Eintrag wenn die Liste leer wird – alles unter dem Map-Eintrag,
    /// damit der Uebergang pro Benutzer atomar bleibt
    fn aus_benutzer_loesen(
        &self,
        user_id: &UserId,
        connection_id: &ConnectionId,
    ) -> Option<PresenzUebergang> {
        match self.inner.benutzer.entry(*user_id) {
            Entry::Occupied(mut eintrag) => {
                eintrag.get_mut().verbindungen.retain(|c| c != connection_id);
                if eintrag.get().verbindungen.is_empty() {
                    eintrag.remove();
                    Some(PresenzUebergang::Offline(*user_id))
                } else {
                    None
                }
            }
            Entry::Vacant(_) => None,
        }
    }
}

impl Default for PresenceRegistry {
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

    #[test]
    fn anmelden_und_abmelden() {
        let registry = PresenceRegistry::neu();
        let uid = UserId::new();
        let cid = ConnectionId::new();

        let uebergaenge = registry.verbindung_hinzufuegen(uid, "testuser", cid);
        assert_eq!(uebergaenge, vec![PresenzUebergang::Online(uid)]);
        assert!(registry.ist_online(&uid));
        assert_eq!(registry.online_anzahl(), 1);

        let entfernt = registry.verbindung_entfernen(&cid).expect("Verbindung war registriert");
        assert_eq!(entfernt.user_id, uid);
        assert_eq!(entfernt.uebergang, Some(PresenzUebergang::Offline(uid)));
        assert!(!registry.ist_online(&uid));
        assert_eq!(registry.online_anzahl(), 0);
    }

    #[test]
    fn zwei_geraete_ein_offline_uebergang() {
        // Alice meldet sich auf c1 und c2 an; erst das Entfernen der
        // letzten Verbindung macht sie offline
        let registry = PresenceRegistry::neu();
        let alice = UserId::new();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();

        assert_eq!(
            registry.verbindung_hinzufuegen(alice, "Alice", c1),
            vec![PresenzUebergang::Online(alice)]
        );
        // Zweites Geraet: kein weiterer Online-Uebergang
        assert!(registry.verbindung_hinzufuegen(alice, "Alice", c2).is_empty());

        let entfernt = registry.verbindung_entfernen(&c1).unwrap();
        assert_eq!(entfernt.uebergang, None, "c2 lebt noch – kein Offline-Blip");
        assert!(registry.ist_online(&alice));

        let entfernt = registry.verbindung_entfernen(&c2).unwrap();
        assert_eq!(entfernt.uebergang, Some(PresenzUebergang::Offline(alice)));
        assert!(!registry.ist_online(&alice));
    }

    #[test]
    fn online_folgt_der_netto_verbindungszahl() {
        let registry = PresenceRegistry::neu();
        let uid = UserId::new();
        let verbindungen: Vec<ConnectionId> = (0..4).map(|_| ConnectionId::new()).collect();

        for cid in &verbindungen {
            registry.verbindung_hinzufuegen(uid, "vielgeraetig", *cid);
        }
        assert_eq!(registry.verbindungen_von(&uid).len(), 4);

        for (i, cid) in verbindungen.iter().enumerate() {
            assert!(registry.ist_online(&uid), "vor Entfernung {} noch online", i);
            registry.verbindung_entfernen(cid);
        }
        assert!(!registry.ist_online(&uid));
    }

    #[test]
    fn letzter_login_auf_verbindung_gewinnt() {
        let registry = PresenceRegistry::neu();
        let alt = UserId::new();
        let neu = UserId::new();
        let cid = ConnectionId::new();

        registry.verbindung_hinzufuegen(alt, "alt", cid);
        let uebergaenge = registry.verbindung_hinzufuegen(neu, "neu", cid);

        // Alte Zuordnung stillschweigend ersetzt: alt offline, neu online
        assert!(uebergaenge.contains(&PresenzUebergang::Offline(alt)));
        assert!(uebergaenge.contains(&PresenzUebergang::Online(neu)));
        assert!(!registry.ist_online(&alt));
        assert!(registry.ist_online(&neu));

        let eintrag = registry.nach_verbindung(&cid).unwrap();
        assert_eq!(eintrag.user_id, neu);
    }

    #[test]
    fn juengste_verbindung_ist_repraesentativ() {
        let registry = PresenceRegistry::neu();
        let uid = UserId::new();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();

        registry.verbindung_hinzufuegen(uid, "wechsler", c1);
        registry.verbindung_hinzufuegen(uid, "wechsler", c2);

        let eintrag = registry.nach_benutzer(&uid).unwrap();
        assert_eq!(eintrag.connection_id, c2);

        // Faellt c2 weg, wird c1 wieder repraesentativ
        registry.verbindung_entfernen(&c2);
        let eintrag = registry.nach_benutzer(&uid).unwrap();
        assert_eq!(eintrag.connection_id, c1);
    }

    #[test]
    fn entfernen_unbekannter_selektoren_ist_noop() {
        let registry = PresenceRegistry::neu();
        assert!(registry.verbindung_entfernen(&ConnectionId::new()).is_none());
        assert!(registry.benutzer_entfernen(&UserId::new()).is_none());
    }

    #[test]
    fn lookups_schlagen_typisiert_fehl() {
        let registry = PresenceRegistry::neu();
        assert!(matches!(
            registry.nach_benutzer(&UserId::new()),
            Err(SessionError::NichtGefunden(_))
        ));
        assert!(matches!(
            registry.nach_verbindung(&ConnectionId::new()),
            Err(SessionError::NichtGefunden(_))
        ));
    }

    #[test]
    fn benutzer_entfernen_raeumt_alle_verbindungen() {
        let registry = PresenceRegistry::neu();
        let uid = UserId::new();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();

        registry.verbindung_hinzufuegen(uid, "doppelt", c1);
        registry.verbindung_hinzufuegen(uid, "doppelt", c2);

        let uebergang = registry.benutzer_entfernen(&uid);
        assert_eq!(uebergang, Some(PresenzUebergang::Offline(uid)));
        assert!(registry.nach_verbindung(&c1).is_err());
        assert!(registry.nach_verbindung(&c2).is_err());
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let registry1 = PresenceRegistry::neu();
        let registry2 = registry1.clone();
        let uid = UserId::new();

        registry1.verbindung_hinzufuegen(uid, "shared", ConnectionId::new());
        assert!(registry2.ist_online(&uid));
    }

    #[tokio::test]
    async fn paralleles_reconnect_gewitter_ohne_verlust() {
        // Adds und Removes auf verschiedenen Verbindungen desselben
        // Benutzers duerfen keinen Verbindungs-Datensatz verlieren
        let registry = PresenceRegistry::neu();
        let uid = UserId::new();
        let bleibend = ConnectionId::new();
        registry.verbindung_hinzufuegen(uid, "sturm", bleibend);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    let cid = ConnectionId::new();
                    registry.verbindung_hinzufuegen(uid, "sturm", cid);
                    registry.verbindung_entfernen(&cid);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Die durchgehend lebende Verbindung haelt den Benutzer online
        assert!(registry.ist_online(&uid));
        assert_eq!(registry.verbindungen_von(&uid), vec![bleibend]);
    }
}
