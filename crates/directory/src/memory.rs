//! In-Memory-Verzeichnis
//!
//! Fluechtige Implementierung der Repository-Traits auf DashMaps. Jede
//! Mutation laeuft als Read-Modify-Write auf dem Eintrag der betroffenen
//! Entitaet – nie als Ganz-Map-Ersatz, damit gleichzeitige Aenderungen an
//! verschiedenen Feldern derselben Entitaet (Nachricht anfuegen vs.
//! Mitglied hinzufuegen) einander nicht verlieren.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use stammtisch_core::models::{Benutzer, Chatroom, Nachricht};
use stammtisch_core::types::{ChatroomId, UserId};

use async_trait::async_trait;

use crate::error::{VerzeichnisError, VerzeichnisResult};
use crate::repository::{
    BenutzerRepository, BenutzerUpdate, ChatroomRepository, ChatroomUpdate,
};

/// In-Memory-Verzeichnis fuer Benutzer und Chatrooms
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct MemoryVerzeichnis {
    inner: Arc<MemoryVerzeichnisInner>,
}

struct MemoryVerzeichnisInner {
    /// Alle Benutzer, indiziert nach UserId
    benutzer: DashMap<UserId, Benutzer>,
    /// Alle Chatrooms, indiziert nach ChatroomId
    chatrooms: DashMap<ChatroomId, Chatroom>,
    /// Serialisiert Direktnachricht-Dual-Writes: beide Kopien entstehen
    /// unter der Sperre, und beide Konversationsseiten behalten dieselbe
    /// Reihenfolge
    direkt_sperre: Mutex<()>,
}

impl MemoryVerzeichnis {
    /// Erstellt ein neues, leeres Verzeichnis
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(MemoryVerzeichnisInner {
                benutzer: DashMap::new(),
                chatrooms: DashMap::new(),
                direkt_sperre: Mutex::new(()),
            }),
        }
    }

    /// Gibt die Anzahl der Benutzer zurueck
    pub fn benutzer_anzahl(&self) -> usize {
        self.inner.benutzer.len()
    }

    /// Gibt die Anzahl der Chatrooms zurueck
    pub fn chatroom_anzahl(&self) -> usize {
        self.inner.chatrooms.len()
    }

    fn benutzer_fehlt(user_id: &UserId) -> VerzeichnisError {
        VerzeichnisError::nicht_gefunden(format!("Benutzer '{}' existiert nicht", user_id))
    }

    fn chatroom_fehlt(chatroom_id: &ChatroomId) -> VerzeichnisError {
        VerzeichnisError::nicht_gefunden(format!("Chatroom '{}' existiert nicht", chatroom_id))
    }
}

impl Default for MemoryVerzeichnis {
    fn default() -> Self {
        Self::neu()
    }
}

#[async_trait]
impl BenutzerRepository for MemoryVerzeichnis {
    async fn benutzer_laden(&self, user_id: UserId) -> VerzeichnisResult<Benutzer> {
        self.inner
            .benutzer
            .get(&user_id)
            .map(|e| e.clone())
            .ok_or_else(|| Self::benutzer_fehlt(&user_id))
    }

    async fn alle_benutzer(&self) -> VerzeichnisResult<Vec<Benutzer>> {
        Ok(self
            .inner
            .benutzer
            .iter()
            .map(|e| e.value().clone())
            .collect())
    }

    async fn benutzer_erstellen(&self, username: &str) -> VerzeichnisResult<Benutzer> {
        if username.trim().is_empty() {
            return Err(VerzeichnisError::validierung(
                "Username darf nicht leer sein",
            ));
        }

        let benutzer = Benutzer {
            user_id: UserId::new(),
            username: username.to_string(),
            chatroom_ids: Vec::new(),
            messages: Default::default(),
        };
        self.inner.benutzer.insert(benutzer.user_id, benutzer.clone());

        tracing::debug!(user_id = %benutzer.user_id, username = %benutzer.username, "Benutzer erstellt");
        Ok(benutzer)
    }

    async fn benutzer_aktualisieren(
        &self,
        user_id: UserId,
        update: BenutzerUpdate,
    ) -> VerzeichnisResult<Benutzer> {
        let mut eintrag = self
            .inner
            .benutzer
            .get_mut(&user_id)
            .ok_or_else(|| Self::benutzer_fehlt(&user_id))?;

        if let Some(username) = update.username {
            if username.trim().is_empty() {
                return Err(VerzeichnisError::validierung(
                    "Username darf nicht leer sein",
                ));
            }
            // Historische Nachrichten behalten den alten, denormalisierten Namen
            eintrag.username = username;
        }

        Ok(eintrag.clone())
    }

    async fn chatrooms_hinzufuegen(
        &self,
        user_id: UserId,
        chatroom_ids: &[ChatroomId],
    ) -> VerzeichnisResult<Benutzer> {
        let mut eintrag = self
            .inner
            .benutzer
            .get_mut(&user_id)
            .ok_or_else(|| Self::benutzer_fehlt(&user_id))?;

        for chatroom_id in chatroom_ids {
            if !eintrag.chatroom_ids.contains(chatroom_id) {
                eintrag.chatroom_ids.push(*chatroom_id);
            }
        }

        Ok(eintrag.clone())
    }

    async fn direktnachrichten(
        &self,
        user_id: UserId,
        gegenueber: UserId,
    ) -> VerzeichnisResult<Vec<Nachricht>> {
        let benutzer = self
            .inner
            .benutzer
            .get(&user_id)
            .ok_or_else(|| Self::benutzer_fehlt(&user_id))?;

        Ok(benutzer
            .messages
            .get(&gegenueber)
            .cloned()
            .unwrap_or_default())
    }

    async fn direktnachricht_anfuegen(
        &self,
        von: UserId,
        an: UserId,
        nachricht: Nachricht,
    ) -> VerzeichnisResult<()> {
        // Sperre haelt beide Schreibvorgaenge zusammen: kein Beobachter einer
        // spaeteren Operation sieht nur eine der beiden Kopien einer
        // abgeschlossenen Zustellung, und beide Seiten behalten dieselbe
        // Konversationsreihenfolge
        let _sperre = self.inner.direkt_sperre.lock();

        if !self.inner.benutzer.contains_key(&von) {
            return Err(Self::benutzer_fehlt(&von));
        }

        // Kopie beim Empfaenger, abgelegt unter dem Absender-Schluessel
        {
            let mut empfaenger = self
                .inner
                .benutzer
                .get_mut(&an)
                .ok_or_else(|| Self::benutzer_fehlt(&an))?;
            empfaenger
                .messages
                .entry(von)
                .or_default()
                .push(nachricht.clone());
        }

        // Kopie beim Absender, abgelegt unter dem Empfaenger-Schluessel.
        // Selbstnachrichten erhalten genau eine Kopie.
        if von != an {
            let mut absender = self
                .inner
                .benutzer
                .get_mut(&von)
                .ok_or_else(|| Self::benutzer_fehlt(&von))?;
            absender.messages.entry(an).or_default().push(nachricht);
        }

        Ok(())
    }
}

#[async_trait]
impl ChatroomRepository for MemoryVerzeichnis {
    async fn chatroom_laden(
        &self,
        chatroom_id: ChatroomId,
        anfrager: UserId,
    ) -> VerzeichnisResult<Chatroom> {
        let chatroom = self
            .inner
            .chatrooms
            .get(&chatroom_id)
            .map(|e| e.clone())
            .ok_or_else(|| Self::chatroom_fehlt(&chatroom_id))?;

        if !chatroom.ist_mitglied(&anfrager) {
            return Err(VerzeichnisError::NichtAutorisiert(format!(
                "Benutzer ist kein Mitglied des Chatrooms '{}'",
                chatroom_id
            )));
        }

        Ok(chatroom)
    }

    async fn alle_chatrooms(&self) -> VerzeichnisResult<Vec<Chatroom>> {
        Ok(self
            .inner
            .chatrooms
            .iter()
            .map(|e| e.value().clone())
            .collect())
    }

    async fn chatroom_erstellen(
        &self,
        name: &str,
        ersteller: UserId,
        member_ids: &[UserId],
    ) -> VerzeichnisResult<Chatroom> {
        if name.trim().is_empty() {
            return Err(VerzeichnisError::validierung(
                "Chatroom-Name darf nicht leer sein",
            ));
        }

        // Ersteller ist immer implizit Mitglied; Duplikate werden verworfen,
        // die Reihenfolge bleibt erhalten
        let mut mitglieder = vec![ersteller];
        for mitglied in member_ids {
            if !mitglieder.contains(mitglied) {
                mitglieder.push(*mitglied);
            }
        }

        let chatroom = Chatroom {
            chatroom_id: ChatroomId::new(),
            name: name.to_string(),
            member_ids: mitglieder,
            messages: Vec::new(),
        };
        self.inner
            .chatrooms
            .insert(chatroom.chatroom_id, chatroom.clone());

        tracing::debug!(chatroom_id = %chatroom.chatroom_id, name = %chatroom.name, "Chatroom erstellt");
        Ok(chatroom)
    }

    async fn chatroom_aktualisieren(
        &self,
        chatroom_id: ChatroomId,
        update: ChatroomUpdate,
    ) -> VerzeichnisResult<Chatroom> {
        let mut eintrag = self
            .inner
            .chatrooms
            .get_mut(&chatroom_id)
            .ok_or_else(|| Self::chatroom_fehlt(&chatroom_id))?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(VerzeichnisError::validierung(
                    "Chatroom-Name darf nicht leer sein",
                ));
            }
            eintrag.name = name;
        }

        Ok(eintrag.clone())
    }

    async fn mitglied_hinzufuegen(
        &self,
        chatroom_id: ChatroomId,
        user_id: UserId,
    ) -> VerzeichnisResult<bool> {
        let mut eintrag = self
            .inner
            .chatrooms
            .get_mut(&chatroom_id)
            .ok_or_else(|| Self::chatroom_fehlt(&chatroom_id))?;

        if eintrag.member_ids.contains(&user_id) {
            return Ok(false);
        }

        eintrag.member_ids.push(user_id);
        Ok(true)
    }

    async fn raum_nachricht_anfuegen(
        &self,
        chatroom_id: ChatroomId,
        nachricht: Nachricht,
    ) -> VerzeichnisResult<()> {
        let mut eintrag = self
            .inner
            .chatrooms
            .get_mut(&chatroom_id)
            .ok_or_else(|| Self::chatroom_fehlt(&chatroom_id))?;

        eintrag.messages.push(nachricht);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
