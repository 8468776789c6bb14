//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt den Session-Router und die REST-Handler
//! von der konkreten Speicher-Implementierung. Die Traits verwenden
//! async-trait, damit die Futures Send sind und direkt aus Axum-Handlern
//! aufgerufen werden koennen.

use async_trait::async_trait;
use stammtisch_core::models::{Benutzer, Chatroom, Nachricht};
use stammtisch_core::types::{ChatroomId, UserId};

use crate::error::VerzeichnisResult;

/// Partielles Update fuer einen Benutzer-Datensatz
///
/// Nicht gesetzte Felder bleiben unveraendert; die UserId ist nie Teil
/// eines Updates.
#[derive(Debug, Clone, Default)]
pub struct BenutzerUpdate {
    pub username: Option<String>,
}

/// Partielles Update fuer einen Chatroom
///
/// Die ChatroomId ist nie Teil eines Updates.
#[derive(Debug, Clone, Default)]
pub struct ChatroomUpdate {
    pub name: Option<String>,
}

/// Repository fuer Benutzer-Datenzugriffe
#[async_trait]
pub trait BenutzerRepository: Send + Sync {
    /// Einen Benutzer anhand seiner ID laden
    async fn benutzer_laden(&self, user_id: UserId) -> VerzeichnisResult<Benutzer>;

    /// Alle Benutzer laden
    async fn alle_benutzer(&self) -> VerzeichnisResult<Vec<Benutzer>>;

    /// Einen neuen Benutzer anlegen
    ///
    /// Der Username wird nur hier validiert; Eindeutigkeit wird nicht
    /// garantiert.
    async fn benutzer_erstellen(&self, username: &str) -> VerzeichnisResult<Benutzer>;

    /// Benutzer-Details partiell aktualisieren (atomar pro Datensatz)
    ///
    /// Historische Nachrichten behalten den beim Schreiben denormalisierten
    /// Username.
    async fn benutzer_aktualisieren(
        &self,
        user_id: UserId,
        update: BenutzerUpdate,
    ) -> VerzeichnisResult<Benutzer>;

    /// Chatroom-Mitgliedschaften zum Benutzer-Datensatz hinzufuegen
    /// (idempotent, Set-Semantik)
    async fn chatrooms_hinzufuegen(
        &self,
        user_id: UserId,
        chatroom_ids: &[ChatroomId],
    ) -> VerzeichnisResult<Benutzer>;

    /// Direktnachrichten zwischen dem Benutzer und einem Gegenueber laden
    async fn direktnachrichten(
        &self,
        user_id: UserId,
        gegenueber: UserId,
    ) -> VerzeichnisResult<Vec<Nachricht>>;

    /// Eine Direktnachricht in beide Konversationskopien schreiben
    ///
    /// Atomarer Dual-Write: nach Erfolg existieren beide Kopien, nach
    /// Fehlschlag keine. Bei `von == an` wird genau eine Kopie abgelegt.
    async fn direktnachricht_anfuegen(
        &self,
        von: UserId,
        an: UserId,
        nachricht: Nachricht,
    ) -> VerzeichnisResult<()>;
}

/// Repository fuer Chatroom-Datenzugriffe
#[async_trait]
pub trait ChatroomRepository: Send + Sync {
    /// Einen Chatroom laden; der Anfrager muss Mitglied sein
    async fn chatroom_laden(
        &self,
        chatroom_id: ChatroomId,
        anfrager: UserId,
    ) -> VerzeichnisResult<Chatroom>;

    /// Alle Chatrooms laden
    async fn alle_chatrooms(&self) -> VerzeichnisResult<Vec<Chatroom>>;

    /// Einen neuen Chatroom anlegen
    ///
    /// Der Ersteller ist immer implizit Mitglied; `member_ids` werden
    /// dedupliziert, die Einfuegereihenfolge bleibt erhalten.
    async fn chatroom_erstellen(
        &self,
        name: &str,
        ersteller: UserId,
        member_ids: &[UserId],
    ) -> VerzeichnisResult<Chatroom>;

    /// Chatroom-Details partiell aktualisieren (atomar pro Datensatz)
    ///
    /// Schlaegt bei unbekannter ID fehl – ein Update erweckt keinen
    /// geloeschten Raum wieder zum Leben.
    async fn chatroom_aktualisieren(
        &self,
        chatroom_id: ChatroomId,
        update: ChatroomUpdate,
    ) -> VerzeichnisResult<Chatroom>;

    /// Ein Mitglied zum Chatroom hinzufuegen
    ///
    /// Gibt `true` zurueck wenn das Mitglied neu war, `false` wenn es
    /// bereits eingetragen ist (idempotent).
    async fn mitglied_hinzufuegen(
        &self,
        chatroom_id: ChatroomId,
        user_id: UserId,
    ) -> VerzeichnisResult<bool>;

    /// Eine Nachricht an die Historie des Chatrooms anfuegen
    async fn raum_nachricht_anfuegen(
        &self,
        chatroom_id: ChatroomId,
        nachricht: Nachricht,
    ) -> VerzeichnisResult<()>;
}

/// Kombinierter Verzeichnis-Trait fuer Stellen die beide Repositories
/// benoetigen (Session-Router, REST-Handler)
pub trait Verzeichnis: BenutzerRepository + ChatroomRepository {}

impl<T: BenutzerRepository + ChatroomRepository> Verzeichnis for T {}
