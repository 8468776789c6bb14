//! Fehlertypen fuer das Verzeichnis

use thiserror::Error;

/// Fehlertyp fuer Verzeichnis-Operationen
///
/// Operationen schlagen mit typisierten Fehlern fehl statt leere Objekte
/// zurueckzugeben – das "leeres Objekt heisst nicht gefunden"-Muster macht
/// nachgelagerte Mitgliedschaftspruefungen unlesbar und ist hier bewusst
/// ausgeschlossen.
#[derive(Debug, Error)]
pub enum VerzeichnisError {
    /// Pflichtfeld fehlt oder ist ungueltig
    #[error("Ungueltige Eingabe: {0}")]
    Validierung(String),

    /// Benutzer oder Chatroom existiert nicht
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Anfrager ist kein Mitglied des abgefragten Chatrooms
    #[error("Nicht autorisiert: {0}")]
    NichtAutorisiert(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl VerzeichnisError {
    /// Erstellt einen Validierungsfehler
    pub fn validierung(msg: impl Into<String>) -> Self {
        Self::Validierung(msg.into())
    }

    /// Erstellt einen Nicht-gefunden-Fehler
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }
}

/// Result-Typ fuer Verzeichnis-Operationen
pub type VerzeichnisResult<T> = Result<T, VerzeichnisError>;
