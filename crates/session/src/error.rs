//! Fehlertypen fuer den Session-Service

use stammtisch_directory::VerzeichnisError;
use thiserror::Error;

/// Fehlertyp fuer den Session-Service
#[derive(Debug, Error)]
pub enum SessionError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Fehler aus dem Verzeichnis
    #[error("Verzeichnisfehler: {0}")]
    Verzeichnis(#[from] VerzeichnisError),

    /// Benutzer oder Verbindung nicht in der Presence-Registry
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SessionError {
    /// Erstellt einen Nicht-gefunden-Fehler
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }
}

/// Result-Typ fuer den Session-Service
pub type SessionResult<T> = Result<T, SessionError>;
