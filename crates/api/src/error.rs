//! Fehlertypen fuer die REST-API
//!
//! Jeder Fehler wird als `{type, message}`-Umschlag mit passendem
//! HTTP-Status serialisiert. Interne Fehler gehen nur generisch an den
//! Aufrufer; das Detail landet ausschliesslich im Server-Log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use stammtisch_directory::VerzeichnisError;
use thiserror::Error;

/// Alle moeglichen Fehler der REST-API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Pflichtfeld fehlt oder ist ungueltig (400)
    #[error("Ungueltige Eingabe: {0}")]
    Validierung(String),

    /// Benutzer oder Chatroom existiert nicht (404)
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Anfrager ist kein Mitglied des abgefragten Chatrooms (401)
    #[error("Nicht autorisiert: {0}")]
    NichtAutorisiert(String),

    /// Unerwarteter interner Fehler (500)
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl ApiError {
    /// Erstellt einen Validierungsfehler
    pub fn validierung(msg: impl Into<String>) -> Self {
        Self::Validierung(msg.into())
    }

    /// HTTP-Statuscode fuer diesen Fehler
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validierung(_) => StatusCode::BAD_REQUEST,
            Self::NichtGefunden(_) => StatusCode::NOT_FOUND,
            Self::NichtAutorisiert(_) => StatusCode::UNAUTHORIZED,
            Self::Intern(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fehlertyp-Bezeichner im `{type, message}`-Umschlag
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Validierung(_) => "ValidationError",
            Self::NichtGefunden(_) => "NotFoundError",
            Self::NichtAutorisiert(_) => "UnauthorizedError",
            Self::Intern(_) => "InternalError",
        }
    }
}

impl From<VerzeichnisError> for ApiError {
    fn from(e: VerzeichnisError) -> Self {
        match e {
            VerzeichnisError::Validierung(msg) => Self::Validierung(msg),
            VerzeichnisError::NichtGefunden(msg) => Self::NichtGefunden(msg),
            VerzeichnisError::NichtAutorisiert(msg) => Self::NichtAutorisiert(msg),
            VerzeichnisError::Intern(msg) => Self::Intern(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();

        // Interne Details nie an den Aufrufer durchreichen
        let message = match &self {
            Self::Intern(detail) => {
                tracing::error!(fehler = %detail, "Interner Fehler in REST-Handler");
                "Unerwarteter interner Fehler".to_string()
            }
            andere => andere.to_string(),
        };

        (
            status,
            Json(json!({
                "type": self.typ(),
                "message": message,
            })),
        )
            .into_response()
    }
}

/// Result-Typ fuer REST-Handler
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_zuordnung() {
        assert_eq!(
            ApiError::validierung("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NichtGefunden("x".into()).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::NichtAutorisiert("x".into()).http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Intern("x".into()).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn verzeichnis_fehler_werden_uebersetzt() {
        let api: ApiError = VerzeichnisError::NichtAutorisiert("kein Mitglied".into()).into();
        assert_eq!(api.typ(), "UnauthorizedError");
    }

    #[test]
    fn umschlag_typen() {
        assert_eq!(ApiError::validierung("x").typ(), "ValidationError");
        assert_eq!(ApiError::Intern("x".into()).typ(), "InternalError");
    }
}
