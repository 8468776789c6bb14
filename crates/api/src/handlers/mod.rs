//! REST-Handler fuer die Stammtisch-API

pub mod rooms;
pub mod users;

use axum::http::HeaderMap;
use stammtisch_core::types::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// Name des Headers der den anfragenden Benutzer identifiziert
///
/// Kommt derzeit ungeprueft vom Client; sobald Tokens eingefuehrt werden,
/// ersetzt deren Inhalt diesen Header.
pub const REQUESTER_HEADER: &str = "RequesterUserId";

/// Liest die UserId des Anfragers aus den Request-Headern
pub fn anfrager_aus_headers(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let wert = headers
        .get(REQUESTER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::validierung(format!("Header '{}' fehlt", REQUESTER_HEADER))
        })?;

    let uuid = Uuid::parse_str(wert).map_err(|_| {
        ApiError::validierung(format!("Header '{}' ist keine gueltige ID", REQUESTER_HEADER))
    })?;

    Ok(UserId(uuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn anfrager_wird_aus_header_gelesen() {
        let uid = UserId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            REQUESTER_HEADER,
            HeaderValue::from_str(&uid.inner().to_string()).unwrap(),
        );
        assert_eq!(anfrager_aus_headers(&headers).unwrap(), uid);
    }

    #[test]
    fn fehlender_header_ist_validierungsfehler() {
        let headers = HeaderMap::new();
        assert!(matches!(
            anfrager_aus_headers(&headers),
            Err(ApiError::Validierung(_))
        ));
    }

    #[test]
    fn ungueltige_id_ist_validierungsfehler() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUESTER_HEADER, HeaderValue::from_static("keine-uuid"));
        assert!(matches!(
            anfrager_aus_headers(&headers),
            Err(ApiError::Validierung(_))
        ));
    }
}
