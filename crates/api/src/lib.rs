//! stammtisch-api – REST-Schnittstelle
//!
//! CRUD-Oberflaeche fuer Benutzer und Chatrooms. Die Handler mutieren das
//! Verzeichnis und benachrichtigen verbundene Clients ueber denselben
//! EventBroadcaster und dieselbe PresenceRegistry wie der
//! Session-Service – die eine Stelle an der REST und Echtzeit
//! zusammenlaufen.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

// Bequeme Re-Exporte
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use server::{RestServer, RestServerKonfig};
pub use state::ApiState;
