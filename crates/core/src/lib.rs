//! stammtisch-core – Gemeinsame Typen und Domain-Modelle
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Stammtisch-Crates gemeinsam genutzt werden: die ID-Newtypes
//! und die Domain-Modelle (Benutzer, Chatroom, Nachricht).

pub mod models;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use models::{Benutzer, BenutzerAnsicht, Chatroom, Nachricht};
pub use types::{ChatroomId, ConnectionId, UserId};
