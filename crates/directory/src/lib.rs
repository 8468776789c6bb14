//! stammtisch-directory – Verzeichnis fuer Benutzer und Chatrooms
//!
//! Das Verzeichnis ist der persistente Mitspieler des Systems: es haelt
//! Benutzer, Chatrooms, Mitgliedschaften und Nachrichten-Historie hinter
//! schmalen Repository-Traits. Die mitgelieferte Implementierung ist
//! in-memory und fluechtig; ein echtes Storage-Backend kann hinter
//! denselben Traits eingesetzt werden, ohne den Session-Router zu
//! beruehren.

pub mod error;
pub mod memory;
pub mod repository;

// Bequeme Re-Exporte
pub use error::{VerzeichnisError, VerzeichnisResult};
pub use memory::MemoryVerzeichnis;
pub use repository::{
    BenutzerRepository, BenutzerUpdate, ChatroomRepository, ChatroomUpdate, Verzeichnis,
};
