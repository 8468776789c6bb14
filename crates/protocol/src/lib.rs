//! stammtisch-protocol – Wire-Format und Event-Typen
//!
//! Definiert die Ereignisse, die zwischen Client und Server ueber die
//! TCP-Verbindung ausgetauscht werden, sowie den Frame-Codec
//! (Laengenpraefix + JSON-Payload).

pub mod control;
pub mod wire;

// Re-Exporte fuer bequemen Zugriff
pub use control::{ClientEvent, ServerEvent};
pub use wire::FrameCodec;
