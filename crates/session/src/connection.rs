//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task und eine frische `ConnectionId`, die nie wiederverwendet
//! wird. Der Task liest Frames, dispatcht sie in Eingangsreihenfolge und
//! schreibt ausgehende Events aus der Broadcaster-Queue zurueck.
//!
//! ## Lebenszyklus
//! ```text
//! Accept -> Broadcaster-Queue registrieren
//!        -> Schleife: Frame lesen/dispatchen | Queue leeren | Shutdown
//!        -> Disconnect: genau ein verbindung_getrennt()
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use stammtisch_core::types::ConnectionId;
use stammtisch_directory::Verzeichnis;
use stammtisch_protocol::control::ClientEvent;
use stammtisch_protocol::wire::FrameCodec;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::dispatcher::EventDispatcher;
use crate::server_state::SessionState;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `FrameCodec`, dispatcht an den `EventDispatcher` und
/// sendet Events aus der Broadcaster-Queue zurueck. Laeuft in einem
/// eigenen tokio-Task.
pub struct ClientConnection<D: Verzeichnis + 'static> {
    state: Arc<SessionState<D>>,
    peer_addr: SocketAddr,
    connection_id: ConnectionId,
}

impl<D: Verzeichnis + 'static> ClientConnection<D> {
    /// Erstellt eine neue ClientConnection mit frischer ConnectionId
    pub fn neu(state: Arc<SessionState<D>>, peer_addr: SocketAddr) -> Self {
        Self {
            state,
            peer_addr,
            connection_id: ConnectionId::new(),
        }
    }

    /// Gibt die ConnectionId dieser Verbindung zurueck
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht. Events werden strikt in Eingangsreihenfolge verarbeitet:
    /// der naechste Frame wird erst gelesen wenn der Dispatch des
    /// vorherigen abgeschlossen ist.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let verbindung = self.connection_id;

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Neue Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::<ClientEvent>::new());

        // Queue sofort registrieren: globale Broadcasts (neuer Benutzer,
        // Online-Status) erreichen auch Verbindungen vor dem Login
        let mut empfangs_queue = self.state.broadcaster.verbindung_registrieren(verbindung);

        let dispatcher = EventDispatcher::neu(Arc::clone(&self.state));

        loop {
            tokio::select! {
                // Eingehendes Ereignis vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(event)) => {
                            tracing::trace!(
                                peer = %peer_addr,
                                verbindung = %verbindung,
                                "Ereignis empfangen"
                            );
                            dispatcher.dispatch(verbindung, event).await;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                verbindung = %verbindung,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(
                                peer = %peer_addr,
                                verbindung = %verbindung,
                                "Verbindung vom Client getrennt"
                            );
                            break;
                        }
                    }
                }

                // Ausgehendes Event aus dem Broadcaster
                Some(ausgehend) = empfangs_queue.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            verbindung = %verbindung,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(
                            peer = %peer_addr,
                            verbindung = %verbindung,
                            "Shutdown-Signal – Verbindung wird getrennt"
                        );
                        break;
                    }
                }
            }
        }

        // Genau einmal pro physischem Disconnect: Presence loesen und
        // Send-Queue samt Raum-Mitgliedschaften entfernen
        dispatcher.verbindung_getrennt(&verbindung);

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Verbindungs-Task beendet");
    }
}
