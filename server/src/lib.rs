//! stammtisch-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und verdrahtet die Subsysteme:
//! In-Memory-Verzeichnis, TCP-Session-Server und REST-API teilen sich
//! PresenceRegistry und EventBroadcaster.

pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use stammtisch_api::{ApiState, RestServer, RestServerKonfig};
use stammtisch_directory::MemoryVerzeichnis;
use stammtisch_session::{SessionConfig, SessionServer, SessionState};

use config::ServerConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Verzeichnis anlegen (fluechtig, in-memory)
    /// 2. Session-State aufbauen (Presence, Broadcaster)
    /// 3. TCP-Listener starten (Chat-Protokoll)
    /// 4. REST-API starten
    /// 5. Auf Ctrl-C / SIGTERM warten
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            chat = %self.config.chat_bind_adresse(),
            api = %self.config.api_bind_adresse(),
            "Server startet"
        );

        let verzeichnis = Arc::new(MemoryVerzeichnis::neu());

        let session_config = SessionConfig {
            server_name: self.config.server.name.clone(),
            max_clients: self.config.server.max_clients,
        };
        let state = SessionState::neu(session_config, Arc::clone(&verzeichnis));

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        // TCP-Session-Server
        let chat_addr = self
            .config
            .chat_bind_adresse()
            .parse()
            .context("Ungueltige Chat-Bind-Adresse")?;
        let session_server = SessionServer::neu(Arc::clone(&state), chat_addr);
        let session_task = tokio::spawn(session_server.starten(shutdown_rx.clone()));

        // REST-API, teilt Presence und Broadcaster mit dem Session-Service
        let api_state = ApiState::neu(
            verzeichnis,
            state.presence.clone(),
            state.broadcaster.clone(),
        );
        let api_addr = self
            .config
            .api_bind_adresse()
            .parse()
            .context("Ungueltige API-Bind-Adresse")?;
        let rest_server = RestServer::neu(RestServerKonfig {
            bind_addr: api_addr,
            cors_origins: self.config.api.cors_origins.clone(),
        });
        let rest_task = tokio::spawn(rest_server.starten(api_state));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(true);
        session_task.abort();
        rest_task.abort();

        Ok(())
    }
}
