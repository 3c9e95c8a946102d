//! Main application logic and lifecycle management.
//!
//! This module contains the core `Application` struct that orchestrates
//! server startup, monitoring, and shutdown with enhanced error handling.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, setup_signal_handlers_silent},
};
use rps_server::RpsServer;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main application struct with monitoring capabilities.
///
/// The `Application` struct manages the complete lifecycle of the RPS
/// server, including configuration loading, server initialization, health
/// monitoring, and graceful shutdown handling.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Server instance
    server: Arc<RpsServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads configuration, applies CLI overrides, validates settings, and
    /// initializes the server.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Initialize the server with configuration
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides
        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        // Validate configuration
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let server_config = config.to_server_config()?;
        let server = Arc::new(RpsServer::new(server_config));

        info!("📂 Config: {}", args.config_path.display());

        Ok(Self { config, server })
    }

    /// Runs the application.
    ///
    /// Starts the server, sets up the monitoring task, waits for shutdown
    /// signals, and performs graceful cleanup with final statistics.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting RPS Server Application");
        self.log_configuration_summary();

        // Start server in background
        let server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move {
                match server.start().await {
                    Ok(()) => {
                        info!("✅ Server completed successfully");
                    }
                    Err(e) => {
                        error!("❌ Server error: {:?}", e);
                        std::process::exit(1);
                    }
                }
            })
        };

        // Start monitoring task for real-time statistics
        let monitoring_handle = {
            let sessions = self.server.sessions();
            let matches = self.server.matches();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
                interval.tick().await; // first tick fires immediately

                loop {
                    interval.tick().await;
                    info!(
                        "📊 System Health - {} users online | {} matches in flight",
                        sessions.user_count().await,
                        matches.live_count()
                    );
                }
            })
        };

        info!("✅ RPS Server is now running!");
        info!(
            "🎮 Ready to accept connections on {}",
            self.config.server.bind_address
        );
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        // Wait for shutdown signal
        let shutdown_state = setup_signal_handlers().await?;

        // A second signal skips the graceful path entirely
        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up second-signal handler: {e}");
                return;
            }
            warn!("Shutdown signal received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        monitoring_handle.abort();
        self.server.shutdown();

        if let Err(e) =
            tokio::time::timeout(tokio::time::Duration::from_secs(8), server_handle).await
        {
            warn!("⏰ Server task did not stop within timeout: {:?}", e);
        } else {
            info!("✅ Server task completed gracefully");
        }
        shutdown_state.complete_shutdown();

        // Final statistics
        info!(
            "📊 Final state - {} users online | {} matches in flight",
            self.server.sessions().user_count().await,
            self.server.matches().live_count()
        );
        info!("👋 Goodbye!");
        Ok(())
    }

    /// Logs a summary of the active configuration.
    fn log_configuration_summary(&self) {
        info!("⚙️ Configuration Summary:");
        info!("  - Bind address: {}", self.config.server.bind_address);
        info!("  - Max connections: {}", self.config.server.max_connections);
        info!("  - Join wait: {}s", self.config.server.join_wait_secs);
        info!("  - Move wait: {}s", self.config.server.move_wait_secs);
        info!(
            "  - Log level: {} (json: {})",
            self.config.logging.level, self.config.logging.json_format
        );
    }
}
