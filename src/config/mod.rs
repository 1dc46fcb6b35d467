use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::orchestrator::OrchestratorConfig;
use crate::persistence::PersistenceConfig;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: PersistenceConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(cli.config.clone()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        Ok(settings)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(url) = &cli.database_url {
            self.database.url = Some(url.clone());
        }
        if let Some(cap) = cli.max_iterations {
            self.orchestrator.max_iterations = cap;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let cli = Cli::parse_from(["hermes", "--config", "/nonexistent/hermes.toml"]);
        let settings = Settings::new_with_cli(&cli).unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert!(settings.database.url.is_none());
        assert_eq!(settings.orchestrator.max_iterations, 6);
        assert_eq!(settings.orchestrator.chat_tool_name, "chat");
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let cli = Cli::parse_from([
            "hermes",
            "--config",
            "/nonexistent/hermes.toml",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--database-url",
            "sqlite::memory:",
            "--max-iterations",
            "3",
        ]);
        let settings = Settings::new_with_cli(&cli).unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(settings.orchestrator.max_iterations, 3);
    }
}
