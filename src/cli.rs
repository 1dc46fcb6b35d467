use clap::Parser;
use std::path::PathBuf;

/// Hermes - multi-agent tool-calling orchestration server
#[derive(Parser, Debug, Clone)]
#[command(name = "hermes", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "HERMES_CONFIG", default_value = "hermes.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "HERMES_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "HERMES_PORT")]
    pub port: Option<u16>,

    /// Database connection URL (sqlite://, postgres://, mysql://)
    #[arg(long, env = "HERMES_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum main-agent round trips per orchestration run
    #[arg(long, env = "HERMES_MAX_ITERATIONS")]
    pub max_iterations: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["hermes"]);
        assert_eq!(cli.config, PathBuf::from("hermes.toml"));
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.database_url.is_none());
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "hermes",
            "--config",
            "custom.toml",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--database-url",
            "sqlite://hermes.db",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.database_url.as_deref(), Some("sqlite://hermes.db"));
    }
}
