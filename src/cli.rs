//! Command-line interface definition for Aerin
//!
//! The service is a single long-running HTTP server, so the CLI stays
//! small: a config path plus bind and storage overrides.

use clap::Parser;

/// Aerin - conversational AI assistant web service
#[derive(Parser, Debug, Clone)]
#[command(name = "aerin", version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "AERIN_CONFIG")]
    pub config: Option<String>,

    /// Bind address override
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port override
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Base directory override for the filesystem storage backend
    #[arg(long, env = "AERIN_STORAGE_DIR")]
    pub storage_dir: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args() {
        let cli = Cli::parse_from(["aerin"]);
        assert!(cli.config.is_none());
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.storage_dir.is_none());
    }

    #[test]
    fn test_parse_all_args() {
        let cli = Cli::parse_from([
            "aerin",
            "--config",
            "config/aerin.yaml",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--storage-dir",
            "/var/lib/aerin",
        ]);
        assert_eq!(cli.config.as_deref(), Some("config/aerin.yaml"));
        assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.storage_dir.as_deref(), Some("/var/lib/aerin"));
    }

    #[test]
    fn test_parse_short_flags() {
        let cli = Cli::parse_from(["aerin", "-c", "a.yaml", "-p", "9000"]);
        assert_eq!(cli.config.as_deref(), Some("a.yaml"));
        assert_eq!(cli.port, Some(9000));
    }
}
