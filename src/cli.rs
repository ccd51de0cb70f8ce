use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_NETWORKS_FILE;

#[derive(Parser)]
#[command(name = "fee-proxy")]
#[command(about = "Caching proxy for exchange withdrawal fees")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// JSON file with the allowed networks and their display names
    #[arg(short, long, global = true, default_value = DEFAULT_NETWORKS_FILE)]
    pub networks: PathBuf,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate the environment and network tables, then exit
    CheckConfig,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve {
            host: None,
            port: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["fee-proxy"]).unwrap();

        assert_eq!(cli.command(), Commands::Serve { host: None, port: None });
        assert_eq!(cli.networks, PathBuf::from(DEFAULT_NETWORKS_FILE));
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["fee-proxy", "serve", "--port", "8080", "--networks", "n.json"])
            .unwrap();

        assert_eq!(
            cli.command(),
            Commands::Serve {
                host: None,
                port: Some(8080)
            }
        );
        assert_eq!(cli.networks, PathBuf::from("n.json"));
    }

    #[test]
    fn parses_check_config() {
        let cli = Cli::try_parse_from(["fee-proxy", "check-config"]).unwrap();
        assert_eq!(cli.command(), Commands::CheckConfig);
    }
}
