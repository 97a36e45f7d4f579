//! Command line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "replyr", about = "Comment monitoring and reply bot", version)]
pub struct Cli {
    /// Path to a config file (default: .replyr.yml, then ~/.config/replyr/replyr.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor the post and reply to new comments (default)
    Run,
    /// Show ledger statistics
    Status,
    /// Show recent replies
    History {
        /// Number of replies to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_defaults_to_no_subcommand() {
        let cli = Cli::parse_from(["replyr"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_history_limit() {
        let cli = Cli::parse_from(["replyr", "history", "--limit", "5"]);
        match cli.command {
            Some(Commands::History { limit }) => assert_eq!(limit, 5),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["replyr", "run", "--config", "custom.yml"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("custom.yml")));
    }
}
