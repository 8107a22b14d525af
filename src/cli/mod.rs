//! CLI module - Command-line interface for Clubhouse

pub mod commands;

use clap::{Parser, Subcommand};

/// Clubhouse - a members-only message board
#[derive(Parser)]
#[command(name = "clubhouse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the web server (default)
    #[command(alias = "run")]
    Serve,

    /// Create a default config.toml in the current directory
    #[command(alias = "init")]
    InitConfig,

    /// Load and validate the configuration, then exit
    #[command(alias = "check")]
    CheckConfig,
}

impl Cli {
    #[must_use]
    pub fn subcommand(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["clubhouse"]).unwrap();
        assert_eq!(cli.subcommand(), &Commands::Serve);
    }

    #[test]
    fn aliases_resolve() {
        let cli = Cli::try_parse_from(["clubhouse", "init"]).unwrap();
        assert_eq!(cli.subcommand(), &Commands::InitConfig);

        let cli = Cli::try_parse_from(["clubhouse", "check-config"]).unwrap();
        assert_eq!(cli.subcommand(), &Commands::CheckConfig);
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(Cli::try_parse_from(["clubhouse", "frobnicate"]).is_err());
    }
}
