//! Command-line interface for the codebreaker client.

use clap::{Parser, Subcommand};

/// Codebreaker - play the code-guessing game against a remote service
#[derive(Parser, Debug)]
#[command(name = "codebreaker")]
#[command(about = "Client for the Codebreaker game service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML client configuration
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Service root URL (overrides config file and environment)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a game and read guesses from stdin, one per line
    Play {
        /// Characters the code is drawn from
        #[arg(short, long, default_value = "ABCDEF")]
        pool: String,

        /// Number of positions in the code
        #[arg(short, long, default_value = "4")]
        length: usize,

        /// Keep the game on the service when the session ends
        #[arg(long)]
        keep: bool,
    },

    /// Print a game and its guess history
    Show {
        /// Game identifier
        game_id: String,
    },

    /// Delete a game
    Delete {
        /// Game identifier
        game_id: String,
    },
}
