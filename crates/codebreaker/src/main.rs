//! Codebreaker - command-line client
//!
//! Plays the code-guessing game against a remote Codebreaker service.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Command};
use codebreaker::{ClientConfig, Game, Guess, HttpCodebreakerService, SessionPublisher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/codebreaker";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(config.log_level());

    let service = Arc::new(HttpCodebreakerService::new(&config)?);
    let session = SessionPublisher::new(service);

    let result = match cli.command {
        Command::Play { pool, length, keep } => play(&session, pool, length, keep).await,
        Command::Show { game_id } => show(&session, &game_id).await,
        Command::Delete { game_id } => delete(&session, &game_id).await,
    };

    session.shutdown();
    result
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves configuration: `--config` file, else environment, else defaults.
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_env()?.unwrap_or_else(|| ClientConfig::new(DEFAULT_BASE_URL)),
    };
    let config = match &cli.base_url {
        Some(url) => config.with_base_url(url.clone()),
        None => config,
    };
    config.validate()?;
    Ok(config)
}

/// Starts a game and submits one guess per stdin line until solved.
#[instrument(skip(session))]
async fn play(session: &SessionPublisher, pool: String, length: usize, keep: bool) -> Result<()> {
    let _errors = session.subscribe_error(|error| eprintln!("error: {}", error));
    let _guesses = session.subscribe_guess(|guess| println!("{}", describe_guess(guess)));
    let _solved = session.subscribe_solved(|solved| {
        if *solved == Some(true) {
            println!("Solved!");
        }
    });

    session.start_game(pool, length).await?;
    session.settled().await;
    let game = session
        .current_game()
        .await
        .context("could not start a game")?;
    println!(
        "Game {} started: {} positions drawn from \"{}\"",
        game.id().unwrap_or("?"),
        game.length(),
        game.pool()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        session.submit_guess(text).await?;
        session.settled().await;
        if session.current_solved().await == Some(true) {
            break;
        }
    }

    if let Some(game) = session.current_game().await {
        info!(guesses = game.guesses().len(), "Session finished");
        println!("{} guess(es) submitted", game.guesses().len());
    }

    if !keep {
        debug!("Deleting game");
        session.delete_current_game().await?;
        session.settled().await;
    }
    Ok(())
}

/// Prints a game with its guess history.
#[instrument(skip(session))]
async fn show(session: &SessionPublisher, game_id: &str) -> Result<()> {
    session.get_game(game_id).await?;
    session.settled().await;
    match session.current_game().await {
        Some(game) => {
            print_game(&game);
            Ok(())
        }
        None => match session.current_error().await {
            Some(error) => bail!("could not fetch game {}: {}", game_id, error),
            None => bail!("could not fetch game {}", game_id),
        },
    }
}

/// Deletes a game by id.
#[instrument(skip(session))]
async fn delete(session: &SessionPublisher, game_id: &str) -> Result<()> {
    session.delete_game(game_id).await?;
    session.settled().await;
    if let Some(error) = session.current_error().await {
        bail!("could not delete game {}: {}", game_id, error);
    }
    println!("Deleted game {}", game_id);
    Ok(())
}

fn print_game(game: &Game) {
    println!("Game {}", game.id().unwrap_or("?"));
    println!("  pool:    {}", game.pool());
    println!("  length:  {}", game.length());
    match game.solved() {
        Some(true) => println!("  solved:  yes"),
        Some(false) => println!("  solved:  no"),
        None => println!("  solved:  unknown"),
    }
    if let Some(created) = game.created() {
        println!("  created: {}", created.to_rfc3339());
    }
    for guess in game.guesses() {
        println!("  {}", describe_guess(guess));
    }
}

fn describe_guess(guess: &Guess) -> String {
    format!(
        "{}  exact={} near={}{}",
        guess.text(),
        guess.exact_matches().unwrap_or(0),
        guess.near_matches().unwrap_or(0),
        if guess.is_solution() { "  (solution)" } else { "" }
    )
}
