//! Reference CLI front-end: seeded demo games, bot-driven simulation, and
//! saved-state inspection.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use scala_quaranta::codec::{GameDocument, SCHEMA_VERSION};
use scala_quaranta::domain::integrity::validate_integrity;
use scala_quaranta::domain::state::{GameSettings, MatchStatus, UserId};
use scala_quaranta::engine::GameEngine;
use scala_quaranta::rng::SecureRng;
use scala_quaranta::sim::{simulate_match, BaselineBot};

const EXIT_VALIDATION: u8 = 2;
const EXIT_CORRUPT: u8 = 3;

#[derive(Parser)]
#[command(name = "scala40")]
#[command(about = "Scala 40 rules engine reference front-end")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one seeded demonstration game with per-turn output
    Play {
        #[arg(long, default_value_t = 2)]
        players: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Drive complete games with the baseline bot
    Simulate {
        #[arg(long, default_value_t = 10)]
        games: u32,
        #[arg(long, default_value_t = 4)]
        players: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Inspect and validate a saved game state
    Inspect {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        validate: bool,
        #[arg(long, value_enum)]
        show: Option<ShowTarget>,
        #[arg(long)]
        player: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShowTarget {
    Hand,
    Table,
    Stock,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Command::Play { players, seed } => cmd_play(players, seed).await,
        Command::Simulate {
            games,
            players,
            seed,
        } => cmd_simulate(games, players, seed).await,
        Command::Inspect {
            file,
            validate,
            show,
            player,
        } => cmd_inspect(&file, validate, show, player.as_deref()),
    }
}

async fn cmd_play(players: usize, seed: Option<u64>) -> ExitCode {
    let seed = seed.unwrap_or_else(|| SecureRng::new().random_seed());
    println!("Demonstration game: {players} players, seed {seed}");

    let engine = GameEngine::in_memory();
    let player_ids: Vec<UserId> = (1..=players).map(|i| format!("p{i}")).collect();
    let game = match engine
        .create_game(&player_ids, "play", GameSettings::default(), Some(seed))
        .await
    {
        Ok(g) => g,
        Err(e) => {
            eprintln!("failed to create game: {e}");
            return ExitCode::from(EXIT_VALIDATION);
        }
    };
    let game_id = game.game_id.clone();
    let mut bot = BaselineBot::new(seed ^ 0x5EED_BA5E);

    let mut turn = 0u32;
    loop {
        let game = match engine.get_game(&game_id).await {
            Ok(g) => g,
            Err(e) => {
                eprintln!("game vanished: {e}");
                return ExitCode::from(EXIT_VALIDATION);
            }
        };
        if game.status == MatchStatus::Finished || turn >= 4000 {
            for p in &game.players {
                let flag = if p.is_eliminated { " (eliminated)" } else { "" };
                println!("  {}: {} points{flag}", p.user_id, p.score);
            }
            if let Some(winner) = game.active_players().next() {
                if game.status == MatchStatus::Finished {
                    println!("Winner: {}", winner.user_id);
                }
            }
            return ExitCode::SUCCESS;
        }

        let violations = validate_integrity(&game);
        if !violations.is_empty() {
            eprintln!("integrity violations: {violations:?}");
            return ExitCode::from(EXIT_CORRUPT);
        }

        turn += 1;
        let discard = game
            .discard_top()
            .map(|c| c.display())
            .unwrap_or_else(|| "-".into());
        let hands: Vec<String> = game
            .active_players()
            .map(|p| format!("{}:{}", p.user_id, p.hand.len()))
            .collect();
        println!(
            "turn {turn:4} hand {} | {} to act | discard {} | stock {:3} | hands {}",
            game.hand_number,
            game.current_turn_user_id,
            discard,
            game.stock.len(),
            hands.join(" ")
        );

        if let Err(e) = bot.take_turn(&engine, &game_id).await {
            eprintln!("bot turn failed: {e}");
            return ExitCode::from(EXIT_VALIDATION);
        }
    }
}

async fn cmd_simulate(games: u32, players: usize, seed: Option<u64>) -> ExitCode {
    let base_seed = seed.unwrap_or_else(|| SecureRng::new().random_seed());
    println!("Simulating {games} games with {players} players (base seed {base_seed})");

    let mut errors = 0u32;
    let mut completed = 0u32;
    let mut total_turns = 0u64;
    let mut total_hands = 0u64;
    let mut wins: std::collections::BTreeMap<String, u32> = Default::default();

    for i in 0..games {
        let game_seed = base_seed.wrapping_add(i as u64);
        match simulate_match(players, game_seed, 4000).await {
            Ok(outcome) => match outcome.winner {
                Some(winner) => {
                    completed += 1;
                    total_turns += outcome.turns as u64;
                    total_hands += outcome.hands as u64;
                    *wins.entry(winner).or_default() += 1;
                }
                None => {
                    warn!(seed = game_seed, turns = outcome.turns, "game hit the turn cap");
                    errors += 1;
                }
            },
            Err(e) => {
                warn!(seed = game_seed, error = %e, "game failed");
                errors += 1;
            }
        }
        if (i + 1) % 100 == 0 {
            println!("  {}/{games} done...", i + 1);
        }
    }

    println!("\nResults:");
    println!("  completed: {completed}/{games}");
    println!("  errors:    {errors}");
    if completed > 0 {
        println!("  avg turns: {:.1}", total_turns as f64 / completed as f64);
        println!("  avg hands: {:.1}", total_hands as f64 / completed as f64);
        println!("  wins:      {wins:?}");
    }
    if errors > 0 {
        ExitCode::from(EXIT_VALIDATION)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_inspect(
    file: &PathBuf,
    validate: bool,
    show: Option<ShowTarget>,
    player: Option<&str>,
) -> ExitCode {
    let raw = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot read {}: {e}", file.display());
            return ExitCode::from(EXIT_CORRUPT);
        }
    };
    let doc: GameDocument = match serde_json::from_str(&raw) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("undecodable document: {e}");
            return ExitCode::from(EXIT_CORRUPT);
        }
    };
    if doc.schema_version != SCHEMA_VERSION {
        eprintln!(
            "unsupported schema version {} (expected {SCHEMA_VERSION})",
            doc.schema_version
        );
        return ExitCode::from(EXIT_CORRUPT);
    }
    let game = doc.game;

    if validate {
        let violations = validate_integrity(&game);
        if violations.is_empty() {
            println!("state is valid");
            return ExitCode::SUCCESS;
        }
        println!("integrity violations:");
        for v in &violations {
            println!("  - {v}");
        }
        return ExitCode::from(EXIT_VALIDATION);
    }

    match show {
        Some(ShowTarget::Hand) => {
            let Some(user_id) = player else {
                eprintln!("--show hand requires --player");
                return ExitCode::from(EXIT_VALIDATION);
            };
            let Some(p) = game.get_player(user_id) else {
                eprintln!("player {user_id} not found");
                return ExitCode::from(EXIT_VALIDATION);
            };
            println!("hand of {user_id} ({} cards):", p.hand.len());
            for (i, card) in p.hand.iter().enumerate() {
                println!("  {:2}. {} [{}]", i + 1, card.display(), card.compact());
            }
        }
        Some(ShowTarget::Table) => {
            if game.table_melds.is_empty() {
                println!("no melds on the table");
            }
            for meld in &game.table_melds {
                let cards: Vec<String> = meld.cards.iter().map(|c| c.display()).collect();
                println!(
                    "  [{}] {}: {} ({:?})",
                    meld.meld_id,
                    meld.owner,
                    cards.join(" "),
                    meld.kind
                );
            }
        }
        Some(ShowTarget::Stock) => {
            println!("stock: {} cards", game.stock.len());
        }
        None => {
            println!("game:    {}", game.game_id);
            println!("hand:    {}", game.hand_number);
            println!("status:  {:?}", game.status);
            println!(
                "turn:    {} ({:?}, round {})",
                game.current_turn_user_id, game.turn_phase, game.round_number
            );
            println!("stock:   {} cards", game.stock.len());
            println!("discard: {} cards", game.discard_pile.len());
            if let Some(top) = game.discard_top() {
                println!("  top: {}", top.display());
            }
            println!("players:");
            for p in &game.players {
                let status = if p.is_eliminated {
                    "eliminated"
                } else if p.has_opened {
                    "opened"
                } else {
                    "not opened"
                };
                println!(
                    "  {}: {} cards, {} points ({status})",
                    p.user_id,
                    p.hand.len(),
                    p.score
                );
            }
        }
    }
    ExitCode::SUCCESS
}
