use std::path::{Path, PathBuf};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use arcade_launcher::core::GameKind;
use arcade_launcher::host::autoplay;
use arcade_launcher::{CliConfig, Config, EngineConfig, QuestionBank, ScoreStore, APP_NAME, VERSION};
use tracing::{error, info};

const DEFAULT_CONFIG_FILE: &str = "arcade.toml";

#[derive(Parser)]
#[command(name = "arcade")]
#[command(about = "Scores, statistics and headless play for the arcade launcher")]
#[command(version = VERSION)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding scores, statistics and achievements
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Player name recorded with new scores
    #[arg(short, long)]
    player: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available games
    Games,
    /// Show high scores, for one game or all of them
    Scores { game: Option<GameKind> },
    /// Show play statistics
    Stats,
    /// Show earned and available achievements
    Achievements,
    /// Write all records to a JSON file
    Export { path: PathBuf },
    /// Merge records from a JSON export
    Import { path: PathBuf },
    /// Delete every score, statistic and achievement
    Reset,
    /// Write the effective configuration to a TOML file
    InitConfig {
        /// Destination, defaults to the --config path or ./arcade.toml
        path: Option<PathBuf>,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Play a game headlessly and record the result
    Play {
        game: GameKind,
        /// Seed for a reproducible session
        #[arg(long)]
        seed: Option<u64>,
        /// Upper bound on autoplay decisions
        #[arg(long, default_value_t = 500)]
        max_steps: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    config.merge_with_cli(CliConfig {
        data_dir: cli.data_dir.clone(),
        player: cli.player.clone(),
        debug: cli.debug,
        ..Default::default()
    });
    config.validate()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(format!("arcade_launcher={},warn", config.logging.level))
        .init();

    info!("Starting {} v{}", APP_NAME, VERSION);

    let mut store = ScoreStore::open(&config.paths.data_dir).await;
    store.register_launch().await;

    if let Err(e) = run(cli.command, cli.config.as_deref(), &config, &mut store).await {
        error!("Command failed: {}", e);
        eprintln!("{} {}", "An error occurred:".red(), e);
        std::process::exit(1);
    }

    info!("Launcher session ended");
    Ok(())
}

async fn run(command: Command, config_path: Option<&Path>, config: &Config, store: &mut ScoreStore) -> Result<()> {
    match command {
        Command::Games => show_games(store),
        Command::Scores { game } => show_scores(store, game),
        Command::Stats => show_stats(store, &config.player.name),
        Command::Achievements => show_achievements(store),
        Command::Export { path } => {
            if !store.export_data(&path).await {
                bail!("could not export to {}", path.display());
            }
            println!("{} {}", "Exported records to".green(), path.display());
        }
        Command::Import { path } => {
            if !store.import_data(&path).await {
                bail!("could not import {}", path.display());
            }
            println!("{} {}", "Imported records from".green(), path.display());
        }
        Command::Reset => {
            if !store.reset_all().await {
                bail!("could not reset the data directory");
            }
            println!("{}", "All records cleared".yellow());
        }
        Command::InitConfig { path, force } => {
            let path = path
                .or_else(|| config_path.map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            if path.exists() && !force {
                bail!("{} already exists, pass --force to replace it", path.display());
            }
            config.save_to_file(&path)?;
            println!("{} {}", "Configuration written to".green(), path.display());
        }
        Command::Play { game, seed, max_steps } => {
            let bank = QuestionBank::load_or_fallback(&config.paths.quiz_bank).await;
            let engine_config = EngineConfig::new(config.games.clone(), bank).with_seed(seed);
            let report = autoplay(game, &engine_config, &config.player.name, store, max_steps).await?;

            println!("{} {} {}", game.icon(), game.name().cyan().bold(), format!("({:?})", report.status).bright_black());
            println!("Score: {}", report.score.to_string().yellow());
            println!("Time:  {:.1}s", report.duration.as_secs_f64());
            if report.high_score {
                println!("{}", "New high score!".green().bold());
            }
            for achievement in &report.new_achievements {
                println!("{} {} {}", achievement.icon, "Unlocked".green(), achievement.name);
            }
        }
    }
    Ok(())
}

fn separator() -> String {
    "─".repeat(40).bright_black().to_string()
}

fn show_games(store: &ScoreStore) {
    println!("{}", "🕹  Games".cyan().bold());
    println!("{}", separator());
    for game in GameKind::all() {
        let plays = store.statistics().plays_of(game.id());
        println!(
            "{} {:<14} {:<10} {} {}",
            game.icon(),
            game.name().bold(),
            game.category().bright_black(),
            game.description(),
            format!("[{} plays]", plays).bright_black()
        );
    }
}

fn show_scores(store: &ScoreStore, game: Option<GameKind>) {
    let games = match game {
        Some(game) => vec![game],
        None => GameKind::all().to_vec(),
    };

    for game in games {
        println!("{} {}", game.icon(), game.name().cyan().bold());
        println!("{}", separator());
        let entries = store.high_scores(game, 10);
        if entries.is_empty() {
            println!("  {}", "No scores yet".bright_black());
        }
        for (rank, entry) in entries.iter().enumerate() {
            println!(
                "  {:>2}. {:>8}  {:<16} {}",
                rank + 1,
                entry.score.to_string().yellow(),
                entry.player,
                entry.date.format("%Y-%m-%d %H:%M").to_string().bright_black()
            );
        }
        println!();
    }
}

fn show_stats(store: &ScoreStore, player: &str) {
    let statistics = store.statistics();
    println!("{}", "📊 Statistics".cyan().bold());
    println!("{}", separator());
    println!("Launches:       {}", statistics.total_sessions);
    println!("Games played:   {}", statistics.total_games_played());
    println!("Distinct games: {}", statistics.distinct_games_played());
    println!("Days played:    {}", statistics.unique_play_days());
    if let Some(first) = statistics.first_play_date {
        println!("First played:   {}", first.format("%Y-%m-%d"));
    }
    println!();

    for game in GameKind::all() {
        let game_stats = store.game_statistics(game, player);
        let best = game_stats
            .best_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} {:<14} plays {:>4}  time {:>8.1}s  best ({}) {}",
            game.icon(),
            game.name(),
            game_stats.games_played,
            game_stats.total_time.as_secs_f64(),
            player,
            best.yellow()
        );
    }
}

fn show_achievements(store: &ScoreStore) {
    let progress = store.progress();
    println!(
        "{} {}",
        "🏆 Achievements".cyan().bold(),
        format!("{}/{} ({:.0}%)", progress.earned, progress.total, progress.percentage).bright_black()
    );
    println!("{}", separator());

    for achievement in store.achievements() {
        println!(
            "{} {} - {} {}",
            achievement.icon,
            achievement.name.green().bold(),
            achievement.description,
            achievement.earned_date.format("%Y-%m-%d").to_string().bright_black()
        );
    }
    for definition in &progress.available {
        println!(
            "{} {} - {}",
            definition.icon,
            definition.name.bright_black(),
            definition.description.bright_black()
        );
    }
}
