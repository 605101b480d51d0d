use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::games::memory::MemoryTheme;
use crate::utils::{GameError, GameResult};
use tracing::{debug, info};

pub const ENV_PREFIX: &str = "ARCADE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub player: PlayerConfig,
    pub paths: PathConfig,
    pub logging: LoggingConfig,
    pub games: GamesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub data_dir: PathBuf,
    pub quiz_bank: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamesConfig {
    pub number_puzzle: NumberPuzzleSettings,
    pub snake: SnakeSettings,
    pub tetris: TetrisSettings,
    pub memory: MemorySettings,
    pub quiz: QuizSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberPuzzleSettings {
    pub grid_size: usize,
    pub target_tile: u32,
    /// Chance that a spawned tile is a 4 instead of a 2.
    pub four_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeSettings {
    pub width: i32,
    pub height: i32,
    pub base_interval_ms: u64,
    pub min_interval_ms: u64,
    pub interval_step_ms: u64,
    pub food_points: u64,
    pub points_per_level: u64,
    pub power_up_chance: f64,
    pub max_power_ups: usize,
    /// Ticks a power-up stays on the board.
    pub power_up_lifetime: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetrisSettings {
    pub width: usize,
    pub height: usize,
    pub base_fall_ms: u64,
    pub min_fall_ms: u64,
    pub fall_step_ms: u64,
    pub lines_per_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub grid_size: usize,
    pub theme: MemoryTheme,
    pub reveal_delay_ms: u64,
    /// Completion time that earns the speedster achievement.
    pub speedster_target_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    pub total_questions: usize,
    pub seconds_per_question: u32,
    pub extra_time_bonus: u32,
    pub points_per_answer: u64,
    pub countdown_tick_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            quiz_bank: PathBuf::from("./assets/quiz/questions.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for NumberPuzzleSettings {
    fn default() -> Self {
        Self {
            grid_size: 4,
            target_tile: 2048,
            four_probability: 0.1,
        }
    }
}

impl Default for SnakeSettings {
    fn default() -> Self {
        Self {
            width: 25,
            height: 20,
            base_interval_ms: 150,
            min_interval_ms: 50,
            interval_step_ms: 10,
            food_points: 10,
            points_per_level: 100,
            power_up_chance: 0.15,
            max_power_ups: 2,
            power_up_lifetime: 200,
        }
    }
}

impl Default for TetrisSettings {
    fn default() -> Self {
        Self {
            width: 10,
            height: 20,
            base_fall_ms: 500,
            min_fall_ms: 50,
            fall_step_ms: 50,
            lines_per_level: 10,
        }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            grid_size: 4,
            theme: MemoryTheme::Numbers,
            reveal_delay_ms: 1000,
            speedster_target_secs: 90,
        }
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            total_questions: 10,
            seconds_per_question: 30,
            extra_time_bonus: 15,
            points_per_answer: 10,
            countdown_tick_ms: 1000,
        }
    }
}

impl Config {
    /// Layers defaults, the optional TOML file and `ARCADE__SECTION__KEY`
    /// environment variables, in that order.
    pub fn load(path: Option<&Path>) -> GameResult<Self> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            debug!("Reading configuration from {:?}", path);
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let layered = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let config: Config = layered.try_deserialize()?;
        config.validate()?;

        info!("Configuration loaded (data dir: {:?})", config.paths.data_dir);
        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    /// Everything written here reads back through `load`.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> GameResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!("Configuration written to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> GameResult<()> {
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => return Err(GameError::configuration("Invalid logging level")),
        }

        if self.player.name.trim().is_empty() {
            return Err(GameError::configuration("Player name cannot be empty"));
        }
        if self.paths.data_dir.as_os_str().is_empty() {
            return Err(GameError::configuration("Data directory path cannot be empty"));
        }

        self.games.validate()
    }

    pub fn merge_with_cli(&mut self, cli_config: CliConfig) {
        if let Some(data_dir) = cli_config.data_dir {
            self.paths.data_dir = data_dir;
        }
        if let Some(quiz_bank) = cli_config.quiz_bank {
            self.paths.quiz_bank = quiz_bank;
        }
        if let Some(player) = cli_config.player {
            self.player.name = player;
        }
        if let Some(log_level) = cli_config.log_level {
            self.logging.level = log_level;
        }
        if cli_config.debug {
            self.logging.level = "debug".to_string();
        }
    }
}

impl GamesConfig {
    pub fn validate(&self) -> GameResult<()> {
        let puzzle = &self.number_puzzle;
        if puzzle.grid_size < 2 {
            return Err(GameError::configuration("Number puzzle grid must be at least 2x2"));
        }
        if !puzzle.target_tile.is_power_of_two() || puzzle.target_tile < 4 {
            return Err(GameError::configuration("Target tile must be a power of two of at least 4"));
        }
        if !(0.0..=1.0).contains(&puzzle.four_probability) {
            return Err(GameError::configuration("Four probability must be between 0 and 1"));
        }

        let snake = &self.snake;
        if snake.width < 5 || snake.height < 5 {
            return Err(GameError::configuration("Snake board must be at least 5x5"));
        }
        if snake.min_interval_ms == 0 || snake.base_interval_ms < snake.min_interval_ms {
            return Err(GameError::configuration("Snake intervals must satisfy 0 < min <= base"));
        }
        if snake.points_per_level == 0 {
            return Err(GameError::configuration("Snake points per level must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&snake.power_up_chance) {
            return Err(GameError::configuration("Power-up chance must be between 0 and 1"));
        }

        let tetris = &self.tetris;
        if tetris.width < 5 || tetris.height < 5 {
            return Err(GameError::configuration("Tetris board must be at least 5x5"));
        }
        if tetris.min_fall_ms == 0 || tetris.base_fall_ms < tetris.min_fall_ms {
            return Err(GameError::configuration("Tetris fall times must satisfy 0 < min <= base"));
        }
        if tetris.lines_per_level == 0 {
            return Err(GameError::configuration("Tetris lines per level must be greater than 0"));
        }

        if !matches!(self.memory.grid_size, 4 | 6) {
            return Err(GameError::configuration("Memory grid size must be 4 or 6"));
        }

        let quiz = &self.quiz;
        if quiz.total_questions == 0 || quiz.seconds_per_question == 0 {
            return Err(GameError::configuration("Quiz needs at least one question and one second"));
        }
        if quiz.countdown_tick_ms == 0 {
            return Err(GameError::configuration("Quiz countdown tick must be greater than 0"));
        }

        Ok(())
    }
}

// Configuration that can be overridden by CLI arguments
#[derive(Debug, Default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub quiz_bank: Option<PathBuf>,
    pub player: Option<String>,
    pub log_level: Option<String>,
    pub debug: bool,
}
