pub mod config;
pub mod core;
pub mod data;
pub mod games;
pub mod host;
pub mod scores;
pub mod utils;

pub use config::{CliConfig, Config};
pub use self::core::{EngineConfig, GameEngine, GameKind, GameStatus, RenderState};
pub use data::QuestionBank;
pub use host::{GameSession, Scheduler, SessionReport};
pub use scores::ScoreStore;
pub use utils::{GameError, GameResult};

// Re-export commonly used types
pub type Result<T> = anyhow::Result<T>;

// Launcher version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
