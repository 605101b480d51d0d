pub mod engine;
pub mod events;
pub mod grid;
pub mod types;

pub use engine::{
    CommandOutcome, Engine, EngineConfig, GameCommand, GameEngine, GameSummary, QuizCommand, RenderState,
    TickOutcome,
};
pub use events::{EventLogger, GameEvent, GameEventHandler, GameEventType};
pub use grid::Grid;
pub use types::{Direction, GameKind, GameStatus};
