use std::time::Duration;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::config::GamesConfig;
use crate::core::{Direction, GameKind, GameStatus};
use crate::data::QuestionBank;
use crate::games::memory::{MemoryGame, MemoryView, RevealResult};
use crate::games::number_puzzle::{MoveResult, NumberPuzzle, NumberPuzzleView};
use crate::games::quiz::{Lifeline, QuizEvent, QuizSession, QuizView};
use crate::games::snake::{SnakeEvent, SnakeGame, SnakeView};
use crate::games::tetris::{TetrisCommand, TetrisEvent, TetrisGame, TetrisView};
use crate::scores::AchievementContext;
use crate::utils::{GameError, GameResult};
use tracing::{debug, info};

/// The surface every game exposes to a host. Game-specific input goes
/// through each game's own methods or `GameEngine::apply`.
pub trait Engine {
    fn kind(&self) -> GameKind;
    fn score(&self) -> u64;
    fn status(&self) -> GameStatus;
    /// Delay until the next `tick`, or `None` when the game is not timed
    /// right now.
    fn tick_interval(&self) -> Option<Duration>;
    fn render_state(&self) -> RenderState;
    fn summary(&self) -> GameSummary;
    /// Stops accepting input. Idempotent.
    fn cleanup(&mut self);
}

/// End-of-game facts handed to the score store.
#[derive(Debug, Clone, Default)]
pub struct GameSummary {
    pub score: u64,
    pub metadata: Map<String, Value>,
    pub achievements: AchievementContext,
}

impl GameSummary {
    pub fn new(score: u64) -> Self {
        Self {
            score,
            ..Default::default()
        }
    }

    pub fn insert<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", content = "view", rename_all = "snake_case")]
pub enum RenderState {
    NumberPuzzle(NumberPuzzleView),
    Snake(SnakeView),
    Tetris(TetrisView),
    Memory(MemoryView),
    Quiz(QuizView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizCommand {
    Select(usize),
    Next,
    UseLifeline(Lifeline),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameCommand {
    Slide(Direction),
    Undo,
    Steer(Direction),
    Tetris(TetrisCommand),
    Reveal(usize),
    ResolvePending,
    Quiz(QuizCommand),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    Slid(MoveResult),
    Undone(bool),
    Steered(bool),
    Tetris(TetrisEvent),
    Revealed(RevealResult),
    Resolved(Option<bool>),
    Quiz(QuizEvent),
    /// The command does not belong to this game.
    Unsupported,
    /// The session is paused and input is held back.
    Paused,
}

impl CommandOutcome {
    pub fn is_accepted(&self) -> bool {
        match self {
            CommandOutcome::Slid(result) => result.moved,
            CommandOutcome::Undone(done) | CommandOutcome::Steered(done) => *done,
            CommandOutcome::Tetris(event) => *event != TetrisEvent::Rejected,
            CommandOutcome::Revealed(result) => !matches!(result, RevealResult::Rejected(_)),
            CommandOutcome::Resolved(result) => result.is_some(),
            CommandOutcome::Quiz(event) => *event != QuizEvent::Rejected,
            CommandOutcome::Unsupported | CommandOutcome::Paused => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Snake(SnakeEvent),
    Tetris(TetrisEvent),
    Quiz(QuizEvent),
    /// The game has no clock.
    Idle,
}

/// Everything the factory needs to build a fresh engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub settings: GamesConfig,
    pub question_bank: QuestionBank,
    /// Fixed seed for reproducible sessions; entropy when unset.
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn new(settings: GamesConfig, question_bank: QuestionBank) -> Self {
        Self {
            settings,
            question_bank,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }
}

pub enum GameEngine {
    NumberPuzzle(NumberPuzzle),
    Snake(SnakeGame),
    Tetris(TetrisGame),
    Memory(MemoryGame),
    Quiz(QuizSession),
}

impl GameEngine {
    /// Builds a fresh engine for `kind`. Every session gets its own engine.
    pub fn create(kind: GameKind, config: &EngineConfig) -> GameResult<GameEngine> {
        config.settings.validate()?;
        let settings = &config.settings;
        let rng = config.rng();

        let engine = match kind {
            GameKind::NumberPuzzle => GameEngine::NumberPuzzle(NumberPuzzle::new(&settings.number_puzzle, rng)),
            GameKind::Snake => GameEngine::Snake(SnakeGame::new(&settings.snake, rng)),
            GameKind::Tetris => GameEngine::Tetris(TetrisGame::new(&settings.tetris, rng)),
            GameKind::Memory => GameEngine::Memory(MemoryGame::new(&settings.memory, rng)),
            GameKind::Quiz => {
                if config.question_bank.is_empty() {
                    return Err(GameError::quiz_data("Question bank is empty"));
                }
                GameEngine::Quiz(QuizSession::new(&settings.quiz, &config.question_bank, rng))
            }
        };

        info!("Created {} engine (seed: {:?})", kind, config.seed);
        Ok(engine)
    }

    pub fn apply(&mut self, command: GameCommand) -> CommandOutcome {
        let outcome = match (self, command) {
            (GameEngine::NumberPuzzle(game), GameCommand::Slide(direction)) => CommandOutcome::Slid(game.slide(direction)),
            (GameEngine::NumberPuzzle(game), GameCommand::Undo) => CommandOutcome::Undone(game.undo()),
            (GameEngine::Snake(game), GameCommand::Steer(direction)) => CommandOutcome::Steered(game.steer(direction)),
            (GameEngine::Tetris(game), GameCommand::Tetris(command)) => CommandOutcome::Tetris(game.apply(command)),
            (GameEngine::Memory(game), GameCommand::Reveal(index)) => CommandOutcome::Revealed(game.reveal(index)),
            (GameEngine::Memory(game), GameCommand::ResolvePending) => CommandOutcome::Resolved(game.resolve_pending()),
            (GameEngine::Quiz(quiz), GameCommand::Quiz(command)) => CommandOutcome::Quiz(match command {
                QuizCommand::Select(option) => quiz.select_answer(option),
                QuizCommand::Next => quiz.next_question(),
                QuizCommand::UseLifeline(lifeline) => quiz.use_lifeline(lifeline),
            }),
            _ => CommandOutcome::Unsupported,
        };
        debug!("{:?} -> {:?}", command, outcome);
        outcome
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self {
            GameEngine::Snake(game) => TickOutcome::Snake(game.tick()),
            GameEngine::Tetris(game) => TickOutcome::Tetris(game.tick()),
            GameEngine::Quiz(quiz) => TickOutcome::Quiz(quiz.tick()),
            GameEngine::NumberPuzzle(_) | GameEngine::Memory(_) => TickOutcome::Idle,
        }
    }

    /// Delay before a revealed memory pair should be resolved.
    pub fn pending_resolve_delay(&self) -> Option<Duration> {
        match self {
            GameEngine::Memory(game) if game.has_pending_pair() => Some(game.reveal_delay()),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Engine {
        match self {
            GameEngine::NumberPuzzle(game) => game,
            GameEngine::Snake(game) => game,
            GameEngine::Tetris(game) => game,
            GameEngine::Memory(game) => game,
            GameEngine::Quiz(quiz) => quiz,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Engine {
        match self {
            GameEngine::NumberPuzzle(game) => game,
            GameEngine::Snake(game) => game,
            GameEngine::Tetris(game) => game,
            GameEngine::Memory(game) => game,
            GameEngine::Quiz(quiz) => quiz,
        }
    }
}

impl Engine for GameEngine {
    fn kind(&self) -> GameKind {
        self.inner().kind()
    }

    fn score(&self) -> u64 {
        self.inner().score()
    }

    fn status(&self) -> GameStatus {
        self.inner().status()
    }

    fn tick_interval(&self) -> Option<Duration> {
        self.inner().tick_interval()
    }

    fn render_state(&self) -> RenderState {
        self.inner().render_state()
    }

    fn summary(&self) -> GameSummary {
        self.inner().summary()
    }

    fn cleanup(&mut self) {
        self.inner_mut().cleanup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> EngineConfig {
        EngineConfig::default().with_seed(Some(seed))
    }

    #[test]
    fn test_factory_builds_every_kind() {
        for kind in GameKind::all() {
            let engine = GameEngine::create(kind, &seeded(1)).unwrap();
            assert_eq!(engine.kind(), kind);
            assert_eq!(engine.status(), GameStatus::Running);
            assert_eq!(engine.score(), 0);
        }
    }

    #[test]
    fn test_seed_makes_engines_reproducible() {
        for kind in GameKind::all() {
            let a = GameEngine::create(kind, &seeded(42)).unwrap();
            let b = GameEngine::create(kind, &seeded(42)).unwrap();
            let a = serde_json::to_value(a.render_state()).unwrap();
            let b = serde_json::to_value(b.render_state()).unwrap();
            assert_eq!(a, b, "{}", kind);
        }
    }

    #[test]
    fn test_invalid_memory_size_is_rejected() {
        let mut config = seeded(1);
        config.settings.memory.grid_size = 5;
        assert!(GameEngine::create(GameKind::Memory, &config).is_err());
    }

    #[test]
    fn test_foreign_commands_are_unsupported() {
        let mut engine = GameEngine::create(GameKind::Snake, &seeded(3)).unwrap();
        let outcome = engine.apply(GameCommand::Slide(Direction::Left));
        assert_eq!(outcome, CommandOutcome::Unsupported);
        assert!(!outcome.is_accepted());
    }

    #[test]
    fn test_untimed_games_idle() {
        let mut engine = GameEngine::create(GameKind::NumberPuzzle, &seeded(3)).unwrap();
        assert_eq!(engine.tick_interval(), None);
        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_memory_pending_delay() {
        let mut engine = GameEngine::create(GameKind::Memory, &seeded(3)).unwrap();
        assert_eq!(engine.pending_resolve_delay(), None);
        engine.apply(GameCommand::Reveal(0));
        engine.apply(GameCommand::Reveal(1));
        assert_eq!(engine.pending_resolve_delay(), Some(Duration::from_millis(1000)));
        assert!(engine.apply(GameCommand::ResolvePending).is_accepted());
        assert_eq!(engine.pending_resolve_delay(), None);
    }

    #[test]
    fn test_cleanup_stops_input() {
        let mut engine = GameEngine::create(GameKind::Quiz, &seeded(3)).unwrap();
        engine.cleanup();
        assert_eq!(engine.status(), GameStatus::Terminated);
        assert_eq!(engine.tick_interval(), None);
        let outcome = engine.apply(GameCommand::Quiz(QuizCommand::Select(0)));
        assert_eq!(outcome, CommandOutcome::Quiz(QuizEvent::Rejected));
    }
}
