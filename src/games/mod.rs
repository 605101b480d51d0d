pub mod memory;
pub mod number_puzzle;
pub mod quiz;
pub mod snake;
pub mod tetris;

pub use memory::{MemoryGame, MemoryTheme, RevealResult};
pub use number_puzzle::{MoveResult, NumberPuzzle};
pub use quiz::{Lifeline, QuizEvent, QuizSession};
pub use snake::{SnakeEvent, SnakeGame};
pub use tetris::{TetrisCommand, TetrisEvent, TetrisGame};
