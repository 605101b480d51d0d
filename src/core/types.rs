use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::utils::GameError;

/// The games the launcher can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Quiz,
    Snake,
    Memory,
    Tetris,
    NumberPuzzle,
}

impl GameKind {
    pub fn all() -> [GameKind; 5] {
        [
            GameKind::Quiz,
            GameKind::Snake,
            GameKind::Memory,
            GameKind::Tetris,
            GameKind::NumberPuzzle,
        ]
    }

    /// Identifier used as the key in the persisted score and statistics files.
    pub fn id(&self) -> &'static str {
        match self {
            GameKind::Quiz => "quiz",
            GameKind::Snake => "snake",
            GameKind::Memory => "memory",
            GameKind::Tetris => "tetris",
            GameKind::NumberPuzzle => "number_puzzle",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameKind::Quiz => "KBC Quiz",
            GameKind::Snake => "Snake Game",
            GameKind::Memory => "Memory Match",
            GameKind::Tetris => "Tetris",
            GameKind::NumberPuzzle => "Number Puzzle",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GameKind::Quiz => "Test your knowledge with challenging questions",
            GameKind::Snake => "Classic snake game with modern twists",
            GameKind::Memory => "Match cards and test your memory",
            GameKind::Tetris => "Stack falling blocks and clear lines",
            GameKind::NumberPuzzle => "Slide and merge tiles to reach 2048",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            GameKind::Quiz => "🧠",
            GameKind::Snake => "🐍",
            GameKind::Memory => "🧩",
            GameKind::Tetris => "🟩",
            GameKind::NumberPuzzle => "🔢",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            GameKind::Quiz => "Knowledge",
            GameKind::Snake | GameKind::Tetris => "Arcade",
            GameKind::Memory | GameKind::NumberPuzzle => "Puzzle",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for GameKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "quiz" => Ok(GameKind::Quiz),
            "snake" => Ok(GameKind::Snake),
            "memory" => Ok(GameKind::Memory),
            "tetris" => Ok(GameKind::Tetris),
            "number_puzzle" | "2048" => Ok(GameKind::NumberPuzzle),
            _ => Err(GameError::unknown_game(s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit step as `(dx, dy)` with y growing downwards.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Coarse lifecycle state every engine reports to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Running,
    Won,
    Lost,
    /// Played to the end without a win/loss notion (quiz results).
    Finished,
    /// The host discarded the session; every command is rejected.
    Terminated,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_kind_round_trips_through_id() {
        for kind in GameKind::all() {
            assert_eq!(kind.id().parse::<GameKind>().unwrap(), kind);
        }
        assert_eq!("2048".parse::<GameKind>().unwrap(), GameKind::NumberPuzzle);
        assert!("pong".parse::<GameKind>().is_err());
    }

    #[test]
    fn test_direction_opposites() {
        for direction in Direction::all() {
            assert_eq!(direction.opposite().opposite(), direction);
            let (dx, dy) = direction.delta();
            let (ox, oy) = direction.opposite().delta();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }
}
