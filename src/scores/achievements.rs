use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::scores::statistics::Statistics;

pub const QUIZ_STREAK_TARGET: u32 = 10;
pub const SNAKE_SCORE_TARGET: u64 = 100;
pub const MEMORY_TIME_TARGET: Duration = Duration::from_secs(60);
pub const TETRIS_LINES_TARGET: u32 = 10;
pub const PUZZLE_TILE_TARGET: u32 = 1024;
pub const DISTINCT_GAMES_TARGET: usize = 5;
pub const PLAY_DAYS_TARGET: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstGame,
    QuizMaster,
    SnakeCharmer,
    MemoryExpert,
    TetrisChampion,
    PuzzleSolver,
    MultiPlayer,
    HighScorer,
    Persistent,
    Speedster,
}

impl AchievementId {
    pub fn all() -> [AchievementId; 10] {
        [
            AchievementId::FirstGame,
            AchievementId::QuizMaster,
            AchievementId::SnakeCharmer,
            AchievementId::MemoryExpert,
            AchievementId::TetrisChampion,
            AchievementId::PuzzleSolver,
            AchievementId::MultiPlayer,
            AchievementId::HighScorer,
            AchievementId::Persistent,
            AchievementId::Speedster,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementId::FirstGame => "first_game",
            AchievementId::QuizMaster => "quiz_master",
            AchievementId::SnakeCharmer => "snake_charmer",
            AchievementId::MemoryExpert => "memory_expert",
            AchievementId::TetrisChampion => "tetris_champion",
            AchievementId::PuzzleSolver => "puzzle_solver",
            AchievementId::MultiPlayer => "multi_player",
            AchievementId::HighScorer => "high_scorer",
            AchievementId::Persistent => "persistent",
            AchievementId::Speedster => "speedster",
        }
    }

    pub fn definition(&self) -> AchievementDefinition {
        let (name, description, icon) = match self {
            AchievementId::FirstGame => ("First Steps", "Play your first game", "🎮"),
            AchievementId::QuizMaster => ("Quiz Master", "Answer 10 quiz questions correctly in a row", "🧠"),
            AchievementId::SnakeCharmer => ("Snake Charmer", "Reach 100 points in Snake Game", "🐍"),
            AchievementId::MemoryExpert => ("Memory Expert", "Complete Memory Game in under 60 seconds", "🧩"),
            AchievementId::TetrisChampion => ("Tetris Champion", "Clear 10 lines in a single Tetris game", "🟩"),
            AchievementId::PuzzleSolver => ("Puzzle Solver", "Reach 1024 in Number Puzzle", "🔢"),
            AchievementId::MultiPlayer => ("Multi-Player", "Play all 5 games", "🏆"),
            AchievementId::HighScorer => ("High Scorer", "Achieve a high score in any game", "⭐"),
            AchievementId::Persistent => ("Persistent Player", "Play games for 10 days", "📅"),
            AchievementId::Speedster => ("Speedster", "Complete any timed game under target time", "⚡"),
        };
        AchievementDefinition {
            id: *self,
            name,
            description,
            icon,
        }
    }

    /// Whether the unlock condition holds for the given facts.
    pub fn is_met(&self, context: &AchievementContext, statistics: &Statistics) -> bool {
        match self {
            AchievementId::FirstGame => statistics.total_games_played() >= 1,
            AchievementId::QuizMaster => context.correct_streak.is_some_and(|s| s >= QUIZ_STREAK_TARGET),
            AchievementId::SnakeCharmer => context.score.is_some_and(|s| s >= SNAKE_SCORE_TARGET),
            AchievementId::MemoryExpert => context.elapsed.is_some_and(|t| t < MEMORY_TIME_TARGET),
            AchievementId::TetrisChampion => context.lines_cleared.is_some_and(|l| l >= TETRIS_LINES_TARGET),
            AchievementId::PuzzleSolver => context.highest_tile.is_some_and(|t| t >= PUZZLE_TILE_TARGET),
            AchievementId::MultiPlayer => statistics.distinct_games_played() >= DISTINCT_GAMES_TARGET,
            AchievementId::HighScorer => true,
            AchievementId::Persistent => statistics.unique_play_days() >= PLAY_DAYS_TARGET,
            AchievementId::Speedster => context.under_target_time.unwrap_or(false),
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AchievementId::all()
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown achievement: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AchievementDefinition {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// An earned achievement as persisted. `id` stays a string so imported
/// files with ids this build does not know still round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub earned_date: DateTime<Utc>,
}

impl Achievement {
    pub fn earned(id: AchievementId, at: DateTime<Utc>) -> Self {
        let definition = id.definition();
        Self {
            id: id.as_str().to_string(),
            name: definition.name.to_string(),
            description: definition.description.to_string(),
            icon: definition.icon.to_string(),
            earned_date: at,
        }
    }
}

/// Facts a finished game reports for achievement checks. Unset fields never
/// satisfy a condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AchievementContext {
    pub score: Option<u64>,
    pub lines_cleared: Option<u32>,
    pub highest_tile: Option<u32>,
    pub correct_streak: Option<u32>,
    pub elapsed: Option<Duration>,
    pub under_target_time: Option<bool>,
}

impl AchievementContext {
    /// Fills in the play time of a completed timed game.
    pub fn with_elapsed(mut self, elapsed: Duration, target: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self.under_target_time = Some(elapsed < target);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementProgress {
    pub total: usize,
    pub earned: usize,
    pub percentage: f64,
    pub available: Vec<AchievementDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_through_strings() {
        for id in AchievementId::all() {
            assert_eq!(id.as_str().parse::<AchievementId>().unwrap(), id);
        }
        assert!("nonsense".parse::<AchievementId>().is_err());
    }

    #[test]
    fn test_thresholds() {
        let stats = Statistics::default();
        let met = |id: AchievementId, ctx: AchievementContext| id.is_met(&ctx, &stats);

        assert!(met(AchievementId::QuizMaster, AchievementContext { correct_streak: Some(10), ..Default::default() }));
        assert!(!met(AchievementId::QuizMaster, AchievementContext { correct_streak: Some(9), ..Default::default() }));
        assert!(met(AchievementId::SnakeCharmer, AchievementContext { score: Some(100), ..Default::default() }));
        assert!(met(AchievementId::MemoryExpert, AchievementContext { elapsed: Some(Duration::from_secs(59)), ..Default::default() }));
        assert!(!met(AchievementId::MemoryExpert, AchievementContext { elapsed: Some(Duration::from_secs(60)), ..Default::default() }));
        assert!(met(AchievementId::TetrisChampion, AchievementContext { lines_cleared: Some(10), ..Default::default() }));
        assert!(met(AchievementId::PuzzleSolver, AchievementContext { highest_tile: Some(1024), ..Default::default() }));
        assert!(!met(AchievementId::PuzzleSolver, AchievementContext { highest_tile: Some(512), ..Default::default() }));
    }

    #[test]
    fn test_empty_context_meets_nothing_game_specific() {
        let stats = Statistics::default();
        let ctx = AchievementContext::default();
        for id in [
            AchievementId::FirstGame,
            AchievementId::QuizMaster,
            AchievementId::SnakeCharmer,
            AchievementId::MemoryExpert,
            AchievementId::TetrisChampion,
            AchievementId::PuzzleSolver,
            AchievementId::MultiPlayer,
            AchievementId::Persistent,
            AchievementId::Speedster,
        ] {
            assert!(!id.is_met(&ctx, &stats), "{}", id);
        }
    }

    #[test]
    fn test_with_elapsed_sets_speed_facts() {
        let context = AchievementContext::default().with_elapsed(Duration::from_secs(45), Duration::from_secs(90));
        assert_eq!(context.under_target_time, Some(true));
        assert!(AchievementId::MemoryExpert.is_met(&context, &Statistics::default()));
        assert!(AchievementId::Speedster.is_met(&context, &Statistics::default()));
    }

    #[test]
    fn test_earned_copies_definition() {
        let achievement = Achievement::earned(AchievementId::HighScorer, Utc::now());
        assert_eq!(achievement.id, "high_scorer");
        assert_eq!(achievement.name, "High Scorer");
        assert_eq!(achievement.icon, "⭐");
    }
}
