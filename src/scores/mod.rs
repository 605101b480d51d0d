pub mod achievements;
pub mod score_store;
pub mod statistics;

pub use achievements::{Achievement, AchievementContext, AchievementId, AchievementProgress};
pub use score_store::{ScoreEntry, ScoreStore, MAX_SCORES_PER_GAME};
pub use statistics::{GameStatistics, Statistics};
