use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use crate::core::GameKind;
use crate::scores::achievements::{Achievement, AchievementContext, AchievementId, AchievementProgress};
use crate::scores::statistics::{GameStatistics, Statistics};
use crate::utils::{write_json_atomic, read_json_or_default, GameError, GameResult};
use tracing::{debug, error, info, warn};

pub const MAX_SCORES_PER_GAME: usize = 10;
pub const EXPORT_VERSION: &str = "1.0";

const SCORES_FILE: &str = "scores.json";
const STATISTICS_FILE: &str = "statistics.json";
const ACHIEVEMENTS_FILE: &str = "achievements.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: u64,
    pub player: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub additional_data: Map<String, Value>,
}

impl ScoreEntry {
    fn signature(&self) -> (u64, &str, DateTime<Utc>) {
        (self.score, self.player.as_str(), self.date)
    }
}

/// High-score lists keyed by game id, each sorted by score descending.
pub type ScoreTable = BTreeMap<String, Vec<ScoreEntry>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    #[serde(default)]
    pub scores: ScoreTable,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    pub export_date: Option<DateTime<Utc>>,
    pub version: Option<String>,
}

/// Scores, statistics and achievements, written through to three JSON files
/// in `data_dir`. Mutations that fail to persist are rolled back and report
/// `false`.
pub struct ScoreStore {
    data_dir: PathBuf,
    scores: ScoreTable,
    statistics: Statistics,
    achievements: Vec<Achievement>,
}

impl ScoreStore {
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        info!("Opening score store in: {:?}", data_dir);

        let mut scores: ScoreTable = read_json_or_default(&data_dir.join(SCORES_FILE)).await;
        for list in scores.values_mut() {
            list.sort_by(|a, b| b.score.cmp(&a.score));
            list.truncate(MAX_SCORES_PER_GAME);
        }
        let statistics = read_json_or_default(&data_dir.join(STATISTICS_FILE)).await;
        let achievements = read_json_or_default(&data_dir.join(ACHIEVEMENTS_FILE)).await;

        Self {
            data_dir,
            scores,
            statistics,
            achievements,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Records a score. Returns whether it made the high-score list.
    pub async fn record_score(&mut self, game: GameKind, score: u64, player: &str, metadata: Map<String, Value>) -> bool {
        let snapshot = self.scores.clone();
        let list = self.scores.entry(game.id().to_string()).or_default();

        // after any equal scores
        let position = list.iter().position(|e| e.score < score).unwrap_or(list.len());
        if position >= MAX_SCORES_PER_GAME {
            debug!("Score {} for {} did not make the top {}", score, game, MAX_SCORES_PER_GAME);
            self.scores = snapshot;
            return false;
        }

        list.insert(
            position,
            ScoreEntry {
                score,
                player: player.to_string(),
                date: Utc::now(),
                additional_data: metadata,
            },
        );
        list.truncate(MAX_SCORES_PER_GAME);

        if let Err(e) = self.save_scores().await {
            error!("Failed to save score for {}: {}", game, e);
            self.scores = snapshot;
            return false;
        }

        info!("New high score for {}: {} by {} (rank {})", game, score, player, position + 1);
        self.check_achievement(AchievementId::HighScorer, &AchievementContext::default())
            .await;
        true
    }

    pub fn high_scores(&self, game: GameKind, limit: usize) -> &[ScoreEntry] {
        self.scores
            .get(game.id())
            .map(|list| &list[..limit.min(list.len())])
            .unwrap_or(&[])
    }

    pub fn all_high_scores(&self) -> &ScoreTable {
        &self.scores
    }

    pub fn best_score(&self, game: GameKind, player: &str) -> Option<u64> {
        self.scores
            .get(game.id())?
            .iter()
            .filter(|e| e.player == player)
            .map(|e| e.score)
            .max()
    }

    pub async fn update_statistics(&mut self, game: GameKind, play_duration: Duration) -> bool {
        self.update_statistics_at(game, play_duration, Utc::now()).await
    }

    pub async fn update_statistics_at(&mut self, game: GameKind, play_duration: Duration, at: DateTime<Utc>) -> bool {
        let snapshot = self.statistics.clone();
        self.statistics.record_play(game.id(), play_duration, at);

        if let Err(e) = self.save_statistics().await {
            error!("Failed to save statistics for {}: {}", game, e);
            self.statistics = snapshot;
            return false;
        }
        debug!("Statistics updated for {} ({:.1}s)", game, play_duration.as_secs_f64());

        let context = AchievementContext::default();
        for id in [AchievementId::FirstGame, AchievementId::MultiPlayer, AchievementId::Persistent] {
            self.check_achievement(id, &context).await;
        }
        true
    }

    /// Counts one launcher start.
    pub async fn register_launch(&mut self) -> bool {
        self.statistics.total_sessions += 1;
        if let Err(e) = self.save_statistics().await {
            error!("Failed to save session count: {}", e);
            self.statistics.total_sessions -= 1;
            return false;
        }
        true
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn game_statistics(&self, game: GameKind, player: &str) -> GameStatistics {
        GameStatistics {
            games_played: self.statistics.plays_of(game.id()),
            total_time: self.statistics.time_played(game.id()),
            best_score: self.best_score(game, player),
        }
    }

    /// Unlocks `id` if its condition holds and it is not yet earned.
    /// Returns whether it was newly unlocked.
    pub async fn check_achievement(&mut self, id: AchievementId, context: &AchievementContext) -> bool {
        if self.is_earned(id) || !id.is_met(context, &self.statistics) {
            return false;
        }

        self.achievements.push(Achievement::earned(id, Utc::now()));
        self.statistics.achievements_earned = self.achievements.len();

        let saved = match self.save_achievements().await {
            Ok(()) => self.save_statistics().await,
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            error!("Failed to save achievement {}: {}", id, e);
            self.achievements.pop();
            self.statistics.achievements_earned = self.achievements.len();
            self.repersist().await;
            return false;
        }

        info!("Achievement unlocked: {}", id.definition().name);
        true
    }

    pub fn is_earned(&self, id: AchievementId) -> bool {
        self.achievements.iter().any(|a| a.id == id.as_str())
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn progress(&self) -> AchievementProgress {
        let all = AchievementId::all();
        let earned = all.iter().filter(|id| self.is_earned(**id)).count();
        AchievementProgress {
            total: all.len(),
            earned,
            percentage: earned as f64 / all.len() as f64 * 100.0,
            available: all
                .iter()
                .filter(|id| !self.is_earned(**id))
                .map(|id| id.definition())
                .collect(),
        }
    }

    pub async fn export_data<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let bundle = ExportBundle {
            scores: self.scores.clone(),
            statistics: self.statistics.clone(),
            achievements: self.achievements.clone(),
            export_date: Some(Utc::now()),
            version: Some(EXPORT_VERSION.to_string()),
        };

        match write_json_atomic(path, &bundle).await {
            Ok(()) => {
                info!("Exported data to {:?}", path);
                true
            }
            Err(e) => {
                error!("Failed to export data: {}", e);
                false
            }
        }
    }

    /// Merges scores and achievements from an export file, skipping
    /// duplicates.
    pub async fn import_data<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        let bundle = match Self::read_bundle(path).await {
            Ok(bundle) => bundle,
            Err(e) => {
                error!("Failed to import data: {}", e);
                return false;
            }
        };
        if bundle.version.as_deref().is_some_and(|v| v != EXPORT_VERSION) {
            warn!("Importing data from export version {:?}", bundle.version);
        }

        let snapshot = (self.scores.clone(), self.statistics.clone(), self.achievements.clone());

        let mut added_scores = 0;
        for (game_id, entries) in bundle.scores {
            let list = self.scores.entry(game_id).or_default();
            let mut seen: HashSet<(u64, String, DateTime<Utc>)> = list
                .iter()
                .map(|e| (e.score, e.player.clone(), e.date))
                .collect();
            for entry in entries {
                let (score, player, date) = entry.signature();
                if seen.insert((score, player.to_string(), date)) {
                    list.push(entry);
                    added_scores += 1;
                }
            }
            list.sort_by(|a, b| b.score.cmp(&a.score));
            list.truncate(MAX_SCORES_PER_GAME);
        }

        let mut added_achievements = 0;
        for achievement in bundle.achievements {
            if !self.achievements.iter().any(|a| a.id == achievement.id) {
                self.achievements.push(achievement);
                added_achievements += 1;
            }
        }
        self.statistics.achievements_earned = self.achievements.len();

        if let Err(e) = self.persist_all().await {
            error!("Failed to save imported data: {}", e);
            (self.scores, self.statistics, self.achievements) = snapshot;
            self.repersist().await;
            return false;
        }

        info!(
            "Imported {} scores and {} achievements from {:?}",
            added_scores, added_achievements, path
        );
        true
    }

    pub async fn reset_all(&mut self) -> bool {
        let snapshot = (
            std::mem::take(&mut self.scores),
            std::mem::take(&mut self.statistics),
            std::mem::take(&mut self.achievements),
        );

        if let Err(e) = self.persist_all().await {
            error!("Failed to reset data: {}", e);
            (self.scores, self.statistics, self.achievements) = snapshot;
            self.repersist().await;
            return false;
        }

        info!("All scores, statistics and achievements reset");
        true
    }

    async fn read_bundle(path: &Path) -> GameResult<ExportBundle> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GameError::persistence(format!("Failed to read {:?}: {}", path, e)))?;
        let bundle = serde_json::from_str(&content)
            .map_err(|e| GameError::persistence(format!("Failed to parse {:?}: {}", path, e)))?;
        Ok(bundle)
    }

    async fn save_scores(&self) -> GameResult<()> {
        write_json_atomic(&self.data_dir.join(SCORES_FILE), &self.scores).await
    }

    async fn save_statistics(&self) -> GameResult<()> {
        write_json_atomic(&self.data_dir.join(STATISTICS_FILE), &self.statistics).await
    }

    async fn save_achievements(&self) -> GameResult<()> {
        write_json_atomic(&self.data_dir.join(ACHIEVEMENTS_FILE), &self.achievements).await
    }

    async fn persist_all(&self) -> GameResult<()> {
        self.save_scores().await?;
        self.save_statistics().await?;
        self.save_achievements().await
    }

    /// Brings the files back in line with memory after a rollback. Files
    /// written before the failure would otherwise hold the discarded state.
    async fn repersist(&self) {
        if let Err(e) = self.persist_all().await {
            warn!("Could not restore data files after rollback: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn scores_of(store: &ScoreStore, game: GameKind) -> Vec<u64> {
        store.high_scores(game, MAX_SCORES_PER_GAME).iter().map(|e| e.score).collect()
    }

    async fn fill(store: &mut ScoreStore, game: GameKind) {
        for score in (1..=10).map(|n| n * 10) {
            assert!(store.record_score(game, score, "Player", Map::new()).await);
        }
    }

    #[tokio::test]
    async fn test_high_score_list_is_capped_and_sorted() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        fill(&mut store, GameKind::Snake).await;

        assert_eq!(scores_of(&store, GameKind::Snake), vec![100, 90, 80, 70, 60, 50, 40, 30, 20, 10]);

        assert!(!store.record_score(GameKind::Snake, 5, "Player", Map::new()).await);
        assert_eq!(scores_of(&store, GameKind::Snake).len(), 10);
        assert_eq!(scores_of(&store, GameKind::Snake).last(), Some(&10));

        assert!(store.record_score(GameKind::Snake, 55, "Player", Map::new()).await);
        assert_eq!(scores_of(&store, GameKind::Snake), vec![100, 90, 80, 70, 60, 55, 50, 40, 30, 20]);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_arrival_order() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        store.record_score(GameKind::Quiz, 50, "first", Map::new()).await;
        store.record_score(GameKind::Quiz, 50, "second", Map::new()).await;

        let players: Vec<&str> = store.high_scores(GameKind::Quiz, 10).iter().map(|e| e.player.as_str()).collect();
        assert_eq!(players, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_full_list_of_equal_scores_rejects_newcomer() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        for _ in 0..10 {
            store.record_score(GameKind::Tetris, 100, "old", Map::new()).await;
        }
        assert!(!store.record_score(GameKind::Tetris, 100, "new", Map::new()).await);
        assert!(store.high_scores(GameKind::Tetris, 10).iter().all(|e| e.player == "old"));
    }

    #[tokio::test]
    async fn test_high_scorer_earned_once() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        fill(&mut store, GameKind::Memory).await;

        let high_scorer = store.achievements().iter().filter(|a| a.id == "high_scorer").count();
        assert_eq!(high_scorer, 1);
        assert_eq!(store.statistics().achievements_earned, 1);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        {
            let mut store = ScoreStore::open(temp_dir.path()).await;
            let mut metadata = Map::new();
            metadata.insert("moves".to_string(), Value::from(42));
            store.record_score(GameKind::NumberPuzzle, 512, "Ada", metadata).await;
            store.update_statistics(GameKind::NumberPuzzle, Duration::from_secs(90)).await;
            store.register_launch().await;
        }

        let store = ScoreStore::open(temp_dir.path()).await;
        let entry = &store.high_scores(GameKind::NumberPuzzle, 1)[0];
        assert_eq!(entry.score, 512);
        assert_eq!(entry.additional_data.get("moves"), Some(&Value::from(42)));
        assert_eq!(store.statistics().total_sessions, 1);
        assert_eq!(store.game_statistics(GameKind::NumberPuzzle, "Ada").best_score, Some(512));
        assert_eq!(store.game_statistics(GameKind::NumberPuzzle, "Ada").games_played, 1);
        assert!(store.is_earned(AchievementId::FirstGame));
    }

    #[tokio::test]
    async fn test_malformed_files_start_empty() {
        let temp_dir = tempdir().unwrap();
        tokio::fs::write(temp_dir.path().join(SCORES_FILE), "[[[").await.unwrap();
        tokio::fs::write(temp_dir.path().join(ACHIEVEMENTS_FILE), "{}").await.unwrap();

        let store = ScoreStore::open(temp_dir.path()).await;
        assert!(store.all_high_scores().is_empty());
        assert!(store.achievements().is_empty());
    }

    #[tokio::test]
    async fn test_first_game_earned_at_most_once() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        store.update_statistics(GameKind::Quiz, Duration::from_secs(10)).await;
        store.update_statistics(GameKind::Quiz, Duration::from_secs(10)).await;

        assert!(!store.check_achievement(AchievementId::FirstGame, &AchievementContext::default()).await);
        let count = store.achievements().iter().filter(|a| a.id == "first_game").count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_multi_player_after_all_games() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        for game in GameKind::all() {
            assert!(!store.is_earned(AchievementId::MultiPlayer));
            store.update_statistics(game, Duration::from_secs(5)).await;
        }
        assert!(store.is_earned(AchievementId::MultiPlayer));
    }

    #[tokio::test]
    async fn test_persistent_after_ten_days() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        for day in 1..=10 {
            let at = Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap();
            store.update_statistics_at(GameKind::Snake, Duration::from_secs(5), at).await;
            assert_eq!(store.is_earned(AchievementId::Persistent), day == 10);
        }
    }

    #[tokio::test]
    async fn test_game_achievement_needs_context() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;

        let weak = AchievementContext { lines_cleared: Some(3), ..Default::default() };
        assert!(!store.check_achievement(AchievementId::TetrisChampion, &weak).await);

        let strong = AchievementContext { lines_cleared: Some(12), ..Default::default() };
        assert!(store.check_achievement(AchievementId::TetrisChampion, &strong).await);
        assert!(!store.check_achievement(AchievementId::TetrisChampion, &strong).await);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let temp_dir = tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        tokio::fs::write(&blocker, "not a directory").await.unwrap();

        let mut store = ScoreStore::open(blocker.join("data")).await;
        assert!(!store.record_score(GameKind::Snake, 100, "Player", Map::new()).await);
        assert!(store.high_scores(GameKind::Snake, 10).is_empty());

        assert!(!store.update_statistics(GameKind::Snake, Duration::from_secs(1)).await);
        assert_eq!(store.statistics(), &Statistics::default());

        let context = AchievementContext { score: Some(150), ..Default::default() };
        assert!(!store.check_achievement(AchievementId::SnakeCharmer, &context).await);
        assert!(store.achievements().is_empty());
        assert_eq!(store.statistics().achievements_earned, 0);
    }

    #[tokio::test]
    async fn test_import_skips_duplicates() {
        let temp_dir = tempdir().unwrap();
        let export_path = temp_dir.path().join("export.json");

        let mut source = ScoreStore::open(temp_dir.path().join("source")).await;
        source.record_score(GameKind::Snake, 120, "Ada", Map::new()).await;
        source.record_score(GameKind::Quiz, 80, "Ada", Map::new()).await;
        assert!(source.export_data(&export_path).await);

        let mut target = ScoreStore::open(temp_dir.path().join("target")).await;
        target.record_score(GameKind::Snake, 60, "Bob", Map::new()).await;

        assert!(target.import_data(&export_path).await);
        assert!(target.import_data(&export_path).await);

        assert_eq!(scores_of(&target, GameKind::Snake), vec![120, 60]);
        assert_eq!(scores_of(&target, GameKind::Quiz), vec![80]);
        let high_scorer = target.achievements().iter().filter(|a| a.id == "high_scorer").count();
        assert_eq!(high_scorer, 1);
    }

    #[tokio::test]
    async fn test_import_of_missing_file_fails() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        assert!(!store.import_data(temp_dir.path().join("missing.json")).await);
    }

    #[tokio::test]
    async fn test_reset_all() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        store.record_score(GameKind::Snake, 120, "Ada", Map::new()).await;
        store.update_statistics(GameKind::Snake, Duration::from_secs(3)).await;

        assert!(store.reset_all().await);
        assert!(store.all_high_scores().is_empty());
        assert!(store.achievements().is_empty());

        let reopened = ScoreStore::open(temp_dir.path()).await;
        assert!(reopened.all_high_scores().is_empty());
        assert_eq!(reopened.statistics(), &Statistics::default());
    }

    #[tokio::test]
    async fn test_progress_lists_unearned() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;
        store.record_score(GameKind::Snake, 1, "Ada", Map::new()).await;

        let progress = store.progress();
        assert_eq!(progress.total, 10);
        assert_eq!(progress.earned, 1);
        assert_eq!(progress.percentage, 10.0);
        assert_eq!(progress.available.len(), 9);
        assert!(progress.available.iter().all(|d| d.id != AchievementId::HighScorer));
    }
}
