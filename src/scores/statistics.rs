use std::collections::BTreeMap;
use std::time::Duration;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate play statistics, keyed by game id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub games_played: BTreeMap<String, u32>,
    /// Seconds per game.
    pub total_time_played: BTreeMap<String, f64>,
    pub first_play_date: Option<DateTime<Utc>>,
    pub last_play_date: Option<DateTime<Utc>>,
    pub total_sessions: u32,
    pub achievements_earned: usize,
    pub unique_play_dates: Vec<NaiveDate>,
}

impl Statistics {
    pub fn record_play(&mut self, game_id: &str, duration: Duration, at: DateTime<Utc>) {
        *self.games_played.entry(game_id.to_string()).or_insert(0) += 1;
        *self.total_time_played.entry(game_id.to_string()).or_insert(0.0) += duration.as_secs_f64();

        if self.first_play_date.is_none() {
            self.first_play_date = Some(at);
        }
        self.last_play_date = Some(at);

        let day = at.date_naive();
        if !self.unique_play_dates.contains(&day) {
            self.unique_play_dates.push(day);
        }
    }

    pub fn total_games_played(&self) -> u32 {
        self.games_played.values().sum()
    }

    pub fn distinct_games_played(&self) -> usize {
        self.games_played.values().filter(|&&count| count > 0).count()
    }

    pub fn unique_play_days(&self) -> usize {
        self.unique_play_dates.len()
    }

    pub fn plays_of(&self, game_id: &str) -> u32 {
        self.games_played.get(game_id).copied().unwrap_or(0)
    }

    pub fn time_played(&self, game_id: &str) -> Duration {
        let seconds = self.total_time_played.get(game_id).copied().unwrap_or(0.0);
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

/// Per-game view combining statistics with the player's best score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStatistics {
    pub games_played: u32,
    pub total_time: Duration,
    pub best_score: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_play_tracks_dates() {
        let mut stats = Statistics::default();
        let morning = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();

        stats.record_play("snake", Duration::from_secs(30), morning);
        stats.record_play("snake", Duration::from_secs(45), evening);
        stats.record_play("quiz", Duration::from_secs(60), next_day);

        assert_eq!(stats.plays_of("snake"), 2);
        assert_eq!(stats.time_played("snake"), Duration::from_secs(75));
        assert_eq!(stats.total_games_played(), 3);
        assert_eq!(stats.distinct_games_played(), 2);
        assert_eq!(stats.unique_play_days(), 2);
        assert_eq!(stats.first_play_date, Some(morning));
        assert_eq!(stats.last_play_date, Some(next_day));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let stats: Statistics = serde_json::from_str(r#"{ "total_sessions": 4 }"#).unwrap();
        assert_eq!(stats.total_sessions, 4);
        assert!(stats.games_played.is_empty());
        assert!(stats.unique_play_dates.is_empty());
    }
}
