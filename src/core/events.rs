use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use crate::core::{GameKind, GameStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: Uuid,
    pub event_type: GameEventType,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEventType {
    SessionStarted,
    SessionEnded,
    SessionAbandoned,
    SessionPaused,
    SessionResumed,
    ScoreRecorded,
    HighScore,
    AchievementUnlocked,
}

impl GameEvent {
    pub fn new(event_type: GameEventType, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn session_started(session_id: Uuid, game: GameKind, player: &str) -> Self {
        let data = serde_json::json!({
            "session_id": session_id,
            "game": game.id(),
            "player": player
        });
        Self::new(GameEventType::SessionStarted, data)
    }

    pub fn session_ended(session_id: Uuid, game: GameKind, status: GameStatus, score: u64, seconds: f64) -> Self {
        let data = serde_json::json!({
            "session_id": session_id,
            "game": game.id(),
            "status": status,
            "score": score,
            "seconds": seconds
        });
        Self::new(GameEventType::SessionEnded, data)
    }

    pub fn session_abandoned(session_id: Uuid, game: GameKind) -> Self {
        let data = serde_json::json!({
            "session_id": session_id,
            "game": game.id()
        });
        Self::new(GameEventType::SessionAbandoned, data)
    }

    /// `played_secs` is the active play time when the pause began.
    pub fn session_paused(session_id: Uuid, played_secs: f64) -> Self {
        let data = serde_json::json!({
            "session_id": session_id,
            "played_secs": played_secs
        });
        Self::new(GameEventType::SessionPaused, data)
    }

    pub fn session_resumed(session_id: Uuid, paused_secs: f64) -> Self {
        let data = serde_json::json!({
            "session_id": session_id,
            "paused_secs": paused_secs
        });
        Self::new(GameEventType::SessionResumed, data)
    }

    pub fn score_recorded(game: GameKind, score: u64, player: &str) -> Self {
        let data = serde_json::json!({
            "game": game.id(),
            "score": score,
            "player": player
        });
        Self::new(GameEventType::ScoreRecorded, data)
    }

    pub fn high_score(game: GameKind, score: u64, player: &str) -> Self {
        let data = serde_json::json!({
            "game": game.id(),
            "score": score,
            "player": player
        });
        Self::new(GameEventType::HighScore, data)
    }

    pub fn achievement_unlocked(achievement_id: &str, name: &str) -> Self {
        let data = serde_json::json!({
            "achievement_id": achievement_id,
            "name": name
        });
        Self::new(GameEventType::AchievementUnlocked, data)
    }
}

pub trait GameEventHandler {
    fn handle_event(&mut self, event: &GameEvent);
}

pub struct EventLogger {
    events: Vec<GameEvent>,
    max_events: usize,
}

impl EventLogger {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    pub fn get_events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn get_events_by_type(&self, event_type: &GameEventType) -> Vec<&GameEvent> {
        self.events
            .iter()
            .filter(|event| std::mem::discriminant(&event.event_type) == std::mem::discriminant(event_type))
            .collect()
    }

    pub fn get_recent_events(&self, count: usize) -> Vec<&GameEvent> {
        self.events
            .iter()
            .rev()
            .take(count)
            .collect()
    }

    pub fn export_events(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events)
    }

    pub fn get_event_count(&self) -> usize {
        self.events.len()
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl GameEventHandler for EventLogger {
    fn handle_event(&mut self, event: &GameEvent) {
        self.events.push(event.clone());

        if self.events.len() > self.max_events {
            self.events.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_started_event() {
        let session_id = Uuid::new_v4();
        let event = GameEvent::session_started(session_id, GameKind::Tetris, "Ada");

        assert!(matches!(event.event_type, GameEventType::SessionStarted));
        assert_eq!(event.data["game"], "tetris");
        assert_eq!(event.data["player"], "Ada");
        assert_eq!(event.data["session_id"], session_id.to_string());
    }

    #[test]
    fn test_session_ended_event() {
        let event = GameEvent::session_ended(Uuid::new_v4(), GameKind::Snake, GameStatus::Lost, 120, 42.5);

        assert!(matches!(event.event_type, GameEventType::SessionEnded));
        assert_eq!(event.data["status"], "Lost");
        assert_eq!(event.data["score"], 120);
    }

    #[test]
    fn test_event_logger_drops_oldest() {
        let mut logger = EventLogger::new(3);

        for score in 1..=4 {
            logger.handle_event(&GameEvent::score_recorded(GameKind::Quiz, score, "p"));
        }

        assert_eq!(logger.get_event_count(), 3);
        assert_eq!(logger.get_events()[0].data["score"], 2);
        assert_eq!(logger.get_recent_events(1)[0].data["score"], 4);
    }

    #[test]
    fn test_event_filtering() {
        let mut logger = EventLogger::default();

        logger.handle_event(&GameEvent::score_recorded(GameKind::Memory, 10, "p"));
        logger.handle_event(&GameEvent::achievement_unlocked("first_game", "First Steps"));
        logger.handle_event(&GameEvent::achievement_unlocked("high_scorer", "High Scorer"));

        let unlocked = logger.get_events_by_type(&GameEventType::AchievementUnlocked);
        assert_eq!(unlocked.len(), 2);
        assert!(logger.export_events().unwrap().contains("First Steps"));
    }
}
