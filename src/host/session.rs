use std::time::Duration;
use serde::Serialize;
use uuid::Uuid;
use crate::core::{
    CommandOutcome, Engine, EngineConfig, EventLogger, GameCommand, GameEngine, GameEvent, GameEventHandler,
    GameKind, GameStatus, RenderState, TickOutcome,
};
use crate::games::memory::RevealResult;
use crate::host::scheduler::{FiredTimer, Scheduler, SessionToken, TimerId, TimerKind};
use crate::scores::{Achievement, AchievementId, ScoreStore};
use crate::utils::{GameError, GameResult};
use tracing::{debug, info};

/// What a fired timer did to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerOutcome {
    Tick(TickOutcome),
    Command(CommandOutcome),
    /// The timer belonged to another session or was superseded.
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub game: GameKind,
    pub player: String,
    pub status: GameStatus,
    pub score: u64,
    pub duration: Duration,
    pub high_score: bool,
    pub new_achievements: Vec<Achievement>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub events: Vec<GameEvent>,
}

/// One live engine together with its scheduler token.
pub struct GameSession {
    id: Uuid,
    engine: GameEngine,
    token: SessionToken,
    player: String,
    started_at: Duration,
    paused_at: Option<Duration>,
    paused_total: Duration,
    /// A pair check came due while paused and runs on resume.
    deferred_resolve: bool,
    speedster_target: Duration,
    tick_timer: Option<TimerId>,
    events: EventLogger,
}

impl GameSession {
    pub fn start(kind: GameKind, config: &EngineConfig, player: &str, scheduler: &mut Scheduler) -> GameResult<Self> {
        let engine = GameEngine::create(kind, config)?;
        let token = scheduler.begin_session();

        let mut session = Self {
            id: Uuid::new_v4(),
            engine,
            token,
            player: player.to_string(),
            started_at: scheduler.now(),
            paused_at: None,
            paused_total: Duration::ZERO,
            deferred_resolve: false,
            speedster_target: Duration::from_secs(config.settings.memory.speedster_target_secs),
            tick_timer: None,
            events: EventLogger::default(),
        };
        session.sync_tick(scheduler);
        session
            .events
            .handle_event(&GameEvent::session_started(session.id, kind, player));

        info!("Session {} started: {} for {}", session.id, kind, player);
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> GameKind {
        self.engine.kind()
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn status(&self) -> GameStatus {
        self.engine.status()
    }

    pub fn score(&self) -> u64 {
        self.engine.score()
    }

    pub fn render_state(&self) -> RenderState {
        self.engine.render_state()
    }

    pub fn events(&self) -> &EventLogger {
        &self.events
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Active play time. Paused spans are not counted.
    pub fn elapsed(&self, scheduler: &Scheduler) -> Duration {
        let now = scheduler.now();
        let paused_now = self.paused_at.map_or(Duration::ZERO, |at| now.saturating_sub(at));
        now.saturating_sub(self.started_at)
            .saturating_sub(self.paused_total)
            .saturating_sub(paused_now)
    }

    /// Freezes a running game: its tick timer is cancelled and commands are
    /// refused until `resume`.
    pub fn pause(&mut self, scheduler: &mut Scheduler) -> GameResult<()> {
        if self.is_paused() {
            return Err(GameError::engine("session is already paused"));
        }
        if self.status().is_terminal() {
            return Err(GameError::engine(format!("cannot pause a finished {} game", self.kind())));
        }

        if let Some(id) = self.tick_timer.take() {
            scheduler.cancel(id);
        }
        let played = self.elapsed(scheduler);
        self.paused_at = Some(scheduler.now());
        self.events
            .handle_event(&GameEvent::session_paused(self.id, played.as_secs_f64()));
        info!("Session {} paused after {:.1}s", self.id, played.as_secs_f64());
        Ok(())
    }

    pub fn resume(&mut self, scheduler: &mut Scheduler) -> GameResult<()> {
        let Some(paused_at) = self.paused_at.take() else {
            return Err(GameError::engine("session is not paused"));
        };

        let paused_for = scheduler.now().saturating_sub(paused_at);
        self.paused_total += paused_for;
        if std::mem::take(&mut self.deferred_resolve) {
            scheduler.schedule(self.token, TimerKind::MemoryResolve, Duration::ZERO);
        }
        self.sync_tick(scheduler);
        self.events
            .handle_event(&GameEvent::session_resumed(self.id, paused_for.as_secs_f64()));
        info!("Session {} resumed after a {:.1}s pause", self.id, paused_for.as_secs_f64());
        Ok(())
    }

    pub fn command(&mut self, command: GameCommand, scheduler: &mut Scheduler) -> CommandOutcome {
        if self.is_paused() {
            debug!("Session {} paused, holding back {:?}", self.id, command);
            return CommandOutcome::Paused;
        }
        let outcome = self.engine.apply(command);

        if outcome == CommandOutcome::Revealed(RevealResult::PairPending) {
            if let Some(delay) = self.engine.pending_resolve_delay() {
                scheduler.schedule(self.token, TimerKind::MemoryResolve, delay);
            }
        }
        self.sync_tick(scheduler);
        outcome
    }

    pub fn handle_timer(&mut self, fired: FiredTimer, scheduler: &mut Scheduler) -> TimerOutcome {
        if fired.token != self.token || !scheduler.is_live(self.token) {
            debug!("Session {} ignoring foreign timer {:?}", self.id, fired.id);
            return TimerOutcome::Ignored;
        }

        match fired.kind {
            TimerKind::EngineTick | TimerKind::QuizCountdown => {
                if self.tick_timer != Some(fired.id) {
                    return TimerOutcome::Ignored;
                }
                self.tick_timer = None;
                let outcome = self.engine.tick();
                self.sync_tick(scheduler);
                TimerOutcome::Tick(outcome)
            }
            TimerKind::MemoryResolve if self.is_paused() => {
                self.deferred_resolve = true;
                TimerOutcome::Ignored
            }
            TimerKind::MemoryResolve => {
                let outcome = self.engine.apply(GameCommand::ResolvePending);
                TimerOutcome::Command(outcome)
            }
        }
    }

    /// Ends the session: cancels its timers, records score, statistics and
    /// achievements, and consumes the engine.
    pub async fn finish(mut self, scheduler: &mut Scheduler, store: &mut ScoreStore) -> SessionReport {
        scheduler.cancel_session(self.token);
        let kind = self.kind();
        let status = self.engine.status();
        let duration = self.elapsed(scheduler);
        let summary = self.engine.summary();
        self.engine.cleanup();

        let already_earned: Vec<String> = store.achievements().iter().map(|a| a.id.clone()).collect();

        let high_score = store
            .record_score(kind, summary.score, &self.player, summary.metadata.clone())
            .await;
        self.events
            .handle_event(&GameEvent::score_recorded(kind, summary.score, &self.player));
        if high_score {
            self.events
                .handle_event(&GameEvent::high_score(kind, summary.score, &self.player));
        }

        store.update_statistics(kind, duration).await;

        let mut context = summary.achievements.clone();
        if kind == GameKind::Memory && status == GameStatus::Won {
            context = context.with_elapsed(duration, self.speedster_target);
        }
        store.check_achievement(game_achievement(kind), &context).await;
        store.check_achievement(AchievementId::Speedster, &context).await;

        let new_achievements: Vec<Achievement> = store
            .achievements()
            .iter()
            .filter(|a| !already_earned.contains(&a.id))
            .cloned()
            .collect();
        for achievement in &new_achievements {
            self.events
                .handle_event(&GameEvent::achievement_unlocked(&achievement.id, &achievement.name));
        }

        self.events.handle_event(&GameEvent::session_ended(
            self.id,
            kind,
            status,
            summary.score,
            duration.as_secs_f64(),
        ));
        info!(
            "Session {} finished: {} scored {} ({:?}, {:.1}s)",
            self.id,
            kind,
            summary.score,
            status,
            duration.as_secs_f64()
        );

        SessionReport {
            session_id: self.id,
            game: kind,
            player: self.player,
            status,
            score: summary.score,
            duration,
            high_score,
            new_achievements,
            metadata: summary.metadata,
            events: self.events.get_events().to_vec(),
        }
    }

    /// Discards the session without recording anything.
    pub fn abandon(mut self, scheduler: &mut Scheduler) {
        let cancelled = scheduler.cancel_session(self.token);
        self.engine.cleanup();
        self.events
            .handle_event(&GameEvent::session_abandoned(self.id, self.kind()));
        info!("Session {} abandoned ({} timers cancelled)", self.id, cancelled);
    }

    /// Keeps exactly one tick timer pending while the engine is timed.
    fn sync_tick(&mut self, scheduler: &mut Scheduler) {
        if self.is_paused() {
            return;
        }
        match (self.engine.tick_interval(), self.tick_timer) {
            (Some(interval), None) => {
                let kind = match self.engine.kind() {
                    GameKind::Quiz => TimerKind::QuizCountdown,
                    _ => TimerKind::EngineTick,
                };
                self.tick_timer = scheduler.schedule(self.token, kind, interval);
            }
            (None, Some(id)) => {
                scheduler.cancel(id);
                self.tick_timer = None;
            }
            _ => {}
        }
    }
}

fn game_achievement(kind: GameKind) -> AchievementId {
    match kind {
        GameKind::Quiz => AchievementId::QuizMaster,
        GameKind::Snake => AchievementId::SnakeCharmer,
        GameKind::Memory => AchievementId::MemoryExpert,
        GameKind::Tetris => AchievementId::TetrisChampion,
        GameKind::NumberPuzzle => AchievementId::PuzzleSolver,
    }
}
