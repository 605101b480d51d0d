//! Snake with food, timed power-ups and level-based speed.

use std::collections::VecDeque;
use std::time::Duration;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::config::SnakeSettings;
use crate::core::{Direction, Engine, GameKind, GameStatus, GameSummary, RenderState};
use crate::scores::AchievementContext;
use tracing::debug;

const SPEED_BOOST_TICKS: u32 = 100;
const DOUBLE_SCORE_TICKS: u32 = 150;
const EXTRA_FOOD_BONUS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn step(&self, direction: Direction) -> Point {
        let (dx, dy) = direction.delta();
        Point::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    SpeedBoost,
    ScoreMultiplier,
    ExtraFood,
}

impl PowerUpKind {
    pub fn all() -> [PowerUpKind; 3] {
        [PowerUpKind::SpeedBoost, PowerUpKind::ScoreMultiplier, PowerUpKind::ExtraFood]
    }

    pub fn points(&self) -> u64 {
        match self {
            PowerUpKind::SpeedBoost => 20,
            PowerUpKind::ScoreMultiplier => 30,
            PowerUpKind::ExtraFood => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUp {
    pub position: Point,
    pub kind: PowerUpKind,
    pub ticks_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnakeEvent {
    Moved,
    AteFood,
    CollectedPowerUp(PowerUpKind),
    Collided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub speed_boost: u32,
    pub double_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnakeView {
    pub width: i32,
    pub height: i32,
    pub body: Vec<Point>,
    pub heading: Direction,
    pub food: Option<Point>,
    pub power_ups: Vec<PowerUp>,
    pub effects: ActiveEffects,
    pub score: u64,
    pub level: u32,
    pub status: GameStatus,
}

pub struct SnakeGame {
    settings: SnakeSettings,
    body: VecDeque<Point>,
    heading: Direction,
    pending_turns: Vec<Direction>,
    food: Option<Point>,
    power_ups: Vec<PowerUp>,
    effects: ActiveEffects,
    score: u64,
    level: u32,
    food_eaten: u32,
    collided: bool,
    terminated: bool,
    rng: SmallRng,
}

impl SnakeGame {
    pub fn new(settings: &SnakeSettings, rng: SmallRng) -> Self {
        let cx = settings.width / 2;
        let cy = settings.height / 2;
        let body = (0..3).map(|i| Point::new(cx - i, cy)).collect();

        let mut game = Self {
            settings: settings.clone(),
            body,
            heading: Direction::Right,
            pending_turns: Vec::new(),
            food: None,
            power_ups: Vec::new(),
            effects: ActiveEffects::default(),
            score: 0,
            level: 1,
            food_eaten: 0,
            collided: false,
            terminated: false,
            rng,
        };
        game.food = game.random_free_cell(false);
        game
    }

    pub fn body(&self) -> impl Iterator<Item = &Point> {
        self.body.iter()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn head(&self) -> Point {
        self.body[0]
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn food(&self) -> Option<Point> {
        self.food
    }

    pub fn power_ups(&self) -> &[PowerUp] {
        &self.power_ups
    }

    pub fn effects(&self) -> ActiveEffects {
        self.effects
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Buffers a turn; it is resolved against the heading on the next tick.
    pub fn steer(&mut self, direction: Direction) -> bool {
        if self.collided || self.terminated {
            return false;
        }
        self.pending_turns.push(direction);
        true
    }

    pub fn tick(&mut self) -> SnakeEvent {
        if self.collided || self.terminated {
            return SnakeEvent::Collided;
        }

        let heading = self.heading;
        if let Some(turn) = self
            .pending_turns
            .drain(..)
            .rev()
            .find(|turn| *turn != heading.opposite())
        {
            self.heading = turn;
        }

        let new_head = self.head().step(self.heading);
        if !self.in_bounds(new_head) || self.body.contains(&new_head) {
            debug!("Snake collided at {:?} with score {}", new_head, self.score);
            self.collided = true;
            return SnakeEvent::Collided;
        }

        self.body.push_front(new_head);

        let mut event = SnakeEvent::Moved;
        if self.food == Some(new_head) {
            self.score += self.settings.food_points * self.multiplier();
            self.food_eaten += 1;
            self.food = self.random_free_cell(false);
            event = SnakeEvent::AteFood;
        } else {
            self.body.pop_back();
        }

        if let Some(index) = self.power_ups.iter().position(|p| p.position == new_head) {
            let power_up = self.power_ups.remove(index);
            self.collect(power_up.kind);
            event = SnakeEvent::CollectedPowerUp(power_up.kind);
        }

        self.age_power_ups();
        self.maybe_spawn_power_up();
        self.update_level();

        event
    }

    fn collect(&mut self, kind: PowerUpKind) {
        let multiplier = self.multiplier();
        self.score += kind.points() * multiplier;
        match kind {
            PowerUpKind::SpeedBoost => self.effects.speed_boost = SPEED_BOOST_TICKS,
            PowerUpKind::ScoreMultiplier => self.effects.double_score = DOUBLE_SCORE_TICKS,
            PowerUpKind::ExtraFood => self.score += EXTRA_FOOD_BONUS * multiplier,
        }
        debug!("Collected {:?}, score {}", kind, self.score);
    }

    fn age_power_ups(&mut self) {
        for power_up in &mut self.power_ups {
            power_up.ticks_left = power_up.ticks_left.saturating_sub(1);
        }
        self.power_ups.retain(|p| p.ticks_left > 0);

        self.effects.speed_boost = self.effects.speed_boost.saturating_sub(1);
        self.effects.double_score = self.effects.double_score.saturating_sub(1);
    }

    fn maybe_spawn_power_up(&mut self) {
        if self.power_ups.len() >= self.settings.max_power_ups {
            return;
        }
        if !self.rng.gen_bool(self.settings.power_up_chance) {
            return;
        }
        if let Some(position) = self.random_free_cell(true) {
            let kinds = PowerUpKind::all();
            let kind = kinds[self.rng.gen_range(0..kinds.len())];
            self.power_ups.push(PowerUp {
                position,
                kind,
                ticks_left: self.settings.power_up_lifetime,
            });
        }
    }

    fn update_level(&mut self) {
        let level = (self.score / self.settings.points_per_level) as u32 + 1;
        if level != self.level {
            debug!("Snake level {} -> {}", self.level, level);
            self.level = level;
        }
    }

    fn multiplier(&self) -> u64 {
        if self.effects.double_score > 0 {
            2
        } else {
            1
        }
    }

    fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0 && point.y >= 0 && point.x < self.settings.width && point.y < self.settings.height
    }

    /// Uniform pick among cells free of the snake and power-ups; with
    /// `avoid_food` the food cell is excluded too.
    fn random_free_cell(&mut self, avoid_food: bool) -> Option<Point> {
        let free: Vec<Point> = (0..self.settings.height)
            .flat_map(|y| (0..self.settings.width).map(move |x| Point::new(x, y)))
            .filter(|p| !self.body.contains(p))
            .filter(|p| !self.power_ups.iter().any(|pu| pu.position == *p))
            .filter(|p| !(avoid_food && self.food == Some(*p)))
            .collect();
        if free.is_empty() {
            return None;
        }
        Some(free[self.rng.gen_range(0..free.len())])
    }

    #[cfg(test)]
    fn place_food(&mut self, point: Point) {
        self.food = Some(point);
    }

    #[cfg(test)]
    fn place_power_up(&mut self, point: Point, kind: PowerUpKind) {
        self.power_ups.push(PowerUp {
            position: point,
            kind,
            ticks_left: self.settings.power_up_lifetime,
        });
    }
}

impl Engine for SnakeGame {
    fn kind(&self) -> GameKind {
        GameKind::Snake
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn status(&self) -> GameStatus {
        if self.terminated {
            GameStatus::Terminated
        } else if self.collided {
            GameStatus::Lost
        } else {
            GameStatus::Running
        }
    }

    fn tick_interval(&self) -> Option<Duration> {
        if self.collided || self.terminated {
            return None;
        }
        let s = &self.settings;
        let slowdown = s.interval_step_ms * u64::from(self.level.saturating_sub(1));
        let mut interval = s.base_interval_ms.saturating_sub(slowdown).max(s.min_interval_ms);
        if self.effects.speed_boost > 0 {
            interval = (interval / 2).max(s.min_interval_ms);
        }
        Some(Duration::from_millis(interval))
    }

    fn render_state(&self) -> RenderState {
        RenderState::Snake(SnakeView {
            width: self.settings.width,
            height: self.settings.height,
            body: self.body.iter().copied().collect(),
            heading: self.heading,
            food: self.food,
            power_ups: self.power_ups.clone(),
            effects: self.effects,
            score: self.score,
            level: self.level,
            status: self.status(),
        })
    }

    fn summary(&self) -> GameSummary {
        let mut summary = GameSummary::new(self.score);
        summary.insert("length", self.body.len());
        summary.insert("level", self.level);
        summary.insert("food_eaten", self.food_eaten);
        summary.achievements = AchievementContext {
            score: Some(self.score),
            ..Default::default()
        };
        summary
    }

    fn cleanup(&mut self) {
        self.terminated = true;
        self.pending_turns.clear();
    }
}
