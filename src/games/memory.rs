//! Card-matching memory game.

use std::time::Duration;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use crate::config::MemorySettings;
use crate::core::{Engine, GameKind, GameStatus, GameSummary, RenderState};
use tracing::{debug, warn};

const LETTERS: [&str; 18] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
];
const SYMBOLS: [&str; 18] = [
    "★", "♠", "♥", "♦", "♣", "♪", "☀", "☽", "⚡", "❄", "🔥", "💧", "🌟", "⭐", "✨", "💫", "🌙", "☄",
];
const EMOJIS: [&str; 18] = [
    "🎮", "🎯", "🎨", "🎪", "🎭", "🎲", "🎸", "🎹", "🎵", "🎬", "🎤", "🎧", "🎺", "🎻", "🥁", "🎳", "🎠", "🎡",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryTheme {
    Numbers,
    Letters,
    Symbols,
    Emojis,
}

impl MemoryTheme {
    /// Faces for `pairs` distinct pairs, or `None` when the theme is too small.
    pub fn faces(&self, pairs: usize) -> Option<Vec<String>> {
        let faces: Vec<String> = match self {
            MemoryTheme::Numbers => return Some((1..=pairs).map(|n| n.to_string()).collect()),
            MemoryTheme::Letters => LETTERS.iter().map(|s| s.to_string()).collect(),
            MemoryTheme::Symbols => SYMBOLS.iter().map(|s| s.to_string()).collect(),
            MemoryTheme::Emojis => EMOJIS.iter().map(|s| s.to_string()).collect(),
        };
        if faces.len() < pairs {
            return None;
        }
        Some(faces.into_iter().take(pairs).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardState {
    FaceDown,
    Pending,
    Matched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    OutOfRange,
    AlreadyRevealed,
    AlreadyMatched,
    PairPending,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealResult {
    Rejected(RejectReason),
    FirstRevealed,
    /// Two cards are face up; the host calls `resolve_pending` after the
    /// reveal delay.
    PairPending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardView {
    pub state: CardState,
    /// Only present while the card is face up.
    pub face: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryView {
    pub grid_size: usize,
    pub cards: Vec<CardView>,
    pub moves: u32,
    pub matched_pairs: usize,
    pub total_pairs: usize,
    pub status: GameStatus,
}

pub struct MemoryGame {
    grid_size: usize,
    faces: Vec<String>,
    states: Vec<CardState>,
    pending: Vec<usize>,
    moves: u32,
    matched_pairs: usize,
    reveal_delay: Duration,
    terminated: bool,
}

impl MemoryGame {
    pub fn new(settings: &MemorySettings, mut rng: SmallRng) -> Self {
        let grid_size = settings.grid_size;
        let pairs = grid_size * grid_size / 2;
        let values = settings.theme.faces(pairs).unwrap_or_else(|| {
            warn!("Theme {:?} has fewer than {} faces, using numbers", settings.theme, pairs);
            (1..=pairs).map(|n| n.to_string()).collect()
        });

        let mut faces: Vec<String> = values.iter().chain(values.iter()).cloned().collect();
        faces.shuffle(&mut rng);

        Self::with_faces(grid_size, faces, Duration::from_millis(settings.reveal_delay_ms))
    }

    /// Board with a fixed face layout, used for replays and tests.
    pub fn with_faces(grid_size: usize, faces: Vec<String>, reveal_delay: Duration) -> Self {
        let states = vec![CardState::FaceDown; faces.len()];
        Self {
            grid_size,
            faces,
            states,
            pending: Vec::with_capacity(2),
            moves: 0,
            matched_pairs: 0,
            reveal_delay,
            terminated: false,
        }
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    pub fn total_pairs(&self) -> usize {
        self.faces.len() / 2
    }

    pub fn card_state(&self, index: usize) -> Option<CardState> {
        self.states.get(index).copied()
    }

    pub fn reveal_delay(&self) -> Duration {
        self.reveal_delay
    }

    pub fn has_pending_pair(&self) -> bool {
        self.pending.len() == 2
    }

    pub fn is_complete(&self) -> bool {
        self.matched_pairs == self.total_pairs()
    }

    pub fn reveal(&mut self, index: usize) -> RevealResult {
        if self.terminated || self.is_complete() {
            return RevealResult::Rejected(RejectReason::Inactive);
        }
        if self.pending.len() >= 2 {
            return RevealResult::Rejected(RejectReason::PairPending);
        }
        match self.states.get(index) {
            None => return RevealResult::Rejected(RejectReason::OutOfRange),
            Some(CardState::Matched) => return RevealResult::Rejected(RejectReason::AlreadyMatched),
            Some(CardState::Pending) => return RevealResult::Rejected(RejectReason::AlreadyRevealed),
            Some(CardState::FaceDown) => {}
        }

        self.states[index] = CardState::Pending;
        self.pending.push(index);

        if self.pending.len() == 2 {
            RevealResult::PairPending
        } else {
            RevealResult::FirstRevealed
        }
    }

    /// Settles the two face-up cards. Returns whether they matched, or `None`
    /// when no pair is waiting.
    pub fn resolve_pending(&mut self) -> Option<bool> {
        if self.pending.len() != 2 {
            return None;
        }
        let (first, second) = (self.pending[0], self.pending[1]);
        self.pending.clear();
        self.moves += 1;

        let matched = self.faces[first] == self.faces[second];
        let settled = if matched { CardState::Matched } else { CardState::FaceDown };
        self.states[first] = settled;
        self.states[second] = settled;
        if matched {
            self.matched_pairs += 1;
        }
        debug!(
            "Pair {}/{} {} ({} of {} pairs)",
            first,
            second,
            if matched { "matched" } else { "missed" },
            self.matched_pairs,
            self.total_pairs()
        );
        Some(matched)
    }
}

impl Engine for MemoryGame {
    fn kind(&self) -> GameKind {
        GameKind::Memory
    }

    fn score(&self) -> u64 {
        // 100 per pair, 10 off per missed pair check
        let misses = u64::from(self.moves).saturating_sub(self.matched_pairs as u64);
        (self.matched_pairs as u64 * 100).saturating_sub(misses * 10)
    }

    fn status(&self) -> GameStatus {
        if self.terminated {
            GameStatus::Terminated
        } else if self.is_complete() {
            GameStatus::Won
        } else {
            GameStatus::Running
        }
    }

    fn tick_interval(&self) -> Option<Duration> {
        None
    }

    fn render_state(&self) -> RenderState {
        let cards = self
            .faces
            .iter()
            .zip(&self.states)
            .map(|(face, &state)| CardView {
                state,
                face: (state != CardState::FaceDown).then(|| face.clone()),
            })
            .collect();
        RenderState::Memory(MemoryView {
            grid_size: self.grid_size,
            cards,
            moves: self.moves,
            matched_pairs: self.matched_pairs,
            total_pairs: self.total_pairs(),
            status: self.status(),
        })
    }

    fn summary(&self) -> GameSummary {
        let mut summary = GameSummary::new(self.score());
        summary.insert("moves", self.moves);
        summary.insert("grid_size", self.grid_size);
        summary.insert("matched_pairs", self.matched_pairs);
        summary
    }

    fn cleanup(&mut self) {
        self.terminated = true;
        for index in self.pending.drain(..) {
            self.states[index] = CardState::FaceDown;
        }
    }
}
