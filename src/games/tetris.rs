//! Falling-block puzzle: gravity, locking, line clears and level speed-up.

use std::time::Duration;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::config::TetrisSettings;
use crate::core::{Engine, GameKind, GameStatus, GameSummary, Grid, RenderState};
use crate::scores::AchievementContext;
use tracing::{debug, info};

/// Points for 1..=4 simultaneous lines, multiplied by the level.
pub const LINE_SCORES: [u64; 5] = [0, 100, 300, 500, 800];

type Shape = [(i32, i32); 4];

// Offsets are (row, col) inside a 5x5 box anchored at the piece position.
const I_ROTATIONS: &[Shape] = &[
    [(1, 2), (2, 2), (3, 2), (4, 2)],
    [(2, 0), (2, 1), (2, 2), (2, 3)],
];
const O_ROTATIONS: &[Shape] = &[[(2, 1), (2, 2), (3, 1), (3, 2)]];
const T_ROTATIONS: &[Shape] = &[
    [(2, 1), (3, 0), (3, 1), (3, 2)],
    [(2, 1), (3, 1), (3, 2), (4, 1)],
    [(3, 0), (3, 1), (3, 2), (4, 1)],
    [(2, 1), (3, 0), (3, 1), (4, 1)],
];
const S_ROTATIONS: &[Shape] = &[
    [(2, 1), (2, 2), (3, 0), (3, 1)],
    [(1, 1), (2, 1), (2, 2), (3, 2)],
];
const Z_ROTATIONS: &[Shape] = &[
    [(2, 0), (2, 1), (3, 1), (3, 2)],
    [(1, 2), (2, 1), (2, 2), (3, 1)],
];
const J_ROTATIONS: &[Shape] = &[
    [(1, 1), (2, 1), (3, 0), (3, 1)],
    [(2, 0), (3, 0), (3, 1), (3, 2)],
    [(1, 1), (1, 2), (2, 1), (3, 1)],
    [(2, 0), (2, 1), (2, 2), (3, 2)],
];
const L_ROTATIONS: &[Shape] = &[
    [(1, 2), (2, 2), (3, 1), (3, 2)],
    [(2, 0), (2, 1), (2, 2), (3, 0)],
    [(1, 0), (1, 1), (2, 1), (3, 1)],
    [(2, 2), (3, 0), (3, 1), (3, 2)],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    pub fn rotations(&self) -> &'static [Shape] {
        match self {
            PieceKind::I => I_ROTATIONS,
            PieceKind::O => O_ROTATIONS,
            PieceKind::T => T_ROTATIONS,
            PieceKind::S => S_ROTATIONS,
            PieceKind::Z => Z_ROTATIONS,
            PieceKind::J => J_ROTATIONS,
            PieceKind::L => L_ROTATIONS,
        }
    }

    /// Value written into locked board cells so renderers can pick a color.
    pub fn cell_value(&self) -> u32 {
        Self::ALL.iter().position(|k| k == self).unwrap_or(0) as u32 + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub rotation: usize,
    pub row: i32,
    pub col: i32,
}

impl Piece {
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let rotations = self.kind.rotations();
        rotations[self.rotation % rotations.len()]
            .iter()
            .map(move |&(dr, dc)| (self.row + dr, self.col + dc))
    }

    fn shifted(&self, dr: i32, dc: i32) -> Piece {
        Piece {
            row: self.row + dr,
            col: self.col + dc,
            ..*self
        }
    }

    fn rotated(&self) -> Piece {
        Piece {
            rotation: (self.rotation + 1) % self.kind.rotations().len(),
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TetrisCommand {
    Left,
    Right,
    Down,
    Rotate,
    HardDrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TetrisEvent {
    /// Gravity moved the piece one row.
    Fell,
    /// A command moved or rotated the piece.
    Moved,
    /// The command was not applicable; nothing changed.
    Rejected,
    Locked,
    LinesCleared(u32),
    GameOver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TetrisView {
    pub board: Vec<Vec<u32>>,
    pub current: Option<Piece>,
    pub current_cells: Vec<(i32, i32)>,
    pub next: PieceKind,
    pub score: u64,
    pub lines_cleared: u32,
    pub level: u32,
    pub status: GameStatus,
}

pub struct TetrisGame {
    settings: TetrisSettings,
    board: Grid,
    current: Option<Piece>,
    next: PieceKind,
    score: u64,
    lines_cleared: u32,
    level: u32,
    game_over: bool,
    terminated: bool,
    rng: SmallRng,
}

impl TetrisGame {
    pub fn new(settings: &TetrisSettings, mut rng: SmallRng) -> Self {
        let next = PieceKind::ALL[rng.gen_range(0..PieceKind::ALL.len())];
        let mut game = Self {
            settings: settings.clone(),
            board: Grid::new(settings.height, settings.width),
            current: None,
            next,
            score: 0,
            lines_cleared: 0,
            level: 1,
            game_over: false,
            terminated: false,
            rng,
        };
        game.spawn();
        game
    }

    pub fn board(&self) -> &Grid {
        &self.board
    }

    pub fn current(&self) -> Option<Piece> {
        self.current
    }

    pub fn next_kind(&self) -> PieceKind {
        self.next
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn can_place(&self, piece: &Piece) -> bool {
        piece.cells().all(|(row, col)| {
            if col < 0 || col >= self.board.cols() as i32 || row >= self.board.rows() as i32 {
                return false;
            }
            row < 0 || self.board.get(row as usize, col as usize) == 0
        })
    }

    pub fn tick(&mut self) -> TetrisEvent {
        if self.game_over || self.terminated {
            return TetrisEvent::GameOver;
        }
        let Some(piece) = self.current else {
            return TetrisEvent::GameOver;
        };

        let fallen = piece.shifted(1, 0);
        if self.can_place(&fallen) {
            self.current = Some(fallen);
            return TetrisEvent::Fell;
        }
        self.lock()
    }

    pub fn apply(&mut self, command: TetrisCommand) -> TetrisEvent {
        if self.game_over || self.terminated {
            return TetrisEvent::Rejected;
        }
        let Some(piece) = self.current else {
            return TetrisEvent::Rejected;
        };

        let candidate = match command {
            TetrisCommand::Left => piece.shifted(0, -1),
            TetrisCommand::Right => piece.shifted(0, 1),
            TetrisCommand::Down => piece.shifted(1, 0),
            TetrisCommand::Rotate => piece.rotated(),
            TetrisCommand::HardDrop => {
                let mut dropped = piece;
                while self.can_place(&dropped.shifted(1, 0)) {
                    dropped = dropped.shifted(1, 0);
                }
                self.current = Some(dropped);
                return self.lock();
            }
        };

        if self.can_place(&candidate) {
            self.current = Some(candidate);
            TetrisEvent::Moved
        } else {
            TetrisEvent::Rejected
        }
    }

    fn lock(&mut self) -> TetrisEvent {
        let Some(piece) = self.current.take() else {
            return TetrisEvent::GameOver;
        };

        let value = piece.kind.cell_value();
        for (row, col) in piece.cells() {
            if row >= 0 {
                self.board.set(row as usize, col as usize, value);
            }
        }

        let cleared = self.board.clear_full_rows() as u32;
        if cleared > 0 {
            self.score += LINE_SCORES[cleared.min(4) as usize] * u64::from(self.level);
            self.lines_cleared += cleared;
            let level = self.lines_cleared / self.settings.lines_per_level + 1;
            if level != self.level {
                info!("Tetris level {} reached", level);
                self.level = level;
            }
            debug!("Cleared {} lines, score {}", cleared, self.score);
        }

        if !self.spawn() {
            return TetrisEvent::GameOver;
        }

        if cleared > 0 {
            TetrisEvent::LinesCleared(cleared)
        } else {
            TetrisEvent::Locked
        }
    }

    fn spawn(&mut self) -> bool {
        let kind = self.next;
        self.next = PieceKind::ALL[self.rng.gen_range(0..PieceKind::ALL.len())];
        let piece = Piece {
            kind,
            rotation: 0,
            row: 0,
            col: self.board.cols() as i32 / 2 - 2,
        };

        if !self.can_place(&piece) {
            info!("Tetris game over: score {}, lines {}", self.score, self.lines_cleared);
            self.game_over = true;
            self.current = None;
            return false;
        }
        self.current = Some(piece);
        true
    }

    #[cfg(test)]
    fn set_current(&mut self, piece: Piece) {
        self.current = Some(piece);
    }

    #[cfg(test)]
    fn board_mut(&mut self) -> &mut Grid {
        &mut self.board
    }
}

impl Engine for TetrisGame {
    fn kind(&self) -> GameKind {
        GameKind::Tetris
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn status(&self) -> GameStatus {
        if self.terminated {
            GameStatus::Terminated
        } else if self.game_over {
            GameStatus::Lost
        } else {
            GameStatus::Running
        }
    }

    fn tick_interval(&self) -> Option<Duration> {
        if self.game_over || self.terminated {
            return None;
        }
        let s = &self.settings;
        let speedup = s.fall_step_ms * u64::from(self.level.saturating_sub(1));
        Some(Duration::from_millis(s.base_fall_ms.saturating_sub(speedup).max(s.min_fall_ms)))
    }

    fn render_state(&self) -> RenderState {
        RenderState::Tetris(TetrisView {
            board: self.board.to_rows(),
            current: self.current,
            current_cells: self.current.map(|p| p.cells().collect()).unwrap_or_default(),
            next: self.next,
            score: self.score,
            lines_cleared: self.lines_cleared,
            level: self.level,
            status: self.status(),
        })
    }

    fn summary(&self) -> GameSummary {
        let mut summary = GameSummary::new(self.score);
        summary.insert("lines_cleared", self.lines_cleared);
        summary.insert("level", self.level);
        summary.achievements = AchievementContext {
            lines_cleared: Some(self.lines_cleared),
            ..Default::default()
        };
        summary
    }

    fn cleanup(&mut self) {
        self.terminated = true;
    }
}
