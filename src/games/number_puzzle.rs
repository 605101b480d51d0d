//! Sliding-tile number puzzle (2048 rules).

use std::time::Duration;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::config::NumberPuzzleSettings;
use crate::core::{Direction, Engine, GameKind, GameStatus, GameSummary, Grid, RenderState};
use crate::scores::AchievementContext;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveResult {
    pub moved: bool,
    pub score_delta: u64,
}

#[derive(Debug, Clone)]
struct Snapshot {
    board: Grid,
    score: u64,
    moves: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberPuzzleView {
    pub board: Vec<Vec<u32>>,
    pub score: u64,
    pub moves: u32,
    pub highest_tile: u32,
    pub can_undo: bool,
    pub status: GameStatus,
}

pub struct NumberPuzzle {
    board: Grid,
    score: u64,
    moves: u32,
    target: u32,
    four_probability: f64,
    previous: Option<Snapshot>,
    terminated: bool,
    rng: SmallRng,
}

impl NumberPuzzle {
    pub fn new(settings: &NumberPuzzleSettings, rng: SmallRng) -> Self {
        let mut puzzle = Self {
            board: Grid::new(settings.grid_size, settings.grid_size),
            score: 0,
            moves: 0,
            target: settings.target_tile,
            four_probability: settings.four_probability,
            previous: None,
            terminated: false,
            rng,
        };
        puzzle.spawn_tile();
        puzzle.spawn_tile();
        puzzle
    }

    /// Starts from a fixed board instead of two random tiles.
    pub fn with_board(settings: &NumberPuzzleSettings, board: Grid, rng: SmallRng) -> Self {
        Self {
            board,
            score: 0,
            moves: 0,
            target: settings.target_tile,
            four_probability: settings.four_probability,
            previous: None,
            terminated: false,
            rng,
        }
    }

    pub fn board(&self) -> &Grid {
        &self.board
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn highest_tile(&self) -> u32 {
        self.board.max_value()
    }

    pub fn can_undo(&self) -> bool {
        self.previous.is_some() && !self.terminated
    }

    pub fn slide(&mut self, direction: Direction) -> MoveResult {
        if self.terminated || self.status() == GameStatus::Lost {
            return MoveResult::default();
        }

        let before = Snapshot {
            board: self.board.clone(),
            score: self.score,
            moves: self.moves,
        };

        let mut score_delta = 0;
        let mut moved = false;
        for line in self.lines(direction) {
            let values: Vec<u32> = line.iter().map(|&(r, c)| self.board.get(r, c)).collect();
            let (merged, gained) = merge_line(&values);
            if merged != values {
                moved = true;
                for (&(r, c), value) in line.iter().zip(merged) {
                    self.board.set(r, c, value);
                }
            }
            score_delta += gained;
        }

        if !moved {
            return MoveResult::default();
        }

        self.previous = Some(before);
        self.score += score_delta;
        self.moves += 1;
        self.spawn_tile();
        debug!("Slid {:?}: +{} (score {})", direction, score_delta, self.score);

        MoveResult { moved, score_delta }
    }

    /// Restores the board from before the last successful move. Works once
    /// per move.
    pub fn undo(&mut self) -> bool {
        if self.terminated {
            return false;
        }
        match self.previous.take() {
            Some(snapshot) => {
                self.board = snapshot.board;
                self.score = snapshot.score;
                self.moves = snapshot.moves;
                true
            }
            None => false,
        }
    }

    pub fn has_won(&self) -> bool {
        self.board.max_value() >= self.target
    }

    /// Full board and no orthogonal neighbours with equal values.
    pub fn is_stuck(&self) -> bool {
        if !self.board.is_full() {
            return false;
        }
        for r in 0..self.board.rows() {
            for c in 0..self.board.cols() {
                let value = self.board.get(r, c);
                if c + 1 < self.board.cols() && self.board.get(r, c + 1) == value {
                    return false;
                }
                if r + 1 < self.board.rows() && self.board.get(r + 1, c) == value {
                    return false;
                }
            }
        }
        true
    }

    fn spawn_tile(&mut self) {
        let empty = self.board.empty_cells();
        if empty.is_empty() {
            return;
        }
        let (r, c) = empty[self.rng.gen_range(0..empty.len())];
        let value = if self.rng.gen_bool(self.four_probability) { 4 } else { 2 };
        self.board.set(r, c, value);
    }

    /// Cell coordinates of every row/column, ordered in the direction of motion.
    fn lines(&self, direction: Direction) -> Vec<Vec<(usize, usize)>> {
        let rows = self.board.rows();
        let cols = self.board.cols();
        match direction {
            Direction::Left => (0..rows).map(|r| (0..cols).map(|c| (r, c)).collect()).collect(),
            Direction::Right => (0..rows).map(|r| (0..cols).rev().map(|c| (r, c)).collect()).collect(),
            Direction::Up => (0..cols).map(|c| (0..rows).map(|r| (r, c)).collect()).collect(),
            Direction::Down => (0..cols).map(|c| (0..rows).rev().map(|r| (r, c)).collect()).collect(),
        }
    }
}

/// Compacts a line towards index 0, merging equal neighbours once.
pub fn merge_line(line: &[u32]) -> (Vec<u32>, u64) {
    let tiles: Vec<u32> = line.iter().copied().filter(|&v| v != 0).collect();
    let mut merged = Vec::with_capacity(line.len());
    let mut gained = 0u64;
    let mut i = 0;
    while i < tiles.len() {
        if i + 1 < tiles.len() && tiles[i] == tiles[i + 1] {
            let value = tiles[i] * 2;
            merged.push(value);
            gained += value as u64;
            i += 2;
        } else {
            merged.push(tiles[i]);
            i += 1;
        }
    }
    merged.resize(line.len(), 0);
    (merged, gained)
}

impl Engine for NumberPuzzle {
    fn kind(&self) -> GameKind {
        GameKind::NumberPuzzle
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn status(&self) -> GameStatus {
        if self.terminated {
            GameStatus::Terminated
        } else if self.has_won() {
            GameStatus::Won
        } else if self.is_stuck() {
            GameStatus::Lost
        } else {
            GameStatus::Running
        }
    }

    fn tick_interval(&self) -> Option<Duration> {
        None
    }

    fn render_state(&self) -> RenderState {
        RenderState::NumberPuzzle(NumberPuzzleView {
            board: self.board.to_rows(),
            score: self.score,
            moves: self.moves,
            highest_tile: self.highest_tile(),
            can_undo: self.can_undo(),
            status: self.status(),
        })
    }

    fn summary(&self) -> GameSummary {
        let mut summary = GameSummary::new(self.score);
        summary.insert("moves", self.moves);
        summary.insert("highest_tile", self.highest_tile());
        summary.achievements = AchievementContext {
            highest_tile: Some(self.highest_tile()),
            ..Default::default()
        };
        summary
    }

    fn cleanup(&mut self) {
        self.terminated = true;
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    fn puzzle_from(rows: Vec<Vec<u32>>) -> NumberPuzzle {
        NumberPuzzle::with_board(
            &NumberPuzzleSettings::default(),
            Grid::from_rows(rows).unwrap(),
            SmallRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_merge_line_example() {
        assert_eq!(merge_line(&[2, 2, 0, 4]), (vec![4, 4, 0, 0], 4));
    }

    #[test]
    fn test_merge_line_merges_each_tile_once() {
        assert_eq!(merge_line(&[2, 2, 2, 2]), (vec![4, 4, 0, 0], 8));
        assert_eq!(merge_line(&[4, 4, 8, 0]), (vec![8, 8, 0, 0], 8));
        assert_eq!(merge_line(&[2, 0, 2, 2]), (vec![4, 2, 0, 0], 4));
    }

    #[test]
    fn test_new_game_has_two_tiles() {
        let puzzle = NumberPuzzle::new(&NumberPuzzleSettings::default(), SmallRng::seed_from_u64(1));
        assert_eq!(puzzle.board().occupied_count(), 2);
        assert_eq!(puzzle.status(), GameStatus::Running);
    }

    #[test]
    fn test_slide_left_spawns_one_tile() {
        let mut puzzle = puzzle_from(vec![
            vec![2, 2, 0, 4],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);

        let result = puzzle.slide(Direction::Left);
        assert!(result.moved);
        assert_eq!(result.score_delta, 4);
        assert_eq!(&puzzle.board().row(0)[..2], &[4, 4]);
        // three tiles merged into two, plus the spawn
        assert_eq!(puzzle.board().occupied_count(), 3);
        // sum grows only by the spawned 2 or 4
        let spawned = puzzle.board().sum() - 8;
        assert!(spawned == 2 || spawned == 4);
        assert_eq!(puzzle.score(), 4);
        assert_eq!(puzzle.moves(), 1);
    }

    #[test]
    fn test_slide_without_change_is_not_a_move() {
        let mut puzzle = puzzle_from(vec![
            vec![2, 4, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);

        let result = puzzle.slide(Direction::Left);
        assert!(!result.moved);
        assert_eq!(puzzle.board().occupied_count(), 2);
        assert!(!puzzle.can_undo());
    }

    #[test]
    fn test_slide_down_and_right() {
        let mut puzzle = puzzle_from(vec![
            vec![2, 0, 0, 0],
            vec![2, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        assert_eq!(puzzle.slide(Direction::Down).score_delta, 4);
        assert_eq!(puzzle.board().get(3, 0), 4);

        let mut puzzle = puzzle_from(vec![
            vec![0, 0, 0, 0],
            vec![8, 8, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        assert_eq!(puzzle.slide(Direction::Right).score_delta, 16);
        assert_eq!(puzzle.board().get(1, 3), 16);
    }

    #[test]
    fn test_full_board_without_pairs_is_lost() {
        let puzzle = puzzle_from(vec![
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 2],
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 2],
        ]);
        assert_eq!(puzzle.status(), GameStatus::Lost);
    }

    #[test]
    fn test_full_board_with_pair_is_running() {
        let puzzle = puzzle_from(vec![
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 2],
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 4],
        ]);
        assert_eq!(puzzle.status(), GameStatus::Running);
    }

    #[test]
    fn test_target_tile_wins_even_when_full() {
        let puzzle = puzzle_from(vec![
            vec![2048, 4, 2, 4],
            vec![4, 2, 4, 2],
            vec![2, 4, 2, 4],
            vec![4, 2, 4, 2],
        ]);
        assert_eq!(puzzle.status(), GameStatus::Won);
    }

    #[test]
    fn test_undo_restores_once() {
        let mut puzzle = puzzle_from(vec![
            vec![2, 2, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        let before = puzzle.board().clone();

        assert!(puzzle.slide(Direction::Left).moved);
        assert!(puzzle.undo());
        assert_eq!(puzzle.board(), &before);
        assert_eq!(puzzle.score(), 0);
        assert_eq!(puzzle.moves(), 0);
        assert!(!puzzle.undo());
    }

    #[test]
    fn test_cleanup_rejects_moves() {
        let mut puzzle = puzzle_from(vec![
            vec![2, 2, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 0],
        ]);
        puzzle.cleanup();
        assert!(!puzzle.slide(Direction::Left).moved);
        assert_eq!(puzzle.status(), GameStatus::Terminated);
    }
}
