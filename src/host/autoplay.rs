//! Headless driver that plays a whole session through the host API only:
//! it reads `render_state`, issues commands and pumps the scheduler.

use std::collections::HashMap;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use crate::core::{Direction, EngineConfig, GameCommand, GameKind, Grid, QuizCommand, RenderState};
use crate::games::memory::{CardState, MemoryView};
use crate::games::quiz::{Lifeline, QuizPhase, QuizView};
use crate::games::snake::{Point, SnakeView};
use crate::games::tetris::{Piece, TetrisCommand, TetrisView};
use crate::host::scheduler::Scheduler;
use crate::host::session::{GameSession, SessionReport};
use crate::scores::ScoreStore;
use crate::utils::GameResult;
use tracing::{debug, info};

/// Plays `kind` until the game ends or `max_steps` decisions were made, then
/// finishes the session against `store`.
pub async fn autoplay(
    kind: GameKind,
    config: &EngineConfig,
    player: &str,
    store: &mut ScoreStore,
    max_steps: usize,
) -> GameResult<SessionReport> {
    let mut scheduler = Scheduler::new();
    let mut session = GameSession::start(kind, config, player, &mut scheduler)?;
    let mut pilot = Pilot::new(config.seed);

    let mut steps = 0;
    while steps < max_steps && !session.status().is_terminal() {
        steps += 1;
        pilot.step(&mut session, &mut scheduler);
    }

    info!("Autoplay of {} stopped after {} steps ({:?})", kind, steps, session.status());
    Ok(session.finish(&mut scheduler, store).await)
}

struct Pilot {
    rng: SmallRng,
    /// Memory faces seen so far, by card index.
    seen: HashMap<usize, String>,
}

impl Pilot {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(1)),
            None => SmallRng::from_entropy(),
        };
        Self {
            rng,
            seen: HashMap::new(),
        }
    }

    fn step(&mut self, session: &mut GameSession, scheduler: &mut Scheduler) {
        match session.render_state() {
            RenderState::NumberPuzzle(_) => self.slide(session, scheduler),
            RenderState::Snake(view) => {
                if let Some(direction) = snake_direction(&view) {
                    session.command(GameCommand::Steer(direction), scheduler);
                }
                pump(session, scheduler);
            }
            RenderState::Tetris(view) => {
                self.drop_piece(&view, session, scheduler);
                pump(session, scheduler);
            }
            RenderState::Memory(view) => {
                self.flip_pair(view, session, scheduler);
                pump(session, scheduler);
            }
            RenderState::Quiz(view) => self.answer(&view, session, scheduler),
        }
    }

    fn slide(&mut self, session: &mut GameSession, scheduler: &mut Scheduler) {
        for direction in [Direction::Down, Direction::Left, Direction::Right, Direction::Up] {
            if session.command(GameCommand::Slide(direction), scheduler).is_accepted() {
                return;
            }
        }
    }

    fn drop_piece(&mut self, view: &TetrisView, session: &mut GameSession, scheduler: &mut Scheduler) {
        let (Some(piece), Some((rotation, col))) = (view.current, plan_tetris(view)) else {
            return;
        };

        let rotations = piece.kind.rotations().len();
        let turns = (rotation + rotations - piece.rotation % rotations) % rotations;
        for _ in 0..turns {
            session.command(GameCommand::Tetris(TetrisCommand::Rotate), scheduler);
        }

        let shift = if col < piece.col { TetrisCommand::Left } else { TetrisCommand::Right };
        for _ in 0..(col - piece.col).abs() {
            if !session.command(GameCommand::Tetris(shift), scheduler).is_accepted() {
                break;
            }
        }
        session.command(GameCommand::Tetris(TetrisCommand::HardDrop), scheduler);
    }

    fn flip_pair(&mut self, view: MemoryView, session: &mut GameSession, scheduler: &mut Scheduler) {
        self.remember(&view);
        let face_down: Vec<usize> = view
            .cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.state == CardState::FaceDown)
            .map(|(i, _)| i)
            .collect();

        if let Some((a, b)) = self.known_pair(&face_down) {
            session.command(GameCommand::Reveal(a), scheduler);
            session.command(GameCommand::Reveal(b), scheduler);
            return;
        }

        let Some(&first) = face_down
            .iter()
            .find(|&&i| !self.seen.contains_key(&i))
            .or_else(|| face_down.first())
        else {
            return;
        };
        session.command(GameCommand::Reveal(first), scheduler);
        if let RenderState::Memory(view) = session.render_state() {
            self.remember(&view);
        }

        let face = self.seen.get(&first).cloned();
        let partner = face_down
            .iter()
            .copied()
            .filter(|&i| i != first)
            .find(|i| self.seen.get(i).is_some() && self.seen.get(i) == face.as_ref())
            .or_else(|| face_down.iter().copied().find(|&i| i != first && !self.seen.contains_key(&i)))
            .or_else(|| face_down.iter().copied().find(|&i| i != first));
        if let Some(second) = partner {
            session.command(GameCommand::Reveal(second), scheduler);
        }
    }

    fn remember(&mut self, view: &MemoryView) {
        for (index, card) in view.cards.iter().enumerate() {
            if let Some(face) = &card.face {
                self.seen.insert(index, face.clone());
            }
        }
    }

    fn known_pair(&self, face_down: &[usize]) -> Option<(usize, usize)> {
        for (n, &a) in face_down.iter().enumerate() {
            let Some(face) = self.seen.get(&a) else { continue };
            if let Some(&b) = face_down[n + 1..].iter().find(|&&b| self.seen.get(&b) == Some(face)) {
                return Some((a, b));
            }
        }
        None
    }

    fn answer(&mut self, view: &QuizView, session: &mut GameSession, scheduler: &mut Scheduler) {
        match view.phase {
            QuizPhase::Displayed => {
                if view.lifelines.fifty_fifty && self.rng.gen_bool(0.3) {
                    session.command(GameCommand::Quiz(QuizCommand::UseLifeline(Lifeline::FiftyFifty)), scheduler);
                }
                let enabled: Vec<usize> = match session.render_state() {
                    RenderState::Quiz(view) => view
                        .disabled
                        .iter()
                        .enumerate()
                        .filter(|&(_, &disabled)| !disabled)
                        .map(|(i, _)| i)
                        .collect(),
                    _ => Vec::new(),
                };
                if let Some(&option) = enabled.choose(&mut self.rng) {
                    let outcome = session.command(GameCommand::Quiz(QuizCommand::Select(option)), scheduler);
                    debug!("Picked option {}: {:?}", option, outcome);
                }
            }
            QuizPhase::Answered(_) => {
                session.command(GameCommand::Quiz(QuizCommand::Next), scheduler);
            }
            QuizPhase::Results(_) => {}
        }
    }
}

/// Fires whatever is due next on the virtual clock.
fn pump(session: &mut GameSession, scheduler: &mut Scheduler) {
    for fired in scheduler.advance_to_next() {
        let outcome = session.handle_timer(fired, scheduler);
        debug!("{:?} -> {:?}", fired.kind, outcome);
    }
}

/// Greedy step toward the food that does not immediately collide.
fn snake_direction(view: &SnakeView) -> Option<Direction> {
    let head = *view.body.first()?;
    let blocked = &view.body[..view.body.len().saturating_sub(1)];
    let target = view.food.unwrap_or(head);

    let mut options: Vec<(i32, Direction)> = Direction::all()
        .into_iter()
        .filter(|d| *d != view.heading.opposite())
        .filter_map(|d| {
            let (dx, dy) = d.delta();
            let next = Point::new(head.x + dx, head.y + dy);
            let inside = next.x >= 0 && next.y >= 0 && next.x < view.width && next.y < view.height;
            (inside && !blocked.contains(&next))
                .then(|| ((next.x - target.x).abs() + (next.y - target.y).abs(), d))
        })
        .collect();
    options.sort_by_key(|(distance, _)| *distance);
    options.first().map(|(_, d)| *d)
}

/// Picks the rotation and column whose hard drop leaves the flattest board.
fn plan_tetris(view: &TetrisView) -> Option<(usize, i32)> {
    let board = Grid::from_rows(view.board.clone())?;
    let piece = view.current?;
    let fits = |p: &Piece| {
        p.cells().all(|(row, col)| {
            col >= 0
                && (col as usize) < board.cols()
                && row < board.rows() as i32
                && (row < 0 || board.get(row as usize, col as usize) == 0)
        })
    };

    let mut best: Option<(i64, usize, i32)> = None;
    for rotation in 0..piece.kind.rotations().len() {
        for col in -3..board.cols() as i32 + 3 {
            let mut candidate = Piece { rotation, col, ..piece };
            if !fits(&candidate) {
                continue;
            }
            while fits(&Piece { row: candidate.row + 1, ..candidate }) {
                candidate.row += 1;
            }

            let mut after = board.clone();
            for (row, col) in candidate.cells() {
                if row >= 0 {
                    after.set(row as usize, col as usize, 1);
                }
            }
            let cleared = after.clear_full_rows() as i64;
            let cost = board_cost(&after) - cleared * 10;
            if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                best = Some((cost, rotation, col));
            }
        }
    }
    best.map(|(_, rotation, col)| (rotation, col))
}

/// Aggregate height plus weighted holes and bumpiness.
fn board_cost(board: &Grid) -> i64 {
    let rows = board.rows();
    let heights: Vec<i64> = (0..board.cols())
        .map(|col| {
            (0..rows)
                .find(|&row| board.get(row, col) != 0)
                .map_or(0, |top| (rows - top) as i64)
        })
        .collect();

    let holes: i64 = (0..board.cols())
        .map(|col| {
            let top = rows - heights[col] as usize;
            (top..rows).filter(|&row| board.get(row, col) == 0).count() as i64
        })
        .sum();
    let bumpiness: i64 = heights.windows(2).map(|w| (w[0] - w[1]).abs()).sum();

    heights.iter().sum::<i64>() + holes * 4 + bumpiness
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameStatus;
    use tempfile::tempdir;

    fn seeded(seed: u64) -> EngineConfig {
        EngineConfig::default().with_seed(Some(seed))
    }

    #[tokio::test]
    async fn test_memory_autoplay_completes_board() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;

        let report = autoplay(GameKind::Memory, &seeded(5), "bot", &mut store, 200).await.unwrap();
        assert_eq!(report.status, GameStatus::Won);
        assert_eq!(report.metadata["matched_pairs"], 8);
        assert_eq!(store.high_scores(GameKind::Memory, 1)[0].score, report.score);
    }

    #[tokio::test]
    async fn test_quiz_autoplay_reaches_results() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;

        let report = autoplay(GameKind::Quiz, &seeded(5), "bot", &mut store, 100).await.unwrap();
        assert_eq!(report.status, GameStatus::Finished);
        assert_eq!(report.metadata["total_questions"], 5);
    }

    #[tokio::test]
    async fn test_snake_autoplay_advances_clock() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;

        let report = autoplay(GameKind::Snake, &seeded(5), "bot", &mut store, 300).await.unwrap();
        assert!(report.duration > std::time::Duration::ZERO);
        assert!(report.metadata["food_eaten"].as_u64().unwrap() >= 1);
        assert_eq!(store.statistics().plays_of("snake"), 1);
    }

    #[tokio::test]
    async fn test_tetris_autoplay_places_pieces() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;

        let report = autoplay(GameKind::Tetris, &seeded(5), "bot", &mut store, 60).await.unwrap();
        assert_eq!(report.game, GameKind::Tetris);
        assert!(report.high_score);
    }

    #[tokio::test]
    async fn test_number_puzzle_respects_step_limit() {
        let temp_dir = tempdir().unwrap();
        let mut store = ScoreStore::open(temp_dir.path()).await;

        let report = autoplay(GameKind::NumberPuzzle, &seeded(5), "bot", &mut store, 25).await.unwrap();
        let moves = report.metadata["moves"].as_u64().unwrap();
        assert!(moves >= 1 && moves <= 25);
    }

    #[test]
    fn test_board_cost_penalises_holes() {
        let flat = Grid::from_rows(vec![vec![0, 0], vec![1, 1]]).unwrap();
        let holed = Grid::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        assert!(board_cost(&flat) < board_cost(&holed));
    }
}
