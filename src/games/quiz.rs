//! Timed multiple-choice quiz with one-shot lifelines.

use std::time::Duration;
use rand::rngs::SmallRng;
use rand::seq::{index, SliceRandom};
use serde::{Deserialize, Serialize};
use crate::config::QuizSettings;
use crate::core::{Engine, GameKind, GameStatus, GameSummary, RenderState};
use crate::data::{Question, QuestionBank};
use crate::scores::AchievementContext;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifeline {
    FiftyFifty,
    Skip,
    ExtraTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifelines {
    pub fifty_fifty: bool,
    pub skip: bool,
    pub extra_time: bool,
}

impl Default for Lifelines {
    fn default() -> Self {
        Self {
            fifty_fifty: true,
            skip: true,
            extra_time: true,
        }
    }
}

impl Lifelines {
    fn take(&mut self, lifeline: Lifeline) -> bool {
        let slot = match lifeline {
            Lifeline::FiftyFifty => &mut self.fifty_fifty,
            Lifeline::Skip => &mut self.skip,
            Lifeline::ExtraTime => &mut self.extra_time,
        };
        std::mem::replace(slot, false)
    }

    pub fn is_available(&self, lifeline: Lifeline) -> bool {
        match lifeline {
            Lifeline::FiftyFifty => self.fifty_fifty,
            Lifeline::Skip => self.skip,
            Lifeline::ExtraTime => self.extra_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Choice { index: usize, correct: bool },
    Timeout,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Excellent,
    Good,
    NotBad,
    KeepTrying,
}

impl Tier {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Tier::Excellent
        } else if percentage >= 60.0 {
            Tier::Good
        } else if percentage >= 40.0 {
            Tier::NotBad
        } else {
            Tier::KeepTrying
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Tier::Excellent => "EXCELLENT! You're a Quiz Champion!",
            Tier::Good => "GOOD JOB! Well played!",
            Tier::NotBad => "NOT BAD! Keep practicing!",
            Tier::KeepTrying => "KEEP TRYING! Practice makes perfect!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuizResults {
    pub score: u64,
    pub max_score: u64,
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
    pub tier: Tier,
    pub best_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QuizPhase {
    Displayed,
    Answered(Answer),
    Results(QuizResults),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QuizEvent {
    Countdown(u32),
    TimedOut,
    Answered { correct: bool },
    LifelineUsed(Lifeline),
    Advanced { question: usize },
    Finished(QuizResults),
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizView {
    pub question_number: usize,
    pub total_questions: usize,
    pub question: Option<String>,
    pub options: Vec<String>,
    pub disabled: Vec<bool>,
    /// Revealed once the question has been answered.
    pub correct_option: Option<usize>,
    pub time_remaining: u32,
    pub score: u64,
    pub lifelines: Lifelines,
    pub phase: QuizPhase,
    pub status: GameStatus,
}

pub struct QuizSession {
    settings: QuizSettings,
    questions: Vec<Question>,
    current: usize,
    phase: QuizPhase,
    time_remaining: u32,
    disabled: Vec<bool>,
    lifelines: Lifelines,
    score: u64,
    correct: usize,
    streak: u32,
    best_streak: u32,
    terminated: bool,
    rng: SmallRng,
}

impl QuizSession {
    pub fn new(settings: &QuizSettings, bank: &QuestionBank, mut rng: SmallRng) -> Self {
        let total = settings.total_questions.min(bank.len());
        let questions: Vec<Question> = index::sample(&mut rng, bank.len(), total)
            .into_iter()
            .filter_map(|i| bank.get(i).cloned())
            .collect();
        info!("Quiz started with {} of {} questions", questions.len(), bank.len());

        let mut session = Self {
            settings: settings.clone(),
            questions,
            current: 0,
            phase: QuizPhase::Displayed,
            time_remaining: settings.seconds_per_question,
            disabled: Vec::new(),
            lifelines: Lifelines::default(),
            score: 0,
            correct: 0,
            streak: 0,
            best_streak: 0,
            terminated: false,
            rng,
        };
        session.display_current();
        session
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn lifelines(&self) -> Lifelines {
        self.lifelines
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            QuizPhase::Results(_) => None,
            _ => self.questions.get(self.current),
        }
    }

    pub fn enabled_options(&self) -> Vec<usize> {
        self.disabled
            .iter()
            .enumerate()
            .filter(|(_, &disabled)| !disabled)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    /// One countdown unit elapsed.
    pub fn tick(&mut self) -> QuizEvent {
        if !self.accepting_input() {
            return QuizEvent::Rejected;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            debug!("Question {} timed out", self.current + 1);
            self.streak = 0;
            self.phase = QuizPhase::Answered(Answer::Timeout);
            return QuizEvent::TimedOut;
        }
        QuizEvent::Countdown(self.time_remaining)
    }

    pub fn select_answer(&mut self, option: usize) -> QuizEvent {
        if !self.accepting_input() {
            return QuizEvent::Rejected;
        }
        if self.disabled.get(option).copied().unwrap_or(true) {
            return QuizEvent::Rejected;
        }
        let Some(question) = self.questions.get(self.current) else {
            return QuizEvent::Rejected;
        };

        let correct = question.is_correct(option);
        if correct {
            self.score += self.settings.points_per_answer;
            self.correct += 1;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
        self.phase = QuizPhase::Answered(Answer::Choice { index: option, correct });
        QuizEvent::Answered { correct }
    }

    pub fn next_question(&mut self) -> QuizEvent {
        if self.terminated || !matches!(self.phase, QuizPhase::Answered(_)) {
            return QuizEvent::Rejected;
        }
        self.advance()
    }

    pub fn use_lifeline(&mut self, lifeline: Lifeline) -> QuizEvent {
        if !self.accepting_input() || !self.lifelines.is_available(lifeline) {
            return QuizEvent::Rejected;
        }

        match lifeline {
            Lifeline::FiftyFifty => {
                let Some(correct) = self.questions.get(self.current).and_then(|q| q.correct_index()) else {
                    return QuizEvent::Rejected;
                };
                let wrong: Vec<usize> = (0..self.disabled.len()).filter(|&i| i != correct).collect();
                for &i in wrong.choose_multiple(&mut self.rng, 2) {
                    self.disabled[i] = true;
                }
                self.lifelines.take(lifeline);
                QuizEvent::LifelineUsed(lifeline)
            }
            Lifeline::ExtraTime => {
                self.lifelines.take(lifeline);
                self.time_remaining += self.settings.extra_time_bonus;
                QuizEvent::LifelineUsed(lifeline)
            }
            Lifeline::Skip => {
                self.lifelines.take(lifeline);
                self.streak = 0;
                self.phase = QuizPhase::Answered(Answer::Skip);
                self.advance()
            }
        }
    }

    pub fn results(&self) -> Option<QuizResults> {
        match self.phase {
            QuizPhase::Results(results) => Some(results),
            _ => None,
        }
    }

    fn accepting_input(&self) -> bool {
        !self.terminated && self.phase == QuizPhase::Displayed
    }

    fn advance(&mut self) -> QuizEvent {
        self.current += 1;
        if self.current >= self.questions.len() {
            let results = self.compute_results();
            info!("Quiz finished: {}/{} ({:?})", results.score, results.max_score, results.tier);
            self.phase = QuizPhase::Results(results);
            return QuizEvent::Finished(results);
        }
        self.display_current();
        QuizEvent::Advanced { question: self.current }
    }

    fn display_current(&mut self) {
        if self.questions.is_empty() {
            self.phase = QuizPhase::Results(self.compute_results());
            return;
        }
        self.phase = QuizPhase::Displayed;
        self.time_remaining = self.settings.seconds_per_question;
        let option_count = self.questions[self.current].options.len();
        self.disabled = vec![false; option_count];
    }

    fn compute_results(&self) -> QuizResults {
        let max_score = self.questions.len() as u64 * self.settings.points_per_answer;
        let percentage = if max_score == 0 {
            0.0
        } else {
            self.score as f64 / max_score as f64 * 100.0
        };
        QuizResults {
            score: self.score,
            max_score,
            correct: self.correct,
            total: self.questions.len(),
            percentage,
            tier: Tier::from_percentage(percentage),
            best_streak: self.best_streak,
        }
    }
}

impl Engine for QuizSession {
    fn kind(&self) -> GameKind {
        GameKind::Quiz
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn status(&self) -> GameStatus {
        if self.terminated {
            GameStatus::Terminated
        } else if matches!(self.phase, QuizPhase::Results(_)) {
            GameStatus::Finished
        } else {
            GameStatus::Running
        }
    }

    fn tick_interval(&self) -> Option<Duration> {
        self.accepting_input()
            .then(|| Duration::from_millis(self.settings.countdown_tick_ms))
    }

    fn render_state(&self) -> RenderState {
        let question = self.current_question();
        let correct_option = match self.phase {
            QuizPhase::Answered(_) => question.and_then(|q| q.correct_index()),
            _ => None,
        };
        RenderState::Quiz(QuizView {
            question_number: (self.current + 1).min(self.questions.len()),
            total_questions: self.questions.len(),
            question: question.map(|q| q.text.clone()),
            options: question.map(|q| q.options.clone()).unwrap_or_default(),
            disabled: self.disabled.clone(),
            correct_option,
            time_remaining: self.time_remaining,
            score: self.score,
            lifelines: self.lifelines,
            phase: self.phase,
            status: self.status(),
        })
    }

    fn summary(&self) -> GameSummary {
        let results = self.compute_results();
        let mut summary = GameSummary::new(self.score);
        summary.insert("correct", results.correct);
        summary.insert("total_questions", results.total);
        summary.insert("percentage", results.percentage);
        summary.insert("best_streak", self.best_streak);
        summary.achievements = AchievementContext {
            correct_streak: Some(self.best_streak),
            ..Default::default()
        };
        summary
    }

    fn cleanup(&mut self) {
        self.terminated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn session(total: usize) -> QuizSession {
        let settings = QuizSettings {
            total_questions: total,
            ..QuizSettings::default()
        };
        QuizSession::new(&settings, &QuestionBank::fallback(), SmallRng::seed_from_u64(17))
    }

    fn correct_index(session: &QuizSession) -> usize {
        session.current_question().unwrap().correct_index().unwrap()
    }

    #[test]
    fn test_sample_is_capped_by_bank_size() {
        let quiz = session(10);
        assert_eq!(quiz.question_count(), QuestionBank::fallback().len());

        let quiz = session(3);
        assert_eq!(quiz.question_count(), 3);
        let mut texts: Vec<&str> = quiz.questions.iter().map(|q| q.text.as_str()).collect();
        texts.sort();
        texts.dedup();
        assert_eq!(texts.len(), 3);
    }

    #[test]
    fn test_correct_answer_scores() {
        let mut quiz = session(3);
        let correct = correct_index(&quiz);
        assert_eq!(quiz.select_answer(correct), QuizEvent::Answered { correct: true });
        assert_eq!(quiz.score(), 10);
        // answering twice is not possible
        assert_eq!(quiz.select_answer(correct), QuizEvent::Rejected);
        assert_eq!(quiz.score(), 10);
    }

    #[test]
    fn test_wrong_answer_scores_nothing() {
        let mut quiz = session(3);
        let wrong = (correct_index(&quiz) + 1) % 4;
        assert_eq!(quiz.select_answer(wrong), QuizEvent::Answered { correct: false });
        assert_eq!(quiz.score(), 0);
    }

    #[test]
    fn test_countdown_times_out() {
        let mut quiz = session(3);
        for _ in 0..29 {
            assert!(matches!(quiz.tick(), QuizEvent::Countdown(_)));
        }
        assert_eq!(quiz.tick(), QuizEvent::TimedOut);
        assert_eq!(quiz.phase(), QuizPhase::Answered(Answer::Timeout));
        assert_eq!(quiz.tick_interval(), None);
        assert_eq!(quiz.select_answer(0), QuizEvent::Rejected);
    }

    #[test]
    fn test_fifty_fifty_keeps_correct_option() {
        let mut quiz = session(3);
        let correct = correct_index(&quiz);
        assert_eq!(quiz.use_lifeline(Lifeline::FiftyFifty), QuizEvent::LifelineUsed(Lifeline::FiftyFifty));

        let enabled = quiz.enabled_options();
        assert_eq!(enabled.len(), 2);
        assert!(enabled.contains(&correct));

        assert_eq!(quiz.use_lifeline(Lifeline::FiftyFifty), QuizEvent::Rejected);
        assert_eq!(quiz.enabled_options(), enabled);
    }

    #[test]
    fn test_disabled_option_cannot_be_chosen() {
        let mut quiz = session(3);
        quiz.use_lifeline(Lifeline::FiftyFifty);
        let disabled = (0..4).find(|i| !quiz.enabled_options().contains(i)).unwrap();
        assert_eq!(quiz.select_answer(disabled), QuizEvent::Rejected);
    }

    #[test]
    fn test_skip_advances_once() {
        let mut quiz = session(3);
        assert_eq!(quiz.use_lifeline(Lifeline::Skip), QuizEvent::Advanced { question: 1 });
        assert_eq!(quiz.score(), 0);
        assert_eq!(quiz.use_lifeline(Lifeline::Skip), QuizEvent::Rejected);
    }

    #[test]
    fn test_extra_time() {
        let mut quiz = session(3);
        quiz.tick();
        assert_eq!(quiz.time_remaining(), 29);
        quiz.use_lifeline(Lifeline::ExtraTime);
        assert_eq!(quiz.time_remaining(), 44);
        assert!(!quiz.lifelines().extra_time);
    }

    #[test]
    fn test_next_question_resets_timer_and_options() {
        let mut quiz = session(3);
        quiz.use_lifeline(Lifeline::FiftyFifty);
        quiz.tick();
        assert_eq!(quiz.next_question(), QuizEvent::Rejected);
        let correct = correct_index(&quiz);
        quiz.select_answer(correct);
        assert_eq!(quiz.next_question(), QuizEvent::Advanced { question: 1 });
        assert_eq!(quiz.time_remaining(), 30);
        assert_eq!(quiz.enabled_options().len(), 4);
    }

    #[test]
    fn test_results_tier() {
        let mut quiz = session(5);
        for _ in 0..4 {
            let correct = correct_index(&quiz);
            quiz.select_answer(correct);
            quiz.next_question();
        }
        let wrong = (correct_index(&quiz) + 1) % 4;
        quiz.select_answer(wrong);
        let QuizEvent::Finished(results) = quiz.next_question() else {
            panic!("quiz should be finished");
        };
        assert_eq!(results.score, 40);
        assert_eq!(results.max_score, 50);
        assert_eq!(results.tier, Tier::Excellent);
        assert_eq!(results.best_streak, 4);
        assert_eq!(quiz.status(), GameStatus::Finished);
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(Tier::from_percentage(100.0), Tier::Excellent);
        assert_eq!(Tier::from_percentage(60.0), Tier::Good);
        assert_eq!(Tier::from_percentage(40.0), Tier::NotBad);
        assert_eq!(Tier::from_percentage(39.9), Tier::KeepTrying);
    }
}
