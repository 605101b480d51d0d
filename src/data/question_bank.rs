use std::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use crate::utils::{GameError, GameResult};
use tracing::{info, warn};

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    /// Option text, never an index.
    pub answer: String,
}

impl Question {
    pub fn new<S: Into<String>>(text: S, options: [&str; OPTIONS_PER_QUESTION], answer: S) -> Self {
        Self {
            text: text.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer: answer.into(),
        }
    }

    pub fn correct_index(&self) -> Option<usize> {
        let answer = self.answer.trim();
        self.options.iter().position(|o| o.trim() == answer)
    }

    pub fn is_correct(&self, option: usize) -> bool {
        self.options
            .get(option)
            .is_some_and(|o| o.trim() == self.answer.trim())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.text.trim().is_empty() {
            errors.push("Question text is empty".to_string());
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            errors.push(format!(
                "Expected {} options, found {}",
                OPTIONS_PER_QUESTION,
                self.options.len()
            ));
        }
        if self.correct_index().is_none() {
            errors.push(format!("Answer '{}' is not one of the options", self.answer));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// On-disk layout: three parallel arrays.
#[derive(Debug, Deserialize)]
struct BankFile {
    questions: Vec<String>,
    options: Vec<Vec<String>>,
    correct_answers: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Builds a bank, dropping invalid questions with a warning.
    pub fn new(questions: Vec<Question>) -> Self {
        let questions = questions
            .into_iter()
            .filter(|q| match q.validate() {
                Ok(()) => true,
                Err(errors) => {
                    warn!("Skipping question '{}': {}", q.text, errors.join("; "));
                    false
                }
            })
            .collect();
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn from_json(content: &str) -> GameResult<Self> {
        let file: BankFile = serde_json::from_str(content)
            .map_err(|e| GameError::quiz_data(format!("Failed to parse question bank: {}", e)))?;

        if file.questions.len() != file.options.len() || file.questions.len() != file.correct_answers.len() {
            return Err(GameError::quiz_data(format!(
                "Misaligned bank: {} questions, {} option sets, {} answers",
                file.questions.len(),
                file.options.len(),
                file.correct_answers.len()
            )));
        }

        let mut questions = Vec::with_capacity(file.questions.len());
        for ((text, options), answer) in file.questions.into_iter().zip(file.options).zip(file.correct_answers) {
            match answer {
                Value::String(answer) => questions.push(Question { text, options, answer }),
                other => warn!("Skipping question '{}': answer {} is not option text", text, other),
            }
        }

        let bank = Self::new(questions);
        if bank.is_empty() {
            return Err(GameError::quiz_data("Question bank has no valid questions"));
        }
        Ok(bank)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> GameResult<Self> {
        let path = path.as_ref();
        info!("Loading question bank from: {:?}", path);

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GameError::quiz_data(format!("Failed to read question bank {:?}: {}", path, e)))?;
        let bank = Self::from_json(&content)?;

        info!("Loaded {} questions", bank.len());
        Ok(bank)
    }

    pub async fn load_or_fallback<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path).await {
            Ok(bank) => bank,
            Err(e) => {
                warn!("{}; using the built-in questions", e);
                Self::fallback()
            }
        }
    }

    pub fn fallback() -> Self {
        Self::new(vec![
            Question::new(
                "What is the capital of France?",
                ["London", "Berlin", "Paris", "Madrid"],
                "Paris",
            ),
            Question::new(
                "Which planet is known as the Red Planet?",
                ["Venus", "Mars", "Jupiter", "Saturn"],
                "Mars",
            ),
            Question::new(
                "Who painted the Mona Lisa?",
                ["Van Gogh", "Picasso", "Leonardo da Vinci", "Michelangelo"],
                "Leonardo da Vinci",
            ),
            Question::new(
                "What is the largest ocean on Earth?",
                ["Atlantic", "Indian", "Arctic", "Pacific"],
                "Pacific",
            ),
            Question::new(
                "In which year did World War II end?",
                ["1944", "1945", "1946", "1947"],
                "1945",
            ),
        ])
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fallback_is_valid() {
        let bank = QuestionBank::fallback();
        assert_eq!(bank.len(), 5);
        assert!(bank.questions().iter().all(|q| q.validate().is_ok()));
    }

    #[test]
    fn test_answer_matches_trimmed_text() {
        let q = Question::new("Q?", [" Paris ", "Rome", "Berlin", "Madrid"], "Paris");
        assert_eq!(q.correct_index(), Some(0));
        assert!(q.is_correct(0));
        assert!(!q.is_correct(1));
        assert!(!q.is_correct(7));
    }

    #[test]
    fn test_numeric_answers_are_skipped() {
        let json = r#"{
            "questions": ["A?", "B?"],
            "options": [["1", "2", "3", "4"], ["x", "y", "z", "w"]],
            "correct_answers": [2, "y"]
        }"#;
        let bank = QuestionBank::from_json(json).unwrap();
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get(0).unwrap().answer, "y");
    }

    #[test]
    fn test_answer_outside_options_is_skipped() {
        let json = r#"{
            "questions": ["A?", "B?"],
            "options": [["a", "b", "c", "d"], ["x", "y", "z"]],
            "correct_answers": ["e", "y"]
        }"#;
        assert!(QuestionBank::from_json(json).is_err());
    }

    #[test]
    fn test_misaligned_bank_is_rejected() {
        let json = r#"{ "questions": ["A?"], "options": [], "correct_answers": ["a"] }"#;
        let err = QuestionBank::from_json(json).unwrap_err();
        assert!(matches!(err, GameError::QuizData { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let dir = tempdir().unwrap();
        let bank = QuestionBank::load_or_fallback(dir.path().join("nope.json")).await;
        assert_eq!(bank, QuestionBank::fallback());
    }

    #[tokio::test]
    async fn test_bundled_bank_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/quiz/questions.json");
        let bank = QuestionBank::load(path).await.unwrap();
        assert!(bank.len() >= 10);
    }
}
