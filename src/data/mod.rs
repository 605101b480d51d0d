pub mod question_bank;

pub use question_bank::{Question, QuestionBank};
