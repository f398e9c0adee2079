pub mod loaders;
pub mod quiz;

pub use loaders::{load_quiz_export, parse_quiz_export};
pub use quiz::{EssayAnswer, QuestionBlock, QuestionColumns, QuizExport, StudentRecord};
