// ============================================
// src/lib.rs
// かなスワイプ: ひらがな・カタカナ・単語のスワイプ式クイズ
// ============================================

pub mod items;
pub mod progress;
pub mod quiz;
pub mod settings;

pub use items::{Category, ContentError, LearnableItem};
pub use progress::{CategoryStats, ItemResult, ProgressRecord, ProgressStore};
pub use quiz::{CardCount, DisplayCard, QuizError, QuizState, SwipeDirection, SwipeQuiz};
pub use settings::{Language, Settings};
