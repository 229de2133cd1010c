// ============================================
// src/quiz.rs
// スワイプ式クイズのロジック (デッキ生成・正誤判定・成績)
// ============================================

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use thiserror::Error;

use crate::items::LearnableItem;

/// 画面に重ねて表示するカードの枚数
pub const CARD_STACK_DEPTH: usize = 4;

/// 1セッションで出題できる最大枚数
pub const MAX_CARD_COUNT: usize = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("the item pool is empty")]
    EmptyPool,

    #[error("no swipe accepted while the quiz is {0}")]
    NotPlaying(QuizState),

    #[error("invalid card count `{0}` (expected a number or `all`)")]
    InvalidCardCount(String),
}

pub type Result<T> = std::result::Result<T, QuizError>;

/// 出題枚数の指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CardCount {
    All,
    Exactly(usize),
}

impl CardCount {
    /// プールの大きさから実際の枚数を決める。プールより多くても切り詰めない
    pub fn resolve(self, pool_len: usize) -> usize {
        match self {
            CardCount::All => pool_len,
            CardCount::Exactly(n) => n,
        }
    }
}

impl Default for CardCount {
    fn default() -> Self {
        CardCount::Exactly(20)
    }
}

impl fmt::Display for CardCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardCount::All => f.write_str("all"),
            CardCount::Exactly(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for CardCount {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(CardCount::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n <= MAX_CARD_COUNT => Ok(CardCount::Exactly(n)),
            _ => Err(QuizError::InvalidCardCount(s.to_string())),
        }
    }
}

impl TryFrom<String> for CardCount {
    type Error = QuizError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CardCount> for String {
    fn from(count: CardCount) -> Self {
        count.to_string()
    }
}

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    Loading,
    Playing,
    Finished,
    Error,
}

impl fmt::Display for QuizState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuizState::Loading => "loading",
            QuizState::Playing => "playing",
            QuizState::Finished => "finished",
            QuizState::Error => "error",
        };
        f.write_str(name)
    }
}

/// スワイプの方向。右 = 「この組み合わせは正しい」、左 = 「間違っている」
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn asserts_correct(self) -> bool {
        self == SwipeDirection::Right
    }

    /// ユーザーの主張が実際の組み合わせの正誤と一致したか
    pub fn judge(self, pairing_truth: bool) -> bool {
        self.asserts_correct() == pairing_truth
    }
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwipeDirection::Left => f.write_str("left"),
            SwipeDirection::Right => f.write_str("right"),
        }
    }
}

/// 表示用カード。`shown_romaji` はダミーのこともある
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCard {
    pub item: LearnableItem,
    pub shown_romaji: String,
    pub correct_romaji: String,
}

impl DisplayCard {
    pub fn is_truthful(&self) -> bool {
        self.shown_romaji == self.correct_romaji
    }
}

/// 正誤マップのキー (デッキ内の位置 + アイテムID)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairingKey {
    pub position: usize,
    pub item_id: String,
}

/// 間違えたカードの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mistake {
    pub item: LearnableItem,
    pub card: DisplayCard,
    pub direction: SwipeDirection,
    pub pairing_was_true: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub correct: usize,
    pub incorrect: usize,
    pub mistakes: Vec<Mistake>,
}

impl SessionStats {
    pub fn answered(&self) -> usize {
        self.correct + self.incorrect
    }

    /// 正答率 (%)。まだ1枚も答えていなければ 0
    pub fn accuracy(&self) -> f64 {
        match self.answered() {
            0 => 0.0,
            n => self.correct as f64 / n as f64 * 100.0,
        }
    }
}

/// 1回のスワイプの結果。呼び出し側が進捗の記録に使う
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeOutcome {
    pub item: LearnableItem,
    pub is_correct: bool,
    pub finished: bool,
}

/// スワイプクイズ1セッション分の状態
#[derive(Debug, Clone)]
pub struct SwipeQuiz {
    state: QuizState,
    deck: Vec<LearnableItem>,
    cards: Vec<DisplayCard>,
    pairing_truth: HashMap<PairingKey, bool>,
    current_index: usize,
    stats: SessionStats,
    /// ダミーを選べずに正しい組み合わせにしたデッキ位置
    degenerate_positions: Vec<usize>,
}

impl Default for SwipeQuiz {
    fn default() -> Self {
        Self::new()
    }
}

impl SwipeQuiz {
    pub fn new() -> Self {
        Self {
            state: QuizState::Loading,
            deck: Vec::new(),
            cards: Vec::new(),
            pairing_truth: HashMap::new(),
            current_index: 0,
            stats: SessionStats::default(),
            degenerate_positions: Vec::new(),
        }
    }

    /// スレッドローカルの乱数でセッションを開始する
    pub fn initialize(&mut self, items: &[LearnableItem], card_count: CardCount) -> Result<()> {
        self.initialize_with_rng(items, card_count, &mut rand::rng())
    }

    /// セッションを開始する。以前のセッションの状態はすべて破棄される
    pub fn initialize_with_rng<R: Rng + ?Sized>(
        &mut self,
        items: &[LearnableItem],
        card_count: CardCount,
        rng: &mut R,
    ) -> Result<()> {
        *self = Self::new();

        if items.is_empty() {
            log::warn!("cannot start a quiz with an empty item pool");
            self.state = QuizState::Error;
            return Err(QuizError::EmptyPool);
        }

        let total = card_count.resolve(items.len());
        if matches!(card_count, CardCount::Exactly(n) if n > MAX_CARD_COUNT) {
            log::warn!("refusing to build a deck of {} cards", total);
            self.state = QuizState::Error;
            return Err(QuizError::InvalidCardCount(total.to_string()));
        }
        self.deck = build_deck(items, total, rng);

        for (idx, item) in self.deck.iter().enumerate() {
            let mut is_correct_meaning = rng.random_bool(0.5);
            let shown_romaji = if is_correct_meaning {
                item.romaji.clone()
            } else {
                match pick_distractor(items, item, rng) {
                    Some(distractor) => distractor.romaji.clone(),
                    None => {
                        // 全アイテムが同じローマ字なのでダミーが作れない
                        is_correct_meaning = true;
                        self.degenerate_positions.push(idx);
                        item.romaji.clone()
                    }
                }
            };

            self.cards.push(DisplayCard {
                item: item.clone(),
                shown_romaji,
                correct_romaji: item.romaji.clone(),
            });
            self.pairing_truth.insert(
                PairingKey {
                    position: idx,
                    item_id: item.id.clone(),
                },
                is_correct_meaning,
            );
        }

        if !self.degenerate_positions.is_empty() {
            log::warn!(
                "no distractor available for {} card(s); every item shares the same romaji",
                self.degenerate_positions.len()
            );
        }

        self.state = if self.deck.is_empty() {
            QuizState::Finished
        } else {
            QuizState::Playing
        };
        log::debug!(
            "quiz initialized: {} cards from a pool of {} ({})",
            self.deck.len(),
            items.len(),
            self.state
        );
        Ok(())
    }

    /// スワイプ結果を反映する。`is_correct` は呼び出し側が判定した正誤
    pub fn submit_swipe(&mut self, is_correct: bool, direction: SwipeDirection) -> Result<SwipeOutcome> {
        if self.state != QuizState::Playing {
            return Err(QuizError::NotPlaying(self.state));
        }

        let idx = self.current_index;
        let item = self.deck[idx].clone();

        if is_correct {
            self.stats.correct += 1;
        } else {
            let card = self.cards[idx].clone();
            let pairing_was_true = self.pairing_truth_at(idx).unwrap_or_else(|| card.is_truthful());
            self.stats.mistakes.push(Mistake {
                item: item.clone(),
                card,
                direction,
                pairing_was_true,
            });
            self.stats.incorrect += 1;
        }

        self.current_index += 1;
        let finished = self.current_index >= self.deck.len();
        if finished {
            self.state = QuizState::Finished;
        }
        log::debug!(
            "swipe {} on `{}` at {}: {}",
            direction,
            item.id,
            idx,
            if is_correct { "correct" } else { "incorrect" }
        );

        Ok(SwipeOutcome {
            item,
            is_correct,
            finished,
        })
    }

    /// 方向だけを受け取り、正誤判定まで行う
    pub fn swipe(&mut self, direction: SwipeDirection) -> Result<SwipeOutcome> {
        let truth = self
            .correct_answer_for_current()
            .ok_or(QuizError::NotPlaying(self.state))?;
        self.submit_swipe(direction.judge(truth), direction)
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_cards(&self) -> usize {
        self.deck.len()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn deck_items(&self) -> &[LearnableItem] {
        &self.deck
    }

    pub fn degenerate_positions(&self) -> &[usize] {
        &self.degenerate_positions
    }

    pub fn current_card(&self) -> Option<&DisplayCard> {
        if self.state != QuizState::Playing {
            return None;
        }
        self.cards.get(self.current_index)
    }

    /// 現在位置から最大 `CARD_STACK_DEPTH` 枚
    pub fn card_stack(&self) -> &[DisplayCard] {
        if self.state != QuizState::Playing {
            return &[];
        }
        let end = (self.current_index + CARD_STACK_DEPTH).min(self.cards.len());
        &self.cards[self.current_index..end]
    }

    /// 現在のカードが正しい組み合わせか。カードがなければ `None`
    pub fn correct_answer_for_current(&self) -> Option<bool> {
        self.current_card()?;
        self.pairing_truth_at(self.current_index)
    }

    pub fn pairing_truth_at(&self, position: usize) -> Option<bool> {
        let item = self.deck.get(position)?;
        self.pairing_truth
            .get(&PairingKey {
                position,
                item_id: item.id.clone(),
            })
            .copied()
    }
}

/// プール全体のシャッフルを繰り返して、ちょうど `total` 枚のデッキを作る
fn build_deck<R: Rng + ?Sized>(pool: &[LearnableItem], total: usize, rng: &mut R) -> Vec<LearnableItem> {
    let mut deck = Vec::with_capacity(total);
    while deck.len() < total {
        let mut pass = pool.to_vec();
        pass.shuffle(rng);
        let take = (total - deck.len()).min(pass.len());
        deck.extend(pass.into_iter().take(take));
    }
    deck
}

/// ローマ字が異なるアイテムから一様に1つ選ぶ。候補がなければ `None`
fn pick_distractor<'a, R: Rng + ?Sized>(
    pool: &'a [LearnableItem],
    item: &LearnableItem,
    rng: &mut R,
) -> Option<&'a LearnableItem> {
    let candidates: Vec<&LearnableItem> = pool.iter().filter(|c| c.romaji != item.romaji).collect();
    candidates.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn pool(romaji: &[&str]) -> Vec<LearnableItem> {
        romaji
            .iter()
            .enumerate()
            .map(|(i, r)| LearnableItem::character((i + 1).to_string(), format!("c{}", i), *r))
            .collect()
    }

    fn started(items: &[LearnableItem], count: CardCount, seed: u64) -> SwipeQuiz {
        let mut quiz = SwipeQuiz::new();
        quiz.initialize_with_rng(items, count, &mut StdRng::seed_from_u64(seed))
            .unwrap();
        quiz
    }

    #[test]
    fn test_new_quiz_is_loading() {
        let quiz = SwipeQuiz::new();
        assert_eq!(quiz.state(), QuizState::Loading);
        assert_eq!(quiz.total_cards(), 0);
        assert!(quiz.card_stack().is_empty());
        assert_eq!(quiz.correct_answer_for_current(), None);
    }

    #[test]
    fn test_deck_length_matches_request() {
        for pool_size in 1..=5 {
            let items = pool(&["a", "ka", "sa", "ta", "na"][..pool_size]);
            for count in 0..12 {
                let quiz = started(&items, CardCount::Exactly(count), count as u64);
                assert_eq!(quiz.total_cards(), count, "pool {} count {}", pool_size, count);
            }
            let quiz = started(&items, CardCount::All, 7);
            assert_eq!(quiz.total_cards(), pool_size);
        }
    }

    #[test]
    fn test_deck_repeats_cover_whole_pool_each_pass() {
        let items = pool(&["a", "ka", "sa"]);
        let quiz = started(&items, CardCount::Exactly(7), 3);
        let deck = quiz.deck_items();

        let first_pass: HashSet<&str> = deck[..3].iter().map(|i| i.id.as_str()).collect();
        let second_pass: HashSet<&str> = deck[3..6].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(first_pass.len(), 3);
        assert_eq!(second_pass.len(), 3);
    }

    #[test]
    fn test_three_items_five_cards() {
        let items = pool(&["a", "ka", "sa"]);
        let allowed: HashSet<&str> = ["a", "ka", "sa"].into_iter().collect();

        for seed in 0..20 {
            let quiz = started(&items, CardCount::Exactly(5), seed);
            assert_eq!(quiz.total_cards(), 5);
            for position in 0..5 {
                let card = &quiz.cards[position];
                assert!(allowed.contains(card.shown_romaji.as_str()));
                assert!(items.contains(&card.item));
            }
        }
    }

    #[test]
    fn test_pairing_truth_is_consistent_with_cards() {
        let items = pool(&["a", "i", "u", "e", "o"]);
        let mut seen_true = false;
        let mut seen_false = false;

        for seed in 0..30 {
            let quiz = started(&items, CardCount::Exactly(10), seed);
            for (position, card) in quiz.cards.iter().enumerate() {
                let truth = quiz.pairing_truth_at(position).unwrap();
                assert_eq!(card.correct_romaji, card.item.romaji);
                if truth {
                    assert_eq!(card.shown_romaji, card.correct_romaji);
                    seen_true = true;
                } else {
                    assert_ne!(card.shown_romaji, card.correct_romaji);
                    seen_false = true;
                }
            }
            assert!(quiz.degenerate_positions().is_empty());
        }
        assert!(seen_true && seen_false);
    }

    #[test]
    fn test_empty_pool_enters_error() {
        let mut quiz = SwipeQuiz::new();
        let err = quiz.initialize(&[], CardCount::Exactly(5)).unwrap_err();
        assert_eq!(err, QuizError::EmptyPool);
        assert_eq!(quiz.state(), QuizState::Error);
        assert_eq!(
            quiz.submit_swipe(true, SwipeDirection::Right),
            Err(QuizError::NotPlaying(QuizState::Error))
        );
        assert_eq!(quiz.stats(), &SessionStats::default());
    }

    #[test]
    fn test_zero_cards_finishes_immediately() {
        let quiz = started(&pool(&["a", "ka"]), CardCount::Exactly(0), 1);
        assert_eq!(quiz.state(), QuizState::Finished);
        assert!(quiz.card_stack().is_empty());
    }

    #[test]
    fn test_session_finishes_on_last_swipe() {
        let items = pool(&["a", "ka", "sa"]);
        let mut quiz = started(&items, CardCount::Exactly(6), 11);

        for i in 0..6 {
            assert_eq!(quiz.state(), QuizState::Playing);
            let outcome = quiz.submit_swipe(i % 2 == 0, SwipeDirection::Left).unwrap();
            assert_eq!(outcome.finished, i == 5);
        }
        assert_eq!(quiz.state(), QuizState::Finished);
        assert_eq!(quiz.current_index(), 6);
    }

    #[test]
    fn test_score_accounting() {
        let items = pool(&["a", "ka", "sa", "ta"]);
        let mut quiz = started(&items, CardCount::Exactly(8), 5);
        let answers = [true, false, false, true, true, false, true, true];

        for (i, &correct) in answers.iter().enumerate() {
            quiz.submit_swipe(correct, SwipeDirection::Right).unwrap();
            let expected_correct = answers[..=i].iter().filter(|&&c| c).count();
            let stats = quiz.stats();
            assert_eq!(stats.correct, expected_correct);
            assert_eq!(stats.incorrect, i + 1 - expected_correct);
            assert_eq!(stats.mistakes.len(), stats.incorrect);
        }
        assert_eq!(quiz.stats().accuracy(), 62.5);
    }

    #[test]
    fn test_mistake_captures_card_and_direction() {
        let items = pool(&["a", "ka", "sa"]);
        let mut quiz = started(&items, CardCount::Exactly(3), 2);
        let card = quiz.current_card().unwrap().clone();
        let truth = quiz.correct_answer_for_current().unwrap();

        quiz.submit_swipe(false, SwipeDirection::Left).unwrap();

        let mistake = &quiz.stats().mistakes[0];
        assert_eq!(mistake.card, card);
        assert_eq!(mistake.item, card.item);
        assert_eq!(mistake.direction, SwipeDirection::Left);
        assert_eq!(mistake.pairing_was_true, truth);
    }

    #[test]
    fn test_terminal_state_rejects_swipes() {
        let items = pool(&["a", "ka"]);
        let mut quiz = started(&items, CardCount::Exactly(2), 9);
        quiz.submit_swipe(true, SwipeDirection::Right).unwrap();
        quiz.submit_swipe(false, SwipeDirection::Left).unwrap();
        let before = quiz.stats().clone();

        assert_eq!(
            quiz.submit_swipe(true, SwipeDirection::Right),
            Err(QuizError::NotPlaying(QuizState::Finished))
        );
        assert!(quiz.swipe(SwipeDirection::Left).is_err());
        assert_eq!(quiz.stats(), &before);
        assert_eq!(quiz.current_index(), 2);
        assert_eq!(quiz.correct_answer_for_current(), None);
    }

    #[test]
    fn test_swipe_judges_against_pairing_truth() {
        let items = pool(&["a", "ka", "sa", "ta"]);
        let mut quiz = started(&items, CardCount::Exactly(12), 21);

        while quiz.state() == QuizState::Playing {
            let truth = quiz.correct_answer_for_current().unwrap();
            let direction = if truth { SwipeDirection::Right } else { SwipeDirection::Left };
            assert!(quiz.swipe(direction).unwrap().is_correct);
        }
        assert_eq!(quiz.stats().correct, 12);
        assert!(quiz.stats().mistakes.is_empty());
    }

    #[test]
    fn test_card_stack_shrinks_near_end() {
        let items = pool(&["a", "ka", "sa"]);
        let mut quiz = started(&items, CardCount::Exactly(6), 4);

        let expected = [4, 4, 4, 3, 2, 1];
        for &len in &expected {
            let stack = quiz.card_stack();
            assert_eq!(stack.len(), len);
            assert_eq!(&stack[0], quiz.current_card().unwrap());
            quiz.submit_swipe(true, SwipeDirection::Right).unwrap();
        }
        assert!(quiz.card_stack().is_empty());
    }

    #[test]
    fn test_degenerate_pool_falls_back_to_truthful_pairing() {
        let items = pool(&["a", "a", "a"]);
        let quiz = started(&items, CardCount::Exactly(20), 8);

        for (position, card) in quiz.cards.iter().enumerate() {
            assert!(card.is_truthful());
            assert_eq!(quiz.pairing_truth_at(position), Some(true));
        }
        // 約半数の位置で表が出ず、ダミー選択にフォールバックしているはず
        assert!(!quiz.degenerate_positions().is_empty());
    }

    #[test]
    fn test_partially_degenerate_pool_still_finds_distractor() {
        let items = pool(&["a", "a", "a", "a", "ka"]);
        for seed in 0..20 {
            let quiz = started(&items, CardCount::Exactly(10), seed);
            assert!(quiz.degenerate_positions().is_empty());
            for (position, card) in quiz.cards.iter().enumerate() {
                if quiz.pairing_truth_at(position) == Some(false) {
                    assert_ne!(card.shown_romaji, card.correct_romaji);
                }
            }
        }
    }

    #[test]
    fn test_reinitialize_discards_previous_session() {
        let items = pool(&["a", "ka", "sa"]);
        let mut quiz = started(&items, CardCount::Exactly(3), 1);
        quiz.submit_swipe(false, SwipeDirection::Left).unwrap();

        quiz.initialize_with_rng(&items, CardCount::Exactly(2), &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(quiz.state(), QuizState::Playing);
        assert_eq!(quiz.current_index(), 0);
        assert_eq!(quiz.total_cards(), 2);
        assert_eq!(quiz.stats(), &SessionStats::default());

        assert!(quiz.initialize(&[], CardCount::All).is_err());
        assert_eq!(quiz.total_cards(), 0);
        assert_eq!(quiz.state(), QuizState::Error);
    }

    #[test]
    fn test_oversized_card_count_is_rejected() {
        let items = pool(&["a", "ka"]);
        let mut quiz = SwipeQuiz::new();
        let err = quiz.initialize(&items, CardCount::Exactly(usize::MAX)).unwrap_err();
        assert_eq!(err, QuizError::InvalidCardCount(usize::MAX.to_string()));
        assert_eq!(quiz.state(), QuizState::Error);
        assert_eq!(quiz.total_cards(), 0);

        quiz.initialize(&items, CardCount::Exactly(MAX_CARD_COUNT)).unwrap();
        assert_eq!(quiz.total_cards(), MAX_CARD_COUNT);
    }

    #[test]
    fn test_card_count_parsing() {
        assert_eq!("all".parse::<CardCount>().unwrap(), CardCount::All);
        assert_eq!(" ALL ".parse::<CardCount>().unwrap(), CardCount::All);
        assert_eq!("15".parse::<CardCount>().unwrap(), CardCount::Exactly(15));
        assert!("-3".parse::<CardCount>().is_err());
        assert!("many".parse::<CardCount>().is_err());
        assert_eq!(
            "10000".parse::<CardCount>().unwrap(),
            CardCount::Exactly(MAX_CARD_COUNT)
        );
        assert_eq!(
            "18446744073709551615".parse::<CardCount>(),
            Err(QuizError::InvalidCardCount("18446744073709551615".to_string()))
        );
        assert_eq!(CardCount::Exactly(15).to_string(), "15");
        assert_eq!(CardCount::All.resolve(46), 46);
        assert_eq!(CardCount::Exactly(100).resolve(3), 100);
    }

    #[test]
    fn test_swipe_direction_judge() {
        assert!(SwipeDirection::Right.judge(true));
        assert!(!SwipeDirection::Right.judge(false));
        assert!(SwipeDirection::Left.judge(false));
        assert!(!SwipeDirection::Left.judge(true));
    }
}
