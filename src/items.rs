/*
 * src/items.rs
 * 出題データ (ひらがな・カタカナ・単語) を管理するモジュール
 */

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown group `{group}` in category {category}")]
    UnknownGroup { category: Category, group: String },

    #[error("item `{0}` has an empty romaji")]
    EmptyRomaji(String),

    #[error("duplicate item id `{0}`")]
    DuplicateId(String),

    #[error("unknown category `{0}`")]
    UnknownCategory(String),
}

pub type Result<T> = std::result::Result<T, ContentError>;

/// 1枚のカードになる学習単位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnableItem {
    pub id: String,
    /// かな1文字 (ひらがな・カタカナ用)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    /// 単語 (vocabulary用)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    /// 正解のローマ字
    pub romaji: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
}

impl LearnableItem {
    pub fn character(id: impl Into<String>, character: impl Into<String>, romaji: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            character: Some(character.into()),
            word: None,
            romaji: romaji.into(),
            meaning: None,
        }
    }

    pub fn word(id: impl Into<String>, word: impl Into<String>, romaji: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            character: None,
            word: Some(word.into()),
            romaji: romaji.into(),
            meaning: None,
        }
    }

    pub fn with_meaning(mut self, meaning: impl Into<String>) -> Self {
        self.meaning = Some(meaning.into());
        self
    }

    /// 画面に出す文字列 (character か word のどちらか)
    pub fn prompt(&self) -> &str {
        self.character
            .as_deref()
            .or(self.word.as_deref())
            .unwrap_or_default()
    }
}

/// 出題カテゴリ。`as_str` の値が進捗データのキーになる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Hiragana,
    Katakana,
    Vocabulary,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Hiragana, Category::Katakana, Category::Vocabulary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hiragana => "hiragana",
            Category::Katakana => "katakana",
            Category::Vocabulary => "vocabulary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ContentError::UnknownCategory(s.to_string()))
    }
}

// --------------------------------------------------
// 組み込みデータ
// --------------------------------------------------

/// 五十音の1行 (ひらがな, カタカナ, ローマ字)
struct KanaRow {
    name: &'static str,
    kana: &'static [(&'static str, &'static str, &'static str)],
}

const KANA_ROWS: &[KanaRow] = &[
    KanaRow {
        name: "vowels",
        kana: &[("あ", "ア", "a"), ("い", "イ", "i"), ("う", "ウ", "u"), ("え", "エ", "e"), ("お", "オ", "o")],
    },
    KanaRow {
        name: "k",
        kana: &[("か", "カ", "ka"), ("き", "キ", "ki"), ("く", "ク", "ku"), ("け", "ケ", "ke"), ("こ", "コ", "ko")],
    },
    KanaRow {
        name: "s",
        kana: &[("さ", "サ", "sa"), ("し", "シ", "shi"), ("す", "ス", "su"), ("せ", "セ", "se"), ("そ", "ソ", "so")],
    },
    KanaRow {
        name: "t",
        kana: &[("た", "タ", "ta"), ("ち", "チ", "chi"), ("つ", "ツ", "tsu"), ("て", "テ", "te"), ("と", "ト", "to")],
    },
    KanaRow {
        name: "n",
        kana: &[("な", "ナ", "na"), ("に", "ニ", "ni"), ("ぬ", "ヌ", "nu"), ("ね", "ネ", "ne"), ("の", "ノ", "no")],
    },
    KanaRow {
        name: "h",
        kana: &[("は", "ハ", "ha"), ("ひ", "ヒ", "hi"), ("ふ", "フ", "fu"), ("へ", "ヘ", "he"), ("ほ", "ホ", "ho")],
    },
    KanaRow {
        name: "m",
        kana: &[("ま", "マ", "ma"), ("み", "ミ", "mi"), ("む", "ム", "mu"), ("め", "メ", "me"), ("も", "モ", "mo")],
    },
    KanaRow {
        name: "y",
        kana: &[("や", "ヤ", "ya"), ("ゆ", "ユ", "yu"), ("よ", "ヨ", "yo")],
    },
    KanaRow {
        name: "r",
        kana: &[("ら", "ラ", "ra"), ("り", "リ", "ri"), ("る", "ル", "ru"), ("れ", "レ", "re"), ("ろ", "ロ", "ro")],
    },
    KanaRow {
        name: "w",
        kana: &[("わ", "ワ", "wa"), ("を", "ヲ", "wo"), ("ん", "ン", "n")],
    },
];

/// 単語 (表示, ローマ字, 意味)
struct WordGroup {
    name: &'static str,
    words: &'static [(&'static str, &'static str, &'static str)],
}

const WORD_GROUPS: &[WordGroup] = &[
    WordGroup {
        name: "animals",
        words: &[("猫", "neko", "cat"), ("犬", "inu", "dog"), ("鳥", "tori", "bird"), ("魚", "sakana", "fish")],
    },
    WordGroup {
        name: "nature",
        words: &[("空", "sora", "sky"), ("海", "umi", "sea"), ("山", "yama", "mountain"), ("川", "kawa", "river")],
    },
    WordGroup {
        name: "greetings",
        words: &[
            ("こんにちは", "konnichiwa", "hello"),
            ("ありがとう", "arigatou", "thank you"),
            ("さようなら", "sayounara", "goodbye"),
            ("おはよう", "ohayou", "good morning"),
        ],
    },
];

/// カテゴリ内のグループ名一覧
pub fn groups(category: Category) -> Vec<&'static str> {
    match category {
        Category::Hiragana | Category::Katakana => KANA_ROWS.iter().map(|row| row.name).collect(),
        Category::Vocabulary => WORD_GROUPS.iter().map(|g| g.name).collect(),
    }
}

fn kana_row_items(category: Category, row: &KanaRow) -> Vec<LearnableItem> {
    row.kana
        .iter()
        .map(|&(hiragana, katakana, romaji)| {
            let character = if category == Category::Katakana { katakana } else { hiragana };
            LearnableItem::character(format!("{}-{}", category, romaji), character, romaji)
        })
        .collect()
}

fn word_group_items(group: &WordGroup) -> Vec<LearnableItem> {
    group
        .words
        .iter()
        .map(|&(word, romaji, meaning)| {
            LearnableItem::word(format!("{}-{}", Category::Vocabulary, romaji), word, romaji)
                .with_meaning(meaning)
        })
        .collect()
}

/// 組み込みの出題プールを返す。`group` が `None` ならカテゴリ全体
pub fn builtin_pool(category: Category, group: Option<&str>) -> Result<Vec<LearnableItem>> {
    let unknown = |g: &str| ContentError::UnknownGroup {
        category,
        group: g.to_string(),
    };

    match category {
        Category::Hiragana | Category::Katakana => match group {
            None => Ok(KANA_ROWS.iter().flat_map(|row| kana_row_items(category, row)).collect()),
            Some(g) => KANA_ROWS
                .iter()
                .find(|row| row.name == g)
                .map(|row| kana_row_items(category, row))
                .ok_or_else(|| unknown(g)),
        },
        Category::Vocabulary => match group {
            None => Ok(WORD_GROUPS.iter().flat_map(word_group_items).collect()),
            Some(g) => WORD_GROUPS
                .iter()
                .find(|wg| wg.name == g)
                .map(word_group_items)
                .ok_or_else(|| unknown(g)),
        },
    }
}

// --------------------------------------------------
// 外部ファイル
// --------------------------------------------------

/// `{ "items": [...] }` 形式のファイル
#[derive(Debug, Deserialize)]
struct PoolFile {
    items: Vec<LearnableItem>,
}

/// 出題プールの妥当性チェック (空のローマ字・ID重複)
pub fn validate_pool(items: &[LearnableItem]) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        if item.romaji.trim().is_empty() {
            return Err(ContentError::EmptyRomaji(item.id.clone()));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(ContentError::DuplicateId(item.id.clone()));
        }
    }
    Ok(())
}

/// JSONファイルから出題プールを読み込む
pub fn load_pool_file(path: &Path) -> Result<Vec<LearnableItem>> {
    let reader = BufReader::new(File::open(path)?);
    let file: PoolFile = serde_json::from_reader(reader)?;
    validate_pool(&file.items)?;
    log::debug!("loaded {} items from {}", file.items.len(), path.display());
    Ok(file.items)
}
