// ============================================
// src/settings.rs
// ユーザー設定 (表示言語・出題枚数) と保存先ディレクトリ
// ============================================

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::CardCount;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown language `{0}`")]
    UnknownLanguage(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("jp", "kana-swipe", "KANA_SWIPE")
}

/// 進捗データの保存ディレクトリ。取得できなければカレントディレクトリ
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 設定ファイルの保存ディレクトリ
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 同じディレクトリの一時ファイルに書いてから置き換える。
/// 途中で中断されても既存のファイルは壊れない
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// 画面表示の言語
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Japanese,
}

impl Language {
    pub fn toggle(self) -> Self {
        match self {
            Language::English => Language::Japanese,
            Language::Japanese => Language::English,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => f.write_str("english"),
            Language::Japanese => f.write_str("japanese"),
        }
    }
}

impl FromStr for Language {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "ja" | "jp" | "japanese" => Ok(Language::Japanese),
            other => Err(SettingsError::UnknownLanguage(other.to_string())),
        }
    }
}

/// 画面に出す文言
#[derive(Debug, Clone, Copy)]
pub struct Strings {
    pub title: &'static str,
    pub help: &'static str,
    pub progress: &'static str,
    pub correct: &'static str,
    pub incorrect: &'static str,
    pub finished: &'static str,
    pub accuracy: &'static str,
    pub mistakes: &'static str,
    pub load_failed: &'static str,
    pub pick_category: &'static str,
    pub pick_group: &'static str,
    pub all_groups: &'static str,
    pub card_count: &'static str,
}

const ENGLISH: Strings = Strings {
    title: "Kana Swipe",
    help: "→/l: correct   ←/h: wrong   Esc/q: quit",
    progress: "Card",
    correct: "Correct",
    incorrect: "Incorrect",
    finished: "Finished!",
    accuracy: "Accuracy",
    mistakes: "Mistakes",
    load_failed: "Could not load any cards.",
    pick_category: "Category",
    pick_group: "Group",
    all_groups: "(all)",
    card_count: "Number of cards (number or `all`)",
};

const JAPANESE: Strings = Strings {
    title: "かなスワイプ",
    help: "→/l: 正しい   ←/h: まちがい   Esc/q: 終了",
    progress: "カード",
    correct: "正解",
    incorrect: "不正解",
    finished: "おわり!",
    accuracy: "正答率",
    mistakes: "まちがえたカード",
    load_failed: "カードを読み込めませんでした。",
    pick_category: "カテゴリ",
    pick_group: "グループ",
    all_groups: "(すべて)",
    card_count: "枚数 (数字 または `all`)",
};

impl Strings {
    pub fn for_language(language: Language) -> &'static Strings {
        match language {
            Language::English => &ENGLISH,
            Language::Japanese => &JAPANESE,
        }
    }
}

/// ユーザー設定。グローバルには持たず、必要な箇所へ明示的に渡す
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub language: Language,
    pub default_card_count: CardCount,
}

impl Settings {
    pub fn default_path() -> PathBuf {
        config_dir().join(SETTINGS_FILE)
    }

    pub fn strings(&self) -> &'static Strings {
        Strings::for_language(self.language)
    }

    /// 読み込みに失敗した場合はデフォルト値
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("failed to read settings from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, serde_json::to_string_pretty(self)?.as_bytes())?;
        log::info!("settings saved to {}", path.display());
        Ok(())
    }
}
