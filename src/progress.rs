// ============================================
// src/progress.rs
// カテゴリ・アイテムごとの学習スコアの保存と集計
// ============================================

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings;

const PROGRESS_FILE: &str = "progress.json";

/// スコアの下限
pub const MIN_SCORE: i32 = -5;
/// このスコア以上で「習得済み」
pub const MASTERED_SCORE: i32 = 3;
/// このスコア以上 (習得未満) で「学習中」
pub const LEARNING_SCORE: i32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// 1アイテム分の記録
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub score: i32,
    pub learned: bool,
}

impl ProgressRecord {
    /// 正解: 上限なしで +1
    pub fn record_correct(&mut self) {
        self.score = self.score.saturating_add(1);
        self.learned = true;
    }

    /// 不正解: 0以上なら -1 へ落とし、マイナスなら -5 まで 1 ずつ下げる
    pub fn record_wrong(&mut self) {
        self.score = if self.score >= 0 {
            -1
        } else {
            (self.score - 1).max(MIN_SCORE)
        };
        self.learned = true;
    }

    pub fn apply(&mut self, correct: bool) {
        if correct {
            self.record_correct();
        } else {
            self.record_wrong();
        }
    }
}

/// カテゴリ1つ分の保存データ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProgress {
    #[serde(default)]
    pub progress: BTreeMap<String, ProgressRecord>,
    pub last_played: DateTime<Utc>,
}

impl CategoryProgress {
    fn new() -> Self {
        Self {
            progress: BTreeMap::new(),
            last_played: Utc::now(),
        }
    }
}

/// 保存ファイル全体 (カテゴリ名 → 進捗)
pub type ProgressDocument = BTreeMap<String, CategoryProgress>;

/// `record_results` に渡す1件分の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub item_id: String,
    pub correct: bool,
}

impl ItemResult {
    pub fn new(item_id: impl Into<String>, correct: bool) -> Self {
        Self {
            item_id: item_id.into(),
            correct,
        }
    }
}

/// カテゴリの集計結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub total: usize,
    pub mastered: usize,
    pub learning: usize,
    pub struggling: usize,
    /// 小数第1位で丸めた平均スコア
    pub average_score: f64,
}

/// 保存先の抽象化。読み書きは常にドキュメント全体
pub trait ProgressBackend {
    fn load(&self) -> Result<ProgressDocument>;
    fn save(&mut self, document: &ProgressDocument) -> Result<()>;
}

/// JSONファイルへの保存
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// OS標準のデータディレクトリ配下の progress.json
    pub fn default_location() -> Self {
        Self::new(settings::data_dir().join(PROGRESS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressBackend for JsonFileBackend {
    fn load(&self) -> Result<ProgressDocument> {
        if !self.path.exists() {
            return Ok(ProgressDocument::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&mut self, document: &ProgressDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        settings::write_atomic(self.path(), json.as_bytes())?;
        Ok(())
    }
}

/// メモリ上だけに保持する (テスト・保存しないプレイ用)
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    document: ProgressDocument,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> &ProgressDocument {
        &self.document
    }
}

impl ProgressBackend for MemoryBackend {
    fn load(&self) -> Result<ProgressDocument> {
        Ok(self.document.clone())
    }

    fn save(&mut self, document: &ProgressDocument) -> Result<()> {
        self.document = document.clone();
        Ok(())
    }
}

/// 学習進捗ストア。
///
/// 保存先の読み書きに失敗してもエラーは外に出さず、ログに残して
/// 空の記録として扱う。クイズの進行を止めないため。
pub struct ProgressStore {
    backend: Box<dyn ProgressBackend>,
}

impl ProgressStore {
    pub fn new(backend: impl ProgressBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// 読み込みに失敗したら `None` (ファイルが無いだけなら空のドキュメント)
    fn try_read(&self) -> Option<ProgressDocument> {
        match self.backend.load() {
            Ok(document) => Some(document),
            Err(e) => {
                log::warn!("failed to read progress, using empty records: {}", e);
                None
            }
        }
    }

    fn read(&self) -> ProgressDocument {
        self.try_read().unwrap_or_default()
    }

    fn write(&mut self, document: &ProgressDocument) {
        if let Err(e) = self.backend.save(document) {
            log::warn!("failed to save progress: {}", e);
        }
    }

    /// 読み込み → 変更 → 書き込み。カテゴリの lastPlayed も更新する。
    ///
    /// 読み込みに失敗した場合は空の記録に対して計算だけ行い、書き込みはしない。
    /// 保存済みの他カテゴリを空のドキュメントで上書きしないため。
    fn update<T>(&mut self, category: &str, f: impl FnOnce(&mut CategoryProgress) -> T) -> T {
        let loaded = self.try_read();
        let readable = loaded.is_some();
        let mut document = loaded.unwrap_or_default();
        let entry = document
            .entry(category.to_string())
            .or_insert_with(CategoryProgress::new);
        let result = f(entry);
        entry.last_played = Utc::now();
        if readable {
            self.write(&document);
        } else {
            log::warn!("progress for {} not saved: stored data could not be read", category);
        }
        result
    }

    pub fn record_correct(&mut self, category: &str, item_id: &str) -> ProgressRecord {
        self.record(category, item_id, true)
    }

    pub fn record_wrong(&mut self, category: &str, item_id: &str) -> ProgressRecord {
        self.record(category, item_id, false)
    }

    pub fn record(&mut self, category: &str, item_id: &str, correct: bool) -> ProgressRecord {
        let record = self.update(category, |entry| {
            let record = entry.progress.entry(item_id.to_string()).or_default();
            record.apply(correct);
            *record
        });
        log::debug!("{}/{} -> score {}", category, item_id, record.score);
        record
    }

    /// 複数の結果を入力順に反映し、書き込みは1回だけ行う
    pub fn record_results(&mut self, category: &str, results: &[ItemResult]) -> CategoryProgress {
        self.update(category, |entry| {
            for result in results {
                entry
                    .progress
                    .entry(result.item_id.clone())
                    .or_default()
                    .apply(result.correct);
            }
            entry.clone()
        })
    }

    pub fn category_progress(&self, category: &str) -> Option<CategoryProgress> {
        self.read().remove(category)
    }

    pub fn item_progress(&self, category: &str, item_id: &str) -> Option<ProgressRecord> {
        self.read()
            .get(category)
            .and_then(|entry| entry.progress.get(item_id).copied())
    }

    /// 記録のあるカテゴリと最終プレイ日時
    pub fn categories(&self) -> Vec<(String, DateTime<Utc>)> {
        self.read()
            .into_iter()
            .map(|(name, entry)| (name, entry.last_played))
            .collect()
    }

    pub fn category_stats(&self, category: &str) -> CategoryStats {
        let Some(entry) = self.category_progress(category) else {
            return CategoryStats::default();
        };
        let records: Vec<&ProgressRecord> = entry.progress.values().collect();
        if records.is_empty() {
            return CategoryStats::default();
        }

        let total_score: i64 = records.iter().map(|r| r.score as i64).sum();
        let average = total_score as f64 / records.len() as f64;

        CategoryStats {
            total: records.len(),
            mastered: records.iter().filter(|r| r.score >= MASTERED_SCORE).count(),
            learning: records
                .iter()
                .filter(|r| (LEARNING_SCORE..MASTERED_SCORE).contains(&r.score))
                .count(),
            struggling: records.iter().filter(|r| r.score <= 0 && r.learned).count(),
            average_score: round_to_tenth(average),
        }
    }

    pub fn reset_category(&mut self, category: &str) {
        let Some(mut document) = self.try_read() else {
            return;
        };
        if document.remove(category).is_some() {
            self.write(&document);
            log::info!("progress reset for {}", category);
        }
    }

    pub fn reset_all(&mut self) {
        self.write(&ProgressDocument::new());
        log::info!("all progress reset");
    }
}

/// 小数第1位に丸める。0.5 は常に正の方向へ (-1.25 → -1.2)
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}
