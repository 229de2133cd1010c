// ============================================
// src/app.rs
// スワイプ画面 (TUI) の状態管理と描画
// ============================================

use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};

use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use kana_swipe::quiz::{DisplayCard, QuizState, SwipeDirection, SwipeQuiz};
use kana_swipe::{ProgressStore, Settings};

/// 直前のスワイプの結果表示用
struct LastSwipe {
    card: DisplayCard,
    is_correct: bool,
}

/// プレイ中の状態
pub struct SwipeApp {
    quiz: SwipeQuiz,
    store: ProgressStore,
    settings: Settings,
    settings_path: PathBuf,
    /// 進捗のキーになるカテゴリ名
    category: String,
    last_swipe: Option<LastSwipe>,
}

impl SwipeApp {
    pub fn new(
        quiz: SwipeQuiz,
        store: ProgressStore,
        settings: Settings,
        settings_path: PathBuf,
        category: String,
    ) -> Self {
        Self {
            quiz,
            store,
            settings,
            settings_path,
            category,
            last_swipe: None,
        }
    }

    pub fn quiz(&self) -> &SwipeQuiz {
        &self.quiz
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// スワイプを処理し、結果を進捗ストアへ記録する
    fn handle_swipe(&mut self, direction: SwipeDirection) -> anyhow::Result<()> {
        let Some(card) = self.quiz.current_card().cloned() else {
            return Ok(());
        };
        let outcome = self.quiz.swipe(direction)?;
        // 保存の失敗はストア側でログに残るだけで、クイズは続行する
        self.store
            .record(&self.category, &outcome.item.id, outcome.is_correct);
        self.last_swipe = Some(LastSwipe {
            card,
            is_correct: outcome.is_correct,
        });
        Ok(())
    }

    fn toggle_language(&mut self) {
        self.settings.language = self.settings.language.toggle();
        if let Err(e) = self.settings.save(&self.settings_path) {
            log::warn!("failed to save settings: {}", e);
        }
    }
}

// --------------------------------------------------
// TUIセットアップと実行ループ
// --------------------------------------------------

fn setup_terminal() -> std::io::Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(Hide)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal() -> std::io::Result<()> {
    stdout().execute(Show)?;
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// スワイプ画面を起動し、終了したら端末を元に戻す
pub fn run(app: &mut SwipeApp) -> anyhow::Result<()> {
    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, app);
    restore_terminal()?;
    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut SwipeApp) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => break,
            KeyCode::Char('t') => app.toggle_language(),
            _ if app.quiz.state() == QuizState::Finished => break,
            KeyCode::Right | KeyCode::Char('l') => app.handle_swipe(SwipeDirection::Right)?,
            KeyCode::Left | KeyCode::Char('h') => app.handle_swipe(SwipeDirection::Left)?,
            _ => {}
        }
    }
    Ok(())
}

// --------------------------------------------------
// UI描画
// --------------------------------------------------

fn ui(f: &mut Frame, app: &SwipeApp) {
    let strings = app.settings.strings();
    let size = f.area();
    let block = Block::default().borders(Borders::ALL).title(strings.title);
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] 進行ゲージ
            Constraint::Length(1), // [1] 直前の結果
            Constraint::Length(1), // [2] 空白
            Constraint::Length(1), // [3] 出題
            Constraint::Length(1), // [4] ローマ字
            Constraint::Length(1), // [5] 空白
            Constraint::Min(1),    // [6] 後続カード
            Constraint::Length(1), // [7] 操作説明
        ])
        .split(inner_area);

    let quiz = &app.quiz;
    let stats = quiz.stats();

    // 0. 進行ゲージ
    let total = quiz.total_cards();
    let ratio = if total > 0 {
        (quiz.current_index() as f64 / total as f64).min(1.0)
    } else {
        0.0
    };
    let label = format!(
        "{} {} / {}   {}: {}  {}: {}",
        strings.progress,
        quiz.current_index(),
        total,
        strings.correct,
        stats.correct,
        strings.incorrect,
        stats.incorrect
    );
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(ratio)
        .label(label);
    f.render_widget(gauge, chunks[0]);

    // 1. 直前の結果
    if let Some(last) = &app.last_swipe {
        let (mark, color) = if last.is_correct {
            (strings.correct, Color::Green)
        } else {
            (strings.incorrect, Color::Red)
        };
        let line = Line::from(vec![
            Span::styled(mark, Style::default().fg(color).bold()),
            Span::raw(format!(
                "  {} = {}",
                last.card.item.prompt(),
                last.card.correct_romaji
            )),
        ]);
        f.render_widget(Paragraph::new(line).centered(), chunks[1]);
    }

    if quiz.state() == QuizState::Finished {
        let summary = vec![
            Line::from(strings.finished).style(Style::default().fg(Color::Yellow).bold()),
            Line::from(format!("{}: {:.1}%", strings.accuracy, stats.accuracy())),
        ];
        f.render_widget(Paragraph::new(summary).centered(), chunks[3].union(chunks[4]));
        return;
    }

    // 2. 現在のカードと後続カード
    let stack = quiz.card_stack();
    if let Some((current, rest)) = stack.split_first() {
        f.render_widget(
            Paragraph::new(current.item.prompt())
                .style(Style::default().fg(Color::White).bold())
                .centered(),
            chunks[3],
        );
        f.render_widget(
            Paragraph::new(current.shown_romaji.as_str())
                .style(Style::default().fg(Color::Cyan))
                .centered(),
            chunks[4],
        );

        let upcoming: Vec<Span> = rest
            .iter()
            .map(|card| Span::styled(format!(" {} ", card.item.prompt()), Style::default().fg(Color::DarkGray)))
            .collect();
        f.render_widget(Paragraph::new(Line::from(upcoming)).centered(), chunks[6]);
    }

    f.render_widget(
        Paragraph::new(strings.help)
            .style(Style::default().fg(Color::Gray))
            .centered(),
        chunks[7],
    );
}
