// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

use kana_swipe::items::{self, Category, LearnableItem};
use kana_swipe::progress::JsonFileBackend;
use kana_swipe::quiz::{CardCount, QuizError};
use kana_swipe::{Language, ProgressStore, Settings, SwipeQuiz};

mod app;
use app::SwipeApp;

#[derive(Parser)]
#[command(name = "kana-swipe", about = "Swipe quiz for hiragana, katakana and vocabulary", version)]
struct Cli {
    /// Settings file (default: OS config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play a swipe quiz (default)
    Play {
        /// hiragana, katakana or vocabulary
        #[arg(long)]
        category: Option<Category>,
        /// Row or theme inside the category (default: all groups)
        #[arg(long)]
        group: Option<String>,
        /// Number of cards, or `all`
        #[arg(long)]
        count: Option<CardCount>,
        /// Load the item pool from a `{ "items": [...] }` JSON file
        #[arg(long)]
        items: Option<PathBuf>,
        /// Do not write progress to disk
        #[arg(long)]
        no_save: bool,
    },

    /// Show learning progress
    Stats {
        #[arg(long)]
        category: Option<Category>,
    },

    /// Clear learning progress
    Reset {
        /// Category to clear
        category: Option<Category>,
        /// Clear every category
        #[arg(long, conflicts_with = "category")]
        all: bool,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Set the interface language, or toggle it when omitted
    Lang { language: Option<Language> },

    /// List the groups of a category
    Groups { category: Category },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let settings_path = cli.settings.unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path);

    match cli.command.unwrap_or(Command::Play {
        category: None,
        group: None,
        count: None,
        items: None,
        no_save: false,
    }) {
        Command::Play {
            category,
            group,
            count,
            items,
            no_save,
        } => play(settings, settings_path, category, group, count, items, no_save),
        Command::Stats { category } => {
            print_stats(&open_store(false), category);
            Ok(())
        }
        Command::Reset { category, all, yes } => reset(category, all, yes),
        Command::Lang { language } => {
            let mut settings = settings;
            settings.language = language.unwrap_or_else(|| settings.language.toggle());
            settings.save(&settings_path).context("failed to save settings")?;
            println!("{}", settings.language);
            Ok(())
        }
        Command::Groups { category } => {
            for group in items::groups(category) {
                println!("{}", group);
            }
            Ok(())
        }
    }
}

fn open_store(no_save: bool) -> ProgressStore {
    if no_save {
        return ProgressStore::in_memory();
    }
    let backend = JsonFileBackend::default_location();
    log::debug!("progress file: {}", backend.path().display());
    ProgressStore::new(backend)
}

// --------------------------------------------------
// play
// --------------------------------------------------

fn play(
    settings: Settings,
    settings_path: PathBuf,
    category: Option<Category>,
    group: Option<String>,
    count: Option<CardCount>,
    items_path: Option<PathBuf>,
    no_save: bool,
) -> anyhow::Result<()> {
    let strings = settings.strings();
    let theme = ColorfulTheme::default();

    // カテゴリが指定されていなければメニューで選ぶ
    let (category, group) = match category {
        Some(category) => (category, group),
        None => {
            let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
            let idx = Select::with_theme(&theme)
                .with_prompt(strings.pick_category)
                .items(&names[..])
                .default(0)
                .interact()?;
            let category = Category::ALL[idx];

            let group = match (group, items_path.is_some()) {
                (Some(group), _) => Some(group),
                (None, true) => None,
                (None, false) => pick_group(&theme, strings.pick_group, strings.all_groups, category)?,
            };
            (category, group)
        }
    };

    let count = match count {
        Some(count) => count,
        None => Input::<String>::with_theme(&theme)
            .with_prompt(strings.card_count)
            .default(settings.default_card_count.to_string())
            .validate_with(|input: &String| input.parse::<CardCount>().map(|_| ()).map_err(|e| e.to_string()))
            .interact_text()?
            .parse()?,
    };

    let pool = load_pool(category, group.as_deref(), items_path.as_deref());

    let mut quiz = SwipeQuiz::new();
    if let Err(e) = quiz.initialize(&pool, count) {
        if e == QuizError::EmptyPool {
            eprintln!("{}", style(strings.load_failed).red().bold());
        }
        anyhow::bail!(e);
    }

    let store = open_store(no_save);
    let mut app = SwipeApp::new(quiz, store, settings, settings_path, category.to_string());
    app::run(&mut app)?;

    print_summary(&app);
    Ok(())
}

fn pick_group(
    theme: &ColorfulTheme,
    prompt: &str,
    all_label: &str,
    category: Category,
) -> anyhow::Result<Option<String>> {
    let groups = items::groups(category);
    let mut labels = vec![all_label];
    labels.extend(groups.iter().copied());

    let idx = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(&labels[..])
        .default(0)
        .interact()?;
    Ok(idx.checked_sub(1).map(|i| groups[i].to_string()))
}

/// 出題プールを読み込む。失敗したら空のプールとして扱う
fn load_pool(category: Category, group: Option<&str>, path: Option<&std::path::Path>) -> Vec<LearnableItem> {
    let result = match path {
        Some(path) => items::load_pool_file(path),
        None => items::builtin_pool(category, group),
    };
    result.unwrap_or_else(|e| {
        log::error!("failed to load items: {}", e);
        Vec::new()
    })
}

fn print_summary(app: &SwipeApp) {
    let strings = app.settings().strings();
    let quiz = app.quiz();
    let stats = quiz.stats();

    println!(
        "{}  {} {}  {} {}  {} {:.1}%",
        style(strings.title).bold(),
        strings.correct,
        style(stats.correct).green(),
        strings.incorrect,
        style(stats.incorrect).red(),
        strings.accuracy,
        stats.accuracy()
    );

    if stats.mistakes.is_empty() {
        return;
    }
    println!("{}:", strings.mistakes);
    for mistake in &stats.mistakes {
        let meaning = mistake
            .item
            .meaning
            .as_deref()
            .map(|m| format!(" ({})", m))
            .unwrap_or_default();
        println!(
            "  {} = {}{}  [shown: {}, swiped {}]",
            style(mistake.item.prompt()).bold(),
            style(&mistake.card.correct_romaji).green(),
            meaning,
            mistake.card.shown_romaji,
            mistake.direction
        );
    }
}

// --------------------------------------------------
// stats / reset
// --------------------------------------------------

fn print_stats(store: &ProgressStore, category: Option<Category>) {
    let categories = match category {
        Some(category) => vec![category],
        None => Category::ALL.to_vec(),
    };
    let last_played: std::collections::HashMap<String, _> = store.categories().into_iter().collect();

    for category in categories {
        let stats = store.category_stats(category.as_str());
        let played = last_played
            .get(category.as_str())
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<11} items {:>3}  {} {:>3}  {} {:>3}  {} {:>3}  avg {:>5.1}  last {}",
            style(category).bold(),
            stats.total,
            style("mastered").green(),
            stats.mastered,
            style("learning").yellow(),
            stats.learning,
            style("struggling").red(),
            stats.struggling,
            stats.average_score,
            played
        );
    }
}

fn reset(category: Option<Category>, all: bool, yes: bool) -> anyhow::Result<()> {
    let target = match (category, all) {
        (Some(category), _) => category.to_string(),
        (None, true) => "all categories".to_string(),
        (None, false) => anyhow::bail!("specify a category or --all"),
    };

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Clear progress for {}?", target))
            .default(false)
            .interact()?;
        if !confirmed {
            return Ok(());
        }
    }

    let mut store = open_store(false);
    match category {
        Some(category) => store.reset_category(category.as_str()),
        None => store.reset_all(),
    }
    println!("{} {}", style("cleared").yellow(), target);
    Ok(())
}
