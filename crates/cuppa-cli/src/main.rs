use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cuppa_core::{Gallery, HttpProbe, ItemSource, KvImpl, KvStore, MemKv, Preferences, Theme, ViewItem};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod copy_helpers;
mod doctor;
mod theme;
mod tui;

#[derive(Parser, Debug)]
#[command(name = "cuppa", version, about = "Brew a gallery of random coffee photos")]
#[command(args_override_self = true)]
struct Cli {
    /// Preferences database file (sqlite backend)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Storage backend; overrides settings.toml
    #[arg(long, value_enum, global = true)]
    store: Option<StoreKind>,
    /// Upstream base URL; images come from <URL>/random
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Sqlite,
    Mem,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ThemeAction {
    Dark,
    Light,
    Toggle,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the preferences store if needed and print its location
    InitDb,
    /// Fetch a batch of images and print the resulting view
    Brew {
        /// How many images to fetch (positive whole number)
        #[arg(allow_hyphen_values = true)]
        count: Option<String>,
        /// Only show images whose filename or note contains this text
        #[arg(long)]
        query: Option<String>,
        /// newest | az | za | fav
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Interactive gallery (default when no command is given)
    Gallery,
    /// Toggle the favorite mark of an image id
    Favorite { id: String },
    /// List favorited image ids
    Favorites {
        #[arg(long)]
        json: bool,
    },
    /// Print the note of an image, or replace it with TEXT (blank removes it)
    Note { id: String, text: Option<String> },
    /// List all notes
    Notes {
        #[arg(long)]
        json: bool,
    },
    /// Print the current theme, or change it
    Theme {
        #[arg(value_enum)]
        action: Option<ThemeAction>,
    },
    /// Drop favorites and notes for every id not listed
    Gc {
        #[arg(long = "keep")]
        keep: Vec<String>,
    },
    /// Show effective configuration and paths
    Config {
        #[arg(long)]
        json: bool,
    },
    /// Check the preferences store and the upstream service
    Doctor,
}

#[derive(Serialize)]
struct Row<'a> {
    id: &'a str,
    filename: &'a str,
    source_url: &'a str,
    display_url: &'a str,
    /// Unix milliseconds
    added_at: i64,
    favorite: bool,
    note: Option<&'a str>,
}

impl<'a> From<&'a ViewItem> for Row<'a> {
    fn from(v: &'a ViewItem) -> Self {
        Row {
            id: &v.item.id,
            filename: &v.item.filename,
            source_url: &v.item.source_url,
            display_url: &v.item.display_url,
            added_at: (v.item.added_at.unix_timestamp_nanos() / 1_000_000) as i64,
            favorite: v.favorite,
            note: v.note.as_deref(),
        }
    }
}

fn init_tracing(log_file: Option<PathBuf>) {
    let filter = EnvFilter::try_from_env("CUPPA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let file = log_file.and_then(|p| {
        if let Some(dir) = p.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        std::fs::OpenOptions::new().create(true).append(true).open(p).ok()
    });
    match file {
        Some(f) => {
            let _ = builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(f))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

fn open_store(kind: StoreKind, db: &Path) -> Result<Box<dyn KvStore>> {
    Ok(match kind {
        StoreKind::Mem => Box::new(MemKv::new()),
        StoreKind::Sqlite => Box::new(
            KvImpl::new(db).with_context(|| format!("opening store at {}", db.display()))?,
        ),
    })
}

fn print_rows(view: &[ViewItem], json: bool) -> Result<()> {
    if json {
        let rows: Vec<Row> = view.iter().map(Row::from).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for v in view {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                v.item.id,
                if v.favorite { "*" } else { " " },
                v.item.filename,
                v.item.display_url,
                v.note.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Gallery);
    let interactive = matches!(command, Commands::Gallery);
    init_tracing(interactive.then(config::log_path));

    let settings = config::load_settings();
    let db = settings.db_path(cli.db.as_ref());
    let kind = cli.store.unwrap_or(match settings.storage {
        config::Storage::Memory => StoreKind::Mem,
        config::Storage::LocalSqlite { .. } => StoreKind::Sqlite,
    });
    let base_url = cli.base_url.clone().unwrap_or_else(|| settings.base_url());
    let source = ItemSource::new(
        base_url,
        HttpProbe::new(&settings.user_agent(), settings.timeout()),
    );

    if let Commands::Doctor = command {
        doctor::run(&source, open_store(kind, &db), &db);
        return Ok(());
    }

    let store = open_store(kind, &db)?;
    store.init()?;
    let prefs = Preferences::new(store);

    match command {
        Commands::InitDb => match kind {
            StoreKind::Sqlite => println!("store ready at {}", db.display()),
            StoreKind::Mem => println!("store ready (memory)"),
        },
        Commands::Brew { count, query, sort, json } => {
            let mut gallery = Gallery::new(source, prefs);
            if let Some(q) = query {
                if let Err(e) = gallery.set_query(&q) {
                    eprintln!("{}", e);
                }
            }
            if let Some(s) = sort {
                if gallery.set_sort(&s).is_none() {
                    eprintln!("unknown sort mode {:?}; showing brew order", s);
                }
            }
            let count = count.unwrap_or_else(|| settings.default_count().to_string());
            gallery.brew(&count)?;
            print_rows(&gallery.view(), json)?;
        }
        Commands::Gallery => {
            let mut gallery = Gallery::new(source, prefs);
            let opts = tui::Options {
                draw: true,
                background: true,
                alt_screen: settings.alt_screen(),
                default_count: settings.default_count(),
                refresh: Duration::from_millis(settings.refresh_ms()),
                palette_file: settings.theme_file(),
            };
            tui::run_gallery_default(&mut gallery, &opts)?;
        }
        Commands::Favorite { id } => {
            if prefs.toggle_favorite(&id)? {
                println!("favorited {}", id);
            } else {
                println!("unfavorited {}", id);
            }
        }
        Commands::Favorites { json } => {
            let ids = prefs.favorites();
            if json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        Commands::Note { id, text } => match text {
            Some(t) => {
                prefs.set_note(&id, &t)?;
                if t.trim().is_empty() {
                    println!("note removed {}", id);
                } else {
                    println!("noted {}", id);
                }
            }
            None => {
                let note = prefs.note(&id);
                if !note.is_empty() {
                    println!("{}", note);
                }
            }
        },
        Commands::Notes { json } => {
            let notes = prefs.notes();
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else {
                for (id, note) in notes {
                    println!("{}\t{}", id, note);
                }
            }
        }
        Commands::Theme { action } => {
            let theme = match action {
                None => prefs.theme(),
                Some(ThemeAction::Toggle) => prefs.toggle_theme()?,
                Some(ThemeAction::Dark) => {
                    prefs.set_theme(Theme::Dark)?;
                    Theme::Dark
                }
                Some(ThemeAction::Light) => {
                    prefs.set_theme(Theme::Light)?;
                    Theme::Light
                }
            };
            println!("{}", theme);
        }
        Commands::Gc { keep } => {
            let live: HashSet<&str> = keep.iter().map(String::as_str).collect();
            let removed = prefs.forget_missing(&live)?;
            println!("removed {}", removed);
        }
        Commands::Config { json } => {
            let storage = match kind {
                StoreKind::Sqlite => "localsqlite",
                StoreKind::Mem => "memory",
            };
            if json {
                let v = serde_json::json!({
                    "config_dir": config::config_dir(),
                    "settings_path": config::settings_path(),
                    "log_path": config::log_path(),
                    "storage": storage,
                    "db_path": db,
                    "base_url": source.base_url(),
                    "default_count": settings.default_count(),
                    "theme": prefs.theme(),
                });
                println!("{}", serde_json::to_string_pretty(&v)?);
            } else {
                println!("config_dir: {}", config::config_dir().display());
                println!("settings: {}", config::settings_path().display());
                println!("log: {}", config::log_path().display());
                println!("storage: {}", storage);
                if kind == StoreKind::Sqlite {
                    println!("db_path: {}", db.display());
                }
                println!("base_url: {}", source.base_url());
                println!("default_count: {}", settings.default_count());
                println!("theme: {}", prefs.theme());
            }
        }
        Commands::Doctor => {}
    }
    Ok(())
}
