//! CLI entry point.
//!
//! # Responsibility
//! - `status` (default): verify `remindnote_core` linkage and report the
//!   configured store location and how many notes it holds.
//! - `watch`: host the reminder scheduler in the terminal until Ctrl-C.
//!
//! # Invariants
//! - Logging starts from `CoreConfig` before the store is touched; a logging
//!   failure is reported but does not stop the command.

use clap::{Parser, Subcommand};
use remindnote_core::db::open_db;
use remindnote_core::{
    BlockingAlert, ChannelNotifier, CoreConfig, NoteStore, ReminderScheduler, SqliteKvRepository,
    SystemClock,
};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "remindnote")]
#[command(about = "Notes with one-shot reminders")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Print store location, note count and pending reminders
    Status,
    /// Check reminders every interval and print due ones until Ctrl-C
    Watch,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = config.init_logging() {
        eprintln!("logging disabled: {err}");
    }

    let conn = match open_db(&config.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("store open failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut store = match SqliteKvRepository::try_new(&conn) {
        Ok(repo) => NoteStore::new(repo),
        Err(err) => {
            eprintln!("store init failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            print_status(&config, &store);
            ExitCode::SUCCESS
        }
        Commands::Watch => watch(&config, &mut store),
    }
}

fn print_status(config: &CoreConfig, store: &NoteStore<SqliteKvRepository<'_>>) {
    println!("remindnote_core ping={}", remindnote_core::ping());
    println!("remindnote_core version={}", remindnote_core::core_version());
    println!("store path={}", config.db_path.display());
    println!("check interval_secs={}", config.check_interval.as_secs());

    let notes = store.list();
    let pending = notes
        .iter()
        .filter(|note| note.reminder.is_some() && !note.reminder_fired)
        .count();
    println!("notes total={} pending_reminders={}", notes.len(), pending);
}

fn watch(config: &CoreConfig, store: &mut NoteStore<SqliteKvRepository<'_>>) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("runtime start failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let scheduler = ReminderScheduler::from_config(Arc::new(SystemClock), config);
    println!(
        "watching reminders every {}s, Ctrl-C to stop",
        scheduler.interval().as_secs()
    );
    let ticks = runtime.block_on(async {
        let notifier = ChannelNotifier::without_channel(Arc::new(TerminalAlert));
        notifier.request_permission_on_load();
        scheduler
            .run_until(store, &notifier, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
    });
    println!("stopped after {ticks} check(s)");
    ExitCode::SUCCESS
}

/// Prints alerts to stderr; a terminal has no notification channel.
struct TerminalAlert;

impl BlockingAlert for TerminalAlert {
    fn alert(&self, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "\x07{message}");
    }
}
