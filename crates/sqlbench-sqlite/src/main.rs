//! sqlbench CLI
//!
//! Command-line front end for the SQL workbench.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sqlbench_client::{
    Confirm, JsonFileSettings, LegacyState, Modal, NotificationKind, PersistedSettings,
    QueryService, ResultView, Workbench,
};
use sqlbench_core::{classify, Verdict};
use sqlbench_sqlite::{connect, SqliteQueryService, SqliteRecordStore};

type Bench = Workbench<SqliteQueryService, SqliteRecordStore>;

/// Run, inspect and edit SQL results from the terminal.
#[derive(Parser)]
#[command(name = "sqlbench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database the statements run against.
    #[arg(short, long, env = "SQLBENCH_DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Database holding history and quick-access records.
    #[arg(short, long, env = "SQLBENCH_RECORDS_URL", default_value = "sqlite:local_data.db")]
    records: String,

    /// Client settings file.
    #[arg(short, long, default_value = ".sqlbench/settings.json")]
    settings: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a statement and show its result.
    Run {
        /// SQL statement.
        sql: String,
    },

    /// Run a statement and report whether its rows are editable.
    Classify {
        /// SQL statement.
        sql: String,
    },

    /// Change one cell of a query result.
    Edit {
        /// Query producing the rows.
        sql: String,

        /// Zero-based row position.
        row: usize,

        /// Column to change.
        column: String,

        /// New value. An empty value stores NULL.
        value: String,
    },

    /// Delete one row of a query result.
    DeleteRow {
        /// Query producing the rows.
        sql: String,

        /// Zero-based row position.
        row: usize,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Insert a row into the table behind a query.
    InsertRow {
        /// Query naming the table.
        sql: String,

        /// Column values as `column=value`.
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },

    /// List statement history, or delete one entry.
    History {
        /// History entry to delete.
        #[arg(long)]
        delete: Option<i64>,
    },

    /// Manage quick-access shortcuts.
    #[command(subcommand)]
    Shortcuts(ShortcutCommands),

    /// Import history and shortcuts saved by an older client.
    ImportLegacy {
        /// JSON file holding the legacy client state.
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ShortcutCommands {
    /// List shortcuts in display order.
    List,

    /// Save a new shortcut.
    Add {
        /// Display name.
        name: String,
        /// Saved statement.
        sql: String,
    },

    /// Change a shortcut's name or statement.
    Update {
        /// Shortcut id.
        id: i64,
        /// New display name.
        #[arg(long)]
        name: Option<String>,
        /// New statement.
        #[arg(long)]
        sql: Option<String>,
    },

    /// Delete a shortcut.
    Remove {
        /// Shortcut id.
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a shortcut between zero-based positions.
    Move {
        /// Current position.
        from: usize,
        /// New position.
        to: usize,
    },

    /// Run a shortcut's statement.
    Run {
        /// Shortcut id.
        id: i64,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(column, value)| (column.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected column=value, got `{raw}`"))
}

/// Asks on stdin unless confirmation was given up front.
struct Prompt {
    assume_yes: bool,
}

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let database = connect(&cli.database)
        .await
        .with_context(|| format!("cannot open {}", cli.database))?;
    let records = connect(&cli.records)
        .await
        .with_context(|| format!("cannot open {}", cli.records))?;
    let store = SqliteRecordStore::new(records);
    store.ensure_tables().await?;
    let settings = PersistedSettings::open(JsonFileSettings::new(&cli.settings))?;

    let mut bench = Workbench::new(SqliteQueryService::new(database), store, settings);
    bench.load().await;

    match cli.command {
        Commands::Run { sql } => {
            run(&mut bench, sql).await;
            print_view(bench.view());
        }

        Commands::Classify { sql } => {
            let payload = bench.service().execute(sql.trim()).await?;
            match payload.rows().map(|rows| classify(&sql, rows)) {
                Some(Verdict::Editable { table, id_column }) => {
                    println!("Editable: table {table} keyed by {id_column}");
                }
                Some(Verdict::ReadOnly(reason)) => println!("Read-only: {reason}"),
                None => println!("Read-only: the statement returned no rows"),
            }
        }

        Commands::Edit {
            sql,
            row,
            column,
            value,
        } => {
            run(&mut bench, sql).await;
            require_editable(&bench)?;
            bench.edit_cell(row, &column, &value).await?;
        }

        Commands::DeleteRow { sql, row, yes } => {
            run(&mut bench, sql).await;
            require_editable(&bench)?;
            if !bench.delete_row(row, &Prompt { assume_yes: yes }).await? {
                info!("Row kept.");
            }
        }

        Commands::InsertRow { sql, values } => {
            run(&mut bench, sql).await;
            bench.open_add_row()?;
            for (column, value) in values {
                if !bench.set_modal_field(&column, value) {
                    bail!("`{column}` cannot be set on insert");
                }
            }
            bench.confirm_modal().await;
            print_view(bench.view());
        }

        Commands::History { delete } => {
            if let Some(id) = delete {
                bench.delete_history(id).await;
            }
            for entry in bench.history() {
                println!(
                    "{:>5}  {}  {}",
                    entry.id,
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.sql
                );
            }
        }

        Commands::Shortcuts(command) => shortcuts(&mut bench, command).await?,

        Commands::ImportLegacy { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let legacy = LegacyState::from_json(&text)?;
            let report = bench.migrate(&legacy).await?;
            if !report.ran {
                info!("Legacy state was already imported.");
            }
        }
    }

    if !bench.status().is_empty() {
        info!("{}", bench.status());
    }
    report_notifications(&mut bench)
}

async fn run(bench: &mut Bench, sql: String) {
    bench.set_editor(sql);
    bench.run_query().await;
}

fn require_editable(bench: &Bench) -> anyhow::Result<()> {
    match bench.view() {
        ResultView::Editable(_) => Ok(()),
        ResultView::ReadOnly { reason, .. } => bail!("rows are read-only: {reason}"),
        _ => bail!("the statement returned no rows"),
    }
}

async fn shortcuts(bench: &mut Bench, command: ShortcutCommands) -> anyhow::Result<()> {
    match command {
        ShortcutCommands::List => {}
        ShortcutCommands::Add { name, sql } => {
            bench.open_add_shortcut();
            bench.set_modal_field(Modal::NAME_FIELD, name);
            bench.set_modal_field(Modal::SQL_FIELD, sql);
            bench.confirm_modal().await;
        }
        ShortcutCommands::Update { id, name, sql } => {
            bench.open_edit_shortcut(id)?;
            if let Some(name) = name {
                bench.set_modal_field(Modal::NAME_FIELD, name);
            }
            if let Some(sql) = sql {
                bench.set_modal_field(Modal::SQL_FIELD, sql);
            }
            bench.confirm_modal().await;
        }
        ShortcutCommands::Remove { id, yes } => {
            bench.delete_shortcut(id, &Prompt { assume_yes: yes }).await?;
        }
        ShortcutCommands::Move { from, to } => {
            if !bench.move_shortcut(from, to).await {
                bail!("position out of range");
            }
        }
        ShortcutCommands::Run { id } => {
            bench.run_shortcut(id).await?;
            print_view(bench.view());
            return Ok(());
        }
    }
    for (position, shortcut) in bench.shortcuts().items().iter().enumerate() {
        println!(
            "{position:>3}  #{:<4} {:<24} {}",
            shortcut.id, shortcut.name, shortcut.sql
        );
    }
    Ok(())
}

fn print_table(columns: &[String], rows: &[Vec<String>]) {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .chain([name.len()])
                .max()
                .unwrap_or_default()
        })
        .collect();
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    println!("{}", line(columns));
    println!("{:-<1$}", "", widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1));
    for row in rows {
        println!("{}", line(row));
    }
}

fn print_view(view: &ResultView) {
    match view {
        ResultView::Empty => println!("{}", ResultView::EMPTY_MESSAGE),
        ResultView::Text(text) => println!("{text}"),
        ResultView::Document(doc) => {
            println!("{}", serde_json::to_string_pretty(doc).unwrap_or_default());
        }
        ResultView::ReadOnly { result, reason } => {
            let rows: Vec<Vec<String>> = result
                .rows()
                .iter()
                .map(|row| row.values().iter().map(ToString::to_string).collect())
                .collect();
            print_table(result.columns(), &rows);
            println!("(read-only: {reason})");
        }
        ResultView::Editable(session) => {
            println!(
                "(editable: {} keyed by {})",
                session.table(),
                session.id_column()
            );
            let mut columns = vec!["#".to_string()];
            columns.extend(session.columns().iter().cloned());
            let rows: Vec<Vec<String>> = session
                .rows()
                .iter()
                .map(|row| {
                    let mut cells = vec![row.key().to_string()];
                    cells.extend(row.cells().iter().map(|c| c.text().to_string()));
                    cells
                })
                .collect();
            print_table(&columns, &rows);
        }
    }
}

fn report_notifications(bench: &mut Bench) -> anyhow::Result<()> {
    let mut failed = false;
    for notification in bench.take_notifications() {
        match notification.kind {
            NotificationKind::Info => info!("{}", notification.message),
            NotificationKind::Error => {
                warn!("{}", notification.message);
                failed = true;
            }
        }
    }
    if failed {
        bail!("the last operation failed");
    }
    Ok(())
}
