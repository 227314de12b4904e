//! skyledger - weather observations on a hash-chained ledger
//!
//! Usage:
//!   skyledger                                   → interactive REPL (form + chat)
//!   skyledger --offline                         → REPL with simulated oracle, no chat
//!   skyledger add --country X --state Y --district Z
//!   skyledger config                            → print effective config
//!   skyledger version

use anyhow::Context;
use clap::{Parser, Subcommand};
use skyledger::render;
use skyledger::{App, Outcome};
use skyledger_core::SkyledgerConfig;
use skyledger_tools::FormInput;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "skyledger",
    about = "Hash-chained ledger of weather observations",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file (TOML)
    #[arg(long, global = true, default_value = "skyledger.toml")]
    config: PathBuf,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Use the simulated oracle and disable the chat assistant
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Repl,
    /// Append one observation through the form path
    Add {
        #[arg(long)]
        country: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        district: String,
    },
    /// Print the effective configuration
    Config,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Version => {
            println!("skyledger v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Config => {
            print!("{}", SkyledgerConfig::load(&cli.config).to_toml());
        }
        Commands::Add { country, state, district } => {
            let app = App::build(SkyledgerConfig::load(&cli.config), cli.offline)
                .context("failed to start (try --offline)")?;
            match app.add(&FormInput::new(country, state, district)).await {
                Ok(block) => print!("{}", render::format_block(&block)),
                Err(e) => anyhow::bail!(e.user_message()),
            }
        }
        Commands::Repl => {
            let app = App::build(SkyledgerConfig::load(&cli.config), cli.offline)
                .context("failed to start (try --offline)")?;
            run_repl(&app).await?;
        }
    }

    Ok(())
}

async fn run_repl(app: &App) -> anyhow::Result<()> {
    print!("{}", app.banner().await);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else { break };
        if line.trim().is_empty() {
            continue;
        }
        match app.dispatch(&line).await {
            Outcome::Print(text) => print!("{}", text),
            Outcome::Quit => break,
        }
    }
    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skyledger=info".into());
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let Some(path) = log_file else {
        registry.init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("--log-file {} does not name a file", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    registry
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}
