//! CLI binary for edgequake-pdfjoin.
//!
//! A thin shim over the library crate that maps CLI flags to `MergeConfig`
//! and `BotConfig`, then runs one batch (`merge`) or the Telegram bot (`bot`).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdfjoin::transport::telegram::run_polling;
use edgequake_pdfjoin::{
    process_message, BatchStatus, BotConfig, ConsoleTransport, FetchProgressCallback,
    InboundMessage, MergeConfig, PdfJoinError, PdfJoiner, ProgressCallback, TelegramTransport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One line per link as it finishes, plus a bar for the whole batch. Links
/// complete out of order; lines carry the link number so that is visible.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} links  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Fetching");

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl FetchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_link_start(&self, index: usize, _total: usize, _link: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
    }

    fn on_link_complete(&self, index: usize, total: usize, bytes: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Link {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{:>7} KiB", bytes / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_link_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Link {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} links fetched{}",
            if failed == 0 { green("✔") } else { red("⚠") },
            bold(&success_count.to_string()),
            total,
            if failed == 0 {
                String::new()
            } else {
                format!("  ({} failed)", red(&failed.to_string()))
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge two PDFs into merged.pdf
  pdfjoin merge "https://example.com/a.pdf, https://example.com/b.pdf"

  # Links as separate arguments, custom output
  pdfjoin merge https://example.com/a.pdf https://example.com/b.pdf -o out/book.pdf

  # One link per line from stdin, JSON summary on stdout
  cat links.txt | pdfjoin merge - --json

  # Run the Telegram bot
  TELEGRAM_BOT_TOKEN=123:abc pdfjoin bot

ENVIRONMENT VARIABLES:
  TELEGRAM_BOT_TOKEN        Bot token for `pdfjoin bot`
  PDFJOIN_CONCURRENCY       Downloads in flight per batch
  PDFJOIN_DOWNLOAD_TIMEOUT  Per-link timeout in seconds
  PDFJOIN_MAX_DOWNLOAD_MB   Largest PDF accepted per link
  RUST_LOG                  Overrides the log filter (e.g. edgequake_pdfjoin=debug)
"#;

/// Fetch PDFs from links and merge them into one document.
#[derive(Parser, Debug)]
#[command(
    name = "pdfjoin",
    version,
    about = "Fetch PDFs from links and merge them into one document",
    long_about = "Fetch PDFs from direct links and cloud-storage share links, then merge \
them into a single PDF in the order the links were given. Runs once from the command line \
or as a Telegram bot.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Maximum downloads in flight per batch.
    #[arg(short, long, global = true, env = "PDFJOIN_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "PDFJOIN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Largest accepted PDF per link, in MiB.
    #[arg(long, global = true, env = "PDFJOIN_MAX_DOWNLOAD_MB", default_value_t = 100)]
    max_download_mb: u64,

    /// Compress content streams of the merged PDF.
    #[arg(long, global = true, env = "PDFJOIN_COMPRESS")]
    compress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFJOIN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFJOIN_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFJOIN_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge the PDFs behind a list of links into one file.
    Merge {
        /// Links, separated by commas or new lines. `-` reads them from stdin.
        #[arg(required = true)]
        text: Vec<String>,

        /// Where to write the merged PDF.
        #[arg(short, long, env = "PDFJOIN_OUTPUT", default_value = "merged.pdf")]
        output: PathBuf,

        /// Print the batch summary as JSON on stdout.
        #[arg(long, env = "PDFJOIN_JSON")]
        json: bool,
    },

    /// Run the Telegram bot until interrupted.
    Bot {
        /// Bot token issued by BotFather.
        #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
        token: String,

        /// Bot API root, for self-hosted Bot API servers.
        #[arg(long, env = "PDFJOIN_TELEGRAM_API", default_value = "https://api.telegram.org")]
        api_base: String,

        /// Long-poll timeout for getUpdates, in seconds.
        #[arg(long, env = "PDFJOIN_POLL_TIMEOUT", default_value_t = 30)]
        poll_timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = &cli.common;

    // ── Logging setup ────────────────────────────────────────────────────
    // In `merge` the progress bar replaces INFO logs; the bot has no bar.
    let is_merge = matches!(cli.command, Command::Merge { .. });
    let json = matches!(cli.command, Command::Merge { json: true, .. });
    let show_progress = is_merge && !common.quiet && !common.no_progress && !json;
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Merge {
            ref text,
            ref output,
            json,
        } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn FetchProgressCallback>)
            } else {
                None
            };
            let config = build_config(common, Some(output.as_path()), progress)?;
            run_merge(config, text, output, json, common.quiet).await
        }
        Command::Bot {
            ref token,
            ref api_base,
            poll_timeout,
        } => {
            let config = build_config(common, None, None)?;
            let bot = BotConfig::new(token.clone())
                .api_base(api_base.clone())
                .poll_timeout_secs(poll_timeout);
            run_bot(config, bot).await
        }
    }
}

/// Map CLI args to `MergeConfig`.
fn build_config(
    common: &CommonArgs,
    output: Option<&Path>,
    progress: Option<ProgressCallback>,
) -> Result<MergeConfig> {
    let mut builder = MergeConfig::builder()
        .concurrency(common.concurrency)
        .download_timeout_secs(common.download_timeout)
        .max_download_bytes(common.max_download_mb.saturating_mul(1024 * 1024))
        .compress_output(common.compress);

    // The delivered name follows `-o` when it is a usable *.pdf name.
    if let Some(name) = output
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .filter(|n| n.to_ascii_lowercase().ends_with(".pdf"))
    {
        builder = builder.output_filename(name);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Collect link text from arguments, reading stdin for `-`.
fn read_text(args: &[String]) -> Result<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        if arg == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read links from stdin")?;
            parts.push(buf);
        } else {
            parts.push(arg.clone());
        }
    }
    Ok(parts.join("\n"))
}

async fn run_merge(
    config: MergeConfig,
    args: &[String],
    output: &Path,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let text = read_text(args)?;
    let joiner = PdfJoiner::new(config).context("Failed to initialise HTTP client")?;
    let transport = ConsoleTransport::new(output).quiet(quiet || json);
    let message = InboundMessage { chat_id: 0, text };

    let summary = match process_message(&joiner, &transport, &message).await {
        Ok(summary) => summary,
        Err(PdfJoinError::EmptyInput) => anyhow::bail!("No links found in input"),
        Err(e) => return Err(e).context("Merge failed"),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !quiet && summary.status == BatchStatus::Delivered {
        eprintln!(
            "{}  {} pages  {}ms  →  {}",
            green("✔"),
            summary.merged_pages.unwrap_or(0),
            summary.duration_ms,
            bold(&output.display().to_string()),
        );
    }

    match summary.status {
        BatchStatus::Delivered => Ok(()),
        BatchStatus::AllFailed => anyhow::bail!("None of the links produced a PDF"),
        BatchStatus::MergeFailed => anyhow::bail!("The fetched PDFs could not be merged"),
        BatchStatus::DeliveryFailed => {
            anyhow::bail!("Failed to write {}", output.display())
        }
    }
}

async fn run_bot(config: MergeConfig, bot: BotConfig) -> Result<()> {
    let joiner = Arc::new(PdfJoiner::new(config).context("Failed to initialise HTTP client")?);
    let transport =
        Arc::new(TelegramTransport::new(bot).context("Failed to initialise Telegram client")?);

    tokio::select! {
        res = run_polling(transport, joiner) => res.context("Telegram bot stopped"),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
