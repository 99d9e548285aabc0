//! CLI binary for pdfer.
//!
//! A thin shim over the library crate: maps CLI flags to `ClientConfig`,
//! drives one `Workflow` from upload to download, and prints the status line.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfer::{
    ClientConfig, DirectorySink, FileCandidate, Phase, ReplacementRule, RuleSet, Session, Status,
    StatusKind, Workflow, WorkflowObserver,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn paint(status: &Status) -> String {
    match status.kind {
        StatusKind::Success => format!("{} {}", green("✔"), status.message),
        StatusKind::Neutral => format!("{} {}", cyan("◆"), status.message),
        StatusKind::Error => format!("{} {}", red("✘"), red(&status.message)),
    }
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Renders the simulated upload progress as a bar and prints each status line.
/// Error statuses are left to `main`, which reports them once through anyhow.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_prefix("Uploading");
        Arc::new(Self { bar })
    }
}

impl WorkflowObserver for CliObserver {
    fn on_upload_progress(&self, percent: u8) {
        if percent == 0 {
            self.bar.reset();
            self.bar.enable_steady_tick(Duration::from_millis(80));
        }
        self.bar.set_position(u64::from(percent));
        if percent >= 100 {
            self.bar.finish_and_clear();
        }
    }

    fn on_phase_change(&self, _from: Phase, to: Phase) {
        self.bar.set_message(to.to_string());
    }

    fn on_status(&self, status: &Status) {
        if !should_echo(status) {
            return;
        }
        self.bar.suspend(|| eprintln!("{}", paint(status)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload only; reports whether the PDF is encrypted
  pdfer statement.pdf

  # Replace numbers and save modified_statement.pdf into ./out
  pdfer statement.pdf --replace 2024=2003 --replace 07=08 -o out

  # Replacement rules from a JSON object file {"2024": "2003"}
  pdfer statement.pdf --rules rules.json

  # Automatic 21+ date adjustment of an encrypted PDF
  pdfer secret.pdf --password hunter2 --adult-age

  # Machine-readable result
  pdfer statement.pdf --adult-age --json > result.json

ENVIRONMENT VARIABLES:
  PDFER_BACKEND_URL   Base URL of the processing service (default http://localhost:8000)
  PDFER_PASSWORD      Password for encrypted PDFs
  PDFER_OUTPUT_DIR    Directory the processed PDF is saved into
  RUST_LOG            Override the log filter (e.g. pdfer=debug)
"#;

/// Upload, unlock, rewrite and download PDFs through a processing service.
#[derive(Parser, Debug)]
#[command(
    name = "pdfer",
    version,
    about = "Upload, unlock, rewrite and download PDFs through a processing service",
    long_about = "Drives a remote PDF processing service: uploads a PDF, unlocks it with a \
password when it is encrypted, then either replaces numbers according to FROM=TO rules or \
shifts dates so everyone appears 21 or older, and saves the result.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file.
    input: PathBuf,

    /// Password for an encrypted PDF.
    #[arg(long, env = "PDFER_PASSWORD")]
    password: Option<String>,

    /// Replacement rule FROM=TO; repeatable. An empty TO deletes the number.
    #[arg(long = "replace", value_name = "FROM=TO", value_parser = parse_rule)]
    replace: Vec<ReplacementRule>,

    /// JSON object file of replacement rules.
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Shift dates so everyone in the document is 21+, instead of rules.
    #[arg(long, conflicts_with_all = ["replace", "rules"])]
    adult_age: bool,

    /// Directory to save the processed PDF into.
    #[arg(short, long, env = "PDFER_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Base URL of the processing service.
    #[arg(long, env = "PDFER_BACKEND_URL", default_value = pdfer::config::DEFAULT_BASE_URL)]
    backend_url: String,

    /// Print the final session and status as JSON.
    #[arg(long, env = "PDFER_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFER_QUIET")]
    quiet: bool,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PDFER_TIMEOUT", default_value_t = 120)]
    timeout: u64,
}

/// Failures reach the terminal through the returned `anyhow::Error`.
fn should_echo(status: &Status) -> bool {
    status.kind != StatusKind::Error
}

fn parse_rule(s: &str) -> std::result::Result<ReplacementRule, String> {
    ReplacementRule::parse(s).ok_or_else(|| format!("expected FROM=TO, got '{s}'"))
}

/// What `--json` prints.
#[derive(Serialize)]
struct Report<'a> {
    session: &'a Session,
    status: Option<&'a Status>,
    saved_to: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar and status lines are the feedback that matters; keep
    // library INFO logs out of the way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config and workflow ───────────────────────────────────────
    let config = ClientConfig::builder()
        .base_url(cli.backend_url.clone())
        .request_timeout_secs(cli.timeout)
        .build()
        .context("Invalid configuration")?;

    let mut workflow = Workflow::connect(config).context("Failed to set up HTTP client")?;
    if show_progress {
        workflow = workflow.with_observer(CliObserver::new());
    }

    let rules = collect_rules(&cli)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = run(&cli, &mut workflow, rules).await;

    if cli.json {
        let report = Report {
            session: workflow.session(),
            status: workflow.status(),
            saved_to: outcome.as_ref().ok().cloned().flatten(),
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        // The observer already printed status lines when the bar is active.
        if let Some(status) = workflow.status().filter(|s| should_echo(s)) {
            eprintln!("{}", paint(status));
        }
    }

    outcome.map(|_| ())
}

/// Rules from `--rules` first, then every `--replace`.
fn collect_rules(cli: &Cli) -> Result<Option<RuleSet>> {
    let mut rules = Vec::new();
    if let Some(ref path) = cli.rules {
        let from_file = RuleSet::from_json_file(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?;
        rules.extend(from_file.rules().iter().cloned());
    }
    rules.extend(cli.replace.iter().cloned());

    if rules.is_empty() {
        Ok(None)
    } else {
        Ok(Some(RuleSet::from_rules(rules)))
    }
}

/// Drive the workflow; returns where the artifact was saved, if processing ran.
async fn run(cli: &Cli, workflow: &mut Workflow, rules: Option<RuleSet>) -> Result<Option<PathBuf>> {
    let candidate = FileCandidate::from_path(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let mut phase = workflow.select(candidate).await.context("Upload failed")?;

    if phase == Phase::Locked {
        let Some(ref password) = cli.password else {
            bail!(
                "{} is password protected; pass --password or set PDFER_PASSWORD",
                cli.input.display()
            );
        };
        phase = workflow
            .submit_password(password.clone())
            .await
            .context("Unlock failed")?;
    }

    if !cli.quiet && !cli.json {
        if let Some(document) = workflow.session().document() {
            eprintln!(
                "{} {}  {}  {}",
                cyan("◆"),
                bold(&document.display_name),
                dim(&document.size_label()),
                dim(&phase.to_string()),
            );
        }
    }

    let artifact = if cli.adult_age {
        workflow
            .make_adult_age()
            .await
            .context("21+ adjustment failed")?
    } else if let Some(rules) = rules {
        workflow.set_rules(rules).context("Invalid rules")?;
        workflow.process().await.context("Processing failed")?
    } else {
        return Ok(None);
    };

    // The download status replaces the processing summary; print it first.
    if cli.no_progress && !cli.quiet && !cli.json {
        if let Some(status) = workflow.status() {
            eprintln!("{}", paint(status));
        }
    }

    let sink = DirectorySink::new(&cli.output_dir);
    let saved = workflow
        .download(&sink)
        .await
        .with_context(|| format!("Failed to download {}", artifact.filename))?;

    if !cli.quiet && !cli.json {
        if let Some(ref path) = saved.path {
            eprintln!(
                "{}  {}  →  {}",
                green("✔"),
                dim(&format!("{} bytes", saved.size_bytes)),
                bold(&path.display().to_string()),
            );
        }
    }

    Ok(saved.path)
}
