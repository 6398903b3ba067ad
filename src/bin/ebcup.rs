//! CLI binary for ebcdic-upload.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `UploadConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use ebcdic_upload::download::download_archives;
use ebcdic_upload::pipeline::selection::upload_name;
use ebcdic_upload::pipeline::transfer::build_client;
use ebcdic_upload::{
    render_html, render_text, validate_selection, FileOutcome, OutputFormat, ProgressCallback,
    UploadConfig, UploadController, UploadError, UploadProgressCallback, KNOWN_DEST_ENCODINGS,
    KNOWN_SOURCE_ENCODINGS,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a 0–100 % bar that fills from upload bytes
/// and then from the finalisation walk.
///
/// The bar is created hidden and only attached to stderr once a cycle
/// starts, so a refused selection leaves the terminal untouched.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Uploading");
        Arc::new(Self { bar })
    }
}

impl UploadProgressCallback for CliProgressCallback {
    fn on_cycle_start(&self, file_count: usize, total_bytes: u64) {
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar.set_position(0);
        self.bar.set_message(format!("{file_count} file(s), {total_bytes} bytes"));
    }

    fn on_progress(&self, percent: u8) {
        if percent > 80 {
            self.bar.set_prefix("Converting");
        }
        self.bar.set_position(u64::from(percent));
    }

    fn on_results(&self, outcomes: &[FileOutcome]) {
        self.bar.finish_and_clear();
        let rejected = outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Rejected { .. }))
            .count();
        if rejected == 0 {
            eprintln!(
                "{} {} file(s) converted",
                green("✔"),
                bold(&outcomes.len().to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) converted  ({} rejected)",
                cyan("⚠"),
                bold(&(outcomes.len() - rejected).to_string()),
                outcomes.len(),
                red(&rejected.to_string()),
            );
        }
    }

    fn on_failure(&self, message: &str) {
        self.bar.abandon_with_message(red("failed"));
        eprintln!("{} {}", red("✘"), message);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert two files with server-side code page detection
  ebcup report.EBC data.ebc

  # Force a source code page and UTF-16 output
  ebcup -e cp1047 -d utf-16 payroll.ebc

  # Save the ZIP archives next to the inputs
  ebcup --download-dir ./converted *.ebc

  # Machine-readable results
  ebcup --format json data.ebc > results.json

  # HTML result cards for embedding in a page
  ebcup --format html data.ebc > cards.html

ENVIRONMENT VARIABLES:
  EBCUP_SERVER         Conversion server base URL
  EBCUP_ENCODING       Source encoding (default: auto)
  EBCUP_DEST_ENCODING  Destination encoding (default: utf-8)
  RUST_LOG             Override the log filter
"#;

/// Upload EBCDIC files to a conversion server and show the results.
#[derive(Parser, Debug)]
#[command(
    name = "ebcup",
    version,
    about = "Upload EBCDIC (.ebc) files for Unicode conversion",
    long_about = "Upload EBCDIC (.ebc) files to an EBCDIC-to-Unicode conversion server, \
follow the upload progress, and print per-file results: detected source encoding, \
destination encoding, replacement-character count, and the ZIP download link.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files to convert; every name must end in .ebc.
    #[arg(required_unless_present = "list_encodings")]
    files: Vec<PathBuf>,

    /// Conversion server base URL.
    #[arg(long, env = "EBCUP_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Source encoding (code page) or "auto" for server-side detection.
    #[arg(short, long, env = "EBCUP_ENCODING", default_value = "auto")]
    encoding: String,

    /// Destination Unicode encoding.
    #[arg(short, long, env = "EBCUP_DEST_ENCODING", default_value = "utf-8")]
    dest_encoding: String,

    /// Download each result's ZIP archive into this directory.
    #[arg(long, env = "EBCUP_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Result output: text, json, html.
    #[arg(long, env = "EBCUP_FORMAT", value_enum, default_value = "text")]
    format: FormatArg,

    /// Whole-request timeout in seconds.
    #[arg(long, env = "EBCUP_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "EBCUP_NO_PROGRESS")]
    no_progress: bool,

    /// Print the known source and destination encodings and exit.
    #[arg(long)]
    list_encodings: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EBCUP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EBCUP_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Text,
    Json,
    Html,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Html => OutputFormat::Html,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let format: OutputFormat = cli.format.clone().into();
    let show_progress = !cli.quiet && !cli.no_progress;
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

    if cli.list_encodings {
        println!("Source encodings:      auto {}", KNOWN_SOURCE_ENCODINGS.join(" "));
        println!("Destination encodings: {}", KNOWN_DEST_ENCODINGS.join(" "));
        return Ok(ExitCode::SUCCESS);
    }

    // ── Check the selection before any UI exists ─────────────────────────
    if let Err(e) = check_selection(&cli.files) {
        eprintln!("{} {}", red("✘"), e);
        return Ok(ExitCode::from(2));
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn UploadProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let server = config.server.clone();
    let controller = UploadController::new(config).context("Failed to set up upload client")?;

    // ── Run the cycle ────────────────────────────────────────────────────
    let output = match controller.submit_paths(cli.files.as_slice()).await {
        Ok(output) => output,
        Err(e) if e.is_selection_error() => {
            // The "alert": nothing was sent.
            eprintln!("{} {}", red("✘"), e);
            return Ok(ExitCode::from(2));
        }
        Err(UploadError::Cancelled) => {
            eprintln!("{} upload cancelled", cyan("⚠"));
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Upload failed"),
    };

    match format {
        OutputFormat::Text => print!("{}", render_text(&output.outcomes)),
        OutputFormat::Html => print!("{}", render_html(&output.outcomes)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&output)
                .context("Failed to serialise results")?;
            println!("{json}");
        }
    }

    if !cli.quiet && format != OutputFormat::Json {
        eprintln!(
            "   {} replacement char(s)  —  {} bytes sent  —  {}ms total",
            dim(&output.stats.total_replacements.to_string()),
            dim(&output.stats.bytes_sent.to_string()),
            output.stats.total_duration_ms,
        );
    }

    // ── Optional archive download ────────────────────────────────────────
    let mut failed_downloads = 0;
    if let Some(ref dir) = cli.download_dir {
        let client = build_client(cli.timeout).context("Failed to set up download client")?;
        for item in download_archives(&client, &server, &output.outcomes, dir).await {
            match item.result {
                Ok(path) => {
                    if !cli.quiet {
                        eprintln!("  {} {}", green("↓"), path.display());
                    }
                }
                Err(e) => {
                    failed_downloads += 1;
                    eprintln!("  {} {}", red("✗"), e);
                }
            }
        }
    }

    if failed_downloads > 0 || output.stats.rejected > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Name-only selection check, the same one the controller runs.
fn check_selection(files: &[PathBuf]) -> Result<(), UploadError> {
    let names: Vec<String> = files.iter().map(|p| upload_name(p)).collect();
    validate_selection(&names)
}

/// Map CLI args to `UploadConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<UploadConfig> {
    let mut builder = UploadConfig::builder()
        .server(cli.server.clone())
        .source_encoding(&cli.encoding)
        .dest_encoding(&cli.dest_encoding)
        .timeout_secs(cli.timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_selection_is_caught_before_ui() {
        let err = check_selection(&[PathBuf::from("notes.txt")]).unwrap_err();
        assert!(err.is_selection_error());
        assert!(check_selection(&[]).is_err());
        assert!(check_selection(&[PathBuf::from("dir/report.EBC")]).is_ok());
    }

    #[test]
    fn bar_stays_hidden_until_cycle_starts() {
        let cb = CliProgressCallback::new();
        assert!(cb.bar.is_hidden());
        cb.on_progress(40);
        assert!(cb.bar.is_hidden());
        assert_eq!(cb.bar.position(), 40);
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::try_parse_from(["ebcup", "a.ebc"]).unwrap();
        assert_eq!(cli.files, vec![PathBuf::from("a.ebc")]);
        assert!(cli.download_dir.is_none());
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.timeout_secs, 300);
    }
}
