//! CLI binary for scholar-intake.
//!
//! A thin shim over the library crate: extract text from one uploaded
//! document, anchor an application fingerprint, or verify an anchoring
//! transaction. Useful for operating the pipeline by hand and for smoke
//! testing a deployment's OCR endpoint and ledger configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scholar_intake::{
    DocumentExtractor, ExtractionObserver, ExtractionProgress, IntakeConfig, LedgerConfig, Notary,
    ProgressObserver, UploadedDocument,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Terminal observer: renders the extractor's 1–99 band onto a 0–100 bar
/// and shows the current stage as the message.
struct CliProgressObserver {
    bar: ProgressBar,
}

impl CliProgressObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Extracting");
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExtractionObserver for CliProgressObserver {
    fn on_progress(&self, event: ExtractionProgress) {
        self.bar.set_position(u64::from(event.percent));
        self.bar.set_message(event.stage.to_string());
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract text from a scanned ID (stdout)
  intake extract id-card.jpg

  # Extract a multi-page certificate of grades
  intake extract --language eng certificate-of-grades.pdf

  # Point at a different OCR endpoint/model
  intake extract --endpoint http://ocr-host:11434/api/generate --model llava:13b form137.pdf

  # Anchor an application fingerprint (needs INTAKE_PRIVATE_KEY)
  intake notarize 6fa459ea-ee8a-3ca4-894e-db77e160355e user-42

  # Verify an anchoring transaction
  intake verify 0x8c1f...e3a9

ENVIRONMENT VARIABLES:
  INTAKE_RPC_URL        Ledger JSON-RPC endpoint (default: public Sepolia)
  INTAKE_PRIVATE_KEY    Signing key (hex); unset disables notarization
  INTAKE_BURN_ADDRESS   Fingerprint recipient (default: 0x…dEaD)
  INTAKE_CHAIN_ID       EIP-155 chain id (default: 11155111)
"#;

/// Scholarship application intake: OCR extraction and ledger notarization.
#[derive(Parser, Debug)]
#[command(
    name = "intake",
    version,
    about = "Extract text from application documents and anchor fingerprints to a ledger",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract plain text from an image or PDF document.
    Extract {
        /// Path to the document (png, jpg, webp, bmp, tiff, or pdf).
        input: PathBuf,

        /// Declared MIME type; inferred from the extension when omitted.
        #[arg(long)]
        mime: Option<String>,

        /// OCR endpoint URL (Ollama-style generate API).
        #[arg(long, env = "INTAKE_OCR_ENDPOINT")]
        endpoint: Option<String>,

        /// Vision model name.
        #[arg(long, env = "INTAKE_OCR_MODEL")]
        model: Option<String>,

        /// Recognition language hint.
        #[arg(long, default_value = "eng")]
        language: String,

        /// Rasterisation scale for PDF pages (0.5–4.0).
        #[arg(long, default_value_t = 2.0)]
        scale: f32,

        /// Disable the progress bar.
        #[arg(long)]
        no_progress: bool,
    },

    /// Anchor an application fingerprint to the configured ledger.
    Notarize {
        /// Application identifier (the stored record's id).
        application_id: String,

        /// Submitting user's identifier.
        user_id: String,
    },

    /// Check that a transaction reference is mined and successful.
    Verify {
        /// 0x-prefixed 32-byte transaction hash.
        tx_hash: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Suppress INFO-level library logs when the progress bar is active; the
    // bar provides the feedback that matters.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        match cli.command {
            Command::Extract { .. } => "warn",
            _ => "info",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Extract {
            input,
            mime,
            endpoint,
            model,
            language,
            scale,
            no_progress,
        } => {
            let bytes = tokio::fs::read(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;
            let file_name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());

            let mut builder = IntakeConfig::builder()
                .ocr_language(language)
                .render_scale(scale);
            if let Some(endpoint) = endpoint {
                builder = builder.ocr_endpoint(endpoint);
            }
            if let Some(model) = model {
                builder = builder.ocr_model(model);
            }
            let config = builder.build().context("invalid configuration")?;

            let extractor =
                DocumentExtractor::from_config(&config).context("failed to build extractor")?;
            let doc = UploadedDocument::new(bytes, mime, file_name, "cli");

            let show_progress = !cli.quiet && !no_progress;
            let observer = show_progress.then(CliProgressObserver::new);
            let handle = observer
                .as_ref()
                .map(|o| Arc::clone(o) as ProgressObserver);

            let result = extractor.extract(&doc, handle).await;
            if let Some(observer) = &observer {
                observer.finish();
            }

            match result.error {
                None => {
                    let stdout = io::stdout();
                    let mut out = stdout.lock();
                    out.write_all(result.text.as_bytes())
                        .context("failed to write to stdout")?;
                    if !result.text.ends_with('\n') {
                        out.write_all(b"\n").ok();
                    }
                    if !cli.quiet {
                        eprintln!(
                            "{} extracted {}",
                            green("✔"),
                            dim(&format!("{} chars", result.text.len()))
                        );
                    }
                }
                Some(error) => {
                    eprintln!("{} {}", red("✘"), error);
                    std::process::exit(1);
                }
            }
        }

        Command::Notarize {
            application_id,
            user_id,
        } => {
            let ledger = LedgerConfig::from_env().context("invalid ledger configuration")?;
            let notary = Notary::new(&ledger).context("failed to build notary")?;

            let timestamp = chrono::Utc::now();
            let fingerprint = Notary::fingerprint_hex(&application_id, &user_id, timestamp);
            if !cli.quiet {
                eprintln!("fingerprint {}", dim(&fingerprint));
            }

            match notary
                .log_application_to_blockchain(&application_id, &user_id, timestamp)
                .await
            {
                Some(tx_hash) => {
                    println!("{tx_hash}");
                    if !cli.quiet {
                        eprintln!("{} fingerprint anchored", green("✔"));
                    }
                }
                None => {
                    eprintln!("{} notarization skipped (see logs)", red("✘"));
                    std::process::exit(1);
                }
            }
        }

        Command::Verify { tx_hash } => {
            let ledger = LedgerConfig::from_env().context("invalid ledger configuration")?;
            let notary = Notary::new(&ledger).context("failed to build notary")?;

            if notary.verify_transaction(&tx_hash).await {
                println!("{}", bold("confirmed"));
            } else {
                println!("not confirmed");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
