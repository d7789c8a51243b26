//! `coach` binary: run the coaching tasks from the command line.
//!
//! Subcommands: `email`, `plan`, `chat`, `summarize` call the model; `check` and `chunk`
//! run offline; `embed` returns embedding vectors.

mod log_format;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use coach::{ChatRequest, CoachConfig, EmailRequest, PlanRequest, TextSplitter};
use coach_cli::commands::{self, CheckRules, CliError, Report};
use tracing::Instrument;

#[derive(Parser, Debug)]
#[command(name = "coach")]
#[command(about = "Personal finance coaching: validated emails, action plans and chat replies")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Log to stderr at debug level (LOG_FILE still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// With --json, pretty-print
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a coaching email and validate it (up to three attempts)
    Email {
        /// Recipient's first name
        #[arg(long)]
        name: String,
        /// Quote the email must include verbatim
        #[arg(long)]
        quote: Option<String>,
        /// Step text the email must include verbatim
        #[arg(long)]
        step: Option<String>,
        /// Background about the recipient
        #[arg(long, default_value = "")]
        about: String,
        /// Payment link for the button (default: COACH_PAYMENT_LINK)
        #[arg(long, value_name = "URL")]
        payment_link: Option<String>,
    },
    /// Propose or revise a financial action plan
    Plan {
        /// JSON or text of the current plan
        #[arg(long, value_name = "FILE")]
        current_plan: Option<PathBuf>,
        /// Read the user message from this file
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
        /// User message
        words: Vec<String>,
    },
    /// Reply to a chat message with optional context and history
    Chat {
        /// Background text for the system prompt
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,
        /// JSON array of prior {"role", "content"} turns
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
        words: Vec<String>,
    },
    /// Summarize text
    Summarize {
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
        words: Vec<String>,
    },
    /// Validate a file against literal rules without calling the model
    Check {
        /// File holding the output to validate
        file: PathBuf,
        /// Literal that must appear exactly once (repeatable)
        #[arg(long = "exactly-once", value_name = "TEXT")]
        exactly_once: Vec<String>,
        /// Literal that must appear at least once (repeatable)
        #[arg(long = "at-least-once", value_name = "TEXT")]
        at_least_once: Vec<String>,
        /// Literal that must not appear (repeatable)
        #[arg(long, value_name = "TEXT")]
        forbid: Vec<String>,
        /// Apply the email rule preset for this user name
        #[arg(long, value_name = "NAME")]
        email_user: Option<String>,
        #[arg(long)]
        quote: Option<String>,
        #[arg(long)]
        step: Option<String>,
        #[arg(long, value_name = "URL")]
        payment_link: Option<String>,
    },
    /// Split text into overlapping chunks
    Chunk {
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
        words: Vec<String>,
        /// Chunk size in characters (default: COACH_CHUNK_SIZE)
        #[arg(long)]
        size: Option<usize>,
        /// Overlap in characters (default: COACH_CHUNK_OVERLAP)
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Embed text, or each of its chunks with --chunks
    Embed {
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
        words: Vec<String>,
        #[arg(long)]
        chunks: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Email { .. } => "email",
            Command::Plan { .. } => "plan",
            Command::Chat { .. } => "chat",
            Command::Summarize { .. } => "summarize",
            Command::Check { .. } => "check",
            Command::Chunk { .. } => "chunk",
            Command::Embed { .. } => "embed",
        }
    }
}

fn write_json_output(value: &serde_json::Value, pretty: bool) -> Result<(), serde_json::Error> {
    let s = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", s);
    Ok(())
}

fn optional_file(path: Option<&Path>) -> Result<Option<String>, CliError> {
    path.map(commands::read_file).transpose()
}

async fn run(cmd: &Command, cfg: &CoachConfig) -> Result<Report, CliError> {
    let gateway = || Arc::new(cfg.gateway());
    match cmd {
        Command::Email {
            name,
            quote,
            step,
            about,
            payment_link,
        } => {
            let catalog = commands::load_catalog(cfg)?;
            let orchestrator = cfg.orchestrator(gateway(), "email");
            let request = EmailRequest {
                user_name: name.clone(),
                payment_link: payment_link
                    .clone()
                    .unwrap_or_else(|| cfg.payment_link.clone()),
                quote: quote.clone(),
                step_text: step.clone(),
                about: about.clone(),
            };
            commands::email(&orchestrator, &catalog, &request).await
        }
        Command::Plan {
            current_plan,
            file,
            words,
        } => {
            let catalog = commands::load_catalog(cfg)?;
            let request = PlanRequest {
                current_plan: optional_file(current_plan.as_deref())?,
                message: commands::input_text(words, file.as_deref())?,
            };
            commands::plan(gateway().as_ref(), &catalog, &request).await
        }
        Command::Chat {
            context,
            history,
            file,
            words,
        } => {
            let catalog = commands::load_catalog(cfg)?;
            let request = ChatRequest {
                context: optional_file(context.as_deref())?.unwrap_or_default(),
                history: match history {
                    Some(p) => commands::read_history(p)?,
                    None => Vec::new(),
                },
                message: commands::input_text(words, file.as_deref())?,
            };
            commands::chat(gateway().as_ref(), &catalog, &request).await
        }
        Command::Summarize { file, words } => {
            let catalog = commands::load_catalog(cfg)?;
            let text = commands::input_text(words, file.as_deref())?;
            commands::summarize(gateway().as_ref(), &catalog, &text).await
        }
        Command::Check {
            file,
            exactly_once,
            at_least_once,
            forbid,
            email_user,
            quote,
            step,
            payment_link,
        } => {
            let text = commands::read_file(file)?;
            let rules = CheckRules {
                email_user: email_user.clone(),
                payment_link: payment_link
                    .clone()
                    .unwrap_or_else(|| cfg.payment_link.clone()),
                quote: quote.clone(),
                step_text: step.clone(),
                exactly_once: exactly_once.clone(),
                at_least_once: at_least_once.clone(),
                forbid: forbid.clone(),
            };
            Ok(commands::check(&text, &rules))
        }
        Command::Chunk {
            file,
            words,
            size,
            overlap,
        } => {
            let text = commands::input_text(words, file.as_deref())?;
            let splitter = TextSplitter::new(
                size.unwrap_or(cfg.splitter.chunk_size()),
                overlap.unwrap_or(cfg.splitter.chunk_overlap()),
            )?;
            Ok(commands::chunk(&text, &splitter))
        }
        Command::Embed {
            file,
            words,
            chunks,
        } => {
            let text = commands::input_text(words, file.as_deref())?;
            if *chunks {
                commands::embed_chunks(gateway().as_ref(), &text).await
            } else {
                commands::embed(gateway().as_ref(), &text).await
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let applied = config::load_and_apply("coach", None);
    let args = Args::parse();
    if let Err(e) = logging::init(args.verbose) {
        eprintln!("coach: logging: {}", e);
        std::process::exit(1);
    }
    match &applied {
        Ok(applied) if !applied.is_empty() => tracing::debug!(
            dotenv = ?applied.from_dotenv,
            xdg = ?applied.from_xdg,
            "applied config"
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!(
            error = %e,
            sources = ?config::describe_sources("coach", None),
            "config not loaded"
        ),
    }

    let cfg = match CoachConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("coach: {}", e);
            std::process::exit(1);
        }
    };

    let span = tracing::info_span!("command", name = args.cmd.name());
    let report = match run(&args.cmd, &cfg).instrument(span).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("coach: {}", e);
            std::process::exit(1);
        }
    };

    if args.json {
        if let Err(e) = write_json_output(&report.json, args.pretty) {
            eprintln!("coach: {}", e);
            std::process::exit(1);
        }
    } else {
        println!("{}", report.text);
    }
    if !report.success {
        std::process::exit(1);
    }
}
