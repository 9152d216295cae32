use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use services::{ApiConfig, AssessmentFlow, HttpProgressApi, ProgressApi, ProgressScreen};
use tracing::info;
use tracing_subscriber::EnvFilter;
use treatment_core::model::Identity;
use treatment_core::path::{AccessClass, PathNode};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingBaseUrl,
    MissingPhone,
    InvalidTimeout { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingBaseUrl => {
                write!(f, "no api base url (use --base-url or TREATMENT_API_BASE_URL)")
            }
            ArgsError::MissingPhone => write!(f, "no phone (use --phone or TREATMENT_PHONE)"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status [--base-url <url>] [--phone <phone>] [--timeout <secs>]");
    eprintln!("  cargo run -p app -- review [--base-url <url>] [--phone <phone>] [--timeout <secs>]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TREATMENT_API_BASE_URL, TREATMENT_API_TIMEOUT_SECS, TREATMENT_PHONE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Review,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "review" => Some(Self::Review),
            _ => None,
        }
    }
}

struct Args {
    config: ApiConfig,
    identity: Identity,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut config = ApiConfig::from_env();
        let mut phone = std::env::var("TREATMENT_PHONE").ok();
        let mut timeout = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--base-url" => {
                    let value = require_value(args, "--base-url")?;
                    config = Some(match config {
                        Some(existing) => ApiConfig {
                            base_url: value,
                            ..existing
                        },
                        None => ApiConfig::new(value),
                    });
                }
                "--phone" => phone = Some(require_value(args, "--phone")?),
                "--timeout" => {
                    let value = require_value(args, "--timeout")?;
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTimeout { raw: value.clone() })?;
                    timeout = Some(Duration::from_secs(secs));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let mut config = config
            .filter(|config| !config.base_url.trim().is_empty())
            .ok_or(ArgsError::MissingBaseUrl)?;
        if let Some(timeout) = timeout {
            config.timeout = timeout;
        }
        let identity = phone
            .map(Identity::new)
            .filter(|identity| !identity.is_blank())
            .ok_or(ArgsError::MissingPhone)?;

        Ok(Self { config, identity })
    }
}

async fn status(
    api: Arc<dyn ProgressApi>,
    identity: Identity,
) -> Result<(), Box<dyn std::error::Error>> {
    let screen = ProgressScreen::new(api);
    screen.set_identity(identity);
    screen.refresh().await?;

    if let Some(state) = screen.screen() {
        println!("screen: {}", state.as_str());
    }
    if let Some(header) = screen.header() {
        println!(
            "xp: {}  streak: {}  plan: {:?}",
            header.xp_total, header.streak, header.plan
        );
        if let Some(paywall) = header.paywall {
            println!("paywall: {:?}", paywall.reason);
        }
    }

    for node in screen.path_nodes().iter() {
        match node {
            PathNode::Results(results) => {
                println!("[results] {}", if results.done { "done" } else { "pending" });
            }
            PathNode::StageHeader(stage) => println!("== {} ({})", stage.title, stage.code),
            PathNode::Day(day) => {
                let class = match day.access.class() {
                    AccessClass::Enterable => "enter",
                    AccessClass::Previewable => "preview",
                    AccessClass::Blocked => "blocked",
                    AccessClass::Locked => "locked",
                };
                let end = if day.is_terminal { " (end)" } else { "" };
                println!(
                    "  {:?} day {} / #{} {class}{end}",
                    day.side, day.day_number_in_stage, day.global_day_number
                );
            }
        }
    }
    Ok(())
}

async fn review(
    api: Arc<dyn ProgressApi>,
    identity: Identity,
) -> Result<(), Box<dyn std::error::Error>> {
    let flow = AssessmentFlow::new(api);
    flow.bootstrap(identity).await?;

    match flow.phase() {
        Some(phase) => println!("phase: {}", phase.name()),
        None => println!("phase: not ready"),
    }
    if let Some(progress) = flow.progress() {
        println!(
            "test {} question {} of {:?}",
            progress.test.as_u8(),
            progress.question_number,
            progress.question_total
        );
    }
    if let Some(question) = flow.current_question() {
        println!("{}", question.text);
        for option in &question.options {
            println!("  [{}] {}", option.value, option.label);
        }
    }
    if let Some(result) = flow.result() {
        println!("{:?}: {}", result.title(), result.message);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => Command::Status,
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    info!(base_url = %parsed.config.base_url, ?cmd, "starting");
    let api: Arc<dyn ProgressApi> = Arc::new(HttpProgressApi::new(&parsed.config)?);

    match cmd {
        Command::Status => status(api, parsed.identity).await,
        Command::Review => review(api, parsed.identity).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
