use std::fmt;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use piece_core::model::{Piece, PieceId};
use services::{
    ApiConfig, ChannelSink, Clock, RECONCILIATION_FAILED_ERROR, RevealConfig, RevealService,
    RevealUpdate, RevealView, SessionPhase, WebSocketStreamClient,
};
use storage::ApiPieceRepository;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ui::{App, UiApp, build_app_context};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingPieceId,
    InvalidPieceId { raw: String },
    InvalidApiUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingPieceId => write!(f, "--piece-id is required (or set PIECE_ID)"),
            ArgsError::InvalidPieceId { raw } => write!(f, "invalid --piece-id value: {raw:?}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api-url value: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// The piece ended in a state the headless watcher reports as failure.
#[derive(Debug)]
struct WatchError(String);

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch failed: {}", self.0)
    }
}

impl std::error::Error for WatchError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct DesktopApp {
    piece_id: PieceId,
    reveal_service: Arc<RevealService>,
}

impl UiApp for DesktopApp {
    fn piece_id(&self) -> PieceId {
        self.piece_id.clone()
    }

    fn clock(&self) -> Clock {
        Clock::default()
    }

    fn reveal_service(&self) -> Arc<RevealService> {
        Arc::clone(&self.reveal_service)
    }
}

struct Args {
    piece_id: PieceId,
    api: ApiConfig,
    regenerate: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- ui    --piece-id <id> [--api-url <url>] [--token <token>]");
    eprintln!("  cargo run -p app -- watch --piece-id <id> [--api-url <url>] [--token <token>] [--regenerate]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PIECE_ID, PIECE_API_BASE_URL, PIECE_API_TOKEN");
    eprintln!("  PIECE_REVEAL_TICK_MS, PIECE_REVEAL_THRESHOLD, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Ui,
    Watch,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "ui" => Some(Self::Ui),
            "watch" => Some(Self::Watch),
            _ => None,
        }
    }
}

impl Args {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut piece_id = lookup("PIECE_ID").filter(|value| !value.trim().is_empty());
        let mut api = ApiConfig::from_lookup(&lookup);
        let mut regenerate = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--piece-id" => piece_id = Some(require_value(args, "--piece-id")?),
                "--api-url" => {
                    let value = require_value(args, "--api-url")?;
                    if !value.starts_with("http://") && !value.starts_with("https://") {
                        return Err(ArgsError::InvalidApiUrl { raw: value });
                    }
                    api.base_url = value;
                }
                "--token" => {
                    let value = require_value(args, "--token")?;
                    api.token = Some(value).filter(|token| !token.trim().is_empty());
                }
                "--regenerate" if cmd == Command::Watch => regenerate = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let raw = piece_id.ok_or(ArgsError::MissingPieceId)?;
        let piece_id =
            PieceId::new(raw.clone()).map_err(|_| ArgsError::InvalidPieceId { raw })?;
        Ok(Self {
            piece_id,
            api,
            regenerate,
        })
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "services=info,storage=info,app=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_reveal_service(args: &Args) -> Result<RevealService, Box<dyn std::error::Error>> {
    let reveal_config = RevealConfig::from_env()?;
    let pieces = ApiPieceRepository::new(args.api.base_url.clone(), args.api.token.clone());
    let client = WebSocketStreamClient::new(args.api.base_url.clone());
    Ok(RevealService::new(Arc::new(client), Arc::new(pieces))
        .with_config(reveal_config)
        .with_credentials(args.api.credentials()))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: launching UI when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Ui,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Ui,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    let reveal_service = build_reveal_service(&parsed)?;
    info!(piece_id = %parsed.piece_id, base_url = %parsed.api.base_url, ?cmd, "starting");

    match cmd {
        Command::Ui => {
            let app: Arc<dyn UiApp> = Arc::new(DesktopApp {
                piece_id: parsed.piece_id,
                reveal_service: Arc::new(reveal_service),
            });
            let context = build_app_context(&app);

            // On macOS, Dioxus/tao can default to an always-on-top window in some dev setups.
            let desktop_cfg = DesktopConfig::new().with_window(
                WindowBuilder::new()
                    .with_title("Piece")
                    .with_always_on_top(false),
            );

            LaunchBuilder::desktop()
                .with_cfg(desktop_cfg)
                .with_context(context)
                .launch(App);
            Ok(())
        }
        Command::Watch => watch(&reveal_service, parsed.piece_id, parsed.regenerate).await,
    }
}

/// Follow one piece headlessly, printing takeaways as they are revealed.
async fn watch(
    service: &RevealService,
    piece_id: PieceId,
    regenerate: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (sink, mut updates) = ChannelSink::new();
    let handle = service.spawn(Arc::new(sink));
    if regenerate {
        handle.request_regeneration(piece_id);
    } else {
        handle.open(piece_id);
    }

    let mut outcome = Ok(());
    while let Some(update) = updates.recv().await {
        match update {
            RevealUpdate::Loaded(piece) => {
                println!("# {}", piece.display_title());
                if piece.has_takeaways() && !regenerate {
                    print_piece(&piece);
                    break;
                }
            }
            RevealUpdate::Title(title) => println!("# {title}"),
            RevealUpdate::View(view) => {
                print_changes(&view);
                if let Some(failure) = watch_failure(&view) {
                    outcome = Err(WatchError(failure).into());
                    break;
                }
            }
            RevealUpdate::Reconciled(piece) => {
                info!(items = piece.takeaways().len(), "reconciled");
                break;
            }
        }
    }

    handle.view_torn_down();
    handle.join().await;
    outcome
}

fn watch_failure(view: &RevealView) -> Option<String> {
    match view.phase {
        SessionPhase::Idle | SessionPhase::Errored => {
            Some(view.error.clone().unwrap_or_else(|| "stream error".into()))
        }
        // The final view is re-published only when reconciliation failed;
        // nothing follows it.
        SessionPhase::CaughtUpComplete => view
            .error
            .clone()
            .filter(|error| error.starts_with(RECONCILIATION_FAILED_ERROR)),
        SessionPhase::Streaming | SessionPhase::Cancelled => None,
    }
}

fn print_changes(view: &RevealView) {
    for &index in &view.changed {
        if let Some(Some(item)) = view.revealed.get(index) {
            println!("[{}] {}\n    {}", index + 1, item.question, item.answer);
        }
    }
}

fn print_piece(piece: &Piece) {
    println!("{} · {}", piece.badge(), piece.source_label());
    for (index, item) in piece.takeaways().iter().enumerate() {
        println!("[{}] {}\n    {}", index + 1, item.question, item.answer);
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
