use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "server")]
use backyard::serve::{ServeArgs, run_serve};
use backyard::{
    Board, BoardSettings, BoardSettingsPatch, BoardSnapshot, ConnectionLineType, FileStore,
    HttpSettingsRemote, LayoutDirection, MarkerEndType, RemoteConfig, SettingsPersistence,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Parser)]
#[command(
    name = "backyard",
    version,
    about = "Arrange Backyard idea-map boards and sync their board settings."
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    /// Local store file used in place of browser storage.
    #[arg(long = "store", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Arrange the nodes of a board file.
    Layout(LayoutArgs),
    /// Stamp edge styling from the current board settings onto a board file.
    Style(IoArgs),
    /// Inspect or change board settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Start the board settings and layout API server.
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum LayoutMode {
    Directed,
    Grid,
}

#[derive(Debug, Args)]
struct IoArgs {
    /// Path to the board JSON file. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Path to the output file. Use '-' or omit to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

#[derive(Debug, Args)]
struct LayoutArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Layout to apply.
    #[arg(short = 'm', long = "mode", value_enum, default_value = "directed")]
    mode: LayoutMode,

    /// Flow direction for the directed layout.
    #[arg(short = 'd', long = "direction", value_enum, default_value = "vertical")]
    direction: LayoutDirection,

    /// Cards per row for the grid layout.
    #[arg(long = "cards-per-row")]
    cards_per_row: Option<usize>,
}

#[derive(Debug, Args)]
struct UserArgs {
    /// User whose settings are synced.
    #[arg(short = 'u', long = "user")]
    user: String,

    /// Base URL of the settings API (defaults to BACKYARD_API_URL).
    #[arg(long = "api-url")]
    api_url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Print the locally cached settings (defaults when none are cached).
    Show,
    /// Overwrite the local cache with the built-in defaults.
    Reset,
    /// Fetch settings from the server into the local cache.
    Pull(UserArgs),
    /// Send the locally cached settings to the server.
    Push(UserArgs),
    /// Change individual settings locally and on the server.
    Set(SetArgs),
}

#[derive(Debug, Args)]
struct SetArgs {
    #[command(flatten)]
    user: UserArgs,

    #[arg(long = "snap-to-grid")]
    snap_to_grid: Option<bool>,

    /// Snap grid cell size as WIDTH,HEIGHT.
    #[arg(long = "snap-grid", value_delimiter = ',')]
    snap_grid: Option<Vec<f32>>,

    #[arg(long = "connection-line", value_parser = parse_connection_line)]
    connection_line_type: Option<ConnectionLineType>,

    #[arg(long = "marker-end", value_parser = parse_marker_end)]
    marker_end_type: Option<MarkerEndType>,

    #[arg(long = "stroke-width")]
    stroke_width: Option<f32>,

    #[arg(long = "marker-size")]
    marker_size: Option<f32>,

    #[arg(long = "edge-color")]
    edge_color: Option<String>,

    #[arg(long = "selected-edge-color")]
    selected_edge_color: Option<String>,

    #[arg(long = "animated")]
    animated: Option<bool>,
}

impl SetArgs {
    fn patch(&self) -> Result<BoardSettingsPatch> {
        let snap_grid = match self.snap_grid.as_deref() {
            Some([width, height]) => Some([*width, *height]),
            Some(_) => bail!("--snap-grid expects WIDTH,HEIGHT"),
            None => None,
        };
        Ok(BoardSettingsPatch {
            snap_to_grid: self.snap_to_grid,
            snap_grid,
            connection_line_type: self.connection_line_type,
            marker_end_type: self.marker_end_type,
            stroke_width: self.stroke_width,
            marker_size: self.marker_size,
            edge_color: self.edge_color.clone(),
            selected_edge_color: self.selected_edge_color.clone(),
            animated: self.animated,
        })
    }
}

fn parse_connection_line(raw: &str) -> Result<ConnectionLineType, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_ascii_lowercase()))
        .map_err(|_| format!("unknown connection line type '{raw}'"))
}

fn parse_marker_end(raw: &str) -> Result<MarkerEndType, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_ascii_lowercase()))
        .map_err(|_| format!("unknown marker end '{raw}'"))
}

#[tokio::main]
async fn main() {
    if let Err(err) = dispatch().await {
        eprintln!("\u{001b}[31merror:\u{001b}[0m {err:?}");
        std::process::exit(1);
    }
}

async fn dispatch() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    match cli.command {
        Command::Layout(args) => run_layout(args),
        Command::Style(args) => run_style(args, open_store(cli.store)?),
        Command::Settings { action } => run_settings(action, open_store(cli.store)?).await,
        #[cfg(feature = "server")]
        Command::Serve(args) => run_serve(args).await,
    }
}

fn setup_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("warn").to_ascii_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn open_store(path: Option<PathBuf>) -> Result<FileStore> {
    match path {
        Some(path) => Ok(FileStore::new(path)),
        None => FileStore::from_env().context("failed to locate the local store"),
    }
}

fn run_layout(args: LayoutArgs) -> Result<()> {
    let mut board = read_board(&args.io)?;
    match args.mode {
        LayoutMode::Directed => {
            if !board.apply_directed_layout(args.direction)? && !args.io.quiet {
                eprintln!("Board has no nodes; nothing to arrange.");
            }
        }
        LayoutMode::Grid => board.apply_grid_layout(args.cards_per_row),
    }
    write_board(&args.io, &board)
}

fn run_style(args: IoArgs, store: FileStore) -> Result<()> {
    let persistence = SettingsPersistence::new(store, remote_client(None)?);
    let settings = persistence.load();
    let board = read_board(&args)?;
    let snapshot = BoardSnapshot {
        edges: board.styled_edges(&settings),
        ..board.snapshot()
    };
    write_output(
        parse_output(args.output.as_deref())?,
        &serde_json::to_vec_pretty(&snapshot)?,
        args.quiet,
    )
}

async fn run_settings(action: SettingsAction, store: FileStore) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let persistence = SettingsPersistence::new(store, remote_client(None)?);
            print_settings(&persistence.load())
        }
        SettingsAction::Reset => {
            let persistence = SettingsPersistence::new(store, remote_client(None)?);
            let defaults = BoardSettings::default();
            persistence.save(&defaults)?;
            print_settings(&defaults)
        }
        SettingsAction::Pull(user) => {
            let persistence = SettingsPersistence::new(store, remote_client(user.api_url)?);
            match persistence.load_from_server(&user.user).await {
                Ok(Some(settings)) => print_settings(&settings),
                Ok(None) => {
                    println!("No settings stored for '{}'; local cache left as is.", user.user);
                    Ok(())
                }
                Err(err) => Err(anyhow!("failed to load layout settings: {err}")),
            }
        }
        SettingsAction::Push(user) => {
            let persistence = SettingsPersistence::new(store, remote_client(user.api_url)?);
            let settings = persistence.load();
            persistence
                .save_to_server(&user.user, &settings)
                .await
                .map_err(|err| anyhow!("layout save failed: {err}"))?;
            println!("Settings saved for '{}'.", user.user);
            Ok(())
        }
        SettingsAction::Set(args) => {
            let patch = args.patch()?;
            if patch.is_empty() {
                bail!("no settings given; see `backyard settings set --help`");
            }
            let persistence = SettingsPersistence::new(store, remote_client(args.user.api_url)?);
            let remote = persistence.update_on_server(&args.user.user, &patch).await;
            print_settings(&persistence.load())?;
            remote.map_err(|err| anyhow!("layout save failed (kept locally): {err}"))
        }
    }
}

fn remote_client(api_url: Option<String>) -> Result<HttpSettingsRemote> {
    let mut config = RemoteConfig::default();
    if let Some(url) = api_url {
        config.base_url = url;
    }
    HttpSettingsRemote::new(config).context("failed to build settings client")
}

fn print_settings(settings: &BoardSettings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    println!("{json}");
    Ok(())
}

fn read_board(args: &IoArgs) -> Result<Board> {
    let source = parse_input(args.input.as_deref())?;
    let contents = load_definition(&source)?;
    let snapshot: BoardSnapshot =
        serde_json::from_str(&contents).context("board file is not a valid board snapshot")?;
    Ok(Board::from(snapshot))
}

fn write_board(args: &IoArgs, board: &Board) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(&board.snapshot())?;
    write_output(parse_output(args.output.as_deref())?, &bytes, args.quiet)
}

fn parse_input(input: Option<&str>) -> Result<InputSource> {
    match input {
        Some("-") => Ok(InputSource::Stdin),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.exists() {
                return Err(anyhow!("input file '{path_str}' does not exist"));
            }
            Ok(InputSource::File(path))
        }
        None => Ok(InputSource::Stdin),
    }
}

fn parse_output(output: Option<&str>) -> Result<OutputDestination> {
    match output {
        None | Some("-") => Ok(OutputDestination::Stdout),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(anyhow!(
                        "output directory '{}' does not exist",
                        parent.display()
                    ));
                }
            }
            Ok(OutputDestination::File(path))
        }
    }
}

fn load_definition(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            if buffer.trim().is_empty() {
                Err(anyhow!("no board supplied on stdin"))
            } else {
                Ok(buffer)
            }
        }
        InputSource::File(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            if contents.trim().is_empty() {
                Err(anyhow!("input file '{}' was empty", path.display()))
            } else {
                Ok(contents)
            }
        }
    }
}

fn write_output(dest: OutputDestination, bytes: &[u8], quiet: bool) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("Generated board -> {}", path.display());
            }
        }
    }
    Ok(())
}
