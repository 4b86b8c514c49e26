use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use client::reconciler::{PendingStroke, Reconciler, Renderer};
use futures_util::{SinkExt, StreamExt};
use protocol::{
    ClientMessage, OpKind, Operation, ServerMessage, decode_server, encode_client,
};
use rand::Rng;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error(transparent)]
    Codec(#[from] protocol::CodecError),
    #[error("timed out waiting for a server event")]
    Timeout,
    #[error("invalid --points value: {0}")]
    InvalidPoints(String),
}

#[derive(Parser, Debug)]
#[command(name = "canvas-client", about = "Terminal client for the collaborative canvas")]
struct Cli {
    #[arg(long, env = "CANVAS_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "CANVAS_ROOM", default_value = "default")]
    room: String,

    /// Display name; a random `User-<n>` when omitted.
    #[arg(long)]
    name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join the room and stream every confirmed event.
    Watch,
    /// Submit one stroke and wait for the authoritative echo.
    Draw(DrawArgs),
    /// Submit one erase path and wait for the authoritative echo.
    Erase(DrawArgs),
    /// Undo the room's most recent visible operation.
    Undo,
    /// Restore the room's most recently undone operation.
    Redo,
}

#[derive(Args, Debug)]
struct DrawArgs {
    /// Path geometry as `x,y;x,y;...`.
    #[arg(long)]
    points: String,

    #[arg(long, default_value = "#000000")]
    color: String,

    #[arg(long, default_value_t = 4.0)]
    width: f64,
}

/// Renderer for a terminal: one line per composited operation.
#[derive(Default)]
struct LogRenderer;

impl Renderer for LogRenderer {
    fn clear(&mut self) {
        println!("-- replay --");
    }

    fn draw(&mut self, op: &Operation) {
        println!("  {:?} {} by {} ({} points)", op.kind, op.id, op.author_id, op.points.len());
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let name = cli
        .name
        .clone()
        .unwrap_or_else(|| format!("User-{}", rand::rng().random_range(0..1000_u16)));

    let mut stream = connect(&cli.base_url).await?;
    send(&mut stream, &ClientMessage::JoinRoom { room_id: cli.room.clone(), name }).await?;

    // Bootstrap: the join reply replaces the (empty) local mirror.
    let mut reconciler = Reconciler::new(LogRenderer);
    let sync = recv_until(&mut stream, Duration::from_secs(5), |msg| {
        matches!(msg, ServerMessage::SyncState { .. })
    })
    .await?;
    reconciler.apply(&sync);
    println!(
        "joined '{}': {} operations, {} visible",
        cli.room,
        reconciler.ops().len(),
        reconciler.visible_count()
    );

    match cli.command {
        Command::Watch => watch(stream, reconciler).await,
        Command::Draw(args) => submit(stream, reconciler, &args, OpKind::Stroke).await,
        Command::Erase(args) => submit(stream, reconciler, &args, OpKind::Erase).await,
        Command::Undo => toggle(stream, reconciler, true).await,
        Command::Redo => toggle(stream, reconciler, false).await,
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn watch(mut stream: WsStream, mut reconciler: Reconciler<LogRenderer>) -> Result<(), CliError> {
    loop {
        let msg = recv_event(&mut stream).await?;
        reconciler.apply(&msg);
        match &msg {
            ServerMessage::UserList { users } => {
                let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
                println!("online: {}", names.join(", "));
            }
            ServerMessage::CursorMove { participant_id, x, y } => {
                println!("cursor {participant_id} at ({x}, {y})");
            }
            _ => {
                println!(
                    "log: {} operations, {} visible",
                    reconciler.ops().len(),
                    reconciler.visible_count()
                );
            }
        }
    }
}

async fn submit(
    mut stream: WsStream,
    mut reconciler: Reconciler<LogRenderer>,
    args: &DrawArgs,
    kind: OpKind,
) -> Result<(), CliError> {
    let mut pending = PendingStroke::new();
    for (i, (x, y)) in parse_points(&args.points)?.into_iter().enumerate() {
        if i == 0 {
            pending.begin(x, y, now_ms());
        } else {
            pending.push(x, y, now_ms());
        }
    }

    let author_id = Uuid::new_v4().to_string();
    let Some(op) = pending.finish(kind, &args.color, args.width, &author_id, now_ms()) else {
        return Err(CliError::InvalidPoints("path is empty".to_owned()));
    };
    let op_id = op.id;

    send(&mut stream, &ClientMessage::Operation(op)).await?;

    // The local copy is a preview; only the broadcast echo is authoritative.
    let echo = recv_until(&mut stream, Duration::from_secs(5), |msg| {
        matches!(msg, ServerMessage::Operation(confirmed) if confirmed.id == op_id)
    })
    .await?;
    reconciler.apply(&echo);
    println!("confirmed {} at log position {}", op_id, reconciler.ops().len());
    Ok(())
}

async fn toggle(
    mut stream: WsStream,
    mut reconciler: Reconciler<LogRenderer>,
    undo: bool,
) -> Result<(), CliError> {
    let (label, msg) = if undo {
        ("undo", ClientMessage::Undo)
    } else {
        ("redo", ClientMessage::Redo)
    };
    send(&mut stream, &msg).await?;

    // The server stays silent when nothing is eligible; a short silence is
    // that no-op, not a failure.
    let result = recv_until(&mut stream, Duration::from_secs(2), |msg| {
        matches!(msg, ServerMessage::Undo(_) | ServerMessage::Redo(_))
    })
    .await;

    match result {
        Ok(event) => {
            reconciler.apply(&event);
            if let ServerMessage::Undo(op) | ServerMessage::Redo(op) = &event {
                println!("{label}: {} ({} visible)", op.id, reconciler.visible_count());
            }
            Ok(())
        }
        Err(CliError::Timeout) => {
            println!("nothing to {label}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

// =============================================================================
// TRANSPORT HELPERS
// =============================================================================

async fn connect(base_url: &str) -> Result<WsStream, CliError> {
    let url = ws_url(base_url)?;
    let (stream, _) = connect_async(url)
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;
    Ok(stream)
}

fn ws_url(base_url: &str) -> Result<String, CliError> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/ws"));
    }
    if let Some(rest) = base.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/ws"));
    }
    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

async fn send(stream: &mut WsStream, msg: &ClientMessage) -> Result<(), CliError> {
    let text = encode_client(msg)?;
    stream
        .send(Message::Text(text.into()))
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))
}

async fn recv_event(stream: &mut WsStream) -> Result<ServerMessage, CliError> {
    loop {
        let Some(message) = stream.next().await else {
            return Err(CliError::WsClosed);
        };
        match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
            Message::Text(text) => return Ok(decode_server(text.as_str())?),
            Message::Close(_) => return Err(CliError::WsClosed),
            _ => {}
        }
    }
}

async fn recv_until(
    stream: &mut WsStream,
    limit: Duration,
    pred: impl Fn(&ServerMessage) -> bool,
) -> Result<ServerMessage, CliError> {
    let fut = async {
        loop {
            let msg = recv_event(stream).await?;
            if pred(&msg) {
                return Ok(msg);
            }
        }
    };

    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CliError::Timeout)?
}

// =============================================================================
// PARSING
// =============================================================================

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

fn parse_points(raw: &str) -> Result<Vec<(f64, f64)>, CliError> {
    let mut points = Vec::new();
    for pair in raw.split(';').filter(|pair| !pair.trim().is_empty()) {
        let Some((x, y)) = pair.split_once(',') else {
            return Err(CliError::InvalidPoints(pair.to_owned()));
        };
        let x: f64 = x.trim().parse().map_err(|_| CliError::InvalidPoints(pair.to_owned()))?;
        let y: f64 = y.trim().parse().map_err(|_| CliError::InvalidPoints(pair.to_owned()))?;
        points.push((x, y));
    }
    Ok(points)
}
