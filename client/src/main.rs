use clap::{Parser, ValueEnum};
use client::game::GameSession;
use client::identity::{IdentityStore, Operator};
use client::input::{spawn_stdin_reader, HELP};
use client::network::{Client, ClientConfig, ReconnectPolicy};
use client::router::MessageRouter;
use log::{info, warn};
use shared::{EchoPrefixDialect, FrameDialect, PlainDialect};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dialect {
    /// Frames are bare JSON
    Plain,
    /// Frames may carry a `[Client <id>]: ` echo prefix
    EchoPrefix,
}

impl Dialect {
    fn build(self) -> Box<dyn FrameDialect> {
        match self {
            Dialect::Plain => Box::new(PlainDialect),
            Dialect::EchoPrefix => Box::new(EchoPrefixDialect),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the game server
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8000/ws")]
    server: String,

    /// Display name; overrides the stored one
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Avatar color as #RRGGBB; overrides the stored one
    #[arg(short = 'c', long)]
    color: Option<String>,

    /// Where the operator identity is kept between runs
    #[arg(long, default_value = "gridmap-identity.json")]
    identity_file: PathBuf,

    /// How inbound frames are framed
    #[arg(long, value_enum, default_value = "echo-prefix")]
    dialect: Dialect,

    /// Reconnect attempts before giving up
    #[arg(long, default_value = "3")]
    reconnect_attempts: u32,

    /// Pause between reconnect attempts in milliseconds
    #[arg(long, default_value = "5000")]
    reconnect_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let store = IdentityStore::new(&args.identity_file);
    let mut operator = match store.load() {
        Ok(Some(operator)) => {
            info!("Loaded identity {} from {}", operator.id, store.path().display());
            operator
        }
        Ok(None) => Operator::generate(),
        Err(e) => {
            warn!("{}; starting with a fresh identity", e);
            Operator::generate()
        }
    };
    if let Some(name) = args.name.filter(|n| !n.trim().is_empty()) {
        operator.name = name.trim().to_string();
    }
    if let Some(color) = args.color {
        operator.color = color;
    }

    info!("Starting client as {} ({})", operator.name, operator.id);
    info!("Connecting to: {}", args.server);

    let router = MessageRouter::with_dialect(args.dialect.build());
    info!("Frame dialect: {}", router.dialect_name());

    let config = ClientConfig {
        server_url: args.server,
        reconnect: ReconnectPolicy {
            attempts: args.reconnect_attempts,
            interval: Duration::from_millis(args.reconnect_interval_ms),
        },
    };

    println!("{}", HELP);

    let (commands, mut rx) = mpsc::channel(32);
    spawn_stdin_reader(commands);

    let mut client = Client::new(config, GameSession::new(operator, router), Some(store));
    client.run(&mut rx).await?;

    Ok(())
}
