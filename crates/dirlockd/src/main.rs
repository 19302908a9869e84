//! dirlockd: serves named advisory locks over a shared directory.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dirlock_server::{Deadlines, Server, ServerConfig, TransportKind};

#[derive(Parser)]
#[command(name = "dirlockd", version, about = "Distributed lock daemon over a shared directory")]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:13123")]
    listen: SocketAddr,

    /// Directory holding the lock files; must already exist.
    #[arg(long)]
    directory: PathBuf,

    /// Transport to serve.
    #[arg(long, value_enum, default_value = "tcp")]
    transport: TransportArg,

    /// Per-request read deadline, in seconds.
    #[arg(long)]
    read_timeout: Option<u64>,

    /// Per-response write deadline, in seconds.
    #[arg(long)]
    write_timeout: Option<u64>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum TransportArg {
    /// Plain TCP with binary framing.
    Tcp,
    /// WebSocket with binary or text framing.
    Ws,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Tcp => TransportKind::Tcp,
            TransportArg::Ws => TransportKind::WebSocket,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "dirlockd=info,dirlock_server=info",
        1 => "dirlockd=debug,dirlock_server=debug",
        _ => "dirlockd=trace,dirlock_server=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = ServerConfig {
        listen: cli.listen,
        directory: cli.directory,
        transport: cli.transport.into(),
        deadlines: Deadlines {
            read: cli.read_timeout.map(Duration::from_secs),
            write: cli.write_timeout.map(Duration::from_secs),
        },
    };

    let server = Server::bind(config).await?;
    server.serve().await?;
    Ok(())
}
