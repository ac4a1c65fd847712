use std::fs::{File, OpenOptions};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use transporter::{
    spawn_signal_listener, JsonDirectory, LocalLink, PacketSource, PipeSink, PipeSource, Settings,
    Transporter,
};
use tunnel::{SharedSink, SystemClock};

#[derive(Parser)]
#[command(
    name = "ayiya-transporter",
    version,
    about = "Multiplexes AYIYA IPv6-over-IPv4 tunnels onto one UDP socket"
)]
struct Cli {
    /// Local UDP address for tunnel packets.
    #[arg(long, default_value = "0.0.0.0:5072")]
    bind: SocketAddr,
    /// JSON file with the tunnel records.
    #[arg(long)]
    tunnels: PathBuf,
    /// Length-prefixed IPv6 datagrams from the local network; stdin if absent.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Length-prefixed IPv6 datagrams to the local network; stdout if absent.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Scheduler period in milliseconds.
    #[arg(long, default_value_t = 1000)]
    heartbeat_tick: u64,
    /// Pass local datagrams without a tunnel to this stream instead of
    /// dropping them.
    #[arg(long)]
    pass_unhandled: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.heartbeat_tick == 0 {
        bail!("--heartbeat-tick must be positive");
    }

    let settings = Settings {
        bind: cli.bind,
        heartbeat_tick: Duration::from_millis(cli.heartbeat_tick),
        ..Settings::default()
    };
    let local = LocalLink {
        source: open_source(cli.input.as_ref())?,
        sink: open_sink(cli.output.as_ref())?,
        unhandled: cli
            .pass_unhandled
            .as_ref()
            .map(|path| open_sink(Some(path)))
            .transpose()
            .context("open pass-through output")?,
    };

    let transporter = Transporter::bind(
        settings,
        Box::new(JsonDirectory::new(&cli.tunnels)),
        Arc::new(SystemClock),
    )
    .context("start transporter")?;

    let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
    let (signals, _listener) = spawn_signal_listener(commands_tx).context("install signals")?;
    let result = transporter.run(local, &commands_rx);
    signals.close();
    result.context("transporter stopped")
}

fn open_source(path: Option<&PathBuf>) -> Result<Box<dyn PacketSource>> {
    Ok(match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            Box::new(PipeSource::new(file))
        }
        None => Box::new(PipeSource::new(io::stdin())),
    })
}

fn open_sink(path: Option<&PathBuf>) -> Result<SharedSink> {
    Ok(match path {
        Some(path) => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("open {}", path.display()))?;
            Arc::new(PipeSink::new(file))
        }
        None => Arc::new(PipeSink::new(io::stdout())),
    })
}
