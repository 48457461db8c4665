use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use ultimate_client::config::ClientConfig;
use ultimate_client::movement::Movement;
use ultimate_client::session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path: Option<PathBuf> = std::env::args()
        .skip_while(|a| a != "--config")
        .nth(1)
        .map(PathBuf::from);
    let server = std::env::args().skip_while(|a| a != "--server").nth(1);
    let username = std::env::args().skip_while(|a| a != "--username").nth(1);
    let interactive = std::env::args().any(|a| a == "--stdin");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let mut config = match &config_path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(server) = server {
        let (host, port) = parse_server(&server)?;
        config.host = host;
        if let Some(port) = port {
            config.port = port;
        }
    }
    if let Some(username) = username {
        config.username = username;
    }
    config.waypoints.extend(parse_gotos(std::env::args())?);
    config.validate()?;

    tracing::info!(
        "Ultimate client -- Minecraft {} (protocol {}) -> {} as {}",
        ultimate_protocol::VERSION_NAME,
        config.protocol_version,
        config.address(),
        config.username
    );

    let mut session = Session::new(config);
    if interactive {
        tokio::spawn(read_commands(session.watch_movement()));
    }

    tokio::select! {
        result = session.run() => {
            if let Err(e) = result {
                tracing::error!("Disconnected: {}", e.reason());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down...");
        }
    }
    Ok(())
}

/// `host` or `host:port`.
fn parse_server(server: &str) -> anyhow::Result<(String, Option<u16>)> {
    match server.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("bad port in --server {}: {}", server, e))?;
            Ok((host.to_string(), Some(port)))
        }
        None => Ok((server.to_string(), None)),
    }
}

/// Every `--goto x,y,z` on the command line, in order.
fn parse_gotos(mut args: impl Iterator<Item = String>) -> anyhow::Result<Vec<[f64; 3]>> {
    let mut out = Vec::new();
    while let Some(arg) = args.next() {
        if arg != "--goto" {
            continue;
        }
        let Some(value) = args.next() else {
            anyhow::bail!("--goto needs x,y,z");
        };
        out.push(parse_point(&value.replace(',', " "))?);
    }
    Ok(out)
}

fn parse_point(text: &str) -> anyhow::Result<[f64; 3]> {
    let coords: Vec<f64> = text
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|e| anyhow::anyhow!("bad coordinates '{}': {}", text, e))?;
    match coords[..] {
        [x, y, z] => Ok([x, y, z]),
        _ => anyhow::bail!("expected three coordinates, got '{}'", text),
    }
}

/// Movement commands from stdin, one per line:
/// `goto x y z`, `pause`, `resume`, `skip`, `clear`, `stop`.
async fn read_commands(mut movement: watch::Receiver<Option<Movement>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let handle = match movement.wait_for(Option::is_some).await {
            Ok(handle) => handle.clone(),
            Err(_) => return,
        };
        let Some(handle) = handle else { continue };

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "goto" => match parse_point(rest) {
                Ok([x, y, z]) => handle.add_target(x, y, z),
                Err(e) => tracing::warn!("{}", e),
            },
            "pause" => handle.pause(),
            "resume" => handle.resume(),
            "skip" => handle.skip_current(),
            "clear" => handle.clear_targets(),
            "stop" => handle.stop(),
            "status" => tracing::info!(
                "Movement {:?}, {} targets queued",
                handle.state(),
                handle.pending_targets()
            ),
            other => tracing::warn!("Unknown command '{}'", other),
        }
    }
}
