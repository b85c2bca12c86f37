use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use severity_beacon::{config, host, poller, BeaconController, BeaconLink, Severity, SerialPortDevice};

const DEFAULT_CONFIG: &str = "./config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "severity_beacon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("--list") {
        for device in host::list_available_devices()? {
            println!("{}", device);
        }
        return Ok(());
    }

    let config_path = arg.unwrap_or_else(|| DEFAULT_CONFIG.to_owned());
    let config_root = config::read_config(&config_path)
        .with_context(|| format!("loading {}", config_path))?;
    let table = config_root.severity_table()?;

    let available = match &config_root.beacon.path {
        Some(_) => Vec::new(),
        None => host::list_available_devices()?,
    };
    let path = host::select_device(config_root.beacon.path.as_deref(), available)?;

    let device = SerialPortDevice::open_now(&path)?;
    tracing::info!(path = device.path(), "Beacon device selected");
    let link = BeaconLink::new(Box::new(device)).shared();
    let beacon = BeaconController::new(
        link,
        config_root.beacon.idle_color,
        config_root.beacon.clear_after,
    );

    let cancel = CancellationToken::new();
    let (sender, receiver) = watch::channel(Vec::<Severity>::new());

    tokio::spawn(read_problems_from_stdin(sender));
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    poller::run(beacon, receiver, &table, config_root.poll_interval(), cancel).await;

    Ok(())
}

/// Each stdin line lists the severities of the active problems, separated by
/// commas. An empty line means there are no problems.
async fn read_problems_from_stdin(sender: watch::Sender<Vec<Severity>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let parsed: Result<Vec<Severity>, _> = line
                    .split(',')
                    .filter(|name| !name.trim().is_empty())
                    .map(|name| name.parse::<Severity>())
                    .collect();
                match parsed {
                    Ok(active) => {
                        tracing::info!(?active, "Active problems updated");
                        sender.send_replace(active);
                    }
                    Err(e) => tracing::warn!(error = %e, "Ignoring problem line"),
                }
            }
            Ok(None) => {
                tracing::info!("Problem input closed, keeping the last state");
                std::future::pending::<()>().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read problems");
                return;
            }
        }
    }
}
