use anyhow::Context;
use clap::Parser;
use hermes_bridge::{cli::BridgeArgs, Bridge, UdpTransport};
use hermes_regbus::RegisterBus;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = BridgeArgs::parse().into_settings()?;

    let filter = match settings.log_filter.as_deref() {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(device = %settings.device, "mapping register window");
    let bus = RegisterBus::map_device_at(&settings.mem_device, &settings.device)
        .with_context(|| format!("map register window of {}", settings.device))?;
    {
        let window = bus.window()?;
        tracing::info!(
            path = %window.path().display(),
            base_address = format_args!("0x{:x}", window.base_address()),
            len_words = bus.len_words()?,
            "register window mapped"
        );
    }

    let config = settings.bridge;
    let transport = UdpTransport::bind(config.bind_addr, config.reply_socket)
        .await
        .with_context(|| format!("bind UDP listener on {}", config.bind_addr))?;
    tracing::info!(
        addr = %transport.local_addr()?,
        skip_reply_count_check = config.skip_reply_count_check,
        "hermes-udp-bridge listening"
    );

    let mut bridge = Bridge::new(bus, transport, config);
    let status = bridge.status().context("read transactor status")?;
    tracing::info!(%status, "transactor status");

    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        err = bridge.run() => {
            return Err(err).context("bridge loop terminated; restart to resynchronise with the transactor");
        }
        _ = ctrl_c => {},
        _ = sigterm => {},
    }

    tracing::info!(stats = ?bridge.stats(), "shutdown signal received");
    Ok(())
}
