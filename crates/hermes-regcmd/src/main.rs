use anyhow::Context;
use clap::Parser;
use hermes_regbus::{RegisterBus, FULL_MASK};
use hermes_regcmd::{cli::CommandArgs, start_server};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = CommandArgs::parse().into_settings()?;

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
    let first = bus.read_scalar(0, FULL_MASK).context("read register 0")?;
    tracing::info!("register 0 reads 0x{first:x}");

    let handle = start_server(settings.service.clone(), bus)
        .await
        .with_context(|| format!("bind command listener on {}", settings.service.bind_addr))?;
    tracing::info!("hermes-regcmd listening on {}", handle.local_addr());

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
        _ = ctrl_c => {},
        _ = sigterm => {},
    }

    tracing::info!("shutdown signal received");
    handle.shutdown().await;
    Ok(())
}
