// Scout Linux daemon: hosts the discovery coordinator behind a LAN multicast
// binding and bridges its events and diagnostics into tracing.

mod binding;
mod config;
mod handle;
mod protocol;

use std::time::Duration;

use scout_core::{Coordinator, DiagLevel, DiagSink, Event, PeerId};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("scout-daemon {}", VERSION);
            return Ok(());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = config::load();
    let local_id = PeerId::new(uuid::Uuid::new_v4().simple().to_string());
    tracing::info!(id = %local_id, port = cfg.discovery_port, "starting scout daemon");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let coordinator =
            Coordinator::with_diag_sink(DiagSink::with_capacity(cfg.diag_capacity));
        let (binding_tx, binding_rx) = tokio::sync::mpsc::unbounded_channel();
        let coordinator_handle = handle::CoordinatorHandle::spawn(coordinator, binding_tx);

        tokio::spawn(binding::run_binding(
            cfg.clone(),
            local_id.clone(),
            coordinator_handle.clone(),
            binding_rx,
        ));

        coordinator_handle
            .subscribe(Box::new(|event| {
                match event {
                    Event::StateChanged { old, new, reason } => match reason {
                        Some(reason) => {
                            tracing::warn!(%old, %new, %reason, "session state changed")
                        }
                        None => tracing::info!(%old, %new, "session state changed"),
                    },
                    Event::PeerListChanged {
                        added,
                        updated,
                        removed,
                    } => {
                        for peer in added {
                            tracing::info!(id = %peer.id, name = %peer.display_name, "peer found");
                        }
                        for peer in updated {
                            tracing::info!(id = %peer.id, name = %peer.display_name, "peer updated");
                        }
                        for peer in removed {
                            tracing::info!(id = %peer.id, "peer lost");
                        }
                    }
                }
                Ok(())
            }))
            .await?;

        coordinator_handle.start().await?;

        let diag_handle = coordinator_handle.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                interval.tick().await;
                let Ok(records) = diag_handle.drain_diag().await else {
                    return;
                };
                for record in records {
                    let context = record
                        .context
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(" ");
                    match record.level {
                        DiagLevel::Debug => tracing::debug!(seq = record.seq, %context, "{}", record.message),
                        DiagLevel::Info => tracing::info!(seq = record.seq, %context, "{}", record.message),
                        DiagLevel::Warn => tracing::warn!(seq = record.seq, %context, "{}", record.message),
                        DiagLevel::Error => tracing::error!(seq = record.seq, %context, "{}", record.message),
                    }
                }
            }
        });

        shutdown_signal().await?;
        tracing::info!("shutting down");
        let _ = coordinator_handle.stop().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
