//! Default command: load Singer input into Magento BI.

use anyhow::{Context, Result};
use contracts::{RecordSink, TargetConfig};
use dispatcher::{HttpTransport, HttpTransportConfig};
use session::{BatchSettings, BufferedSink, DryRunSink, Session, SessionStats};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info, warn};

use crate::cli::RunArgs;
use crate::usage;

/// Execute the default command
pub async fn run_target(args: &RunArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            let config = config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Some(config)
        }
        None => None,
    };

    if let Some(config) = &config {
        info!(
            client_id = config.client_id,
            url = %config.magentobi_url,
            batch_size_bytes = config.batch_size_bytes,
            batch_delay_millis = config.batch_delay_millis,
            "Configuration loaded"
        );

        if config.disable_collection {
            debug!("Anonymous usage collection disabled");
        } else if !args.dry_run {
            usage::spawn_usage_beacon();
        }
    }

    let input = BufReader::new(tokio::io::stdin());
    let output = std::io::stdout();

    if args.dry_run {
        let (stats, _) = drive(DryRunSink::new("dry_run"), input, output).await?;
        stats.log_summary();
    } else {
        let config = config.context("--config is required unless --dry-run is set")?;
        let sink = buffered_sink(&config)?;
        let (stats, sink) = drive(sink, input, output).await?;

        stats.log_summary();
        let dispatched = sink.dispatcher().metrics().snapshot();
        info!(
            batches = dispatched.batch_count,
            requests = dispatched.request_count,
            records = dispatched.record_count,
            bytes = dispatched.byte_count,
            "Dispatch summary"
        );
    }

    info!("Exiting normally");
    Ok(())
}

fn buffered_sink(config: &TargetConfig) -> Result<BufferedSink<HttpTransport>> {
    let transport_config =
        HttpTransportConfig::from_target_config(config).context("Invalid Magento BI endpoint")?;
    let transport = HttpTransport::new("magentobi", transport_config)
        .context("Failed to create HTTP transport")?;

    Ok(BufferedSink::new(
        "magentobi",
        BatchSettings::from_target_config(config),
        transport,
    ))
}

/// Run one session over `input`, stopping early on Ctrl+C or SIGTERM
async fn drive<S, R, W>(sink: S, input: R, output: W) -> Result<(SessionStats, S)>
where
    S: RecordSink,
    R: AsyncBufRead + Unpin,
    W: std::io::Write,
{
    let mut session = Session::new(sink, output);
    let stats = session
        .run_until(input, shutdown_signal())
        .await
        .context("Failed to load records")?;

    let (sink, _) = session.into_parts();
    Ok((stats, sink))
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, finishing up"),
        _ = terminate => warn!("Received SIGTERM, finishing up"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher::MockTransport;
    use std::time::Duration;

    const INPUT: &str = concat!(
        r#"{"type":"SCHEMA","stream":"orders","schema":{},"key_properties":["id"]}"#,
        "\n",
        r#"{"type":"RECORD","stream":"orders","record":{"id":1}}"#,
        "\n",
        r#"{"type":"STATE","value":{"bookmark":1}}"#,
        "\n",
    );

    #[tokio::test]
    async fn test_drive_returns_sink_and_stats() {
        let transport = MockTransport::new();
        let sink = BufferedSink::new(
            "test",
            BatchSettings {
                client_id: 3,
                target_bytes: 1_000_000,
                max_age: Duration::from_secs(60),
            },
            transport.clone(),
        );

        let mut output = Vec::new();
        let (stats, sink) = drive(sink, INPUT.as_bytes(), &mut output).await.unwrap();

        assert_eq!(stats.records, 1);
        assert_eq!(sink.dispatcher().metrics().snapshot().record_count, 1);
        assert_eq!(transport.requests()[0].client_id, 3);
        assert_eq!(String::from_utf8(output).unwrap(), "{\"bookmark\":1}\n");
    }

    #[tokio::test]
    async fn test_drive_surfaces_session_error() {
        let mut output = Vec::new();
        let err = drive(DryRunSink::new("dry"), "not json\n".as_bytes(), &mut output)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("line 1"), "got: {err:#}");
    }

    #[test]
    fn test_buffered_sink_rejects_bad_url() {
        let mut config = TargetConfig::new(1, "k");
        config.magentobi_url = "mailto:nobody@example.com".into();
        assert!(buffered_sink(&config).is_err());
    }
}
