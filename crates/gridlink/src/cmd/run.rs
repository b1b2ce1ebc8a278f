//! Run command - the agent session
//!
//! Wires the session together: resolve the rig's routes once, start the
//! broker publisher and the telemetry source, and forward each event to its
//! destination queue. Panel reporting rides alongside when configured and
//! never touches the forwarding path.

use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gridlink_broker::{
    AmqpTransport, BrokerEndpoint, Publisher, PublisherConfig, RetryPolicy,
};
use gridlink_config::Config;
use gridlink_panel::{
    ActivityTracker, AgentIdentity, LogRelay, PanelClient, PanelConfig, PanelLogLayer,
    StatusReporter,
};
use gridlink_protocol::TelemetryCategory;
use gridlink_routing::{RigProfile, RouteTable};
use gridlink_source::{SourceConfig, Subscriptions, TelemetrySource};

use crate::cmd::{load_config, SessionArgs};

/// Event queue between the source and the forward loop
const EVENT_QUEUE_SIZE: usize = 1024;

/// How long to wait for tasks during shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the agent session
pub async fn run(args: SessionArgs) -> Result<()> {
    let (config, config_path) = load_config(args.config.as_ref())?;

    // Rig id: CLI flag > config > interactive prompt
    let rig_id = match args.rig.or_else(|| config.agent.rig.clone()) {
        Some(rig) => rig,
        None => prompt_rig_id(&config)?,
    };

    // Panel pieces are built before logging init so the relay layer can be
    // part of the subscriber from the first log line
    let panel = config.panel.as_ref().map(|section| {
        let panel_config = PanelConfig {
            base_url: section.url.clone(),
            secret: section.secret.clone(),
            interval: Duration::from_millis(section.interval_ms),
            send_logs: section.send_logs,
        };
        (Arc::new(PanelClient::new(&panel_config)), panel_config)
    });

    let mut relay = None;
    let mut relay_layer = None;
    if let Some((client, panel_config)) = &panel {
        if panel_config.send_logs {
            let (log_relay, layer) = LogRelay::new(Arc::clone(client), rig_id.clone());
            relay = Some(log_relay);
            relay_layer = Some(layer);
        }
    }

    let log_level = args
        .log_level
        .unwrap_or_else(|| config.log.level.as_str().to_string());
    init_logging(&log_level, relay_layer)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        branch = crate::BRANCH,
        rig = %rig_id,
        config = %config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(defaults)".into()),
        "gridlink starting"
    );

    if config.agent.dev_mode {
        warn!("DEVELOPMENT MODE - per-event logging enabled");
    }

    // Unknown rig is the one fatal configuration error
    let Some(entries) = config.rig(&rig_id) else {
        error!(
            rig = %rig_id,
            known = %config.known_rigs().join(", "),
            "unknown rig id"
        );
        anyhow::bail!("unknown rig id '{rig_id}'");
    };

    let profile = RigProfile::new(rig_id.clone(), entries.clone());
    let table = Arc::new(RouteTable::resolve(&profile, &TelemetryCategory::ALL));

    if table.is_empty() {
        warn!(rig = %rig_id, "no categories resolved to a destination, nothing will be forwarded");
    }
    for (category, destination) in table.iter() {
        info!(category = %category, queue = %destination, "route resolved");
    }

    run_session(config, rig_id, table, panel, relay).await
}

/// The wired-up session, from connect to shutdown
async fn run_session(
    config: Config,
    rig_id: String,
    table: Arc<RouteTable>,
    panel: Option<(Arc<PanelClient>, PanelConfig)>,
    relay: Option<LogRelay>,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let activity = ActivityTracker::new();

    // Broker publisher
    let endpoint = broker_endpoint(&config);
    let publisher_config = PublisherConfig::new(endpoint).with_retry(retry_policy(&config));
    let publisher = Arc::new(Publisher::new(AmqpTransport::new(), publisher_config));

    // Telemetry source: one event channel feeds the forward loop, attached
    // for every routed category so unrouted ones die at the socket
    let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
    let mut subscriptions = Subscriptions::new();
    for category in table.categories() {
        subscriptions.attach(category, event_tx.clone());
    }
    drop(event_tx);

    let source_config = SourceConfig {
        address: config.agent.listen_address.clone(),
        port: config.agent.listen_port,
        ..Default::default()
    };
    let source = TelemetrySource::bind(source_config, subscriptions)
        .context("failed to bind telemetry port")?;
    let source_metrics = Arc::clone(source.metrics());
    let source_task = tokio::spawn(source.run(cancel.clone()));

    // Kick off the broker connection; events that arrive before readiness
    // are dropped by the publisher, not buffered
    let destinations: Vec<String> = table
        .distinct_destinations()
        .into_iter()
        .map(String::from)
        .collect();
    {
        let publisher = Arc::clone(&publisher);
        let rig_id = rig_id.clone();
        tokio::spawn(async move {
            publisher.connect(&rig_id, destinations).await;
        });
    }

    // Panel reporter and log relay
    if let Some((client, panel_config)) = panel {
        let reporter = StatusReporter::new(
            client,
            rig_id.clone(),
            AgentIdentity {
                version: env!("CARGO_PKG_VERSION").into(),
                branch: crate::BRANCH.into(),
                dev_mode: config.agent.dev_mode,
                send_logs: panel_config.send_logs,
            },
            panel_config.interval,
            activity.clone(),
        );
        tokio::spawn(reporter.run(cancel.clone()));
    }
    if let Some(relay) = relay {
        tokio::spawn(relay.run(cancel.clone()));
    }

    // Forward loop: per event, look up the destination and hand off
    let forward_task = {
        let publisher = Arc::clone(&publisher);
        let table = Arc::clone(&table);
        let rig_id = rig_id.clone();
        let activity = activity.clone();
        let dev_mode = config.agent.dev_mode;
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                activity.touch();

                let Some(destination) = table.destination(event.category) else {
                    continue;
                };

                if dev_mode {
                    debug!(rig = %rig_id, category = %event.category, queue = %destination, "event");
                }

                publisher.publish(&rig_id, destination, &event.payload).await;
            }
        })
    };

    info!(
        rig = %rig_id,
        routes = table.len(),
        port = config.agent.listen_port,
        "gridlink running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping agent...");

    cancel.cancel();

    // Source first (stops the event stream), then the forward loop drains
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, source_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "telemetry source error during shutdown"),
        Ok(Err(e)) => warn!(error = %e, "telemetry source task panicked"),
        Err(_) => warn!("telemetry source did not stop within timeout"),
    }
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, forward_task).await.is_err() {
        warn!("forward loop did not stop within timeout");
    }

    // Close the broker connection, best-effort; accepted-but-unflushed
    // events are not drained
    publisher.shutdown().await;

    let published = publisher.metrics().snapshot();
    let received = source_metrics.snapshot();
    info!(
        packets = received.packets_received,
        published = published.published,
        dropped_disconnected = published.dropped_no_channel,
        publish_errors = published.publish_errors,
        "gridlink shutdown complete"
    );

    Ok(())
}

/// Broker endpoint from config: URI wins over discrete parameters
fn broker_endpoint(config: &Config) -> BrokerEndpoint {
    match &config.broker.uri {
        Some(uri) => BrokerEndpoint::uri(uri.clone()),
        None => BrokerEndpoint::Params {
            host: config.broker.host.clone(),
            port: config.broker.port,
            vhost: config.broker.vhost.clone(),
            username: config.broker.username.clone(),
            password: config.broker.password.clone(),
        },
    }
}

/// Retry policy from config
fn retry_policy(config: &Config) -> RetryPolicy {
    let retry = &config.broker.retry;
    RetryPolicy {
        initial_delay: Duration::from_millis(retry.initial_delay_ms),
        max_delay: Duration::from_millis(retry.max_delay_ms),
        multiplier: retry.multiplier,
        jitter: retry.jitter,
        max_attempts: retry.max_attempts,
    }
}

/// Ask for the rig id on an interactive terminal
fn prompt_rig_id(config: &Config) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("no rig id configured (set agent.rig or pass --rig)");
    }

    let known = config.known_rigs();
    if known.is_empty() {
        print!("Which rig are we using? ");
    } else {
        print!("Which rig are we using? ({}) ", known.join(", "));
    }
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let rig = answer.trim().to_string();

    if rig.is_empty() {
        anyhow::bail!("no rig id given");
    }
    Ok(rig)
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, panel_layer: Option<PanelLogLayer>) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(panel_layer)
        .with(filter)
        .init();

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
