//! HTTP gateway for administering and tailing a Kafka cluster.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use kafka_admin_broker::BrokerGateway;
use kafka_admin_broker_kafka::{KafkaBroker, KafkaOptions, SaslCredentials};
use kafka_admin_broker_memory::MemoryBroker;
use kafka_admin_core::{Core, CoreOptions};
use kafka_admin_http_insecure::InsecureHttpServer;
use kafka_admin_streaming::StreamingConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Core error
    #[error(transparent)]
    Core(#[from] kafka_admin_core::Error),

    /// Kafka client error
    #[error(transparent)]
    Kafka(#[from] kafka_admin_broker_kafka::Error),

    /// Server task failed
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// No bootstrap servers and not running in memory
    #[error("KAFKA_BOOTSTRAP_SERVERS is required unless --in-memory is set")]
    MissingBootstrapServers,
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 2020, env = "PORT")]
    port: u16,

    /// Comma separated Kafka bootstrap servers
    #[arg(
        long,
        env = "KAFKA_BOOTSTRAP_SERVERS",
        required_unless_present = "in_memory"
    )]
    kafka_bootstrap_servers: Option<String>,

    /// SASL username (SCRAM-SHA-512 over SASL_SSL when set with a password)
    #[arg(long, env = "KAFKA_SASL_USERNAME")]
    kafka_sasl_username: Option<String>,

    /// SASL password
    #[arg(long, env = "KAFKA_SASL_PASSWORD", hide_env_values = true)]
    kafka_sasl_password: Option<String>,

    /// CA bundle for verifying brokers over SASL_SSL
    #[arg(long, env = "KAFKA_CA_LOCATION")]
    kafka_ca_location: Option<String>,

    /// Timeout for metadata and admin requests, in milliseconds
    #[arg(long, default_value_t = 10_000, env = "KAFKA_METADATA_TIMEOUT_MS")]
    metadata_timeout_ms: u64,

    /// Poll interval of batch reads, in milliseconds
    #[arg(
        long,
        default_value_t = 100,
        env = "BATCH_POLL_INTERVAL_MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    batch_poll_interval_ms: u64,

    /// Idle time before a live stream sends a heartbeat, in milliseconds
    #[arg(
        long,
        default_value_t = 500,
        env = "HEARTBEAT_INTERVAL_MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    heartbeat_interval_ms: u64,

    /// Serve an empty in-memory broker instead of connecting to Kafka
    #[arg(long, env = "IN_MEMORY")]
    in_memory: bool,

    /// Log as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    fn streaming_config(&self) -> StreamingConfig {
        StreamingConfig {
            batch_poll_interval: Duration::from_millis(self.batch_poll_interval_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
        }
    }

    fn kafka_options(&self) -> Result<KafkaOptions, Error> {
        let bootstrap_servers = self
            .kafka_bootstrap_servers
            .as_deref()
            .map(str::trim)
            .filter(|servers| !servers.is_empty())
            .ok_or(Error::MissingBootstrapServers)?;

        let mut options = KafkaOptions::new(bootstrap_servers);
        options.sasl = SaslCredentials::from_parts(
            self.kafka_sasl_username.clone(),
            self.kafka_sasl_password.clone(),
        );
        options.ca_location.clone_from(&self.kafka_ca_location);
        options.metadata_timeout = Duration::from_millis(self.metadata_timeout_ms);

        Ok(options)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
                return;
            }
            _ => warn!("failed to install unix signal handlers, falling back to ctrl-c"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received interrupt signal");
}

async fn serve<G: BrokerGateway>(
    broker: G,
    args: &Args,
    shutdown_token: CancellationToken,
) -> Result<(), Error> {
    let core = Core::new(CoreOptions {
        broker,
        streaming_config: args.streaming_config(),
    });

    let handle = core
        .start(InsecureHttpServer::new(args.listen_addr()))
        .await?;

    tokio::select! {
        () = shutdown_token.cancelled() => {
            core.shutdown().await;
            Ok(())
        }
        result = handle => result?.map_err(Error::from),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let shutdown_token = CancellationToken::new();

    // Set up signal handlers
    let signal_shutdown_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;

        info!("Shutting down");
        signal_shutdown_token.cancel();
    });

    if args.in_memory {
        info!("serving in-memory broker");
        serve(MemoryBroker::new(), &args, shutdown_token).await
    } else {
        let broker = KafkaBroker::new(args.kafka_options()?)?;
        serve(broker, &args, shutdown_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kafka-admin-api", "--in-memory"]).unwrap();

        assert_eq!(args.listen_addr(), SocketAddr::from(([0, 0, 0, 0], 2020)));
        assert_eq!(args.streaming_config(), StreamingConfig::default());
        assert_eq!(args.metadata_timeout_ms, 10_000);
        assert!(!args.log_json);
    }

    #[test]
    fn test_zero_intervals_rejected() {
        for flag in ["--batch-poll-interval-ms", "--heartbeat-interval-ms"] {
            let result = Args::try_parse_from(["kafka-admin-api", "--in-memory", flag, "0"]);
            assert!(result.is_err(), "{flag} accepted 0");
        }

        let args = Args::try_parse_from([
            "kafka-admin-api",
            "--in-memory",
            "--batch-poll-interval-ms",
            "1",
            "--heartbeat-interval-ms",
            "1",
        ])
        .unwrap();
        assert_eq!(
            args.streaming_config().heartbeat_interval,
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_kafka_options() {
        let args = Args::try_parse_from([
            "kafka-admin-api",
            "--kafka-bootstrap-servers",
            "kafka-1:9092,kafka-2:9092",
            "--kafka-sasl-username",
            "admin",
            "--kafka-sasl-password",
            "secret",
            "--kafka-ca-location",
            "/etc/kafka/ca.pem",
            "--metadata-timeout-ms",
            "2500",
        ])
        .unwrap();

        let options = args.kafka_options().unwrap();

        assert_eq!(options.bootstrap_servers, "kafka-1:9092,kafka-2:9092");
        assert_eq!(options.sasl.map(|s| s.username), Some("admin".to_string()));
        assert_eq!(options.ca_location.as_deref(), Some("/etc/kafka/ca.pem"));
        assert_eq!(options.metadata_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_username_alone_is_plaintext() {
        let args = Args::try_parse_from([
            "kafka-admin-api",
            "--kafka-bootstrap-servers",
            "localhost:9092",
            "--kafka-sasl-username",
            "admin",
        ])
        .unwrap();

        assert!(args.kafka_options().unwrap().sasl.is_none());
    }

    #[test]
    fn test_blank_bootstrap_servers_rejected() {
        let args =
            Args::try_parse_from(["kafka-admin-api", "--kafka-bootstrap-servers", " "]).unwrap();

        assert!(matches!(
            args.kafka_options(),
            Err(Error::MissingBootstrapServers)
        ));
    }
}
