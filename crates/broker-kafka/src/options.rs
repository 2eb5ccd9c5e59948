use std::fmt;
use std::time::Duration;

use rdkafka::ClientConfig;

/// Default timeout for metadata and admin requests.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// SCRAM credentials used over `SASL_SSL`.
#[derive(Clone)]
pub struct SaslCredentials {
    /// SASL username.
    pub username: String,

    /// SASL password.
    pub password: String,
}

impl SaslCredentials {
    /// Builds credentials only when both parts are present and non-empty.
    #[must_use]
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Self { username, password })
            }
            _ => None,
        }
    }
}

impl fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Options for connecting to a Kafka cluster.
#[derive(Clone, Debug)]
pub struct KafkaOptions {
    /// Comma separated `host:port` list.
    pub bootstrap_servers: String,

    /// Credentials. Without them the connection is plaintext.
    pub sasl: Option<SaslCredentials>,

    /// CA bundle used to verify brokers when SASL is enabled.
    pub ca_location: Option<String>,

    /// Timeout for metadata and admin requests.
    pub metadata_timeout: Duration,
}

impl KafkaOptions {
    /// Creates plaintext options for the given bootstrap servers.
    #[must_use]
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            sasl: None,
            ca_location: None,
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    /// Client configuration shared by every client this crate creates.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);

        if let Some(sasl) = &self.sasl {
            config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "SCRAM-SHA-512")
                .set("sasl.username", &sasl.username)
                .set("sasl.password", &sasl.password);

            if let Some(ca_location) = self.ca_location.as_deref().filter(|l| !l.is_empty()) {
                config.set("ssl.ca.location", ca_location);
            }
        }

        config
    }
}
