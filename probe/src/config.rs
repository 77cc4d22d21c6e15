use std::{env, time::Duration};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:4041";
pub const DEFAULT_METADATA_URL: &str = "http://localhost:9090";
pub const DEFAULT_TAG_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Configuración del probe, leída de variables de entorno.
/// - En Docker: ECS_METADATA_URL=http://ecs-metadata:9090
/// - Local: defaults de arriba
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub listen_addr: String,
    pub metadata_url: String,
    pub tag_interval: Duration,
    pub fetch_timeout: Duration,
}

impl ProbeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str, default: u64| {
            lookup(key)
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Self {
            listen_addr: lookup("PROBE_LISTEN_ADDR")
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            metadata_url: lookup("ECS_METADATA_URL")
                .unwrap_or_else(|| DEFAULT_METADATA_URL.to_string()),
            tag_interval: Duration::from_secs(secs("TAG_INTERVAL_SECS", DEFAULT_TAG_INTERVAL_SECS)),
            fetch_timeout: Duration::from_secs(secs(
                "ECS_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )),
        }
    }
}
