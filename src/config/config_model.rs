use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub request_timeouts: RequestTimeouts,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub min_idle: u32,
    pub connect_timeout: u64,
}

/// Storage deadlines handed to the façade. `short` covers writes, `long` covers reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    pub short: Duration,
    pub long: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(3),
            long: Duration::from_secs(10),
        }
    }
}
