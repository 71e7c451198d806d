use crate::broadcast::TICK_INTERVAL_MS;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime settings for a `Server`
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub addr: String,
    /// Period of the `playersUpdate` broadcast
    pub tick_interval: Duration,
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{}:{}", host, port),
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}
