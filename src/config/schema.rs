use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// TTL heartbeat configuration
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// Service check filter configuration
    #[serde(default)]
    pub filter: FilterConfig,
    /// Local sandbox run of the binary
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

// ============================================================================
// Heartbeat Configuration
// ============================================================================

/// TTL heartbeat configuration for locally registered services
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    /// Whether TTL checks are reported at all
    #[serde(default = "default_heartbeat_enabled")]
    pub enabled: bool,
    /// Period of the scheduler tick (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// TTL of the registered check (seconds)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Fraction of the TTL between two reports for the same service
    #[serde(default = "default_interval_ratio")]
    pub interval_ratio: f64,
}

fn default_heartbeat_enabled() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    15000
}

fn default_ttl_secs() -> u64 {
    30
}

fn default_interval_ratio() -> f64 {
    2.0 / 3.0
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: default_heartbeat_enabled(),
            tick_interval_ms: default_tick_interval_ms(),
            ttl_secs: default_ttl_secs(),
            interval_ratio: default_interval_ratio(),
        }
    }
}

impl HeartbeatConfig {
    /// Period of the scheduler tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Minimum spacing between two reports for the same service
    ///
    /// `ttl * interval_ratio`, no sooner than 1s, and no later than 1s before
    /// the TTL expires. The TTL bound wins when both conflict.
    pub fn heartbeat_interval(&self) -> Duration {
        let ttl = self.ttl_secs as f64;
        let secs = (ttl * self.interval_ratio).max(1.0).min(ttl - 1.0).max(0.0);
        Duration::from_millis((secs * 1000.0).round() as u64)
    }

    /// TTL as registered with the check, e.g. `"30s"`
    pub fn ttl(&self) -> String {
        format!("{}s", self.ttl_secs)
    }
}

// ============================================================================
// Filter Configuration
// ============================================================================

/// Service check filter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// When disabled, candidate lists are passed through untouched
    #[serde(default = "default_filter_enabled")]
    pub enabled: bool,
}

fn default_filter_enabled() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_filter_enabled(),
        }
    }
}

// ============================================================================
// Sandbox Configuration
// ============================================================================

/// Services heartbeated by the binary against an in-memory registry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SandboxConfig {
    /// Service ids registered at startup
    #[serde(default)]
    pub services: Vec<String>,
    /// Address of the Prometheus endpoint, disabled when unset
    #[serde(default)]
    pub metrics_addr: Option<String>,
}
