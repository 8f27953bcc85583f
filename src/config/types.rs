//! Configuration types

pub use crate::dataplane::DEFAULT_PENDING_CAPACITY;
use crate::dataplane::PendingPolicy;
use serde::Deserialize;
use std::net::Ipv4Addr;

/// Default depth of the channel between receive tasks and the dispatch loop
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// User-defined configuration (config.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub arp: ArpConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub interfaces: Vec<InterfaceOverride>,
}

impl Config {
    /// Override entry for the named interface, if any
    pub fn interface(&self, name: &str) -> Option<&InterfaceOverride> {
        self.interfaces.iter().find(|iface| iface.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// error, warn, info, debug, trace
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArpConfig {
    #[serde(default)]
    pub pending_policy: PendingPolicy,
    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,
}

impl Default for ArpConfig {
    fn default() -> Self {
        Self {
            pending_policy: PendingPolicy::default(),
            pending_capacity: DEFAULT_PENDING_CAPACITY,
        }
    }
}

fn default_pending_capacity() -> usize {
    DEFAULT_PENDING_CAPACITY
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Put every bound interface into promiscuous mode
    #[serde(default)]
    pub promiscuous: bool,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            promiscuous: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Replaces the kernel-reported addresses of one interface
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceOverride {
    pub name: String,
    pub address: Option<Ipv4Addr>,
    /// Colon- or dash-separated hex, e.g. `de:ad:be:ef:00:01`
    pub mac: Option<String>,
}
