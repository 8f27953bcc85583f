//! Metrics collection for packet statistics.
//!
//! Provides thread-safe counters for tracking packet processing metrics
//! at both the global and per-interface level.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a value to the counter.
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Point-in-time value that can move both ways.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, val: usize) {
        self.0.store(val as u64, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-interface statistics.
#[derive(Debug, Default)]
pub struct InterfaceStats {
    /// Number of frames received.
    pub rx_packets: Counter,
    /// Number of bytes received.
    pub rx_bytes: Counter,
    /// Number of frames transmitted.
    pub tx_packets: Counter,
    /// Number of bytes transmitted.
    pub tx_bytes: Counter,
    /// Number of received frames that could not be parsed.
    pub rx_errors: Counter,
}

impl InterfaceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received frame.
    pub fn record_rx(&self, bytes: usize) {
        self.rx_packets.inc();
        self.rx_bytes.add(bytes as u64);
    }

    /// Records a transmitted frame.
    pub fn record_tx(&self, bytes: usize) {
        self.tx_packets.inc();
        self.tx_bytes.add(bytes as u64);
    }
}

/// Global metrics registry for the forwarding engine.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Per-interface statistics keyed by interface name.
    interfaces: RwLock<BTreeMap<String, InterfaceStats>>,

    // Forwarding metrics
    /// Packets sent toward their next hop, including replays.
    pub packets_forwarded: Counter,
    /// Packets discarded (malformed, unsupported, queue full).
    pub packets_dropped: Counter,
    /// IPv4 headers whose checksum did not verify.
    pub checksum_errors: Counter,

    // ARP metrics
    pub arp_requests_sent: Counter,
    pub arp_replies_sent: Counter,
    /// Queued packets sent after their next hop resolved.
    pub arp_replays: Counter,

    // ICMP metrics
    pub icmp_echo_replies: Counter,
    pub icmp_dest_unreachable: Counter,
    pub icmp_time_exceeded: Counter,

    // Table size gauges
    pub arp_cache_size: Gauge,
    pub pending_depth: Gauge,
    pub route_count: Gauge,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interface for statistics tracking.
    pub fn register_interface(&self, name: &str) {
        let mut interfaces = self
            .interfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        interfaces.entry(name.to_string()).or_default();
    }

    fn with_interface(&self, interface: &str, f: impl FnOnce(&InterfaceStats)) {
        let interfaces = self
            .interfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(stats) = interfaces.get(interface) {
            f(stats);
        }
    }

    /// Records a received frame on an interface.
    pub fn record_rx(&self, interface: &str, bytes: usize) {
        self.with_interface(interface, |stats| stats.record_rx(bytes));
    }

    /// Records a transmitted frame on an interface.
    pub fn record_tx(&self, interface: &str, bytes: usize) {
        self.with_interface(interface, |stats| stats.record_tx(bytes));
    }

    /// Records an unparseable frame on an interface.
    pub fn record_rx_error(&self, interface: &str) {
        self.with_interface(interface, |stats| stats.rx_errors.inc());
    }

    /// Exports all metrics as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        let mut result = vec![
            ("packets_forwarded".into(), self.packets_forwarded.get()),
            ("packets_dropped".into(), self.packets_dropped.get()),
            ("checksum_errors".into(), self.checksum_errors.get()),
            ("arp_requests_sent".into(), self.arp_requests_sent.get()),
            ("arp_replies_sent".into(), self.arp_replies_sent.get()),
            ("arp_replays".into(), self.arp_replays.get()),
            ("icmp_echo_replies".into(), self.icmp_echo_replies.get()),
            (
                "icmp_dest_unreachable".into(),
                self.icmp_dest_unreachable.get(),
            ),
            ("icmp_time_exceeded".into(), self.icmp_time_exceeded.get()),
            ("arp_cache_size".into(), self.arp_cache_size.get()),
            ("pending_depth".into(), self.pending_depth.get()),
            ("route_count".into(), self.route_count.get()),
        ];

        let interfaces = self
            .interfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for (name, stats) in interfaces.iter() {
            result.extend([
                (format!("{}_rx_packets", name), stats.rx_packets.get()),
                (format!("{}_rx_bytes", name), stats.rx_bytes.get()),
                (format!("{}_tx_packets", name), stats.tx_packets.get()),
                (format!("{}_tx_bytes", name), stats.tx_bytes.get()),
                (format!("{}_rx_errors", name), stats.rx_errors.get()),
            ]);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_basic() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);

        counter.inc();
        assert_eq!(counter.get(), 1);

        counter.add(10);
        assert_eq!(counter.get(), 11);
    }

    #[test]
    fn test_gauge_overwrites() {
        let gauge = Gauge::default();
        gauge.set(7);
        gauge.set(3);
        assert_eq!(gauge.get(), 3);
    }

    #[test]
    fn test_interface_stats() {
        let stats = InterfaceStats::new();

        stats.record_rx(100);
        stats.record_rx(200);
        stats.record_tx(150);

        assert_eq!(stats.rx_packets.get(), 2);
        assert_eq!(stats.rx_bytes.get(), 300);
        assert_eq!(stats.tx_packets.get(), 1);
        assert_eq!(stats.tx_bytes.get(), 150);
    }

    #[test]
    fn test_metrics_registry() {
        let registry = MetricsRegistry::new();

        registry.register_interface("r-0");
        registry.register_interface("r-1");

        registry.record_rx("r-0", 100);
        registry.record_tx("r-0", 200);
        registry.record_rx("r-1", 50);
        registry.record_rx_error("r-1");
        // Unknown interfaces are ignored
        registry.record_rx("r-9", 10);

        registry.packets_forwarded.inc();
        registry.arp_requests_sent.add(5);
        registry.route_count.set(4);

        let metrics = registry.export();

        assert!(metrics.contains(&("packets_forwarded".into(), 1)));
        assert!(metrics.contains(&("arp_requests_sent".into(), 5)));
        assert!(metrics.contains(&("route_count".into(), 4)));

        assert!(metrics.contains(&("r-0_rx_packets".into(), 1)));
        assert!(metrics.contains(&("r-0_rx_bytes".into(), 100)));
        assert!(metrics.contains(&("r-0_tx_bytes".into(), 200)));
        assert!(metrics.contains(&("r-1_rx_errors".into(), 1)));
        assert!(!metrics.iter().any(|(name, _)| name.starts_with("r-9")));
    }
}
