//! Route table file loader
//!
//! One route per line: `prefix next_hop mask interface`, whitespace
//! separated. Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! # prefix     next_hop      mask           interface
//! 10.0.1.0     192.168.1.2   255.255.255.0  1
//! 0.0.0.0      172.16.0.1    0.0.0.0        0
//! ```

use super::ValidationResult;
use crate::dataplane::{is_contiguous, RouteEntry};
use crate::{Error, Result};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;

/// Load a route table file
pub fn load_routes<P: AsRef<Path>>(path: P) -> Result<Vec<RouteEntry>> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse_routes(&content)
}

/// Parse route table text
pub fn parse_routes(text: &str) -> Result<Vec<RouteEntry>> {
    let mut routes = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        routes.push(parse_line(line).map_err(|reason| Error::RouteTable {
            line: index + 1,
            reason,
        })?);
    }

    Ok(routes)
}

fn parse_line(line: &str) -> std::result::Result<RouteEntry, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [prefix, next_hop, mask, interface] = fields.as_slice() else {
        return Err(format!(
            "expected 4 fields (prefix next_hop mask interface), found {}",
            fields.len()
        ));
    };

    let prefix = parse_addr("prefix", prefix)?;
    let next_hop = parse_addr("next hop", next_hop)?;
    let mask = parse_addr("mask", mask)?;
    if !is_contiguous(mask) {
        return Err(format!("mask {} is not contiguous", mask));
    }
    let interface: usize = interface
        .parse()
        .map_err(|_| format!("invalid interface id '{}'", interface))?;

    Ok(RouteEntry::new(prefix, mask, next_hop, interface))
}

fn parse_addr(what: &str, value: &str) -> std::result::Result<Ipv4Addr, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, value))
}

/// Check loaded routes against each other and the interface count
///
/// Without an interface count, interface ids are not checked.
pub fn validate_routes(routes: &[RouteEntry], interface_count: Option<usize>) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut seen = HashSet::new();

    for route in routes {
        if route.has_host_bits() {
            result.warn(format!(
                "Route {}: prefix has bits set outside mask {}",
                route, route.mask
            ));
        }

        if let Some(count) = interface_count {
            if route.interface >= count {
                result.error(format!(
                    "Route {}: interface {} does not exist ({} configured)",
                    route, route.interface, count
                ));
            }
        }

        if !seen.insert((route.prefix, route.mask)) {
            result.warn(format!(
                "Route {}: duplicate prefix, the last entry wins",
                route
            ));
        }
    }

    if routes.is_empty() {
        result.warn("Route table is empty; every packet will be unreachable");
    }

    result
}
