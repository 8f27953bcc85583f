//! Configuration validation

use super::Config;
use crate::protocol::MacAddr;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fold another result's diagnostics into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_logging(config, &mut result);
    validate_arp(config, &mut result);
    validate_capture(config, &mut result);
    validate_interfaces(config, &mut result);

    result
}

fn validate_logging(config: &Config, result: &mut ValidationResult) {
    let level = &config.logging.level;
    if level.parse::<tracing::Level>().is_err() {
        result.warn(format!(
            "logging.level: unknown level '{}', using info",
            level
        ));
    }
}

fn validate_arp(config: &Config, result: &mut ValidationResult) {
    if config.arp.pending_capacity == 0 {
        result.error("arp.pending_capacity: must be at least 1");
    }
}

fn validate_capture(config: &Config, result: &mut ValidationResult) {
    if config.capture.channel_capacity == 0 {
        result.error("capture.channel_capacity: must be at least 1");
    }
}

fn validate_interfaces(config: &Config, result: &mut ValidationResult) {
    let mut seen = HashSet::new();

    for (i, iface) in config.interfaces.iter().enumerate() {
        if iface.name.is_empty() {
            result.error(format!("interfaces[{}]: name must not be empty", i));
            continue;
        }

        if !seen.insert(iface.name.as_str()) {
            result.error(format!(
                "interfaces[{}]: duplicate entry for '{}'",
                i, iface.name
            ));
        }

        if let Some(ref mac) = iface.mac {
            match mac.parse::<MacAddr>() {
                Ok(parsed) if parsed.is_multicast() => {
                    result.error(format!(
                        "interfaces.{}: mac {} is a group address",
                        iface.name, parsed
                    ));
                }
                Ok(_) => {}
                Err(e) => result.error(format!("interfaces.{}: {}", iface.name, e)),
            }
        }

        if let Some(addr) = iface.address {
            if addr.is_unspecified() || addr.is_broadcast() || addr.is_multicast() {
                result.error(format!(
                    "interfaces.{}: address {} cannot be assigned to an interface",
                    iface.name, addr
                ));
            }
        }

        if iface.address.is_none() && iface.mac.is_none() {
            result.warn(format!(
                "interfaces.{}: entry overrides nothing",
                iface.name
            ));
        }
    }
}
