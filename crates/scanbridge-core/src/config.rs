// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanBridgeError};
use crate::types::CaptureFormat;

/// UDP port the device sends button events to. Fixed by the firmware.
pub const COMMAND_PORT: u16 = 54925;

/// Standard SNMP agent port.
pub const SNMP_PORT: u16 = 161;

/// Tunables for the bridge. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Device hostname or IP address (SNMP target).
    pub device_addr: String,
    /// Local address the command socket binds to.
    pub listen_addr: String,
    /// Host written into the advertised callback address. Defaults to
    /// `listen_addr`; set it when the device must reach us through NAT.
    pub advertise_host: Option<String>,
    /// Directory scanned documents are written to.
    pub output_dir: PathBuf,
    /// Scanner selector passed to the capture tool.
    pub scanner_device: Option<String>,
    /// UDP port for inbound button events.
    pub command_port: u16,
    /// SNMP agent port on the device.
    pub snmp_port: u16,
    /// SNMP community string.
    pub snmp_community: String,
    /// How long to wait for the SNMP agent's response, in milliseconds.
    pub snmp_timeout_ms: u64,
    /// Seconds between advertisement rounds.
    pub advertise_interval_secs: u64,
    /// Capture resolution in dpi.
    pub resolution_dpi: u32,
    /// Image format requested from the capture tool.
    pub capture_format: CaptureFormat,
    /// Capture tool executable.
    pub capture_program: String,
    /// Wait before the first capture attempt of a command, in milliseconds.
    pub settle_delay_ms: u64,
    /// Total capture attempts per command.
    pub capture_attempts: u32,
    /// Capacity of the command queue between listener and coordinator.
    pub queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device_addr: String::new(),
            listen_addr: "0.0.0.0".into(),
            advertise_host: None,
            output_dir: PathBuf::from("."),
            scanner_device: None,
            command_port: COMMAND_PORT,
            snmp_port: SNMP_PORT,
            snmp_community: "internal".into(),
            snmp_timeout_ms: 2_000,
            advertise_interval_secs: 30,
            resolution_dpi: 200,
            capture_format: CaptureFormat::Jpeg,
            capture_program: "scanimage".into(),
            settle_delay_ms: 1_000,
            capture_attempts: 2,
            queue_capacity: 10,
        }
    }
}

impl BridgeConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Reject combinations the bridge cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.device_addr.trim().is_empty() {
            return Err(ScanBridgeError::Config("device address is required".into()));
        }
        if self.listen_addr.trim().is_empty() {
            return Err(ScanBridgeError::Config("listen address is required".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ScanBridgeError::Config("queue capacity must be at least 1".into()));
        }
        if self.capture_attempts == 0 {
            return Err(ScanBridgeError::Config("capture attempts must be at least 1".into()));
        }
        if self.advertise_interval_secs == 0 {
            return Err(ScanBridgeError::Config("advertise interval must be non-zero".into()));
        }
        Ok(())
    }

    /// Host the device should send button events to.
    pub fn callback_host(&self) -> &str {
        self.advertise_host.as_deref().unwrap_or(&self.listen_addr)
    }

    /// Time between advertisement rounds.
    pub fn advertise_interval(&self) -> Duration {
        Duration::from_secs(self.advertise_interval_secs)
    }

    /// Wait before the first capture attempt of a command.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// How long to wait for the agent to confirm a SET.
    pub fn snmp_timeout(&self) -> Duration {
        Duration::from_millis(self.snmp_timeout_ms)
    }
}
