// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface. Values given here override the config file.

use std::path::PathBuf;

use clap::Parser;

use scanbridge_core::BridgeConfig;
use scanbridge_core::error::Result;

#[derive(Debug, Parser)]
#[command(
    name = "scanbridge",
    version,
    about = "Scan-button bridge for Brother network scanners with multi-page PDF support"
)]
pub struct Cli {
    /// IP address or DNS name of the scanner
    #[arg(required_unless_present = "config")]
    pub device_addr: Option<String>,

    /// Local IP address or DNS name to receive button events on
    #[arg(required_unless_present = "config")]
    pub listen_addr: Option<String>,

    /// Directory scanned documents are written to
    #[arg(required_unless_present = "config")]
    pub output_dir: Option<PathBuf>,

    /// SANE device selector passed to the capture tool
    #[arg(short = 'd', long = "device")]
    pub scanner_device: Option<String>,

    /// Host advertised to the scanner, if it differs from the listen address
    #[arg(long)]
    pub advertise_host: Option<String>,

    /// JSON config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Build the bridge configuration: defaults, then the file, then flags.
    pub fn to_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_file(path)?,
            None => BridgeConfig::default(),
        };

        if let Some(addr) = &self.device_addr {
            config.device_addr = addr.clone();
        }
        if let Some(addr) = &self.listen_addr {
            config.listen_addr = addr.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.scanner_device.is_some() {
            config.scanner_device = self.scanner_device.clone();
        }
        if self.advertise_host.is_some() {
            config.advertise_host = self.advertise_host.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
