// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Menu advertiser: keeps our four entries alive in the device's scan-to menu.
//
// Each round writes one entry per command into the vendor's custom menu
// attribute (BROTHER-MIB, `brRegisterKeyInfo`).  Entries expire on the device
// after `DURATION` seconds, which is three rounds, so two lost rounds are
// tolerated.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use scanbridge_core::Command;
use scanbridge_core::error::Result;

use crate::snmp::SnmpClient;

/// OID of the device's custom menu-entry attribute.
pub const MENU_ENTRY_OID: [u64; 15] = [1, 3, 6, 1, 4, 1, 2435, 2, 3, 9, 2, 11, 1, 1, 0];

/// Something that can write a menu-entry string to the device.
pub trait MenuTransport: Send + Sync + 'static {
    /// Write one menu-entry payload.
    fn register_entry(&self, payload: &str) -> impl Future<Output = Result<()>> + Send;

    /// Release the transport. Called once, when the advertiser stops.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

impl MenuTransport for SnmpClient {
    async fn register_entry(&self, payload: &str) -> Result<()> {
        self.set_octet_string(&MENU_ENTRY_OID, payload.as_bytes()).await
    }

    fn close(self) {
        info!(target = %self.target(), "SNMP client closed");
    }
}

/// Menu-entry payload for one command.
pub fn menu_payload(command: Command, callback_host: &str, command_port: u16, lifetime: Duration) -> String {
    [
        "TYPE=BR".to_string(),
        "BUTTON=SCAN".to_string(),
        format!("USER={}", command.menu_label()),
        "FUNC=FILE".to_string(),
        format!("HOST={callback_host}:{command_port}"),
        format!("APPNUM={}", command.slot()),
        format!("DURATION={}", lifetime.as_secs()),
        "BRID=".to_string(),
    ]
    .join(";")
}

/// Periodically advertises the command menu to one device.
pub struct Advertiser<T> {
    transport: T,
    callback_host: String,
    command_port: u16,
    interval: Duration,
}

impl<T: MenuTransport> Advertiser<T> {
    /// Advertise `callback_host:command_port` through `transport` every `interval`.
    pub fn new(transport: T, callback_host: impl Into<String>, command_port: u16, interval: Duration) -> Self {
        Self {
            transport,
            callback_host: callback_host.into(),
            command_port,
            interval,
        }
    }

    /// How long the device keeps an entry without a refresh.
    pub fn entry_lifetime(&self) -> Duration {
        self.interval * 3
    }

    /// Send one round. Returns how many entries the device accepted.
    ///
    /// A failed entry is logged and does not stop the others.
    pub async fn advertise_once(&self) -> usize {
        let lifetime = self.entry_lifetime();
        let mut accepted = 0;

        for command in Command::ALL {
            let payload = menu_payload(command, &self.callback_host, self.command_port, lifetime);
            match self.transport.register_entry(&payload).await {
                Ok(()) => {
                    debug!(slot = command.slot(), %command, "menu entry registered");
                    accepted += 1;
                }
                Err(e) => {
                    warn!(slot = command.slot(), %command, error = %e, "menu entry registration failed");
                }
            }
        }

        accepted
    }

    /// Advertise every interval until `shutdown` fires, then close the transport.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            host = %self.callback_host,
            port = self.command_port,
            interval_secs = self.interval.as_secs(),
            "advertising scan menu"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("advertiser received shutdown signal");
                    break;
                }

                _ = ticker.tick() => {
                    // A round can stall on SNMP timeouts; shutdown must not wait for it.
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        accepted = self.advertise_once() => {
                            if accepted < Command::ALL.len() {
                                warn!(accepted, total = Command::ALL.len(), "advertisement round incomplete");
                            }
                        }
                    }
                }
            }
        }

        self.transport.close();
        info!("advertiser stopped");
    }
}
