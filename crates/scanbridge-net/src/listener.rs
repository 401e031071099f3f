// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command listener: receives button-event datagrams from the device, drops
// malformed and duplicate ones, and feeds the rest into the command queue.
//
// The protocol is one-way: nothing is ever sent back to the device.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use scanbridge_core::Command;
use scanbridge_core::error::{Result, ScanBridgeError};

use crate::protocol::{self, DatagramError};
use crate::queue::{CommandSender, Submit};

/// Receive buffer size. Device datagrams are well under this.
const RECV_BUFFER_BYTES: usize = 2048;

/// Remembers the last accepted `SEQ`.
///
/// Only the immediately preceding value is compared, so `5, 5` is one event
/// but `5, 6, 5` is three.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceTracker {
    last: Option<u64>,
}

impl SequenceTracker {
    /// Most recently accepted `SEQ`, if any.
    pub fn last(&self) -> Option<u64> {
        self.last
    }

    /// Record `seq`. Returns `false` if it repeats the previous value.
    pub fn observe(&mut self, seq: u64) -> bool {
        if self.last == Some(seq) {
            return false;
        }
        self.last = Some(seq);
        true
    }
}

/// What happened to one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Queued(Command),
    Rejected(DatagramError),
    Duplicate(u64),
    InvalidSlot { seq: u64, appnum: Option<u64> },
    /// Valid command the queue could not take.
    Dropped(Command),
}

/// Datagram validation and duplicate suppression, independent of the socket.
#[derive(Debug)]
pub struct CommandFilter {
    tracker: SequenceTracker,
    sender: CommandSender,
}

impl CommandFilter {
    /// Filter feeding accepted commands into `sender`.
    pub fn new(sender: CommandSender) -> Self {
        Self {
            tracker: SequenceTracker::default(),
            sender,
        }
    }

    /// Duplicate-suppression state.
    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    /// Process one datagram. Never blocks.
    pub fn handle(&mut self, data: &[u8]) -> Disposition {
        let event = match protocol::decode(data) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, bytes = data.len(), "dropping unrecognised datagram");
                return Disposition::Rejected(e);
            }
        };

        if !self.tracker.observe(event.seq) {
            // Every press arrives twice.
            debug!(seq = event.seq, "dropping duplicate event");
            return Disposition::Duplicate(event.seq);
        }

        let command = match event
            .appnum
            .and_then(|n| u8::try_from(n).ok())
            .and_then(Command::from_slot)
        {
            Some(command) => command,
            None => {
                warn!(seq = event.seq, appnum = ?event.appnum, "dropping event with no or invalid APPNUM");
                return Disposition::InvalidSlot {
                    seq: event.seq,
                    appnum: event.appnum,
                };
            }
        };

        info!(seq = event.seq, slot = command.slot(), %command, "button pressed");
        match self.sender.submit(command) {
            Submit::Accepted => Disposition::Queued(command),
            Submit::Full | Submit::Closed => Disposition::Dropped(command),
        }
    }
}

/// Owns the command socket.
#[derive(Debug)]
pub struct CommandListener {
    socket: UdpSocket,
    filter: CommandFilter,
}

impl CommandListener {
    /// Bind the command socket.
    ///
    /// # Errors
    ///
    /// Returns [`ScanBridgeError::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr, sender: CommandSender) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ScanBridgeError::Bind { addr, source })?;
        info!(addr = %addr, "command listener bound");
        Ok(Self {
            socket,
            filter: CommandFilter::new(sender),
        })
    }

    /// Resolve `host` and bind to the first address it yields.
    pub async fn bind_host(host: &str, port: u16, sender: CommandSender) -> Result<Self> {
        let addr = resolve(host, port).await?;
        Self::bind(addr, sender).await
    }

    /// Address the socket is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| ScanBridgeError::Socket(format!("local address: {e}")))
    }

    /// Receive until `shutdown` fires. The socket is closed on return.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut buf = [0u8; RECV_BUFFER_BYTES];

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("command listener received shutdown signal");
                    break;
                }

                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => {
                            debug!(peer = %peer, bytes = len, "datagram received");
                            self.filter.handle(&buf[..len]);
                        }
                        Err(e) => {
                            warn!(error = %e, "datagram receive failed");
                        }
                    }
                }
            }
        }

        info!("command listener stopped");
    }
}

/// Resolve `host:port` to one socket address.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ScanBridgeError::Config(format!("cannot resolve {host}: {e}")))?
        .next()
        .ok_or_else(|| ScanBridgeError::Config(format!("{host} resolved to no addresses")))
}
