// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SNMPv1 client: pushes one OCTET STRING to the device with a SET.
//
// Framing and request-id matching are handled by `snmp2`; this wrapper adds
// the response timeout and folds its errors into `ScanBridgeError`.

use std::net::SocketAddr;
use std::time::Duration;

use snmp2::{AsyncSession, Oid, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use scanbridge_core::error::{Result, ScanBridgeError};

/// First request id used by a new session.
const FIRST_REQUEST_ID: i32 = 1;

/// SNMPv1 client bound to one agent.
pub struct SnmpClient {
    /// A session issues one request at a time.
    session: Mutex<AsyncSession>,
    target: SocketAddr,
    timeout: Duration,
}

impl SnmpClient {
    /// Open an SNMPv1 session to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanBridgeError::Snmp`] if no local socket can be opened.
    pub async fn connect(target: SocketAddr, community: impl Into<String>, timeout: Duration) -> Result<Self> {
        let community = community.into();
        let session = AsyncSession::new_v1(target, community.as_bytes(), FIRST_REQUEST_ID)
            .await
            .map_err(|e| ScanBridgeError::Snmp(format!("open session to {target}: {e}")))?;

        info!(target = %target, "SNMP client ready");
        Ok(Self {
            session: Mutex::new(session),
            target,
            timeout,
        })
    }

    /// Agent this client talks to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// SET `oid` to an OCTET STRING and wait for the agent to confirm.
    ///
    /// # Errors
    ///
    /// [`ScanBridgeError::SnmpStatus`] when the agent refuses the write,
    /// [`ScanBridgeError::Snmp`] on timeout or transport failure.
    pub async fn set_octet_string(&self, oid: &[u64], value: &[u8]) -> Result<()> {
        let oid = Oid::from(oid).map_err(|e| ScanBridgeError::Snmp(format!("invalid OID {oid:?}: {e:?}")))?;

        let mut session = self.session.lock().await;
        let response = tokio::time::timeout(self.timeout, session.set(&[(&oid, Value::OctetString(value))]))
            .await
            .map_err(|_| {
                ScanBridgeError::Snmp(format!(
                    "no response from {} within {}ms",
                    self.target,
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| ScanBridgeError::Snmp(format!("SET to {}: {e:?}", self.target)))?;

        if response.error_status != 0 {
            return Err(ScanBridgeError::SnmpStatus {
                status: i64::from(response.error_status),
                index: i64::from(response.error_index),
            });
        }

        debug!(target = %self.target, bytes = value.len(), "SNMP SET confirmed");
        Ok(())
    }
}
