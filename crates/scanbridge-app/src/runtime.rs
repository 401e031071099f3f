// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge runtime: builds the three long-lived tasks from a validated config
// and runs them until shutdown.

use std::net::IpAddr;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use scanbridge_core::BridgeConfig;
use scanbridge_core::error::Result;
use scanbridge_document::{PdfDocumentSink, PdfWriter};
use scanbridge_net::listener::resolve;
use scanbridge_net::{Advertiser, CommandListener, CommandReceiver, SnmpClient, command_queue};
use scanbridge_scan::{CoordinatorSettings, ScanCoordinator, ScanImage};

pub struct Bridge {
    listener: CommandListener,
    advertiser: Advertiser<SnmpClient>,
    coordinator: ScanCoordinator<ScanImage, PdfDocumentSink>,
    commands: CommandReceiver,
}

impl Bridge {
    /// Prepare every resource the tasks need.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid, the output directory cannot be
    /// created, the command port cannot be bound, or the device address does
    /// not resolve.
    pub async fn start(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.output_dir).await?;

        let (sender, commands) = command_queue(config.queue_capacity);
        let listener = CommandListener::bind_host(&config.listen_addr, config.command_port, sender).await?;
        let command_port = listener.local_addr()?.port();

        let device = resolve(&config.device_addr, config.snmp_port).await?;
        let snmp = SnmpClient::connect(device, config.snmp_community.clone(), config.snmp_timeout()).await?;

        let callback_host = config.callback_host();
        if callback_host.parse::<IpAddr>().is_ok_and(|ip| ip.is_unspecified()) {
            warn!(
                host = callback_host,
                "advertising an unspecified address; set --advertise-host so the device can reach us"
            );
        }
        let advertiser = Advertiser::new(snmp, callback_host, command_port, config.advertise_interval());

        let sink = PdfDocumentSink::new(config.output_dir.clone(), PdfWriter::a4(config.resolution_dpi));
        let coordinator = ScanCoordinator::new(
            ScanImage::new(config.capture_program.clone()),
            sink,
            CoordinatorSettings::from_config(&config),
        );

        info!(
            device = %device,
            command_port,
            output_dir = %config.output_dir.display(),
            "bridge ready"
        );

        Ok(Self {
            listener,
            advertiser,
            coordinator,
            commands,
        })
    }

    /// Address button events are received on.
    #[cfg(test)]
    pub fn command_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Run advertiser, listener and coordinator until `shutdown` fires, then
    /// wait for all three to stop.
    pub async fn run(self, shutdown: CancellationToken) {
        let advertiser = tokio::spawn(self.advertiser.run(shutdown.clone()));
        let listener = tokio::spawn(self.listener.run(shutdown.clone()));
        let coordinator = tokio::spawn(self.coordinator.run(self.commands, shutdown.clone()));

        let (advertiser, listener, coordinator) = tokio::join!(advertiser, listener, coordinator);
        for (task, joined) in [("advertiser", advertiser), ("listener", listener), ("coordinator", coordinator)] {
            if let Err(e) = joined {
                error!(task, error = %e, "task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanbridge_core::ScanBridgeError;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    fn local_config(output_dir: &std::path::Path, snmp_port: u16) -> BridgeConfig {
        BridgeConfig {
            device_addr: "127.0.0.1".into(),
            listen_addr: "127.0.0.1".into(),
            output_dir: output_dir.to_path_buf(),
            command_port: 0,
            snmp_port,
            snmp_timeout_ms: 200,
            capture_program: "/nonexistent/scanbridge-test-tool".into(),
            ..BridgeConfig::default()
        }
    }

    #[tokio::test]
    async fn advertises_bound_port_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("nested").join("scans");
        let device = UdpSocket::bind("127.0.0.1:0").await.expect("device socket");
        let snmp_port = device.local_addr().expect("addr").port();

        let bridge = Bridge::start(local_config(&output, snmp_port)).await.expect("start");
        assert!(output.is_dir());
        let command_port = bridge.command_addr().expect("command addr").port();
        assert_ne!(command_port, 0);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(bridge.run(shutdown.clone()));

        let mut buf = [0u8; 512];
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), device.recv_from(&mut buf))
            .await
            .expect("advertisement arrives")
            .expect("recv");
        let expected = format!("HOST=127.0.0.1:{command_port};");
        assert!(
            buf[..len].windows(expected.len()).any(|w| w == expected.as_bytes()),
            "set request names the callback address"
        );

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("bridge stops")
            .expect("join");
    }

    #[tokio::test]
    async fn taken_command_port_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let taken = UdpSocket::bind("127.0.0.1:0").await.expect("first bind");
        let mut config = local_config(dir.path(), 161);
        config.command_port = taken.local_addr().expect("addr").port();

        let err = Bridge::start(config).await.err().expect("bind conflict");
        assert!(matches!(err, ScanBridgeError::Bind { .. }));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_binding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = local_config(dir.path(), 161);
        config.queue_capacity = 0;

        let err = Bridge::start(config).await.err().expect("invalid");
        assert!(matches!(err, ScanBridgeError::Config(_)));
    }
}
