// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture invocation with a fixed retry policy.
//
// The device is not ready to scan immediately after it reports a button
// press, so every command waits a settle delay before its first attempt.  A
// failed attempt is retried straight away, without waiting again.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use scanbridge_core::CaptureRequest;
use scanbridge_core::error::{Result, ScanBridgeError};

/// Produces one raw image per call.
pub trait CaptureInvoker: Send + Sync + 'static {
    fn capture(&self, request: &CaptureRequest) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// When and how often to attempt a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePolicy {
    /// Wait before the first attempt.
    pub settle_delay: Duration,
    /// Total attempts, including the first.
    pub attempts: u32,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            attempts: 2,
        }
    }
}

impl CapturePolicy {
    /// Delay before attempt number `attempt` (1-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 1 { self.settle_delay } else { Duration::ZERO }
    }

    fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

/// Capture once, retrying according to `policy`. Returns the last error when
/// every attempt fails.
#[instrument(skip_all, fields(w = request.area.width_mm, h = request.area.height_mm))]
pub async fn capture_with_retry<C: CaptureInvoker>(
    invoker: &C,
    request: &CaptureRequest,
    policy: &CapturePolicy,
) -> Result<Vec<u8>> {
    let max_attempts = policy.max_attempts();

    for attempt in 1..=max_attempts {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "waiting for device to settle");
            tokio::time::sleep(delay).await;
        }

        match invoker.capture(request).await {
            Ok(image) => {
                if attempt > 1 {
                    info!(attempt, "capture succeeded on retry");
                }
                return Ok(image);
            }
            Err(e) if attempt < max_attempts => {
                warn!(attempt, max = max_attempts, error = %e, "capture attempt failed, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    // `max_attempts` is at least 1, so the loop always returns.
    Err(ScanBridgeError::CaptureSpawn("no capture attempt was made".into()))
}

/// Runs SANE's `scanimage` (or a compatible tool) and returns its stdout.
#[derive(Debug, Clone)]
pub struct ScanImage {
    program: String,
}

impl ScanImage {
    /// Invoker running `program`, looked up on `PATH` unless it is a path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for one capture.
    pub fn args(request: &CaptureRequest) -> Vec<String> {
        let mut args = vec![
            "--resolution".to_string(),
            request.resolution_dpi.to_string(),
            "-x".to_string(),
            request.area.width_mm.to_string(),
            "-y".to_string(),
            request.area.height_mm.to_string(),
            "--format".to_string(),
            request.format.tool_keyword().to_string(),
        ];
        if let Some(device) = &request.device {
            args.push("--device".to_string());
            args.push(device.clone());
        }
        args
    }
}

impl Default for ScanImage {
    fn default() -> Self {
        Self::new("scanimage")
    }
}

impl CaptureInvoker for ScanImage {
    async fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>> {
        let args = Self::args(request);
        debug!(
            w = request.area.width_mm,
            h = request.area.height_mm,
            "+ {} {}",
            self.program,
            args.join(" ")
        );

        // Dropping the future (shutdown) kills the tool.
        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ScanBridgeError::CaptureSpawn(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(ScanBridgeError::CaptureFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(bytes = output.stdout.len(), "capture complete");
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanbridge_core::{CaptureFormat, ScanArea};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn request(area: ScanArea) -> CaptureRequest {
        CaptureRequest {
            resolution_dpi: 200,
            area,
            format: CaptureFormat::Jpeg,
            device: None,
        }
    }

    /// Invoker that fails or succeeds according to a script, then succeeds.
    #[derive(Clone, Default)]
    struct Scripted {
        failures: Arc<Mutex<VecDeque<bool>>>,
        calls: Arc<Mutex<u32>>,
    }

    impl Scripted {
        fn with(script: &[bool]) -> Self {
            let scripted = Self::default();
            scripted.failures.lock().expect("lock").extend(script.iter().copied());
            scripted
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("lock")
        }
    }

    impl CaptureInvoker for Scripted {
        async fn capture(&self, _request: &CaptureRequest) -> Result<Vec<u8>> {
            let call = {
                let mut calls = self.calls.lock().expect("lock");
                *calls += 1;
                *calls
            };
            let fail = self.failures.lock().expect("lock").pop_front().unwrap_or(false);
            if fail {
                return Err(ScanBridgeError::CaptureFailed {
                    status: "exit status: 1".into(),
                    stderr: "scanimage: open of device failed".into(),
                });
            }
            Ok(format!("image-{call}").into_bytes())
        }
    }

    #[test]
    fn settle_delay_applies_only_to_first_attempt() {
        let policy = CapturePolicy::default();
        assert_eq!(policy.delay_before(1), Duration::from_secs(1));
        assert_eq!(policy.delay_before(2), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_failure_returns_single_image() {
        let invoker = Scripted::with(&[true]);
        let policy = CapturePolicy::default();
        let started = Instant::now();

        let image = capture_with_retry(&invoker, &request(ScanArea::FULL_PAGE), &policy)
            .await
            .expect("second attempt succeeds");

        assert_eq!(image, b"image-2");
        assert_eq!(invoker.calls(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_two_failures() {
        let invoker = Scripted::with(&[true, true, false]);
        let policy = CapturePolicy::default();
        let started = Instant::now();

        let result = capture_with_retry(&invoker, &request(ScanArea::FULL_PAGE), &policy).await;

        assert!(matches!(result, Err(ScanBridgeError::CaptureFailed { .. })));
        assert_eq!(invoker.calls(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_does_not_retry() {
        let invoker = Scripted::default();
        let image = capture_with_retry(&invoker, &request(ScanArea::DUMMY), &CapturePolicy::default())
            .await
            .expect("capture");
        assert_eq!(image, b"image-1");
        assert_eq!(invoker.calls(), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let invoker = Scripted::default();
        let policy = CapturePolicy {
            settle_delay: Duration::ZERO,
            attempts: 0,
        };
        assert!(capture_with_retry(&invoker, &request(ScanArea::DUMMY), &policy).await.is_ok());
        assert_eq!(invoker.calls(), 1);
    }

    #[test]
    fn args_follow_scanimage_conventions() {
        let mut req = request(ScanArea::FULL_PAGE);
        assert_eq!(
            ScanImage::args(&req),
            ["--resolution", "200", "-x", "210", "-y", "297", "--format", "jpeg"]
        );

        req.area = ScanArea::DUMMY;
        req.device = Some("brother4:net1;dev0".into());
        let args = ScanImage::args(&req);
        assert_eq!(&args[2..6], ["-x", "1", "-y", "1"]);
        assert_eq!(&args[8..], ["--device", "brother4:net1;dev0"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_stdout_is_the_image() {
        let tool = ScanImage::new("echo");
        let image = tool.capture(&request(ScanArea::DUMMY)).await.expect("echo runs");
        assert_eq!(image, b"--resolution 200 -x 1 -y 1 --format jpeg\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_capture_failure() {
        let tool = ScanImage::new("false");
        let result = tool.capture(&request(ScanArea::FULL_PAGE)).await;
        assert!(matches!(result, Err(ScanBridgeError::CaptureFailed { .. })));
    }

    #[tokio::test]
    async fn missing_tool_is_spawn_failure() {
        let tool = ScanImage::new("/nonexistent/scanbridge-test-tool");
        let result = tool.capture(&request(ScanArea::FULL_PAGE)).await;
        assert!(matches!(result, Err(ScanBridgeError::CaptureSpawn(_))));
    }
}
