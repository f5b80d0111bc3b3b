use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// How long `check` waits for an echo reply by default.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Slack on top of the probe timeout for process startup and reaping.
const PROBE_OVERHEAD: Duration = Duration::from_millis(500);

/// Probes `addr` with one ICMP echo request and reports whether it replied
/// within `timeout`.
///
/// The probe shells out to the system `ping` utility so no raw-socket
/// privilege is needed. The utility's own wait flag only takes whole
/// seconds, so a sub-second `timeout` rounds up to `-W 1` and the outer
/// deadline here is what bounds the call (the child is killed when the
/// deadline drops it). Every failure mode collapses to `false`: timeout,
/// no route, resolution failure, even a missing `ping` binary. Offline and
/// unprobeable are indistinguishable on purpose, and the caller never sees
/// an error.
pub async fn check(addr: &str, timeout: Duration) -> bool {
    let wait_secs = timeout.as_secs().max(1).to_string();
    let probe = Command::new("ping")
        .args(["-c", "1", "-W", &wait_secs])
        .arg(addr)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        // the deadline below may fire before ping's own -W does
        .kill_on_drop(true)
        .output();
    match tokio::time::timeout(timeout + PROBE_OVERHEAD, probe).await {
        Ok(Ok(output)) => output.status.success(),
        Ok(Err(_)) | Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    // .invalid is reserved and never resolves (RFC 2606)
    #[tokio::test]
    async fn unresolvable_host_is_not_alive() {
        let start = Instant::now();
        assert!(!check("host.invalid", PROBE_TIMEOUT).await);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    // 192.0.2.0/24 is TEST-NET-1, nothing answers there
    #[tokio::test]
    async fn unroutable_address_is_not_alive() {
        let start = Instant::now();
        assert!(!check("192.0.2.1", PROBE_TIMEOUT).await);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn garbage_address_is_not_alive() {
        assert!(!check("", PROBE_TIMEOUT).await);
    }
}
