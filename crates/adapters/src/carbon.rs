// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Carbon plaintext metrics sink: `post_metric` opens a raw TCP socket and
//! writes a single `path value timestamp\n` line. Failures are logged and
//! swallowed; metrics are an observability nicety, never a reason to fail
//! a run.

use std::io::Write as _;
use std::net::TcpStream;
use std::time::Duration;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct CarbonConfig {
    pub host: String,
    pub port: u16,
    pub metric_prefix: String,
}

/// A best-effort metrics sink. Construct with `None` to get a disabled
/// sink that no-ops every call, matching the original's "enabled" gate
/// when configuration is incomplete.
pub struct CarbonClient {
    config: Option<CarbonConfig>,
}

impl CarbonClient {
    pub fn new(config: Option<CarbonConfig>) -> Self {
        CarbonClient { config }
    }

    pub fn disabled() -> Self {
        CarbonClient { config: None }
    }

    /// Posts a single metric sample at `timestamp` (Unix seconds). Never
    /// returns an error: a connection failure is logged as a warning and
    /// the call otherwise proceeds as if nothing happened.
    pub fn post_metric(&self, metric_path: &str, value: f64, timestamp: i64) {
        let Some(config) = &self.config else {
            return;
        };
        let full_path = format!("{}.{metric_path}", config.metric_prefix);
        let message = format!("{full_path} {value} {timestamp}\n");

        let result = (|| -> std::io::Result<()> {
            let mut stream = TcpStream::connect((config.host.as_str(), config.port))?;
            stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;
            stream.write_all(message.as_bytes())
        })();

        match result {
            Ok(()) => tracing::debug!(metric = %full_path.trim(), "posted metric to Carbon"),
            Err(err) => tracing::warn!(
                metric = %full_path,
                host = %config.host,
                port = config.port,
                error = %err,
                "could not post metric to Carbon"
            ),
        }
    }
}

#[cfg(test)]
#[path = "carbon_tests.rs"]
mod tests;
