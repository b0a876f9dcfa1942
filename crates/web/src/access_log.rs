//! One record per answered request.

use http::StatusCode;
use tracing::{error, info, warn};

/// Receives a record for every request that got a response.
///
/// Called concurrently from every connection task.
#[cfg_attr(test, mockall::automock)]
pub trait AccessLog: Send + Sync {
    fn record(&self, status: StatusCode, method: &str, path: &str, query: &str);
}

/// Logs through `tracing` on the `ember::access` target, with the level chosen by status:
/// `ERROR` for 5xx, `WARN` for 4xx and `INFO` otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAccessLog;

impl AccessLog for TracingAccessLog {
    fn record(&self, status: StatusCode, method: &str, path: &str, query: &str) {
        let status = status.as_u16();
        let separator = if query.is_empty() { "" } else { "?" };
        if status >= 500 {
            error!(target: "ember::access", "[{method}] [{status}] {path}{separator}{query}");
        } else if status >= 400 {
            warn!(target: "ember::access", "[{method}] [{status}] {path}{separator}{query}");
        } else {
            info!(target: "ember::access", "[{method}] [{status}] {path}{separator}{query}");
        }
    }
}
