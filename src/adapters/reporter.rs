//! Ready-made [`Reporter`] sinks.
use tokio::sync::mpsc;

use crate::{
    core::result::{ProxyResult, ProxyStatus},
    ports::reporter::Reporter,
};

/// Emits one structured `tracing` event per result.
///
/// Bodies are left out unless `include_bodies` is set; they can be large and
/// may carry credentials.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    include_bodies: bool,
}

impl TracingReporter {
    pub fn new(include_bodies: bool) -> Self {
        Self { include_bodies }
    }
}

impl Reporter for TracingReporter {
    fn report(&self, mut result: ProxyResult) {
        if !self.include_bodies {
            result.request_body = None;
            result.response_body = None;
        }

        let details = match serde_json::to_string(&result) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize proxy result: {}", e);
                String::new()
            }
        };

        let proxied_uri = result
            .proxied_uri
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        match result.proxy_status {
            ProxyStatus::Proxied if result.http_status_code >= 500 => tracing::warn!(
                target: "switchyard::report",
                outcome = "proxied",
                method = %result.http_method,
                original_uri = %result.original_uri,
                proxied_uri = %proxied_uri,
                status = result.http_status_code,
                elapsed_ms = result.elapsed.as_millis() as u64,
                details = %details,
                "Request forwarded with server error"
            ),
            status => tracing::info!(
                target: "switchyard::report",
                outcome = ?status,
                method = %result.http_method,
                original_uri = %result.original_uri,
                proxied_uri = %proxied_uri,
                status = result.http_status_code,
                elapsed_ms = result.elapsed.as_millis() as u64,
                details = %details,
                "Request handled"
            ),
        }
    }
}

/// Pushes every result onto an unbounded channel.
///
/// Results are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: mpsc::UnboundedSender<ProxyResult>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProxyResult>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, result: ProxyResult) {
        if self.sender.send(result).is_err() {
            tracing::debug!("Result receiver dropped; discarding proxy result");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{Method, StatusCode, Uri};

    use super::*;
    use crate::core::result::ProxyResultBuilder;

    fn result(status: StatusCode) -> ProxyResult {
        ProxyResultBuilder::new(Uri::from_static("http://gw/x"), Method::GET).not_proxied(status)
    }

    #[tokio::test]
    async fn test_channel_reporter_from_many_tasks() {
        let (reporter, mut receiver) = ChannelReporter::new();
        let reporter = Arc::new(reporter);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reporter = reporter.clone();
                tokio::spawn(async move { reporter.report(result(StatusCode::OK)) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        drop(reporter);

        let mut received = 0;
        while let Some(result) = receiver.recv().await {
            assert_eq!(result.proxy_status, ProxyStatus::NotProxied);
            received += 1;
        }
        assert_eq!(received, 8);
    }

    #[test]
    fn test_channel_reporter_survives_closed_receiver() {
        let (reporter, receiver) = ChannelReporter::new();
        drop(receiver);
        reporter.report(result(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_tracing_reporter_accepts_results() {
        TracingReporter::new(false).report(result(StatusCode::OK));
        TracingReporter::new(true).report(result(StatusCode::BAD_GATEWAY));
    }
}
