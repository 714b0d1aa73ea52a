use async_trait::async_trait;
use reqwest::Client;
use snip_core::ProbeFailure;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Upper bound on a single reachability request.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks whether a URL answers before it is shortened.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync + 'static {
    async fn probe(&self, url: &Url) -> Result<(), ProbeFailure>;
}

/// Probes with a plain `GET`, accepting any 2xx or 3xx answer.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Builds a probe with a [`PROBE_TIMEOUT`] request timeout.
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(concat!("snip/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Wraps an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn probe(&self, url: &Url) -> Result<(), ProbeFailure> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ProbeFailure::Transport(e.to_string()))?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "reachability probe answered");

        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(ProbeFailure::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_refused_is_transport_failure() {
        let probe = HttpProbe::new().unwrap();
        // Grab a free port and release it so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();

        let err = probe.probe(&url).await.unwrap_err();
        assert!(matches!(err, ProbeFailure::Transport(_)));
        assert_eq!(err.code(), "02");
    }
}
