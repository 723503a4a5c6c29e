use std::time::Duration;

use log::debug;
use ng_core::{ConnectivityProbe, ProbeError};

/// Reachability check over HTTP. Any response counts as online, whatever
/// its status.
pub struct HttpProbe {
    runtime: tokio::runtime::Runtime,
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, String> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            runtime,
            client,
            url: url.to_string(),
            timeout,
        })
    }

    async fn probe_async(&self) -> Result<bool, ProbeError> {
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                debug!("probe {} answered {}", self.url, response.status());
                Ok(true)
            }
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout),
            Err(e) if e.is_connect() => {
                debug!("probe {} could not connect: {}", self.url, e);
                Ok(false)
            }
            Err(e) => Err(ProbeError::Failed(e.to_string())),
        }
    }
}

impl ConnectivityProbe for HttpProbe {
    fn is_reachable(&mut self) -> Result<bool, ProbeError> {
        let timeout = self.timeout;
        self.runtime.block_on(async {
            tokio::time::timeout(timeout, self.probe_async())
                .await
                .unwrap_or(Err(ProbeError::Timeout))
        })
    }
}
