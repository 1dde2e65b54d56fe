use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

use crate::core::backend::{Backend, Envelope, Method};

/// Validate that a backend base URL uses HTTPS.
///
/// Plain HTTP is only accepted for loopback hosts, so tokens never leave the
/// machine unencrypted.
pub fn validate_endpoint(url: &str) -> Result<()> {
    if url.starts_with("https://") {
        return Ok(());
    }
    let loopback = ["http://localhost", "http://127.0.0.1", "http://[::1]"];
    let is_loopback = loopback.iter().any(|prefix| {
        url.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':') || rest.starts_with('/'))
    });
    if !is_loopback {
        anyhow::bail!("backend endpoint must use HTTPS, got: {}", url);
    }
    Ok(())
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        validate_endpoint(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route.trim_start_matches('/'))
    }
}

impl Backend for HttpBackend {
    async fn call(
        &self,
        route: &str,
        method: Method,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Envelope> {
        let url = self.url(route);
        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        request = request.header("Accept", "application/json");
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        tracing::debug!(%url, ?method, "backend call");
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(Envelope::session_expired());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(Envelope::failed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        response
            .json::<Envelope>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}
