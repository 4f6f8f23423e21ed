// src/fetch/mod.rs

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::FetchConfig;
use crate::error::{Error, Result};

/// Build a client carrying the configured headers and request timeout.
pub fn build_client(config: &FetchConfig) -> Result<Client> {
    let mut headers = HeaderMap::with_capacity(config.headers.len());
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Config(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Config(format!("header {name}: {e}")))?;
        headers.insert(name, value);
    }

    Client::builder()
        .default_headers(headers)
        .timeout(config.timeout())
        .build()
        .map_err(|e| Error::Config(format!("building HTTP client: {e}")))
}

/// POST the configured form once and decode the JSON body.
///
/// Any non-2xx status, connection error or timeout is a `TransportFailure`;
/// a 2xx body that is not JSON is a `MalformedResponse`. No retries.
#[instrument(level = "info", skip(client, config), fields(endpoint = %config.endpoint))]
pub async fn fetch(client: &Client, config: &FetchConfig) -> Result<Value> {
    debug!(form = ?config.form, "POST");
    let resp = client
        .post(config.endpoint.clone())
        .form(&config.form)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        warn!(%status, "request rejected");
        return Err(Error::TransportFailure {
            status: Some(status.as_u16()),
            message: format!("POST {} returned {}", config.endpoint, status),
        });
    }

    let body = resp.bytes().await?;
    info!(bytes = body.len(), "response received");
    serde_json::from_slice(&body)
        .map_err(|e| Error::MalformedResponse(format!("body is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_header_values() {
        let mut cfg = FetchConfig::default();
        cfg.headers.insert("X-Bad".to_string(), "line\nbreak".to_string());
        let err = build_client(&cfg).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("x-bad")), "{err}");

        let mut cfg = FetchConfig::default();
        cfg.headers.insert("bad name".to_string(), "v".to_string());
        assert!(matches!(build_client(&cfg), Err(Error::Config(_))));
    }

    #[test]
    fn default_headers_are_valid() {
        assert!(build_client(&FetchConfig::default()).is_ok());
    }
}
