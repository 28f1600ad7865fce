//! Backend uplink reporter
//!
//! Relays position reports to the tracking backend over the network link.
//! The HTTP client and the network association itself are collaborator
//! concerns behind [`NetworkClient`]; this module owns the local abort
//! policy (no link, no base URL, no API key means no request leaves the
//! device) and the request shape.

use crate::error::{Error, Result};
use serde::Serialize;

/// Outbound HTTP boundary provided by the network stack.
pub trait NetworkClient: Send {
    /// POST a JSON body, returning the HTTP status code.
    fn post(&mut self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<u16>;

    /// Whether the network link is currently established.
    fn link_up(&self) -> bool;
}

/// Position report relayed to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerReport {
    pub timestamp: u64,
    pub gps_status: u8,
    pub fix: bool,
    pub satellites: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub battery_level: u8,
}

/// Reporter bound to one backend base URL.
pub struct BackendReporter<C: NetworkClient> {
    client: C,
    base_url: String,
}

impl<C: NetworkClient> BackendReporter<C> {
    pub fn new(client: C, base_url: &str) -> Self {
        let mut reporter = BackendReporter {
            client,
            base_url: String::new(),
        };
        reporter.set_base_url(base_url);
        reporter
    }

    /// Set the backend base URL, trimming a trailing slash so path
    /// joining stays predictable.
    pub fn set_base_url(&mut self, url: &str) {
        self.base_url = url.strip_suffix('/').unwrap_or(url).to_string();
    }

    pub fn link_up(&self) -> bool {
        self.client.link_up()
    }

    /// POST a JSON payload to `path` under the configured base URL.
    ///
    /// Aborts locally, without touching the client, when the network link
    /// is down or the base URL or API key is not configured.
    pub fn post_json(&mut self, api_key: Option<&str>, path: &str, body: &str) -> Result<u16> {
        if !self.client.link_up() {
            log::warn!("Network link down, POST aborted");
            return Err(Error::Offline);
        }
        if self.base_url.is_empty() {
            log::error!("Backend base URL not configured");
            return Err(Error::NotConfigured("base_url"));
        }
        let Some(key) = api_key else {
            log::error!("API key not configured, POST aborted");
            return Err(Error::NotConfigured("api_key"));
        };

        let url = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        log::debug!("POSTing JSON to {}", url);

        let code = self.client.post(
            &url,
            body,
            &[("Content-Type", "application/json"), ("X-API-Key", key)],
        )?;

        if code == 401 {
            log::error!("Backend authentication failed - check the configured API key");
        } else {
            log::debug!("POST complete, HTTP {}", code);
        }

        Ok(code)
    }

    /// Serialize and upload one position report.
    pub fn report_position(
        &mut self,
        api_key: Option<&str>,
        path: &str,
        report: &TrackerReport,
    ) -> Result<u16> {
        let body = serde_json::to_string(report)?;
        self.post_json(api_key, path, &body)
    }
}

/// Recording client for tests and the simulation backend.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug)]
pub struct MockClient {
    pub link_up: bool,
    pub response_code: u16,
    pub requests: Vec<MockRequest>,
}

#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub url: String,
    pub body: String,
    pub api_key: Option<String>,
}

#[cfg(any(test, feature = "mock"))]
impl MockClient {
    /// A client whose link is up, answering 200 to everything.
    pub fn connected() -> Self {
        MockClient {
            link_up: true,
            response_code: 200,
            requests: Vec::new(),
        }
    }

    pub fn disconnected() -> Self {
        MockClient {
            link_up: false,
            response_code: 200,
            requests: Vec::new(),
        }
    }
}

#[cfg(any(test, feature = "mock"))]
impl NetworkClient for MockClient {
    fn post(&mut self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<u16> {
        let api_key = headers
            .iter()
            .find(|(name, _)| *name == "X-API-Key")
            .map(|(_, value)| value.to_string());
        self.requests.push(MockRequest {
            url: url.to_string(),
            body: body.to_string(),
            api_key,
        });
        Ok(self.response_code)
    }

    fn link_up(&self) -> bool {
        self.link_up
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> TrackerReport {
        TrackerReport {
            timestamp: 1_000,
            gps_status: 2,
            fix: true,
            satellites: 8,
            latitude: 45.0,
            longitude: -93.0,
            altitude: 250.0,
            battery_level: 90,
        }
    }

    #[test]
    fn test_abort_when_link_down() {
        let mut reporter = BackendReporter::new(MockClient::disconnected(), "https://api.example.com");

        let err = reporter.post_json(Some("key"), "/loc", "{}").unwrap_err();
        assert!(matches!(err, Error::Offline));
        assert!(reporter.client.requests.is_empty());
    }

    #[test]
    fn test_abort_without_base_url() {
        let mut reporter = BackendReporter::new(MockClient::connected(), "");

        let err = reporter.post_json(Some("key"), "/loc", "{}").unwrap_err();
        assert!(matches!(err, Error::NotConfigured("base_url")));
        assert!(reporter.client.requests.is_empty());
    }

    #[test]
    fn test_abort_without_api_key() {
        let mut reporter = BackendReporter::new(MockClient::connected(), "https://api.example.com");

        let err = reporter.post_json(None, "/loc", "{}").unwrap_err();
        assert!(matches!(err, Error::NotConfigured("api_key")));
        assert!(reporter.client.requests.is_empty());
    }

    #[test]
    fn test_url_normalization() {
        let mut reporter = BackendReporter::new(MockClient::connected(), "https://api.example.com/");

        reporter.post_json(Some("key"), "loc", "{}").unwrap();
        reporter.post_json(Some("key"), "/loc", "{}").unwrap();

        assert_eq!(reporter.client.requests[0].url, "https://api.example.com/loc");
        assert_eq!(reporter.client.requests[1].url, "https://api.example.com/loc");
    }

    #[test]
    fn test_api_key_header_attached() {
        let mut reporter = BackendReporter::new(MockClient::connected(), "https://api.example.com");

        reporter
            .report_position(Some("secret-123"), "/api/device/location", &report())
            .unwrap();

        let request = &reporter.client.requests[0];
        assert_eq!(request.api_key.as_deref(), Some("secret-123"));
        assert!(request.body.contains("\"latitude\":45.0"));
        assert!(request.body.contains("\"gps_status\":2"));
    }

    #[test]
    fn test_auth_failure_code_passed_through() {
        let mut client = MockClient::connected();
        client.response_code = 401;
        let mut reporter = BackendReporter::new(client, "https://api.example.com");

        let code = reporter.post_json(Some("stale-key"), "/loc", "{}").unwrap();
        assert_eq!(code, 401);
    }
}
