//! Content-tier service API client

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{ApiResponse, CandidatePage, IncludedPage, InclusionRequest, Tier, PAGE_SIZE};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Invalid response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Could not encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => ApiError::Status(code),
            other => ApiError::Transport(other.to_string()),
        }
    }
}

/// Connection settings shared by every request
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Host of the included-contents endpoints; empty means `api_base_url`
    pub included_base_url: String,
    pub admin_id: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            included_base_url: String::new(),
            admin_id: "adminId".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

pub struct TierClient {
    agent: ureq::Agent,
    api_base_url: String,
    included_base_url: String,
    admin_id: String,
}

impl TierClient {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.request_timeout_secs)))
            .timeout_connect(Some(Duration::from_secs(config.connect_timeout_secs)))
            .build()
            .new_agent();

        let api_base_url = config.api_base_url.trim().trim_end_matches('/').to_string();
        let included_base_url = match config.included_base_url.trim().trim_end_matches('/') {
            "" => api_base_url.clone(),
            url => url.to_string(),
        };

        Self {
            agent,
            api_base_url,
            included_base_url,
            admin_id: config.admin_id.clone(),
        }
    }

    pub fn included_url(&self, tier: Tier) -> String {
        format!(
            "{}/v1/internal/ads/tiers/{}/included-contents",
            self.included_base_url,
            tier.id()
        )
    }

    pub fn candidates_url(&self, tier: Tier, page: u32) -> String {
        format!(
            "{}/v1/internal/ads/tiers/contents?tierId={}&pageNo={}&pageSize={}",
            self.api_base_url,
            tier.id(),
            page,
            PAGE_SIZE
        )
    }

    /// Contents already included in `tier` (first page only)
    pub fn get_included_contents(&self, tier: Tier) -> Result<IncludedPage, ApiError> {
        let url = format!("{}?pageNo=1&pageSize={}", self.included_url(tier), PAGE_SIZE);
        let body = self.get(&url)?;
        parse_envelope(&body)
    }

    /// One page of inclusion candidates for `tier`
    pub fn get_candidate_contents(&self, tier: Tier, page: u32) -> Result<CandidatePage, ApiError> {
        let body = self.get(&self.candidates_url(tier, page))?;
        parse_envelope(&body)
    }

    /// Bulk inclusion. The response body is not inspected.
    pub fn include_contents(&self, tier: Tier, request: &InclusionRequest) -> Result<(), ApiError> {
        let body = serde_json::to_string(request).map_err(ApiError::Encode)?;
        self.agent
            .post(&self.included_url(tier))
            .header("accept", "application/json")
            .header("adminId", &self.admin_id)
            .header("Content-Type", "application/json")
            .send(body.as_str())?;
        Ok(())
    }

    fn get(&self, url: &str) -> Result<String, ApiError> {
        let mut response = self
            .agent
            .get(url)
            .header("accept", "application/json")
            .header("adminId", &self.admin_id)
            .call()?;

        Ok(response.body_mut().read_to_string()?)
    }
}

/// Decode a service envelope and return its `data` payload
pub fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: ApiResponse<T> = serde_json::from_str(body).map_err(ApiError::Decode)?;
    if let Some(message) = envelope.message.as_deref().filter(|m| !m.is_empty()) {
        log::debug!(
            "service replied code={} message={}",
            envelope.code.as_deref().unwrap_or("-"),
            message
        );
    }
    Ok(envelope.data)
}

/// Run `op` up to `attempts` times, sleeping `delay` between failures
pub fn with_retries<T>(
    attempts: u32,
    delay: Duration,
    mut op: impl FnMut() -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts.max(1) => return Err(e),
            Err(e) => {
                log::warn!("attempt {} failed: {}, retrying", attempt, e);
                std::thread::sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned response and hand back the raw request text
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut payload = vec![0u8; content_length];
            reader.read_exact(&mut payload).unwrap();
            request.push_str(&String::from_utf8_lossy(&payload));

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });
        (format!("http://{}", addr), handle)
    }

    fn client_for(base: &str) -> TierClient {
        TierClient::new(&ClientConfig {
            api_base_url: base.to_string(),
            admin_id: "ops-admin".to_string(),
            ..ClientConfig::default()
        })
    }

    #[test]
    fn test_urls() {
        let client = TierClient::new(&ClientConfig {
            api_base_url: "https://api.example.com/".to_string(),
            included_base_url: "https://qa.example.com".to_string(),
            ..ClientConfig::default()
        });
        assert_eq!(
            client.included_url(Tier::NonTier),
            "https://qa.example.com/v1/internal/ads/tiers/4/included-contents"
        );
        assert_eq!(
            client.candidates_url(Tier::Tier2, 3),
            "https://api.example.com/v1/internal/ads/tiers/contents?tierId=2&pageNo=3&pageSize=20"
        );
    }

    #[test]
    fn test_included_base_falls_back() {
        let client = client_for("http://svc.local");
        assert_eq!(
            client.included_url(Tier::Tier1),
            "http://svc.local/v1/internal/ads/tiers/1/included-contents"
        );
    }

    #[test]
    fn test_parse_included_envelope() {
        let body = r#"{"code":"0000","message":"OK","detailMessage":null,
            "data":{"totalCount":2,"list":[
                {"tierId":1,"tvingContentCode":"P1","pipContentCode":"X1","name":"One"},
                {"tierId":1,"tvingContentCode":"P2","pipContentCode":"X2","name":"Two"}]}}"#;
        let page: IncludedPage = parse_envelope(body).unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.list[1].content_code, "P2");
    }

    #[test]
    fn test_parse_envelope_tolerates_null_metadata() {
        let body = r#"{"code":null,"message":null,"detailMessage":null,
            "data":{"totalCount":1,"list":[
                {"tierId":2,"tvingContentCode":"P7","pipContentCode":"X7","name":"Seven"}]}}"#;
        let page: IncludedPage = parse_envelope(body).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.list[0].content_code, "P7");
    }

    #[test]
    fn test_parse_envelope_rejects_garbage() {
        let result: Result<IncludedPage, _> = parse_envelope("<html>gateway timeout</html>");
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_get_candidates_sends_headers() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"code":"0000","message":"","detailMessage":"","data":{"date":1700000000000,"totalCount":0,"list":[]}}"#,
        );
        let page = client_for(&base).get_candidate_contents(Tier::Tier3, 2).unwrap();
        assert!(page.list.is_empty());

        let request = server.join().unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("GET /v1/internal/ads/tiers/contents?tierId=3&pageNo=2&pageSize=20 "));
        assert!(lower.contains("accept: application/json"));
        assert!(lower.contains("adminid: ops-admin"));
    }

    #[test]
    fn test_include_contents_posts_body() {
        let (base, server) = serve_once("HTTP/1.1 200 OK", r#"{"code":"0000"}"#);
        let body = InclusionRequest::include(vec!["P1".to_string(), "P9".to_string()]);
        client_for(&base).include_contents(Tier::Tier1, &body).unwrap();

        let request = server.join().unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("POST /v1/internal/ads/tiers/1/included-contents "));
        assert!(lower.contains("content-type: application/json"));
        assert!(lower.contains("adminid: ops-admin"));
        assert!(request.ends_with(r#"{"inclusions":["P1","P9"],"exclusions":[]}"#));
    }

    #[test]
    fn test_http_error_status() {
        let (base, server) = serve_once("HTTP/1.1 500 Internal Server Error", "{}");
        let result = client_for(&base).get_included_contents(Tier::Tier2);
        assert!(matches!(result, Err(ApiError::Status(500))));
        server.join().unwrap();
    }

    #[test]
    fn test_with_retries_gives_up() {
        let mut calls = 0;
        let result: Result<(), _> = with_retries(3, Duration::from_millis(1), || {
            calls += 1;
            Err(ApiError::Status(503))
        });
        assert!(matches!(result, Err(ApiError::Status(503))));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_with_retries_recovers() {
        let mut calls = 0;
        let result = with_retries(3, Duration::from_millis(1), || {
            calls += 1;
            if calls < 2 { Err(ApiError::Transport("reset".into())) } else { Ok(calls) }
        });
        assert_eq!(result.unwrap(), 2);
    }
}
