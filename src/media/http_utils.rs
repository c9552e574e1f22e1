//! HTTP utilities for the media client
//!
//! Provides client construction and turns non-success responses into short,
//! log-safe error strings.

use reqwest::{Client as HttpClient, Response};
use std::time::Duration;

/// Connect timeout for every proxy connection
const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Longest error body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Creates the shared HTTP client.
///
/// Per-request timeouts are set by the caller; only the connect timeout is
/// fixed here so a dead proxy cannot hang a flow.
#[must_use]
pub fn create_http_client() -> HttpClient {
    HttpClient::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Reads a non-success response into a summary like `API error: 400 Bad Request - {...}`.
///
/// HTML error pages from proxies are replaced by the status line and long
/// bodies are truncated.
pub async fn describe_error_response(response: Response) -> String {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    summarize_error_body(status, &error_text)
}

/// Builds the error summary for a status and raw body.
#[must_use]
pub fn summarize_error_body(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return format!("API error: {status} (Server returned HTML error page)");
    }

    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated = crate::utils::truncate_str(body, MAX_ERROR_BODY_CHARS);
        format!("API error: {status} - {truncated}... (truncated)")
    } else if body.is_empty() {
        format!("API error: {status}")
    } else {
        format!("API error: {status} - {body}")
    }
}

/// Describes a transport-level `reqwest` failure, naming timeouts explicitly.
#[must_use]
pub fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {error}")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn html_pages_are_not_echoed() {
        let summary = summarize_error_body(
            StatusCode::BAD_GATEWAY,
            "<!DOCTYPE html><html><body>nginx</body></html>",
        );
        assert_eq!(
            summary,
            "API error: 502 Bad Gateway (Server returned HTML error page)"
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let summary = summarize_error_body(StatusCode::BAD_REQUEST, &body);
        assert!(summary.ends_with("... (truncated)"));
        assert!(summary.len() < 600);
    }

    #[test]
    fn json_bodies_are_kept() {
        let summary = summarize_error_body(StatusCode::FORBIDDEN, r#"{"error":"bad key"}"#);
        assert_eq!(summary, r#"API error: 403 Forbidden - {"error":"bad key"}"#);
    }
}
