//! Reqwest-backed Gemini model adapter.
//!
//! This adapter owns transport details only: request serialisation, timeout
//! and HTTP error mapping, and decoding the reply text. It never retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{GenerateContentRequestDto, GenerateContentResponseDto};
use crate::domain::ports::{MatchModel, MatchModelError};
use crate::domain::smart_match::MatchPrompt;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for the Gemini adapter.
pub struct GeminiConfig {
    /// API key sent with every request. Wiped from memory on drop.
    pub api_key: Zeroizing<String>,
    /// Model name, for example `gemini-2.5-flash-lite`.
    pub model: String,
    /// API base, for example `https://generativelanguage.googleapis.com/v1beta`.
    pub endpoint: Url,
    /// Whole-request timeout applied by the HTTP client.
    pub timeout: Duration,
}

/// Errors raised while constructing the adapter.
#[derive(Debug, Error)]
pub enum GeminiSetupError {
    /// The HTTP client could not be built.
    #[error("failed to build Gemini HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The model name does not form a valid request URL.
    #[error("invalid Gemini request URL for model {model:?}: {source}")]
    RequestUrl {
        model: String,
        source: url::ParseError,
    },
}

/// Match model adapter that calls Gemini's `generateContent` endpoint.
pub struct GeminiMatchModel {
    client: Client,
    request_url: Url,
    api_key: Zeroizing<String>,
}

impl GeminiMatchModel {
    /// Build an adapter using a reqwest client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed or the
    /// model name does not form a valid URL.
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiSetupError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let request_url = generate_content_url(&config.endpoint, &config.model)?;
        Ok(Self {
            client,
            request_url,
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl MatchModel for GeminiMatchModel {
    async fn complete(&self, prompt: &MatchPrompt) -> Result<String, MatchModelError> {
        let response = self
            .client
            .post(self.request_url.clone())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&GenerateContentRequestDto::user_text(prompt.as_str()))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(status = status.as_u16(), bytes = body.len(), "Gemini responded");
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        parse_reply(body.as_ref())
    }
}

fn generate_content_url(endpoint: &Url, model: &str) -> Result<Url, GeminiSetupError> {
    let base = endpoint.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/models/{model}:generateContent")).map_err(|source| {
        GeminiSetupError::RequestUrl {
            model: model.to_owned(),
            source,
        }
    })
}

fn parse_reply(body: &[u8]) -> Result<String, MatchModelError> {
    let decoded: GenerateContentResponseDto = serde_json::from_slice(body).map_err(|error| {
        MatchModelError::decode(format!("invalid Gemini JSON payload: {error}"))
    })?;
    decoded.into_text().map_err(MatchModelError::decode)
}

fn map_transport_error(error: reqwest::Error) -> MatchModelError {
    if error.is_timeout() {
        MatchModelError::timeout(error.to_string())
    } else {
        MatchModelError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MatchModelError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => MatchModelError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            MatchModelError::timeout(message)
        }
        _ if status.is_client_error() => MatchModelError::invalid_request(message),
        _ => MatchModelError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network Gemini mapping helpers.

    use super::*;
    use rstest::rstest;

    fn endpoint(raw: &str) -> Url {
        Url::parse(raw).expect("valid endpoint")
    }

    #[rstest]
    #[case::bare("https://generativelanguage.googleapis.com/v1beta")]
    #[case::trailing_slash("https://generativelanguage.googleapis.com/v1beta/")]
    fn request_url_appends_model_and_method(#[case] raw: &str) {
        let url = generate_content_url(&endpoint(raw), "gemini-2.5-flash-lite")
            .expect("url builds");

        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[test]
    fn request_body_wraps_prompt_in_one_user_turn() {
        let body = serde_json::to_value(GenerateContentRequestDto::user_text("rank these"))
            .expect("request serialises");

        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "rank these" }] }]
            })
        );
    }

    #[test]
    fn reply_concatenates_first_candidate_text_parts() {
        let body = r#"{
            "candidates": [
                { "content": { "parts": [{ "text": "[{\"id\":\"0\"," }, { "text": "\"score\":90}]" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }"#;

        let reply = parse_reply(body.as_bytes()).expect("reply decodes");
        assert_eq!(reply, r#"[{"id":"0","score":90}]"#);
    }

    #[rstest]
    #[case::not_json("<html>bad gateway</html>")]
    #[case::no_candidates(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)]
    #[case::no_text(r#"{"candidates":[{"content":{"parts":[]},"finishReason":"MAX_TOKENS"}]}"#)]
    fn unusable_bodies_map_to_decode(#[case] body: &str) {
        let error = parse_reply(body.as_bytes()).expect_err("decode should fail");
        assert!(
            matches!(error, MatchModelError::Decode { .. }),
            "unusable bodies should map to Decode, got {error:?}",
        );
    }

    #[test]
    fn blocked_prompt_reason_is_reported() {
        let error = parse_reply(br#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .expect_err("decode should fail");
        assert!(error.to_string().contains("SAFETY"));
    }

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, "RateLimited")]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT, "Timeout")]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "Timeout")]
    #[case::bad_request(StatusCode::BAD_REQUEST, "InvalidRequest")]
    #[case::forbidden(StatusCode::FORBIDDEN, "InvalidRequest")]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, "Transport")]
    #[case::unavailable(StatusCode::SERVICE_UNAVAILABLE, "Transport")]
    fn maps_http_statuses_to_expected_domain_errors(
        #[case] status: StatusCode,
        #[case] expected: &str,
    ) {
        let error = map_status_error(status, br#"{"error":{"message":"try later"}}"#);
        let matched = match expected {
            "RateLimited" => matches!(error, MatchModelError::RateLimited { .. }),
            "Timeout" => matches!(error, MatchModelError::Timeout { .. }),
            "InvalidRequest" => matches!(error, MatchModelError::InvalidRequest { .. }),
            "Transport" => matches!(error, MatchModelError::Transport { .. }),
            _ => panic!("unsupported test expectation: {expected}"),
        };
        assert!(matched, "{status} should map to {expected}, got {error:?}");
    }

    #[test]
    fn status_message_carries_a_bounded_body_preview() {
        let body = format!("{{\"error\":\n  \"{}\"}}", "x".repeat(400));

        let error = map_status_error(StatusCode::BAD_REQUEST, body.as_bytes());

        let message = error.to_string();
        assert!(message.contains("status 400: {\"error\": \"xxx"));
        assert!(message.ends_with("..."));
    }

    #[test]
    fn empty_error_body_reports_status_only() {
        let error = map_status_error(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(error, MatchModelError::transport("status 502"));
    }
}
