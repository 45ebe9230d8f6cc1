use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use super::ProviderError;

pub(crate) fn client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder().timeout(timeout).build().map_err(|e| ProviderError::Http(e.to_string()))
}

/// Send a request and decode a JSON body, classifying every failure.
/// `timeout` is the one the client was built with.
pub(crate) async fn send_json(request: RequestBuilder, timeout: Duration) -> Result<Value, ProviderError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() { ProviderError::Timeout(timeout) } else { ProviderError::Http(e.to_string()) }
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|e| ProviderError::Http(e.to_string()))?;
    check_status(status, &body)?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}

pub(crate) fn check_status(status: StatusCode, body: &str) -> Result<(), ProviderError> {
    if status.is_success() { return Ok(()); }
    match status.as_u16() {
        s @ (401 | 403) => Err(ProviderError::Auth(s)),
        429 => Err(ProviderError::RateLimited),
        _ => Err(ProviderError::Http(format!("{status}: {}", snippet(body)))),
    }
}

/// Text at `pointer`; missing or non-string is malformed, blank is empty.
pub(crate) fn text_at(body: &Value, pointer: &str) -> Result<String, ProviderError> {
    let text = body
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Malformed(format!("no text at {pointer}")))?;
    let text = text.trim();
    if text.is_empty() { return Err(ProviderError::Empty); }
    Ok(text.to_string())
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let mut s: String = body.chars().take(MAX).collect();
    if body.chars().count() > MAX { s.push('…'); }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_classification() {
        assert_eq!(check_status(StatusCode::OK, ""), Ok(()));
        assert_eq!(check_status(StatusCode::UNAUTHORIZED, ""), Err(ProviderError::Auth(401)));
        assert_eq!(check_status(StatusCode::FORBIDDEN, ""), Err(ProviderError::Auth(403)));
        assert_eq!(check_status(StatusCode::TOO_MANY_REQUESTS, ""), Err(ProviderError::RateLimited));
        let err = check_status(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(matches!(err, ProviderError::Http(ref m) if m.contains("502") && m.contains("upstream down")));
    }

    #[test]
    fn text_extraction() {
        let body = json!({"choices": [{"message": {"content": "  Mì Quảng  "}}]});
        assert_eq!(text_at(&body, "/choices/0/message/content").unwrap(), "Mì Quảng");
        assert_eq!(text_at(&json!({"choices": [{"message": {"content": " "}}]}), "/choices/0/message/content"), Err(ProviderError::Empty));
        assert!(matches!(text_at(&json!({"error": "x"}), "/choices/0/message/content"), Err(ProviderError::Malformed(_))));
    }
}
