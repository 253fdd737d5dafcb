//! Turns HTTP outcomes into [`ApiError`]s.

use serde_json::Value;

use super::ApiError;

/// Pulls a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, `{"detail": [{"msg": "..."}, ...]}` and
/// `{"message": "..."}`.
pub fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    match value.get("detail") {
        Some(Value::String(detail)) if !detail.trim().is_empty() => {
            return Some(detail.clone());
        }
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}

/// Classifies a non-success status. 401 and 403 both mean the session is not good enough.
pub fn classify_status(status: u16, body: &str) -> ApiError {
    let message = extract_message(body);

    match status {
        401 | 403 => ApiError::Unauthorized(
            message.unwrap_or_else(|| "please sign in to continue".to_string()),
        ),
        400..=499 => ApiError::Rejected {
            status,
            message: message.unwrap_or_else(|| format!("request rejected (HTTP {status})")),
        },
        _ => ApiError::Server {
            status,
            message: message.unwrap_or_else(|| format!("HTTP error! status: {status}")),
        },
    }
}

pub fn classify_transport(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network("the server did not respond in time".to_string())
    } else if err.is_connect() {
        ApiError::Network(
            "unable to connect to the server, please check your internet connection".to_string(),
        )
    } else {
        ApiError::Network(err.to_string())
    }
}
