//! Shared HTTP error mapping for REST-backed providers

use std::time::Duration;

use agent_core::error::AgentError;
use reqwest::StatusCode;

/// Map a transport-level failure onto the agent error taxonomy
pub(crate) fn transport_error(
    provider: &str,
    err: reqwest::Error,
    timeout: Duration,
) -> AgentError {
    if err.is_timeout() {
        AgentError::Timeout(timeout)
    } else if err.is_connect() {
        AgentError::ProviderUnavailable(format!("{}: {}", provider, err))
    } else if err.is_decode() {
        AgentError::Parse(format!("{}: {}", provider, err))
    } else {
        AgentError::Provider(format!("{}: {}", provider, err))
    }
}

/// Map a non-success HTTP status onto the agent error taxonomy
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> AgentError {
    let detail = format!("{} returned {}: {}", provider, status, truncate(body, 200));
    match status {
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(detail),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
