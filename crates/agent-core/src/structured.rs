//! Structured Output
//!
//! Models asked for JSON still wrap it in prose or markdown fences.
//! These helpers locate the JSON object and deserialize it.

use serde::de::DeserializeOwned;

use crate::error::{AgentError, Result};

/// Locate the JSON object inside an LLM response
///
/// Looks for a fenced ```` ```json ```` block first, then falls back to the
/// outermost pair of braces.
pub fn extract_json_object(content: &str) -> Result<&str> {
    for fence in ["```json", "```JSON", "```"] {
        if let Some(start_idx) = content.find(fence) {
            let after_marker = &content[start_idx + fence.len()..];
            if let Some(end_idx) = after_marker.find("```") {
                let inner = after_marker[..end_idx].trim();
                if inner.starts_with('{') && inner.ends_with('}') {
                    return Ok(inner);
                }
            }
        }
    }

    let start = content
        .find('{')
        .ok_or_else(|| AgentError::Parse("no JSON object in response".into()))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| AgentError::Parse("unterminated JSON object in response".into()))?;

    if end <= start {
        return Err(AgentError::Parse(
            "malformed JSON object in response".into(),
        ));
    }

    Ok(&content[start..=end])
}

/// Extract and deserialize a JSON object from an LLM response
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T> {
    let json_str = extract_json_object(content)?;
    serde_json::from_str(json_str).map_err(|e| AgentError::Parse(e.to_string()))
}
