//! Model reply post-processing and parsing

use serde::Deserialize;

/// Strips prompt-convention wrapping from a model reply before JSON parsing
pub trait ModelClientResponseProcessor: Send + Sync {
    fn process(&self, response: &str) -> String;
}

/// Unwraps ```` ```json ```` fences and `<answer>` tags
///
/// The fence is handled first, so a fence nested inside an `<answer>` block
/// yields the bare JSON body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModelClientResponseProcessor;

fn between<'a>(text: &'a str, open: &str, close: &str) -> &'a str {
    match text.find(open) {
        Some(start) => {
            let rest = &text[start + open.len()..];
            match rest.find(close) {
                Some(end) => &rest[..end],
                None => rest,
            }
        }
        None => text,
    }
}

impl ModelClientResponseProcessor for DefaultModelClientResponseProcessor {
    fn process(&self, response: &str) -> String {
        let mut text = response.trim();
        if text.contains("```json") {
            text = between(text, "```json", "```").trim();
        }
        if text.contains("<answer>") {
            text = between(text, "<answer>", "</answer>").trim();
        }
        text.to_string()
    }
}

/// Parsed routing answer; unknown fields are ignored
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelClientResponse {
    #[serde(rename = "agentName")]
    pub agent_name: String,
}
